//! Deterministic execution of an `ExecutionPlan` against a `Dataset`.
//!
//! Filters are applied as successive narrowing passes (AND). Missing columns and
//! unknown operators fail open so a sloppy plan degrades instead of aborting.

use crate::blocks::{format_percentage, percentage, ResponseBlock, NO_DATA_PERCENTAGE};
use crate::dataset::Dataset;
use crate::plan::{Calculation, ExecutionPlan, Filter, FilterOperator, PlanAction};

/// Columns that the designated metrics read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricColumns {
    pub scanned_tracking: String,
    pub vendor_tracking: String,
    pub return_po: String,
}

impl Default for MetricColumns {
    fn default() -> Self {
        Self {
            scanned_tracking: "tracking_no".to_string(),
            vendor_tracking: "vend_track_no".to_string(),
            return_po: "return_po".to_string(),
        }
    }
}

/// Computed metrics in the order the plan requested them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metrics {
    values: Vec<(Calculation, f64)>,
}

impl Metrics {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|(c, _)| c.name() == name)
            .map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Calculation, f64)> {
        self.values.iter().map(|(c, v)| (c, *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn insert(&mut self, calculation: Calculation, value: f64) {
        match self.values.iter_mut().find(|(c, _)| *c == calculation) {
            Some(slot) => slot.1 = value,
            None => self.values.push((calculation, value)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    pub metrics: Metrics,
    /// Filtered rows, headers unchanged, original order preserved.
    pub subset: Dataset,
}

impl ExecutionResult {
    /// True when no rows survived filtering, so every metric is 0 for lack of data.
    pub fn no_data(&self) -> bool {
        self.subset.is_empty()
    }

    /// Cards for each metric followed by a preview table of the supporting rows.
    pub fn to_blocks(&self, plan: &ExecutionPlan, preview_rows: usize) -> Vec<ResponseBlock> {
        let mut blocks = Vec::new();
        let total = self.subset.len();

        for (calculation, value) in self.metrics.iter() {
            let (display, description) = if self.no_data() {
                let display = if calculation.is_rate() {
                    NO_DATA_PERCENTAGE.to_string()
                } else {
                    "0".to_string()
                };
                (display, "No data: no rows matched the filters".to_string())
            } else if calculation.is_rate() {
                (
                    format_percentage(value),
                    format!("Computed over {} row{}", total, plural(total)),
                )
            } else {
                (
                    format!("{}", value as u64),
                    format!(
                        "{} filter{} applied",
                        plan.filters.len(),
                        plural(plan.filters.len())
                    ),
                )
            };
            blocks.push(ResponseBlock::card(
                calculation.title(),
                display,
                Some(description),
            ));
        }

        if !self.subset.is_empty() && preview_rows > 0 {
            let (headers, rows) = self.subset.preview(&plan.columns, preview_rows);
            if !headers.is_empty() {
                blocks.push(ResponseBlock::text_table(headers, rows));
                if total > preview_rows {
                    blocks.push(ResponseBlock::markdown(format!(
                        "_Showing the first {} of {} matching rows._",
                        preview_rows, total
                    )));
                }
            }
        }

        blocks
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlanExecutor {
    columns: MetricColumns,
}

impl PlanExecutor {
    pub fn new(columns: MetricColumns) -> Self {
        Self { columns }
    }

    pub fn execute(&self, plan: &ExecutionPlan, dataset: &Dataset) -> ExecutionResult {
        if plan.action == PlanAction::DirectAnalysis {
            return ExecutionResult {
                metrics: Metrics::default(),
                subset: dataset.clone(),
            };
        }

        let mut selected: Vec<usize> = (0..dataset.len()).collect();
        for filter in &plan.filters {
            selected = apply_filter(dataset, &selected, filter);
        }
        let subset = dataset.select_rows(&selected);

        let mut metrics = Metrics::default();
        for calculation in &plan.calculations {
            match self.calculate(calculation, &subset) {
                Some(value) => metrics.insert(calculation.clone(), value),
                None => tracing::warn!(calculation = %calculation, "unknown calculation skipped"),
            }
        }

        tracing::debug!(
            filters = plan.filters.len(),
            rows_in = dataset.len(),
            rows_out = subset.len(),
            metrics = metrics.len(),
            "executed plan"
        );

        ExecutionResult { metrics, subset }
    }

    fn calculate(&self, calculation: &Calculation, rows: &Dataset) -> Option<f64> {
        let total = rows.len();
        let value = match calculation {
            Calculation::Count => total as f64,
            Calculation::MismatchRate => {
                let mismatched = (0..total)
                    .filter(|&i| {
                        let vendor = rows.value(i, &self.columns.vendor_tracking).trim();
                        let scanned = rows.value(i, &self.columns.scanned_tracking).trim();
                        !vendor.is_empty() && scanned != vendor
                    })
                    .count();
                percentage(mismatched, total)
            }
            Calculation::MissingPoRate => {
                let missing = (0..total)
                    .filter(|&i| is_blank(rows.value(i, &self.columns.return_po)))
                    .count();
                percentage(missing, total)
            }
            Calculation::Other(_) => return None,
        };
        Some(value)
    }
}

/// Execute `plan` with the default metric columns.
pub fn execute(plan: &ExecutionPlan, dataset: &Dataset) -> ExecutionResult {
    PlanExecutor::default().execute(plan, dataset)
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// One narrowing pass: the subset of `rows` whose cell satisfies `filter`.
fn apply_filter(dataset: &Dataset, rows: &[usize], filter: &Filter) -> Vec<usize> {
    if !dataset.has_column(&filter.column) {
        tracing::warn!(
            column = %filter.column,
            "filter references a missing column; treating its cells as empty"
        );
    }
    if filter.operator.takes_value() && filter.value.is_none() {
        tracing::warn!(
            column = %filter.column,
            operator = %filter.operator,
            "filter has no value; comparing against an empty string"
        );
    }
    if let FilterOperator::Other(name) = &filter.operator {
        tracing::warn!(operator = %name, "unknown filter operator; passing all rows");
        return rows.to_vec();
    }

    let needle = filter
        .value
        .as_deref()
        .unwrap_or("")
        .trim()
        .to_lowercase();

    rows.iter()
        .copied()
        .filter(|&i| {
            let cell = dataset.value(i, &filter.column);
            match &filter.operator {
                FilterOperator::Equals => cell.trim().to_lowercase() == needle,
                FilterOperator::NotEquals => cell.trim().to_lowercase() != needle,
                FilterOperator::Contains => cell.to_lowercase().contains(&needle),
                FilterOperator::IsEmpty => is_blank(cell),
                FilterOperator::IsNotEmpty => !is_blank(cell),
                FilterOperator::Other(_) => true,
            }
        })
        .collect()
}
