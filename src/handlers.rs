//! Local question handlers: deterministic computations answered without the
//! reasoning engine. Each handler validates its column arguments and reports
//! missing columns as a markdown block instead of failing.

use crate::blocks::{
    format_percentage, percentage, Cell, ChartDataset, ChartStyle, ResponseBlock,
    NO_DATA_PERCENTAGE,
};
use crate::dataset::Dataset;
use std::collections::HashMap;

/// Label used for blank cells in distributions.
pub const EMPTY_LABEL: &str = "(empty)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    UniqueCount,
    Distribution,
    ContainmentPercentage,
}

impl HandlerKind {
    /// Number of column/value arguments the handler expects.
    pub fn arity(&self) -> usize {
        match self {
            HandlerKind::UniqueCount | HandlerKind::Distribution => 1,
            HandlerKind::ContainmentPercentage => 2,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            HandlerKind::UniqueCount => "unique_count",
            HandlerKind::Distribution => "distribution",
            HandlerKind::ContainmentPercentage => "containment_percentage",
        }
    }

    /// Run the handler. Too few arguments yield a markdown block instead of an answer.
    pub fn run(&self, dataset: &Dataset, args: &[String], style: &ChartStyle) -> Vec<ResponseBlock> {
        if args.len() < self.arity() {
            return vec![ResponseBlock::markdown(format!(
                "**{}** needs {} argument{} but got {}.",
                self.name(),
                self.arity(),
                if self.arity() == 1 { "" } else { "s" },
                args.len()
            ))];
        }
        match self {
            HandlerKind::UniqueCount => unique_count(dataset, &args[0]),
            HandlerKind::Distribution => distribution(dataset, &args[0], style),
            HandlerKind::ContainmentPercentage => {
                containment_percentage(dataset, &args[0], &args[1])
            }
        }
    }
}

fn check_columns(dataset: &Dataset, columns: &[&str]) -> Option<Vec<ResponseBlock>> {
    let missing = dataset.missing_columns(columns);
    if missing.is_empty() {
        None
    } else {
        Some(vec![ResponseBlock::missing_columns(
            &missing,
            dataset.headers(),
        )])
    }
}

/// Number of distinct non-blank values in `column`.
pub fn unique_count(dataset: &Dataset, column: &str) -> Vec<ResponseBlock> {
    if let Some(error) = check_columns(dataset, &[column]) {
        return error;
    }
    let mut seen = std::collections::HashSet::new();
    if let Some(values) = dataset.column_values(column) {
        for v in values.filter(|v| !v.trim().is_empty()) {
            seen.insert(v);
        }
    }
    let description = if dataset.is_empty() {
        "No data: the dataset has no rows".to_string()
    } else {
        format!("Distinct non-empty values across {} rows", dataset.len())
    };
    vec![ResponseBlock::card(
        format!("Unique values in {}", column),
        seen.len().to_string(),
        Some(description),
    )]
}

/// Per-value frequency of `column`, most frequent first. Ties keep first-seen order.
/// Blank cells are counted under [`EMPTY_LABEL`] so counts always sum to the row count.
pub fn value_counts(dataset: &Dataset, column: &str) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    if let Some(values) = dataset.column_values(column) {
        for raw in values {
            let key = if raw.trim().is_empty() {
                EMPTY_LABEL
            } else {
                raw
            };
            match index.get(key) {
                Some(&i) => counts[i].1 += 1,
                None => {
                    index.insert(key, counts.len());
                    counts.push((key.to_string(), 1));
                }
            }
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

/// Markdown summary, chart (pie for few categories, bar otherwise) and a
/// value/count/percentage table.
pub fn distribution(dataset: &Dataset, column: &str, style: &ChartStyle) -> Vec<ResponseBlock> {
    if let Some(error) = check_columns(dataset, &[column]) {
        return error;
    }
    let total = dataset.len();
    let counts = value_counts(dataset, column);

    let summary = if total == 0 {
        format!("No data: the dataset has no rows, so **{}** has no distribution.", column)
    } else {
        let (top, top_count) = &counts[0];
        format!(
            "**{}** has {} distinct value{} across {} rows. Most common: **{}** ({}, {}).",
            column,
            counts.len(),
            if counts.len() == 1 { "" } else { "s" },
            total,
            top,
            top_count,
            format_percentage(percentage(*top_count, total))
        )
    };

    let labels: Vec<String> = counts.iter().map(|(v, _)| v.clone()).collect();
    let chart = ResponseBlock::Chart {
        kind: style.kind_for(counts.len()),
        labels,
        datasets: vec![ChartDataset {
            label: column.to_string(),
            data: counts.iter().map(|(_, n)| *n as f64).collect(),
            colors: Some(style.palette(counts.len())),
        }],
    };

    let rows = counts
        .iter()
        .map(|(value, n)| {
            vec![
                Cell::from(value.as_str()),
                Cell::from(*n),
                Cell::Text(format_percentage(percentage(*n, total))),
            ]
        })
        .collect();
    let table = ResponseBlock::table(
        vec![column.to_string(), "Count".to_string(), "Percentage".to_string()],
        rows,
    );

    vec![ResponseBlock::markdown(summary), chart, table]
}

/// Share of rows where both cells are non-blank and the `haystack` cell contains
/// the `needle` cell (case-sensitive substring on raw values).
pub fn containment_percentage(dataset: &Dataset, haystack: &str, needle: &str) -> Vec<ResponseBlock> {
    if let Some(error) = check_columns(dataset, &[haystack, needle]) {
        return error;
    }
    let title = format!("Rows where {} contains {}", haystack, needle);
    let total = dataset.len();
    if total == 0 {
        return vec![ResponseBlock::card(
            title,
            NO_DATA_PERCENTAGE,
            Some("No data: the dataset has no rows".to_string()),
        )];
    }
    let matches = (0..total)
        .filter(|&i| {
            let a = dataset.value(i, haystack);
            let b = dataset.value(i, needle);
            !a.trim().is_empty() && !b.trim().is_empty() && a.contains(b)
        })
        .count();
    vec![ResponseBlock::card(
        title,
        format_percentage(percentage(matches, total)),
        Some(format!("{} of {} rows", matches, total)),
    )]
}
