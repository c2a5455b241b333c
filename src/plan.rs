//! Execution plans: a structured, replayable description of a computation
//! over the loaded dataset (filters, aggregate metrics, column subset).
//!
//! Plans arrive as JSON from the external planner, so operator and
//! calculation names are parsed leniently: unknown names are kept as
//! `Other(name)` instead of failing the whole plan.

use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FilterOperator {
    Equals,
    NotEquals,
    Contains,
    IsEmpty,
    IsNotEmpty,
    /// Unrecognized operator name; passes every row.
    Other(String),
}

impl FilterOperator {
    pub fn as_str(&self) -> &str {
        match self {
            FilterOperator::Equals => "equals",
            FilterOperator::NotEquals => "not_equals",
            FilterOperator::Contains => "contains",
            FilterOperator::IsEmpty => "is_empty",
            FilterOperator::IsNotEmpty => "is_not_empty",
            FilterOperator::Other(name) => name,
        }
    }

    /// Whether the operator compares against `Filter::value`.
    pub fn takes_value(&self) -> bool {
        matches!(
            self,
            FilterOperator::Equals | FilterOperator::NotEquals | FilterOperator::Contains
        )
    }
}

impl From<String> for FilterOperator {
    fn from(name: String) -> Self {
        match name.trim().to_lowercase().as_str() {
            "equals" | "eq" | "=" | "==" => FilterOperator::Equals,
            "not_equals" | "neq" | "!=" | "<>" => FilterOperator::NotEquals,
            "contains" => FilterOperator::Contains,
            "is_empty" => FilterOperator::IsEmpty,
            "is_not_empty" => FilterOperator::IsNotEmpty,
            _ => FilterOperator::Other(name),
        }
    }
}

impl From<FilterOperator> for String {
    fn from(op: FilterOperator) -> Self {
        op.as_str().to_string()
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub column: String,
    pub operator: FilterOperator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Filter {
    pub fn new(column: impl Into<String>, operator: FilterOperator) -> Self {
        Self {
            column: column.into(),
            operator,
            value: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// Named aggregate metric computed over the filtered rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Calculation {
    /// Number of filtered rows.
    Count,
    /// Percentage of rows whose scanned tracking number differs from a non-empty vendor tracking number.
    MismatchRate,
    /// Percentage of rows with an empty return PO.
    MissingPoRate,
    /// Unrecognized calculation name; produces no metric.
    Other(String),
}

impl Calculation {
    pub fn name(&self) -> &str {
        match self {
            Calculation::Count => "count",
            Calculation::MismatchRate => "mismatch_rate",
            Calculation::MissingPoRate => "missing_po_rate",
            Calculation::Other(name) => name,
        }
    }

    /// Rates are percentages (0..=100); `count` is a row count.
    pub fn is_rate(&self) -> bool {
        matches!(self, Calculation::MismatchRate | Calculation::MissingPoRate)
    }

    /// Human-readable title used for result cards.
    pub fn title(&self) -> &str {
        match self {
            Calculation::Count => "Row count",
            Calculation::MismatchRate => "Tracking mismatch rate",
            Calculation::MissingPoRate => "Missing return PO rate",
            Calculation::Other(name) => name,
        }
    }
}

impl From<String> for Calculation {
    fn from(name: String) -> Self {
        match name.trim().to_lowercase().as_str() {
            "count" => Calculation::Count,
            "mismatch_rate" => Calculation::MismatchRate,
            "missing_po_rate" => Calculation::MissingPoRate,
            _ => Calculation::Other(name),
        }
    }
}

impl From<Calculation> for String {
    fn from(calc: Calculation) -> Self {
        calc.name().to_string()
    }
}

impl fmt::Display for Calculation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlanAction {
    /// Use the whole dataset as-is; nothing is computed locally.
    #[default]
    DirectAnalysis,
    /// Apply the filters (AND), then the calculations over the remaining rows.
    FilterAndAnalyze,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ExecutionPlan {
    pub action: PlanAction,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<Filter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub calculations: Vec<Calculation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,
}

impl ExecutionPlan {
    pub fn direct() -> Self {
        Self::default()
    }

    pub fn filter_and_analyze() -> Self {
        Self {
            action: PlanAction::FilterAndAnalyze,
            ..Self::default()
        }
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_calculation(mut self, calculation: Calculation) -> Self {
        self.calculations.push(calculation);
        self
    }

    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = columns;
        self
    }

    /// Parse a plan from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| eyre!("Invalid execution plan: {}", e))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_takes_value() {
        assert!(FilterOperator::Equals.takes_value());
        assert!(FilterOperator::Contains.takes_value());
        assert!(!FilterOperator::IsEmpty.takes_value());
        assert!(!FilterOperator::Other("between".to_string()).takes_value());
    }

    #[test]
    fn test_parse_plan_json() {
        let plan = ExecutionPlan::from_json(
            r#"{
                "action": "filter_and_analyze",
                "filters": [
                    {"column": "return_po", "operator": "is_empty"},
                    {"column": "carrier", "operator": "equals", "value": "UPS"}
                ],
                "calculations": ["count", "mismatch_rate"],
                "columns": ["carrier", "return_po"]
            }"#,
        )
        .unwrap();
        assert_eq!(plan.action, PlanAction::FilterAndAnalyze);
        assert_eq!(plan.filters.len(), 2);
        assert_eq!(plan.filters[0].operator, FilterOperator::IsEmpty);
        assert_eq!(plan.filters[0].value, None);
        assert_eq!(plan.filters[1].value.as_deref(), Some("UPS"));
        assert_eq!(
            plan.calculations,
            vec![Calculation::Count, Calculation::MismatchRate]
        );
        assert_eq!(plan.columns, vec!["carrier", "return_po"]);
    }

    #[test]
    fn test_direct_plan_defaults() {
        let plan = ExecutionPlan::from_json(r#"{"action": "direct_analysis"}"#).unwrap();
        assert_eq!(plan, ExecutionPlan::direct());
    }

    #[test]
    fn test_unknown_names_are_kept() {
        let plan = ExecutionPlan::from_json(
            r#"{"action": "filter_and_analyze",
                "filters": [{"column": "a", "operator": "starts_with", "value": "x"}],
                "calculations": ["median_age"]}"#,
        )
        .unwrap();
        assert_eq!(
            plan.filters[0].operator,
            FilterOperator::Other("starts_with".to_string())
        );
        assert_eq!(
            plan.calculations[0],
            Calculation::Other("median_age".to_string())
        );
    }

    #[test]
    fn test_unknown_action_is_an_error() {
        let err = ExecutionPlan::from_json(r#"{"action": "drop_table"}"#).unwrap_err();
        assert!(err.to_string().contains("Invalid execution plan"));
    }

    #[test]
    fn test_serialize_uses_wire_names() {
        let plan = ExecutionPlan::filter_and_analyze()
            .with_filter(Filter::new("return_po", FilterOperator::IsNotEmpty))
            .with_calculation(Calculation::MissingPoRate);
        let json = plan.to_json().unwrap();
        assert!(json.contains("\"filter_and_analyze\""));
        assert!(json.contains("\"is_not_empty\""));
        assert!(json.contains("\"missing_po_rate\""));
        assert!(!json.contains("columns"));
        assert_eq!(ExecutionPlan::from_json(&json).unwrap(), plan);
    }
}
