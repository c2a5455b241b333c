mod common;

use common::{dataset, matcher, returns_dataset};
use datask::blocks::{Cell, ResponseBlock};
use datask::executor::execute;
use datask::handlers::{containment_percentage, value_counts};
use datask::{Calculation, ExecutionPlan, Filter, FilterOperator};
use std::collections::BTreeSet;

fn filtered_rmas(column: &str, operator: FilterOperator) -> BTreeSet<String> {
    let plan = ExecutionPlan::filter_and_analyze().with_filter(Filter::new(column, operator));
    let subset = execute(&plan, &returns_dataset()).subset;
    (0..subset.len())
        .map(|i| subset.value(i, "rma").to_string())
        .collect()
}

#[test]
fn is_empty_and_is_not_empty_partition_the_rows() {
    let ds = returns_dataset();
    let all: BTreeSet<String> = (0..ds.len()).map(|i| ds.value(i, "rma").to_string()).collect();
    for column in ["tracking_no", "vend_track_no", "return_po", "remark"] {
        let blank: BTreeSet<String> = (0..ds.len())
            .filter(|&i| ds.value(i, column).trim().is_empty())
            .map(|i| ds.value(i, "rma").to_string())
            .collect();
        let empty = filtered_rmas(column, FilterOperator::IsEmpty);
        let not_empty = filtered_rmas(column, FilterOperator::IsNotEmpty);

        assert_eq!(empty, blank, "column {}", column);
        assert!(empty.is_disjoint(&not_empty), "column {}", column);
        assert_eq!(&empty | &not_empty, all, "column {}", column);
    }
    // R5's return_po is whitespace only.
    assert!(filtered_rmas("return_po", FilterOperator::IsEmpty).contains("R5"));
}

#[test]
fn count_equals_filtered_row_count() {
    let ds = returns_dataset();
    let plan = ExecutionPlan::filter_and_analyze()
        .with_filter(Filter::new("carrier", FilterOperator::Equals).with_value("ups"))
        .with_filter(Filter::new("return_po", FilterOperator::IsEmpty))
        .with_calculation(Calculation::Count);
    let result = execute(&plan, &ds);
    assert_eq!(result.subset.len(), 2);
    assert_eq!(result.metrics.get("count"), Some(result.subset.len() as f64));
}

#[test]
fn filters_are_conjunctive_and_order_independent() {
    let ds = returns_dataset();
    let a = Filter::new("carrier", FilterOperator::Equals).with_value("UPS");
    let b = Filter::new("remark", FilterOperator::Contains).with_value("LABEL");

    let ab = ExecutionPlan::filter_and_analyze()
        .with_filter(a.clone())
        .with_filter(b.clone());
    let ba = ExecutionPlan::filter_and_analyze().with_filter(b).with_filter(a);

    let first = execute(&ab, &ds).subset;
    let second = execute(&ba, &ds).subset;
    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
}

#[test]
fn rates_stay_within_bounds() {
    let ds = returns_dataset();
    let plan = ExecutionPlan::filter_and_analyze()
        .with_calculation(Calculation::MismatchRate)
        .with_calculation(Calculation::MissingPoRate);
    let result = execute(&plan, &ds);
    for (_, value) in result.metrics.iter() {
        assert!((0.0..=100.0).contains(&value));
    }
    // R2 differs, R4 has a vendor number but no scan.
    assert_eq!(result.metrics.get("mismatch_rate"), Some(40.0));
    // R2, R3 and the whitespace-only R5.
    assert_eq!(result.metrics.get("missing_po_rate"), Some(60.0));
}

#[test]
fn distribution_counts_sum_to_row_count() {
    let ds = dataset(
        &["carrier"],
        &[&["UPS"], &[""], &["DHL"], &["UPS"], &["FEDEX"], &["DHL"], &["UPS"]],
    );
    let counts = value_counts(&ds, "carrier");
    assert_eq!(counts.iter().map(|(_, n)| n).sum::<usize>(), ds.len());
    assert_eq!(counts[0], ("UPS".to_string(), 3));
    assert_eq!(counts[1], ("DHL".to_string(), 2));
    // Ties keep first-seen order.
    assert_eq!(counts[2].0, "(empty)");
    assert_eq!(counts[3].0, "FEDEX");

    let blocks = matcher()
        .match_question("distribution of carrier", &ds)
        .into_blocks()
        .unwrap();
    let ResponseBlock::Table { rows, .. } = &blocks[2] else {
        panic!("expected table");
    };
    let total_pct: f64 = rows
        .iter()
        .map(|r| match &r[2] {
            Cell::Text(p) => p.trim_end_matches('%').parse::<f64>().unwrap(),
            other => panic!("unexpected cell {:?}", other),
        })
        .sum();
    assert!((total_pct - 100.0).abs() < 0.05, "sum was {}", total_pct);
}

#[test]
fn containment_on_empty_dataset_is_zero_percent() {
    let ds = dataset(&["remark", "tracking_no"], &[]);
    let blocks = containment_percentage(&ds, "remark", "tracking_no");
    assert_eq!(blocks.len(), 1);
    match &blocks[0] {
        ResponseBlock::Card { value, .. } => assert_eq!(value, "0%"),
        other => panic!("expected card, got {:?}", other),
    }
}

#[test]
fn containment_counts_rows_with_both_values() {
    let blocks = containment_percentage(&returns_dataset(), "remark", "tracking_no");
    match &blocks[0] {
        ResponseBlock::Card {
            value, description, ..
        } => {
            assert_eq!(value, "40.00%");
            assert_eq!(description.as_deref(), Some("2 of 5 rows"));
        }
        other => panic!("expected card, got {:?}", other),
    }
}

#[test]
fn execution_is_idempotent_and_leaves_input_untouched() {
    let ds = returns_dataset();
    let before = ds.clone();
    let plan = ExecutionPlan::filter_and_analyze()
        .with_filter(Filter::new("return_po", FilterOperator::IsEmpty))
        .with_calculation(Calculation::Count)
        .with_calculation(Calculation::MismatchRate);

    let first = execute(&plan, &ds);
    let second = execute(&plan, &ds);
    assert_eq!(first, second);
    assert_eq!(ds, before);
}

#[test]
fn direct_analysis_returns_full_dataset_without_metrics() {
    let ds = returns_dataset();
    let plan = ExecutionPlan::direct()
        .with_filter(Filter::new("carrier", FilterOperator::Equals).with_value("UPS"))
        .with_calculation(Calculation::Count);
    let result = execute(&plan, &ds);
    assert_eq!(result.subset, ds);
    assert!(result.metrics.is_empty());
}

#[test]
fn unknown_operator_and_missing_column_fail_open() {
    let ds = returns_dataset();
    let plan = ExecutionPlan::filter_and_analyze()
        .with_filter(Filter::new("carrier", FilterOperator::Other("starts_with".into())).with_value("U"))
        .with_calculation(Calculation::Count);
    assert_eq!(execute(&plan, &ds).metrics.get("count"), Some(5.0));

    // A missing column reads as empty for every row.
    let plan = ExecutionPlan::filter_and_analyze()
        .with_filter(Filter::new("no_such_column", FilterOperator::IsEmpty))
        .with_calculation(Calculation::Count);
    assert_eq!(execute(&plan, &ds).metrics.get("count"), Some(5.0));
}
