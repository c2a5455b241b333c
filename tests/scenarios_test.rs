mod common;

use common::{dataset, empty_returns_dataset, matcher};
use datask::blocks::{Cell, ChartKind, ResponseBlock};
use datask::executor::execute;
use datask::{Calculation, ExecutionPlan, Filter, FilterOperator, MatchOutcome};

#[test]
fn distribution_of_carrier_builds_summary_pie_and_table() {
    let ds = dataset(&["carrier"], &[&["UPS"], &["UPS"], &["FEDEX"]]);

    let outcome = matcher().match_question("distribution of carrier", &ds);
    let blocks = outcome.into_blocks().expect("distribution question matches");
    assert_eq!(blocks.len(), 3);

    assert!(matches!(&blocks[0], ResponseBlock::Markdown { text } if text.contains("carrier")));

    match &blocks[1] {
        ResponseBlock::Chart {
            kind,
            labels,
            datasets,
        } => {
            assert_eq!(*kind, ChartKind::Pie);
            assert_eq!(labels, &["UPS", "FEDEX"]);
            assert_eq!(datasets[0].data, vec![2.0, 1.0]);
            assert_eq!(datasets[0].colors.as_ref().map(Vec::len), Some(2));
        }
        other => panic!("expected chart, got {:?}", other),
    }

    assert_eq!(
        blocks[2],
        ResponseBlock::table(
            vec!["carrier".into(), "Count".into(), "Percentage".into()],
            vec![
                vec![Cell::from("UPS"), Cell::Integer(2), Cell::from("66.67%")],
                vec![Cell::from("FEDEX"), Cell::Integer(1), Cell::from("33.33%")],
            ],
        )
    );
}

#[test]
fn mismatch_rate_over_full_dataset() {
    let ds = dataset(
        &["tracking_no", "vend_track_no"],
        &[&["A", "A"], &["B", "C"], &["D", ""]],
    );
    let plan = ExecutionPlan::filter_and_analyze().with_calculation(Calculation::MismatchRate);

    let result = execute(&plan, &ds);
    assert_eq!(result.metrics.get("mismatch_rate"), Some(33.33));
    assert_eq!(result.subset.len(), 3);
}

#[test]
fn empty_return_po_filter_counts_and_keeps_rows() {
    let ds = dataset(
        &["rma", "return_po"],
        &[
            &["R1", ""],
            &["R2", "PO-2"],
            &["R3", ""],
            &["R4", "   "],
            &["R5", "PO-5"],
            &["R6", "PO-6"],
            &["R7", "PO-7"],
            &["R8", "PO-8"],
            &["R9", "PO-9"],
            &["R10", "PO-10"],
        ],
    );
    let plan = ExecutionPlan::filter_and_analyze()
        .with_filter(Filter::new("return_po", FilterOperator::IsEmpty))
        .with_calculation(Calculation::Count);

    let result = execute(&plan, &ds);
    assert_eq!(result.metrics.get("count"), Some(3.0));
    assert_eq!(result.subset.len(), 3);
    let rmas: Vec<&str> = (0..result.subset.len())
        .map(|i| result.subset.value(i, "rma"))
        .collect();
    assert_eq!(rmas, vec!["R1", "R3", "R4"]);
}

#[test]
fn unique_count_of_missing_column_reports_not_found() {
    let ds = dataset(&["vendor", "sku"], &[&["ACME", "A1"]]);

    let outcome = matcher().match_question("unique count of carrier", &ds);
    assert!(outcome.is_match());
    let blocks = outcome.into_blocks().unwrap();
    assert_eq!(blocks.len(), 1);
    match &blocks[0] {
        ResponseBlock::Markdown { text } => {
            assert!(text.contains("not found"));
            assert!(text.contains("`carrier`"));
            assert!(text.contains("vendor, sku"));
        }
        other => panic!("expected markdown, got {:?}", other),
    }
}

#[test]
fn empty_dataset_rates_are_zero_with_no_data_notice() {
    let ds = empty_returns_dataset();
    let plan = ExecutionPlan::filter_and_analyze()
        .with_calculation(Calculation::MismatchRate)
        .with_calculation(Calculation::MissingPoRate);

    let result = execute(&plan, &ds);
    assert_eq!(result.metrics.get("mismatch_rate"), Some(0.0));
    assert_eq!(result.metrics.get("missing_po_rate"), Some(0.0));
    assert!(result.no_data());

    let blocks = result.to_blocks(&plan, 20);
    assert_eq!(blocks.len(), 2);
    for block in &blocks {
        match block {
            ResponseBlock::Card {
                value, description, ..
            } => {
                assert_eq!(value, "0%");
                assert!(description.as_deref().unwrap_or("").contains("No data"));
            }
            other => panic!("expected card, got {:?}", other),
        }
    }
}

#[test]
fn open_question_defers_to_reasoning() {
    let ds = dataset(&["carrier"], &[&["UPS"]]);
    assert_eq!(
        matcher().match_question("why do UPS returns take longer?", &ds),
        MatchOutcome::NoMatch
    );
}
