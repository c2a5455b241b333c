#![allow(dead_code)]

use datask::blocks::ChartStyle;
use datask::{Dataset, IntentMatcher};
use std::fs;
use std::path::{Path, PathBuf};

pub fn dataset(headers: &[&str], rows: &[&[&str]]) -> Dataset {
    Dataset::new(
        headers.iter().map(|h| h.to_string()).collect(),
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect(),
    )
}

/// Small returns log with every designated metric column present.
pub fn returns_dataset() -> Dataset {
    dataset(
        &["rma", "carrier", "tracking_no", "vend_track_no", "return_po", "remark"],
        &[
            &["R1", "UPS", "1Z001", "1Z001", "PO-1", "label 1Z001 attached"],
            &["R2", "UPS", "1Z002", "1Z999", "", "no label"],
            &["R3", "FEDEX", "7700", "", "", "7700 delivered"],
            &["R4", "DHL", "", "JD01", "PO-4", ""],
            &["R5", "UPS", "1Z005", "1Z005", "  ", "returned"],
        ],
    )
}

pub fn empty_returns_dataset() -> Dataset {
    dataset(
        &["carrier", "tracking_no", "vend_track_no", "return_po"],
        &[],
    )
}

pub fn matcher() -> IntentMatcher {
    IntentMatcher::new(ChartStyle::default()).expect("built-in recognizers compile")
}

pub fn write_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).expect("write test file");
    path
}
