//! In-memory tabular dataset: ordered headers plus rows of text cells.
//!
//! A loaded dataset is never mutated by question answering; filtering produces
//! a new `Dataset` sharing the same headers with a narrowed row set.

use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Dataset {
    /// Build a dataset from headers and positional rows. Short rows are padded with
    /// empty cells and long rows truncated so every row has one cell per header.
    /// Repeated header names get a numeric suffix (`sku`, `sku_2`, ...).
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let headers = unique_headers(headers);
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self { headers, rows }
    }

    /// Build a dataset from rows keyed by column name. Absent cells become empty strings.
    pub fn from_records(headers: Vec<String>, records: &[HashMap<String, String>]) -> Self {
        let rows = records
            .iter()
            .map(|record| {
                headers
                    .iter()
                    .map(|h| record.get(h).cloned().unwrap_or_default())
                    .collect()
            })
            .collect();
        Self {
            headers: unique_headers(headers),
            rows,
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == column)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_index(column).is_some()
    }

    /// Columns from `columns` that are not headers of this dataset, in the given order.
    pub fn missing_columns<'a>(&self, columns: &[&'a str]) -> Vec<&'a str> {
        columns
            .iter()
            .copied()
            .filter(|c| !self.has_column(c))
            .collect()
    }

    /// Cell value for `column` in row `row`; unknown columns and out-of-range rows read as "".
    pub fn value(&self, row: usize, column: &str) -> &str {
        match (self.rows.get(row), self.column_index(column)) {
            (Some(cells), Some(idx)) => cells[idx].as_str(),
            _ => "",
        }
    }

    /// All values of `column` in row order, or None when the column does not exist.
    pub fn column_values(&self, column: &str) -> Option<impl Iterator<Item = &str> + '_> {
        let idx = self.column_index(column)?;
        Some(self.rows.iter().map(move |row| row[idx].as_str()))
    }

    /// New dataset with the same headers holding the rows at `indices`, in the order given.
    pub fn select_rows(&self, indices: &[usize]) -> Dataset {
        Dataset {
            headers: self.headers.clone(),
            rows: indices
                .iter()
                .filter_map(|&i| self.rows.get(i).cloned())
                .collect(),
        }
    }

    /// First `n` rows projected onto `columns` (all headers when `columns` is empty).
    /// Unknown column names are skipped.
    pub fn preview(&self, columns: &[String], n: usize) -> (Vec<String>, Vec<Vec<String>>) {
        let indices: Vec<usize> = if columns.is_empty() {
            (0..self.headers.len()).collect()
        } else {
            columns
                .iter()
                .filter_map(|c| self.column_index(c))
                .collect()
        };
        let headers = indices.iter().map(|&i| self.headers[i].clone()).collect();
        let rows = self
            .rows
            .iter()
            .take(n)
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();
        (headers, rows)
    }
}

/// Suffix later duplicates so every header is addressable by name.
fn unique_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::with_capacity(headers.len());
    let mut out = Vec::with_capacity(headers.len());
    for header in headers {
        let mut name = header.clone();
        let mut n = 2;
        while seen.contains(&name) {
            name = format!("{}_{}", header, n);
            n += 1;
        }
        seen.insert(name.clone());
        out.push(name);
    }
    out
}
