//! Response blocks: the output contract between question answering and whatever
//! renders the answer (terminal, JSON consumer, chat UI).
//!
//! An answer is always an ordered `Vec<ResponseBlock>`, rendered top to bottom.
//! Numbers meant for display are finalized here (e.g. `"12.34%"`) so renderers
//! never re-implement formatting.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseBlock {
    Card {
        title: String,
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<Cell>>,
    },
    Chart {
        kind: ChartKind,
        labels: Vec<String>,
        datasets: Vec<ChartDataset>,
    },
    Markdown {
        text: String,
    },
}

impl ResponseBlock {
    pub fn card(
        title: impl Into<String>,
        value: impl Into<String>,
        description: Option<String>,
    ) -> Self {
        ResponseBlock::Card {
            title: title.into(),
            value: value.into(),
            description,
        }
    }

    pub fn markdown(text: impl Into<String>) -> Self {
        ResponseBlock::Markdown { text: text.into() }
    }

    pub fn table(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        ResponseBlock::Table { headers, rows }
    }

    /// Table whose cells are all text.
    pub fn text_table(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        ResponseBlock::Table {
            headers,
            rows: rows
                .into_iter()
                .map(|r| r.into_iter().map(Cell::Text).collect())
                .collect(),
        }
    }

    /// Markdown block naming columns that do not exist in the dataset.
    pub fn missing_columns(missing: &[&str], available: &[String]) -> Self {
        let names = missing
            .iter()
            .map(|c| format!("`{}`", c))
            .collect::<Vec<_>>()
            .join(", ");
        let noun = if missing.len() == 1 {
            "Column"
        } else {
            "Columns"
        };
        let mut text = format!("**{} not found:** {}.", noun, names);
        if !available.is_empty() {
            text.push_str(&format!(" Available columns: {}.", available.join(", ")));
        }
        ResponseBlock::markdown(text)
    }

    /// Short variant name, used in logs.
    pub fn kind_name(&self) -> &'static str {
        match self {
            ResponseBlock::Card { .. } => "card",
            ResponseBlock::Table { .. } => "table",
            ResponseBlock::Chart { .. } => "chart",
            ResponseBlock::Markdown { .. } => "markdown",
        }
    }
}

/// A table cell: integers and numbers keep their JSON type, everything else is text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Integer(i64),
    Number(f64),
    Text(String),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Integer(n) => write!(f, "{}", n),
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl From<usize> for Cell {
    fn from(n: usize) -> Self {
        Cell::Integer(n as i64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Bar,
    Pie,
    Line,
    Doughnut,
}

impl ChartKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::Bar => "bar",
            ChartKind::Pie => "pie",
            ChartKind::Line => "line",
            ChartKind::Doughnut => "doughnut",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartDataset {
    pub label: String,
    pub data: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colors: Option<Vec<String>>,
}

/// Colour generation settings for charts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartStyle {
    /// Category counts up to this value are drawn as a pie, larger ones as bars.
    pub pie_max_slices: usize,
    /// Upper bound on distinct hues; categories beyond it reuse hues cyclically.
    pub max_hue_steps: usize,
    pub saturation: u8,
    pub lightness: u8,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            pie_max_slices: 5,
            max_hue_steps: 36,
            saturation: 70,
            lightness: 55,
        }
    }
}

impl ChartStyle {
    pub fn kind_for(&self, categories: usize) -> ChartKind {
        if categories <= self.pie_max_slices {
            ChartKind::Pie
        } else {
            ChartKind::Bar
        }
    }

    /// `count` HSL colours with evenly spaced hues. The number of distinct hues is
    /// capped at `max_hue_steps` so very many categories never collapse to sub-degree steps.
    pub fn palette(&self, count: usize) -> Vec<String> {
        let steps = count.clamp(1, self.max_hue_steps.max(1));
        let step = 360.0 / steps as f64;
        (0..count)
            .map(|i| {
                let hue = (i % steps) as f64 * step;
                format!(
                    "hsl({:.0}, {}%, {}%)",
                    hue, self.saturation, self.lightness
                )
            })
            .collect()
    }
}

/// `part / total` as a percentage rounded to two decimals; 0 when `total` is 0.
pub fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2(part as f64 * 100.0 / total as f64)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Display form of a percentage value, e.g. `12.34%`.
pub fn format_percentage(value: f64) -> String {
    format!("{:.2}%", value)
}

/// Value shown for a rate when there were no rows to compute it over.
pub const NO_DATA_PERCENTAGE: &str = "0%";
