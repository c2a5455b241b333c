//! Terminal and JSON rendering of response blocks.

use crate::blocks::{ChartDataset, ChartKind, ResponseBlock};
use crate::OutputFormat;
use color_eyre::Result;

/// Widest bar drawn for a chart value.
const BAR_WIDTH: usize = 40;
const BAR_CHAR: char = '█';

/// Render an answer in the requested output format.
pub fn render(blocks: &[ResponseBlock], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(blocks)),
        OutputFormat::Json => render_json(blocks),
    }
}

/// The block list exactly as serialized on the wire.
pub fn render_json(blocks: &[ResponseBlock]) -> Result<String> {
    Ok(serde_json::to_string_pretty(blocks)?)
}

/// Human-readable rendering, one block after another separated by a blank line.
pub fn render_text(blocks: &[ResponseBlock]) -> String {
    blocks
        .iter()
        .map(render_block)
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_block(block: &ResponseBlock) -> String {
    match block {
        ResponseBlock::Card {
            title,
            value,
            description,
        } => {
            let mut out = format!("{}: {}\n", title, value);
            if let Some(description) = description {
                out.push_str(&format!("  {}\n", description));
            }
            out
        }
        ResponseBlock::Table { headers, rows } => {
            let rows: Vec<Vec<String>> = rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect();
            render_table(headers, &rows)
        }
        ResponseBlock::Chart {
            kind,
            labels,
            datasets,
        } => render_chart(*kind, labels, datasets),
        ResponseBlock::Markdown { text } => format!("{}\n", text.trim_end()),
    }
}

fn display_width(s: &str) -> usize {
    s.chars().count()
}

fn pad(s: &str, width: usize) -> String {
    let fill = width.saturating_sub(display_width(s));
    format!("{}{}", s, " ".repeat(fill))
}

/// Column-aligned table with a dashed rule under the header.
pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let columns = headers
        .len()
        .max(rows.iter().map(Vec::len).max().unwrap_or(0));
    let mut widths = vec![0usize; columns];
    for (i, h) in headers.iter().enumerate() {
        widths[i] = widths[i].max(display_width(h));
    }
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(display_width(cell));
        }
    }

    let line = |cells: &[String]| -> String {
        let parts: Vec<String> = widths
            .iter()
            .enumerate()
            .map(|(i, w)| pad(cells.get(i).map(String::as_str).unwrap_or(""), *w))
            .collect();
        format!("{}\n", parts.join("  ").trim_end())
    };

    let mut out = line(headers);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&format!("{}\n", rule.join("  ")));
    for row in rows {
        out.push_str(&line(row));
    }
    out
}

fn render_chart(kind: ChartKind, labels: &[String], datasets: &[ChartDataset]) -> String {
    let mut out = format!("[{} chart]\n", kind.as_str());
    let label_width = labels.iter().map(|l| display_width(l)).max().unwrap_or(0);
    for dataset in datasets {
        if datasets.len() > 1 {
            out.push_str(&format!("{}\n", dataset.label));
        }
        let max = dataset.data.iter().cloned().fold(0.0_f64, f64::max);
        let total: f64 = dataset.data.iter().sum();
        for (label, value) in labels.iter().zip(&dataset.data) {
            let bar_len = if max > 0.0 {
                ((value / max) * BAR_WIDTH as f64).round() as usize
            } else {
                0
            };
            let bar: String = std::iter::repeat(BAR_CHAR).take(bar_len).collect();
            let mut row = format!("{}  {} {}", pad(label, label_width), bar, value);
            if matches!(kind, ChartKind::Pie | ChartKind::Doughnut) && total > 0.0 {
                row.push_str(&format!(" ({:.1}%)", value * 100.0 / total));
            }
            out.push_str(&format!("{}\n", row));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::Cell;

    #[test]
    fn test_table_is_aligned() {
        let out = render_table(
            &["carrier".to_string(), "Count".to_string()],
            &[
                vec!["UPS".to_string(), "2".to_string()],
                vec!["FEDEX".to_string(), "1".to_string()],
            ],
        );
        assert_eq!(out, "carrier  Count\n-------  -----\nUPS      2\nFEDEX    1\n");
    }

    #[test]
    fn test_card_and_markdown() {
        let blocks = vec![
            ResponseBlock::card("Row count", "3", Some("1 filters applied".to_string())),
            ResponseBlock::markdown("done"),
        ];
        assert_eq!(
            render_text(&blocks),
            "Row count: 3\n  1 filters applied\n\ndone\n"
        );
    }

    #[test]
    fn test_pie_chart_shows_shares() {
        let block = ResponseBlock::Chart {
            kind: ChartKind::Pie,
            labels: vec!["UPS".to_string(), "FEDEX".to_string()],
            datasets: vec![ChartDataset {
                label: "carrier".to_string(),
                data: vec![2.0, 1.0],
                colors: None,
            }],
        };
        let out = render_text(&[block]);
        assert!(out.starts_with("[pie chart]\n"));
        assert!(out.contains("(66.7%)"));
        assert!(out.contains("(33.3%)"));
    }

    #[test]
    fn test_json_uses_block_protocol() {
        let blocks = vec![ResponseBlock::table(
            vec!["carrier".to_string()],
            vec![vec![Cell::from("UPS"), Cell::Integer(2)]],
        )];
        let json = render_json(&blocks).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["type"], "table");
        assert_eq!(value[0]["rows"][0][1], 2);
    }
}
