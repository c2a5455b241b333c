//! File ingestion: delimited text (optionally compressed) via the polars CSV
//! reader and Excel workbooks via calamine. Every value is kept as text.

use crate::dataset::Dataset;
use crate::OpenOptions;
use calamine::{open_workbook_auto, Data, Range, Reader};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use datask_cli::{CompressionFormat, FileFormat};
use polars::prelude::*;
use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::Path;

/// Load `path` into a [`Dataset`], detecting format and compression from the
/// extension unless `options` forces them.
pub fn load_dataset(path: &Path, options: &OpenOptions) -> Result<Dataset> {
    let format = options
        .format
        .or_else(|| FileFormat::from_path(path))
        .ok_or_else(|| {
            eyre!(
                "Cannot detect the file format of {}. Use --format (csv, tsv, psv, excel).",
                path.display()
            )
        })?;

    let dataset = match format {
        FileFormat::Excel => load_excel(path, options)?,
        _ => load_delimited(path, format, options)?,
    };

    tracing::debug!(
        path = %path.display(),
        ?format,
        columns = dataset.headers().len(),
        rows = dataset.len(),
        "loaded dataset"
    );
    Ok(dataset)
}

fn read_bytes(path: &Path, compression: Option<CompressionFormat>) -> Result<Vec<u8>> {
    let reader = BufReader::new(File::open(path)?);
    let mut bytes = Vec::new();
    match compression {
        None => {
            let mut reader = reader;
            reader.read_to_end(&mut bytes)?;
        }
        Some(CompressionFormat::Gzip) => {
            flate2::read::MultiGzDecoder::new(reader).read_to_end(&mut bytes)?;
        }
        Some(CompressionFormat::Zstd) => {
            zstd::stream::read::Decoder::with_buffer(reader)?.read_to_end(&mut bytes)?;
        }
        Some(CompressionFormat::Bzip2) => {
            bzip2::read::BzDecoder::new(reader).read_to_end(&mut bytes)?;
        }
        Some(CompressionFormat::Xz) => {
            xz2::read::XzDecoder::new(reader).read_to_end(&mut bytes)?;
        }
    }
    Ok(bytes)
}

fn load_delimited(path: &Path, format: FileFormat, options: &OpenOptions) -> Result<Dataset> {
    let compression = options
        .compression
        .or_else(|| CompressionFormat::from_extension(path));
    let bytes = read_bytes(path, compression)?;
    parse_delimited(bytes, format, options)
}

/// Parse delimited text. All columns are read as strings (no type inference).
pub fn parse_delimited(bytes: Vec<u8>, format: FileFormat, options: &OpenOptions) -> Result<Dataset> {
    let separator = options
        .delimiter
        .or_else(|| format.separator())
        .unwrap_or(b',');

    let mut read_options = CsvReadOptions::default();
    if let Some(skip_rows) = options.skip_rows {
        read_options.skip_rows = skip_rows;
    }
    if let Some(has_header) = options.has_header {
        read_options.has_header = has_header;
    }
    read_options.infer_schema_length = Some(0);
    read_options = read_options.map_parse_options(|opts| {
        opts.with_separator(separator)
            .with_truncate_ragged_lines(true)
    });

    let df = CsvReader::new(Cursor::new(bytes))
        .with_options(read_options)
        .finish()?;
    dataframe_to_dataset(&df)
}

/// Convert a collected frame into text rows; nulls become empty strings.
pub fn dataframe_to_dataset(df: &DataFrame) -> Result<Dataset> {
    let headers: Vec<String> = df
        .get_column_names()
        .iter()
        .enumerate()
        .map(|(i, name)| header_name(name.as_str(), i))
        .collect();

    let mut rows: Vec<Vec<String>> = vec![Vec::with_capacity(headers.len()); df.height()];
    for column in df.get_columns() {
        let series = column.as_materialized_series().cast(&DataType::String)?;
        let values = series.str()?;
        for (row, value) in rows.iter_mut().zip(values.into_iter()) {
            row.push(value.unwrap_or("").to_string());
        }
    }
    Ok(Dataset::new(headers, rows))
}

fn header_name(raw: &str, index: usize) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        format!("column_{}", index + 1)
    } else {
        trimmed.to_string()
    }
}

fn load_excel(path: &Path, options: &OpenOptions) -> Result<Dataset> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| eyre!("Excel: {}", e))?;
    if workbook.sheet_names().is_empty() {
        return Err(eyre!("Excel file has no worksheets"));
    }
    let range = match options.excel_sheet.as_deref() {
        Some(sheet_sel) => match sheet_sel.parse::<usize>() {
            Ok(idx) => workbook
                .worksheet_range_at(idx)
                .ok_or_else(|| eyre!("Excel: no sheet at index {}", idx))?
                .map_err(|e| eyre!("Excel: {}", e))?,
            Err(_) => workbook
                .worksheet_range(sheet_sel)
                .map_err(|e| eyre!("Excel: {}", e))?,
        },
        None => workbook
            .worksheet_range_at(0)
            .ok_or_else(|| eyre!("Excel: no first sheet"))?
            .map_err(|e| eyre!("Excel: {}", e))?,
    };
    Ok(range_to_dataset(
        &range,
        options.has_header.unwrap_or(true),
        options.skip_rows.unwrap_or(0),
    ))
}

fn range_to_dataset(range: &Range<Data>, has_header: bool, skip_rows: usize) -> Dataset {
    let mut rows: Vec<Vec<String>> = range
        .rows()
        .skip(skip_rows)
        .map(|r| r.iter().map(|c| c.to_string()).collect())
        .collect();
    if rows.is_empty() {
        return Dataset::default();
    }
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    let headers: Vec<String> = if has_header {
        let first = rows.remove(0);
        (0..width)
            .map(|i| header_name(first.get(i).map(String::as_str).unwrap_or(""), i))
            .collect()
    } else {
        (0..width).map(|i| format!("column_{}", i + 1)).collect()
    };
    Dataset::new(headers, rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_csv_keeps_text_and_blanks() {
        let csv = "carrier,return_po,qty\nUPS,PO1,1\nFEDEX,,02\n";
        let ds = parse_delimited(csv.as_bytes().to_vec(), FileFormat::Csv, &OpenOptions::new())
            .unwrap();
        assert_eq!(ds.headers(), &["carrier", "return_po", "qty"]);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.value(1, "return_po"), "");
        assert_eq!(ds.value(1, "qty"), "02");
    }

    #[test]
    fn test_parse_tsv_without_header() {
        let tsv = "a\tb\nc\td\n";
        let opts = OpenOptions::new().with_has_header(false);
        let ds = parse_delimited(tsv.as_bytes().to_vec(), FileFormat::Tsv, &opts).unwrap();
        assert_eq!(ds.headers(), &["column_1", "column_2"]);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.value(1, "column_2"), "d");
    }

    #[test]
    fn test_headers_colliding_after_trim_stay_addressable() {
        let csv = "carrier,carrier ,qty\nUPS,DHL,1\n";
        let ds = parse_delimited(csv.as_bytes().to_vec(), FileFormat::Csv, &OpenOptions::new())
            .unwrap();
        assert_eq!(ds.headers(), &["carrier", "carrier_2", "qty"]);
        assert_eq!(ds.value(0, "carrier_2"), "DHL");
    }

    #[test]
    fn test_excel_range_headers_are_unique() {
        let mut range: Range<Data> = Range::new((0, 0), (1, 2));
        range.set_value((0, 0), Data::String("sku".to_string()));
        range.set_value((0, 1), Data::String("sku ".to_string()));
        range.set_value((0, 2), Data::Empty);
        range.set_value((1, 0), Data::String("A1".to_string()));
        range.set_value((1, 1), Data::String("B2".to_string()));
        range.set_value((1, 2), Data::Float(3.0));

        let ds = range_to_dataset(&range, true, 0);
        assert_eq!(ds.headers(), &["sku", "sku_2", "column_3"]);
        assert_eq!(ds.value(0, "sku_2"), "B2");
        assert_eq!(ds.value(0, "column_3"), "3");
    }

    #[test]
    fn test_header_name_fills_blank() {
        assert_eq!(header_name("  carrier ", 0), "carrier");
        assert_eq!(header_name("", 2), "column_3");
    }
}
