//! User-facing error messages for load failures.
//!
//! Matches typed errors (PolarsError variants, io::ErrorKind) found in the
//! report chain instead of parsing strings.

use polars::prelude::PolarsError;
use std::io;
use std::path::Path;

/// Format a PolarsError raised while parsing delimited text.
pub fn user_message_from_polars(err: &PolarsError) -> String {
    use polars::prelude::PolarsError as PE;

    match err {
        PE::ColumnNotFound(msg) => format!("Column not found: {}", msg),
        PE::Duplicate(msg) => format!(
            "Duplicate column name: {}. Rename the header or use --no-header.",
            msg
        ),
        PE::IO { error, msg } => {
            user_message_from_io(error.as_ref(), msg.as_ref().map(|m| m.as_ref()))
        }
        PE::NoData(msg) => format!("No data: {}", msg),
        PE::ShapeMismatch(msg) => format!(
            "Row shape mismatch: {}. Check the delimiter (--delimiter).",
            msg
        ),
        PE::ComputeError(msg) => {
            let msg = msg.to_string();
            if msg.contains("invalid utf-8") || msg.contains("invalid UTF-8") {
                "File is not valid UTF-8 text. Is it compressed? Try --compression.".to_string()
            } else {
                format!("Could not parse file: {}", msg.trim())
            }
        }
        PE::Context { error, msg } => {
            format!("{}: {}", msg, user_message_from_polars(error))
        }
        _ => err.to_string(),
    }
}

/// Format an io::Error by its kind, optionally followed by context.
pub fn user_message_from_io(err: &io::Error, context: Option<&str>) -> String {
    use std::io::ErrorKind;

    let base = match err.kind() {
        ErrorKind::NotFound => "File or directory not found.".to_string(),
        ErrorKind::PermissionDenied => "Permission denied. Check read access.".to_string(),
        ErrorKind::InvalidData | ErrorKind::InvalidInput => {
            "Invalid or corrupted data.".to_string()
        }
        ErrorKind::UnexpectedEof => "Unexpected end of file.".to_string(),
        ErrorKind::IsADirectory => "Path is a directory, not a file.".to_string(),
        _ => err.to_string(),
    };

    match context {
        Some(ctx) if !ctx.is_empty() => format!("{} {}", base, ctx),
        _ => base,
    }
}

/// One-line message for a report, prefixed with the file being loaded when given.
pub fn user_message_from_report(report: &color_eyre::eyre::Report, path: Option<&Path>) -> String {
    let msg = report
        .chain()
        .find_map(|cause| {
            if let Some(pe) = cause.downcast_ref::<PolarsError>() {
                return Some(user_message_from_polars(pe));
            }
            cause
                .downcast_ref::<io::Error>()
                .map(|io_err| user_message_from_io(io_err, None))
        })
        .unwrap_or_else(|| {
            let display = report.to_string();
            display
                .lines()
                .next()
                .map(str::trim)
                .unwrap_or("An error occurred")
                .to_string()
        });

    match path {
        Some(p) => format!("Failed to load {}: {}", p.display(), msg),
        None => msg,
    }
}
