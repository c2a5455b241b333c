//! Ask questions about tabular data.
//!
//! A loaded [`Dataset`] is queried through the [`Orchestrator`]: questions that
//! match a built-in pattern are answered locally by the [`IntentMatcher`];
//! everything else goes to an optional [`ReasoningEngine`]. Answers are lists
//! of [`ResponseBlock`]s that front ends render as cards, tables, charts and
//! markdown.

pub mod blocks;
pub mod cache;
pub mod config;
pub mod dataset;
pub mod error_display;
pub mod executor;
pub mod handlers;
pub mod intent;
pub mod orchestrator;
pub mod plan;
pub mod render;
pub mod source;

pub use blocks::{Cell, ChartDataset, ChartKind, ChartStyle, ResponseBlock};
pub use cache::{CacheManager, QueryHistory};
pub use config::{AppConfig, ConfigManager};
pub use datask_cli::{Args, CompressionFormat, FileFormat, OutputFormat};
pub use dataset::Dataset;
pub use executor::{ExecutionResult, MetricColumns, PlanExecutor};
pub use handlers::HandlerKind;
pub use intent::{IntentMatcher, LocalIntent, MatchOutcome, Recognizer};
pub use orchestrator::{Answer, AnswerSource, EngineReply, Orchestrator, ReasoningEngine};
pub use plan::{Calculation, ExecutionPlan, Filter, FilterOperator, PlanAction};
pub use source::load_dataset;

/// Application name used for config and cache directories.
pub const APP_NAME: &str = "datask";

/// How to read an input file. Unset fields fall back to detection or reader defaults.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct OpenOptions {
    pub delimiter: Option<u8>,
    pub has_header: Option<bool>,
    pub skip_rows: Option<usize>,
    pub compression: Option<CompressionFormat>,
    pub format: Option<FileFormat>,
    pub excel_sheet: Option<String>,
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_skip_rows(mut self, skip_rows: usize) -> Self {
        self.skip_rows = Some(skip_rows);
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    pub fn with_has_header(mut self, has_header: bool) -> Self {
        self.has_header = Some(has_header);
        self
    }

    pub fn with_compression(mut self, compression: CompressionFormat) -> Self {
        self.compression = Some(compression);
        self
    }

    pub fn with_format(mut self, format: FileFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_excel_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.excel_sheet = Some(sheet.into());
        self
    }

    /// Create OpenOptions from CLI args and config, with CLI args taking precedence
    pub fn from_args_and_config(args: &Args, config: &AppConfig) -> Self {
        let file_loading = &config.file_loading;

        let has_header = match args.no_header {
            Some(no_header) => Some(!no_header),
            None => file_loading.has_header,
        };

        let compression = args.compression.or_else(|| {
            file_loading
                .compression
                .as_deref()
                .and_then(CompressionFormat::from_name)
        });

        Self {
            delimiter: args.delimiter.or(file_loading.delimiter),
            has_header,
            skip_rows: args.skip_rows.or(file_loading.skip_rows),
            compression,
            format: args.format,
            excel_sheet: args
                .excel_sheet
                .clone()
                .or_else(|| file_loading.excel_sheet.clone()),
        }
    }
}

impl From<&Args> for OpenOptions {
    fn from(args: &Args) -> Self {
        Self::from_args_and_config(args, &AppConfig::default())
    }
}
