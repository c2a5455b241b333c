use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::blocks::ChartStyle;
use crate::executor::MetricColumns;

/// Manages config directory and config file operations
#[derive(Clone)]
pub struct ConfigManager {
    pub(crate) config_dir: PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager with a custom config directory (primarily for testing)
    pub fn with_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Create a new ConfigManager for the given app name
    pub fn new(app_name: &str) -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| eyre!("Could not determine config directory"))?
            .join(app_name);

        Ok(Self { config_dir })
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Get path to a specific config file or subdirectory
    pub fn config_path(&self, path: &str) -> PathBuf {
        self.config_dir.join(path)
    }

    /// Ensure the config directory exists
    pub fn ensure_config_dir(&self) -> Result<()> {
        if !self.config_dir.exists() {
            std::fs::create_dir_all(&self.config_dir)?;
        }
        Ok(())
    }

    /// Generate default configuration template as a string
    pub fn generate_default_config(&self) -> String {
        DEFAULT_CONFIG_TEMPLATE.to_string()
    }

    /// Write default configuration to config file
    pub fn write_default_config(&self, force: bool) -> Result<PathBuf> {
        let config_path = self.config_path("config.toml");

        if config_path.exists() && !force {
            return Err(eyre!(
                "Config file already exists at {}. Use --force to overwrite.",
                config_path.display()
            ));
        }

        self.ensure_config_dir()?;
        std::fs::write(&config_path, DEFAULT_CONFIG_TEMPLATE)?;

        Ok(config_path)
    }

    /// Read and parse config.toml from this directory. A missing file yields defaults.
    pub fn read_config(&self) -> Result<AppConfig> {
        let config_path = self.config_path("config.toml");

        if !config_path.exists() {
            return Ok(AppConfig::default());
        }

        let content = std::fs::read_to_string(&config_path).map_err(|e| {
            eyre!(
                "Failed to read config file at {}: {}",
                config_path.display(),
                e
            )
        })?;

        AppConfig::from_toml(&content).map_err(|e| {
            eyre!(
                "Failed to parse config file at {}: {}",
                config_path.display(),
                e
            )
        })
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Configuration format version (for future compatibility)
    pub version: String,
    pub file_loading: FileLoadingConfig,
    pub metrics: MetricsConfig,
    pub chart: ChartConfig,
    pub answer: AnswerConfig,
    pub reasoning: ReasoningConfig,
    pub query: QueryConfig,
    pub debug: DebugConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FileLoadingConfig {
    pub delimiter: Option<u8>,
    pub has_header: Option<bool>,
    pub skip_rows: Option<usize>,
    pub compression: Option<String>,
    pub excel_sheet: Option<String>,
}

/// Designated columns read by the built-in metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub scanned_tracking_column: String,
    pub vendor_tracking_column: String,
    pub return_po_column: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub pie_max_slices: usize,
    pub max_hue_steps: usize,
    pub saturation: u8,
    pub lightness: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerConfig {
    /// Supporting rows shown under a plan result
    pub preview_rows: usize,
}

/// Settings handed to the reasoning engine. Nothing here is read from global state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningConfig {
    /// "none" disables external reasoning
    pub provider: String,
    pub model: String,
    pub api_url: Option<String>,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub timeout_secs: u64,
    /// Rows of the dataset included in the profile sent with each question
    pub sample_rows: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub history_limit: usize,
    pub enable_history: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DebugConfig {
    pub enabled: bool,
}

// Default implementations
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: "0.1".to_string(),
            file_loading: FileLoadingConfig::default(),
            metrics: MetricsConfig::default(),
            chart: ChartConfig::default(),
            answer: AnswerConfig::default(),
            reasoning: ReasoningConfig::default(),
            query: QueryConfig::default(),
            debug: DebugConfig::default(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        let columns = MetricColumns::default();
        Self {
            scanned_tracking_column: columns.scanned_tracking,
            vendor_tracking_column: columns.vendor_tracking,
            return_po_column: columns.return_po,
        }
    }
}

impl Default for ChartConfig {
    fn default() -> Self {
        let style = ChartStyle::default();
        Self {
            pie_max_slices: style.pie_max_slices,
            max_hue_steps: style.max_hue_steps,
            saturation: style.saturation,
            lightness: style.lightness,
        }
    }
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self { preview_rows: 20 }
    }
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            provider: "none".to_string(),
            model: String::new(),
            api_url: None,
            api_key_env: "DATASK_API_KEY".to_string(),
            timeout_secs: 60,
            sample_rows: 5,
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            history_limit: 1000,
            enable_history: true,
        }
    }
}

// Configuration loading and merging
impl AppConfig {
    /// Load configuration from all layers (default → user)
    pub fn load(app_name: &str) -> Result<Self> {
        let manager = ConfigManager::new(app_name)?;
        Self::load_from(&manager)
    }

    /// Load defaults merged with the config file managed by `manager`, then validate.
    pub fn load_from(manager: &ConfigManager) -> Result<Self> {
        let mut config = AppConfig::default();
        config.merge(manager.read_config()?);
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: AppConfig) {
        if other.version != AppConfig::default().version {
            self.version = other.version;
        }

        self.file_loading.merge(other.file_loading);
        self.metrics.merge(other.metrics);
        self.chart.merge(other.chart);
        self.answer.merge(other.answer);
        self.reasoning.merge(other.reasoning);
        self.query.merge(other.query);
        self.debug.merge(other.debug);
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !self.version.starts_with("0.1") {
            return Err(eyre!(
                "Unsupported config version: {}. Expected 0.1.x",
                self.version
            ));
        }

        if self.chart.max_hue_steps == 0 {
            return Err(eyre!("chart.max_hue_steps must be greater than 0"));
        }

        if self.chart.saturation > 100 || self.chart.lightness > 100 {
            return Err(eyre!(
                "chart.saturation and chart.lightness are percentages (0-100)"
            ));
        }

        for (key, value) in [
            ("scanned_tracking_column", &self.metrics.scanned_tracking_column),
            ("vendor_tracking_column", &self.metrics.vendor_tracking_column),
            ("return_po_column", &self.metrics.return_po_column),
        ] {
            if value.trim().is_empty() {
                return Err(eyre!("metrics.{} must not be empty", key));
            }
        }

        if let Some(compression) = &self.file_loading.compression {
            if datask_cli::CompressionFormat::from_name(compression).is_none() {
                return Err(eyre!(
                    "Invalid file_loading.compression: {}. Must be 'gzip', 'zstd', 'bzip2', or 'xz'",
                    compression
                ));
            }
        }

        if self.reasoning.provider.trim().is_empty() {
            return Err(eyre!("reasoning.provider must not be empty (use \"none\")"));
        }

        Ok(())
    }
}

// Merge implementations for each config section
impl FileLoadingConfig {
    pub fn merge(&mut self, other: Self) {
        if other.delimiter.is_some() {
            self.delimiter = other.delimiter;
        }
        if other.has_header.is_some() {
            self.has_header = other.has_header;
        }
        if other.skip_rows.is_some() {
            self.skip_rows = other.skip_rows;
        }
        if other.compression.is_some() {
            self.compression = other.compression;
        }
        if other.excel_sheet.is_some() {
            self.excel_sheet = other.excel_sheet;
        }
    }
}

impl MetricsConfig {
    pub fn merge(&mut self, other: Self) {
        let default = MetricsConfig::default();
        if other.scanned_tracking_column != default.scanned_tracking_column {
            self.scanned_tracking_column = other.scanned_tracking_column;
        }
        if other.vendor_tracking_column != default.vendor_tracking_column {
            self.vendor_tracking_column = other.vendor_tracking_column;
        }
        if other.return_po_column != default.return_po_column {
            self.return_po_column = other.return_po_column;
        }
    }

    pub fn columns(&self) -> MetricColumns {
        MetricColumns {
            scanned_tracking: self.scanned_tracking_column.clone(),
            vendor_tracking: self.vendor_tracking_column.clone(),
            return_po: self.return_po_column.clone(),
        }
    }
}

impl ChartConfig {
    pub fn merge(&mut self, other: Self) {
        let default = ChartConfig::default();
        if other.pie_max_slices != default.pie_max_slices {
            self.pie_max_slices = other.pie_max_slices;
        }
        if other.max_hue_steps != default.max_hue_steps {
            self.max_hue_steps = other.max_hue_steps;
        }
        if other.saturation != default.saturation {
            self.saturation = other.saturation;
        }
        if other.lightness != default.lightness {
            self.lightness = other.lightness;
        }
    }

    pub fn style(&self) -> ChartStyle {
        ChartStyle {
            pie_max_slices: self.pie_max_slices,
            max_hue_steps: self.max_hue_steps,
            saturation: self.saturation,
            lightness: self.lightness,
        }
    }
}

impl AnswerConfig {
    pub fn merge(&mut self, other: Self) {
        if other.preview_rows != AnswerConfig::default().preview_rows {
            self.preview_rows = other.preview_rows;
        }
    }
}

impl ReasoningConfig {
    pub fn merge(&mut self, other: Self) {
        let default = ReasoningConfig::default();
        if other.provider != default.provider {
            self.provider = other.provider;
        }
        if other.model != default.model {
            self.model = other.model;
        }
        if other.api_url.is_some() {
            self.api_url = other.api_url;
        }
        if other.api_key_env != default.api_key_env {
            self.api_key_env = other.api_key_env;
        }
        if other.timeout_secs != default.timeout_secs {
            self.timeout_secs = other.timeout_secs;
        }
        if other.sample_rows != default.sample_rows {
            self.sample_rows = other.sample_rows;
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.provider.eq_ignore_ascii_case("none")
    }

    /// API key read from the environment variable named by `api_key_env`.
    /// Blank values count as unset.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl QueryConfig {
    pub fn merge(&mut self, other: Self) {
        let default = QueryConfig::default();
        if other.history_limit != default.history_limit {
            self.history_limit = other.history_limit;
        }
        if other.enable_history != default.enable_history {
            self.enable_history = other.enable_history;
        }
    }
}

impl DebugConfig {
    pub fn merge(&mut self, other: Self) {
        if other.enabled {
            self.enabled = other.enabled;
        }
    }
}

const DEFAULT_CONFIG_TEMPLATE: &str = include_str!("../config/default.toml");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_template_parses_to_defaults() {
        let config = AppConfig::from_toml(DEFAULT_CONFIG_TEMPLATE).unwrap();
        assert_eq!(config.version, "0.1");
        assert_eq!(config.chart.pie_max_slices, 5);
        assert_eq!(config.metrics.return_po_column, "return_po");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_merge_overrides_only_changed_fields() {
        let mut base = AppConfig::default();
        let user = AppConfig::from_toml(
            r#"
            [metrics]
            return_po_column = "rma_po"

            [chart]
            pie_max_slices = 3
            "#,
        )
        .unwrap();
        base.merge(user);
        assert_eq!(base.metrics.return_po_column, "rma_po");
        assert_eq!(base.metrics.vendor_tracking_column, "vend_track_no");
        assert_eq!(base.chart.pie_max_slices, 3);
        assert_eq!(base.chart.max_hue_steps, 36);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.chart.max_hue_steps = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.file_loading.compression = Some("rar".to_string());
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.version = "2.0".to_string();
        assert!(config.validate().unwrap_err().to_string().contains("version"));
    }

    #[test]
    fn test_reasoning_timeout_and_api_key_lookup() {
        let config = AppConfig::from_toml(
            r#"
            [reasoning]
            provider = "anthropic"
            api_key_env = "DATASK_TEST_KEY_UNSET_7F3A"
            timeout_secs = 15
            "#,
        )
        .unwrap();
        assert_eq!(config.reasoning.timeout(), Duration::from_secs(15));
        assert_eq!(config.reasoning.api_key(), None);

        let mut reasoning = ReasoningConfig::default();
        reasoning.api_key_env = "PATH".to_string();
        assert!(reasoning.api_key().is_some());
    }
}
