use crate::error::ConfigError;
use crate::types::SortDirection;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Character widths for the known FMSCA carrier columns.
pub static DEFAULT_COLUMN_WIDTHS: Lazy<HashMap<&'static str, usize>> = Lazy::new(|| {
    HashMap::from([
        ("created_dt", 18),
        ("data_source_modified_dt", 22),
        ("entity_type", 13),
        ("operating_status", 22),
        ("legal_name", 25),
        ("dba_name", 25),
        ("physical_address", 40),
        ("p_street", 20),
        ("p_city", 19),
        ("p_state", 10),
        ("p_zip_code", 10),
        ("phone", 12),
        ("mailing_address", 40),
        ("m_street", 20),
        ("m_city", 19),
        ("m_state", 10),
        ("m_zip_code", 10),
        ("usdot_number", 15),
        ("mc_mx_ff_number", 15),
        ("power_units", 12),
        ("mcs_150_form_date", 16),
        ("out_of_service_date", 18),
        ("state_carrier_id_number", 21),
        ("duns_number", 15),
        ("drivers", 15),
        ("mcs_150_mileage_year", 18),
        ("id", 10),
        ("credit_score", 12),
        ("record_status", 15),
    ])
});

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub source: SourceConfig,
    pub view: ViewConfig,
    pub columns: ColumnsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// File path or http(s) URL of the CSV.
    pub location: String,
    pub date_column: String,
    /// chrono format string used to parse `date_column`.
    pub date_format: String,
    pub required_columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub debounce_ms: u64,
    pub page_sizes: Vec<usize>,
    pub default_page_size: usize,
    pub max_query_len: usize,
    pub default_sort_column: Option<String>,
    pub default_sort_direction: SortDirection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnsConfig {
    pub labels: HashMap<String, String>,
    pub widths: HashMap<String, usize>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            location: "data/FMSCA.csv".to_string(),
            date_column: "out_of_service_date".to_string(),
            date_format: "%m/%d/%Y".to_string(),
            required_columns: Vec::new(),
        }
    }
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            page_sizes: vec![10, 25, 50, 100],
            default_page_size: 100,
            max_query_len: 100,
            default_sort_column: Some("created_dt".to_string()),
            default_sort_direction: SortDirection::Asc,
        }
    }
}

impl ViewConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl ColumnsConfig {
    pub fn label_for(&self, name: &str) -> Option<&str> {
        self.labels.get(name).map(String::as_str)
    }

    /// Configured width, falling back to the built-in table.
    pub fn width_for(&self, name: &str) -> Option<usize> {
        self.widths
            .get(name)
            .copied()
            .or_else(|| DEFAULT_COLUMN_WIDTHS.get(name).copied())
    }
}

impl AppConfig {
    /// Read a TOML config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(AppConfig::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let view = &self.view;
        if view.page_sizes.is_empty() || view.page_sizes.contains(&0) {
            return Err(ConfigError::Invalid(
                "view.page_sizes must be non-empty and contain no zero".to_string(),
            ));
        }
        if !view.page_sizes.contains(&view.default_page_size) {
            return Err(ConfigError::Invalid(format!(
                "view.default_page_size {} is not listed in view.page_sizes",
                view.default_page_size
            )));
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write the default configuration. Refuses to clobber an existing file unless `force`.
    pub fn write_default(path: &Path, force: bool) -> Result<(), ConfigError> {
        if path.exists() && !force {
            return Err(ConfigError::Invalid(format!(
                "config file already exists at {}",
                path.display()
            )));
        }
        std::fs::write(path, AppConfig::default().to_toml()?)?;
        Ok(())
    }
}
