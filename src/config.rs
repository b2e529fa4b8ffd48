use crate::errors::{ReportError, ReportResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const WAREHOUSE_ENV: &str = "JOBDASH_WAREHOUSE";
pub const LOG_FILTER_ENV: &str = "JOBDASH_LOG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportConfig {
    pub warehouse: WarehouseConfig,
    pub dashboard: DashboardConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WarehouseConfig {
    pub path: PathBuf,
    pub busy_timeout_ms: u64,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("warehouse.db"),
            busy_timeout_ms: 5_000,
        }
    }
}

/// Fixed window sizes and filters applied by the dashboard fetchers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardConfig {
    /// Exactly two top-level regions kept by the geographic breakdown.
    pub regions: Vec<String>,
    pub history_window: usize,
    pub tool_top_n: usize,
    pub company_top_n: usize,
    /// Days between a snapshot and the one it is compared against.
    pub comparison_days: i64,
    pub trend_line_top_k: usize,
    pub trend_bar_top_k: usize,
    /// Every district drawn on the openings map; empty uses the districts
    /// present in the geographic breakdown.
    pub districts: Vec<String>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            regions: vec!["Taipei City".to_string(), "New Taipei City".to_string()],
            history_window: 12,
            tool_top_n: 3,
            company_top_n: 5,
            comparison_days: 7,
            trend_line_top_k: 10,
            trend_bar_top_k: 5,
            districts: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingConfig {
    pub filter: String,
    pub directory: Option<PathBuf>,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            directory: None,
            json: false,
        }
    }
}

impl ReportConfig {
    pub fn load(path: &Path) -> ReportResult<Self> {
        if !path.exists() {
            return Err(ReportError::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        let raw = fs::read_to_string(path)?;
        let mut config: ReportConfig = serde_yaml::from_str(&raw)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_env() -> ReportResult<Self> {
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var(WAREHOUSE_ENV) {
            if !path.trim().is_empty() {
                self.warehouse.path = PathBuf::from(path.trim());
            }
        }
        if let Ok(filter) = std::env::var(LOG_FILTER_ENV) {
            if !filter.trim().is_empty() {
                self.logging.filter = filter.trim().to_string();
            }
        }
    }

    pub fn validate(&self) -> ReportResult<()> {
        let dashboard = &self.dashboard;
        if dashboard.regions.len() != 2 {
            return Err(ReportError::Config(format!(
                "dashboard.regions must name exactly two regions, got {}",
                dashboard.regions.len()
            )));
        }
        let windows = [
            ("historyWindow", dashboard.history_window),
            ("toolTopN", dashboard.tool_top_n),
            ("companyTopN", dashboard.company_top_n),
            ("trendLineTopK", dashboard.trend_line_top_k),
            ("trendBarTopK", dashboard.trend_bar_top_k),
        ];
        for (name, value) in windows {
            if value == 0 {
                return Err(ReportError::Config(format!("dashboard.{} must be positive", name)));
            }
        }
        if dashboard.comparison_days <= 0 {
            return Err(ReportError::Config(
                "dashboard.comparisonDays must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
