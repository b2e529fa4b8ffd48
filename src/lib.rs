pub mod config;
pub mod dashboard;
pub mod errors;
pub mod fetcher;
pub mod logging;
pub mod models;
pub mod ranking;
pub mod trends;
pub mod validate;
pub mod warehouse;

pub use crate::config::ReportConfig;
pub use crate::dashboard::{build_home_page, load_home_page, load_tools_page, HomePage, ToolsPage};
pub use crate::errors::{ReportError, ReportResult};
pub use crate::fetcher::ReportDataFetcher;
pub use crate::models::{FetchOutcome, FetchStatus};
pub use crate::warehouse::Warehouse;
