//! Loader Constants
//!
//! Centralized defaults for the prediction loader and its HTTP client.

/// Default prediction service address
pub const DEFAULT_API_URL: &str = "http://localhost:5001";

/// Rows requested per page
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Request timeout
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Sentinel fires this many pixels before the literal bottom of the list
pub const SENTINEL_ROOT_MARGIN_PX: f32 = 200.0;

/// Fraction of the sentinel marker that must be visible to count as intersecting
pub const SENTINEL_THRESHOLD: f32 = 0.1;

/// Config file name inside the platform config directory
pub const CONFIG_FILE_NAME: &str = "churn-preview.toml";

/// Log file prefix for the rolling file appender
pub const LOG_FILE_PREFIX: &str = "churn-preview.log";

/// Suffix used when the server does not suggest an export filename
pub const EXPORT_FILE_SUFFIX: &str = "predictions.xlsx";
