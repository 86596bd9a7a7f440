//! Error types for churn-preview
//!
//! Centralized error handling using snafu for ergonomic error definitions.

use snafu::Snafu;

/// Main error type for the crate
#[derive(Debug, Snafu)]
pub enum Error {
    /// Invalid input or configuration
    #[snafu(display("Invalid: {message}"))]
    Invalid { message: String },

    /// IO error (file operations)
    #[snafu(display("IO error: {source}"))]
    Io { source: std::io::Error },

    /// JSON serialization/deserialization error
    #[snafu(display("JSON error: {source}"))]
    Json { source: serde_json::Error },

    /// TOML deserialization error
    #[snafu(display("TOML parse error: {source}"))]
    TomlDe { source: toml::de::Error },

    /// TOML serialization error
    #[snafu(display("TOML serialize error: {source}"))]
    TomlSe { source: toml::ser::Error },

    /// Network-level failure talking to the prediction service
    #[snafu(display("HTTP error: {source}"))]
    Http { source: reqwest::Error },

    /// The prediction service answered with a non-success status
    #[snafu(display("{url} returned {status}: {message}"))]
    Status {
        url: String,
        status: u16,
        message: String,
    },

    /// Timeout error
    #[snafu(display("Timeout: {message}"))]
    Timeout { message: String },

    /// The response arrived but its body could not be understood
    #[snafu(display("Malformed response from {url}: {message}"))]
    Malformed { url: String, message: String },

    /// Channel closed before a message could be delivered
    #[snafu(display("Channel closed: {message}"))]
    ChannelClosed { message: String },
}

impl Error {
    /// Network error, timeout or non-success status
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Http { .. } | Error::Status { .. } | Error::Timeout { .. }
        )
    }

    /// Body was received but did not decode into a page
    pub fn is_malformed(&self) -> bool {
        matches!(self, Error::Malformed { .. } | Error::Json { .. })
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Error::Io { source }
    }
}

impl From<serde_json::Error> for Error {
    fn from(source: serde_json::Error) -> Self {
        Error::Json { source }
    }
}

impl From<toml::de::Error> for Error {
    fn from(source: toml::de::Error) -> Self {
        Error::TomlDe { source }
    }
}

impl From<toml::ser::Error> for Error {
    fn from(source: toml::ser::Error) -> Self {
        Error::TomlSe { source }
    }
}

impl From<reqwest::Error> for Error {
    fn from(source: reqwest::Error) -> Self {
        if source.is_timeout() {
            let message = match source.url() {
                Some(url) => format!("request to {url} timed out"),
                None => "request timed out".to_string(),
            };
            Error::Timeout { message }
        } else if source.is_decode() {
            Error::Malformed {
                url: source.url().map(|u| u.to_string()).unwrap_or_default(),
                message: source.to_string(),
            }
        } else {
            Error::Http { source }
        }
    }
}

/// Result type alias for convenience
pub type Result<T, E = Error> = std::result::Result<T, E>;
