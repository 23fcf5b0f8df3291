//! Error types for configuration, backend fetches and exports.
//!
//! Only [`ConfigError`] stops a run. A [`FetchError`] is scoped to a single
//! stock and is carried in that stock's outcome instead of aborting the batch.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Invalid input detected before any network call is made.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The period label is not one of the supported lookback windows.
    #[error("unknown period {0:?}; expected \"1 Month\", \"3 Months\" or \"6 Months\"")]
    UnknownPeriod(String),

    /// `max_results` is outside the range every backend accepts.
    #[error("max_results must be between 1 and {max}, got {got}")]
    MaxResults { got: usize, max: usize },

    /// At least one fetch must be allowed in flight.
    #[error("concurrency must be at least 1")]
    ZeroConcurrency,

    /// The selected backend needs a credential that was not supplied.
    #[error("the {backend} backend requires {name} (flag or environment variable)")]
    MissingCredential {
        backend: &'static str,
        name: &'static str,
    },

    /// A requested stock is not in the configured list.
    #[error("{0:?} is not in the configured F&O stock list")]
    UnknownStock(String),

    /// The configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid YAML for [`crate::config::AppConfig`].
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// A backend failure for one stock.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure (connect, TLS, body read). Stored without
    /// the request url.
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    /// The backend answered with a non-2xx status.
    #[error("unexpected response status {status} from {url}")]
    Status { status: u16, url: String },

    /// The backend answered 2xx but reported an error in its payload.
    #[error("backend error {code}: {message}")]
    Api { code: String, message: String },

    /// The JSON body did not match the expected shape.
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The RSS body was not well-formed XML or not an RSS document.
    #[error("malformed RSS: {0}")]
    Xml(#[from] quick_xml::DeError),

    /// A request URL could not be built.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// The fetch did not finish within the per-fetch timeout.
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Http(e.without_url())
    }
}

impl FetchError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Http(e) => !e.is_builder() && !e.is_decode(),
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            FetchError::Timeout(_) => true,
            FetchError::Api { .. }
            | FetchError::Json(_)
            | FetchError::Xml(_)
            | FetchError::Url(_) => false,
        }
    }
}

/// Failure while serializing or writing an export.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transience() {
        let throttled = FetchError::Status {
            status: 429,
            url: "https://example.com".to_string(),
        };
        let unavailable = FetchError::Status {
            status: 503,
            url: "https://example.com".to_string(),
        };
        let forbidden = FetchError::Status {
            status: 403,
            url: "https://example.com".to_string(),
        };
        assert!(throttled.is_transient());
        assert!(unavailable.is_transient());
        assert!(!forbidden.is_transient());
    }

    #[test]
    fn test_api_error_is_permanent() {
        let e = FetchError::Api {
            code: "apiKeyInvalid".to_string(),
            message: "Your API key is invalid".to_string(),
        };
        assert!(!e.is_transient());
        assert_eq!(e.to_string(), "backend error apiKeyInvalid: Your API key is invalid");
    }

    #[test]
    fn test_timeout_is_transient() {
        assert!(FetchError::Timeout(Duration::from_secs(1)).is_transient());
    }

    #[test]
    fn test_missing_credential_message() {
        let e = ConfigError::MissingCredential {
            backend: "news-api",
            name: "NEWSAPI_KEY",
        };
        assert!(e.to_string().contains("NEWSAPI_KEY"));
    }
}
