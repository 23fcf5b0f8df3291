//! Runtime configuration loaded from an optional YAML file.
//!
//! Every field has a default, so an absent file or a partial file is fine.
//! Credentials are never read from here; they come from flags or the
//! environment (see [`crate::cli::Cli`]).
//!
//! ```yaml
//! stocks: ["Reliance Industries", "TCS", "Infosys"]
//! default_selection: 3
//! trusted_domains: ["economictimes.indiatimes.com", "livemint.com"]
//! http:
//!   timeout_secs: 15
//! retry:
//!   max_retries: 2
//! ```

use crate::error::ConfigError;
use crate::models::Stock;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};

/// The built-in F&O stock list.
pub const DEFAULT_FNO_STOCKS: &[&str] = &[
    "Reliance Industries",
    "TCS",
    "Infosys",
    "HDFC Bank",
    "ICICI Bank",
    "Kotak Mahindra Bank",
    "State Bank of India",
    "Bharti Airtel",
    "Hindustan Unilever",
    "Axis Bank",
    "ITC",
    "Larsen & Toubro",
    "Wipro",
    "Bajaj Finance",
    "HCL Technologies",
    "ONGC",
    "NTPC",
    "Tata Steel",
    "Maruti Suzuki",
    "Tech Mahindra",
    "Adani Enterprises",
    "Tata Motors",
    "Power Grid Corporation",
    "IndusInd Bank",
    "UltraTech Cement",
    "Sun Pharma",
    "Grasim Industries",
    "JSW Steel",
    "BPCL",
    "Coal India",
    "Eicher Motors",
    "HDFC Life",
    "SBI Life",
    "Dr Reddy's Laboratories",
];

/// Publisher domains the custom-search backend restricts its query to.
pub const DEFAULT_TRUSTED_DOMAINS: &[&str] = &[
    "economictimes.indiatimes.com",
    "moneycontrol.com",
    "livemint.com",
    "business-standard.com",
    "thehindubusinessline.com",
    "financialexpress.com",
    "reuters.com",
    "ndtvprofit.com",
];

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Stocks a user may select from.
    pub stocks: Vec<String>,
    /// How many stocks from the top of the list are used when none are named.
    pub default_selection: usize,
    pub trusted_domains: Vec<String>,
    pub google_news: GoogleNewsCfg,
    pub http: HttpCfg,
    pub retry: RetryCfg,
    pub cache: CacheCfg,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            stocks: DEFAULT_FNO_STOCKS.iter().map(|s| s.to_string()).collect(),
            default_selection: 6,
            trusted_domains: DEFAULT_TRUSTED_DOMAINS.iter().map(|s| s.to_string()).collect(),
            google_news: GoogleNewsCfg::default(),
            http: HttpCfg::default(),
            retry: RetryCfg::default(),
            cache: CacheCfg::default(),
        }
    }
}

impl AppConfig {
    /// The configured stock list.
    pub fn stock_list(&self) -> Vec<Stock> {
        self.stocks.iter().map(Stock::new).collect()
    }

    /// Resolve user-supplied names against the configured list.
    ///
    /// Matching ignores case and surrounding whitespace; the configured
    /// spelling is returned. An empty request selects the first
    /// `default_selection` stocks.
    pub fn select_stocks(&self, requested: &[String]) -> Result<Vec<Stock>, ConfigError> {
        if requested.is_empty() {
            return Ok(self
                .stocks
                .iter()
                .take(self.default_selection)
                .map(Stock::new)
                .collect());
        }

        requested
            .iter()
            .map(|name| {
                let wanted = name.trim();
                self.stocks
                    .iter()
                    .find(|s| s.eq_ignore_ascii_case(wanted))
                    .map(Stock::new)
                    .ok_or_else(|| ConfigError::UnknownStock(name.clone()))
            })
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GoogleNewsCfg {
    pub language: String,
    pub country: String,
}

impl Default for GoogleNewsCfg {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            country: "IN".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpCfg {
    pub user_agent: String,
    /// Timeout of a single HTTP request.
    pub timeout_secs: u64,
}

impl Default for HttpCfg {
    fn default() -> Self {
        Self {
            user_agent: format!("fno_news/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 20,
        }
    }
}

impl HttpCfg {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryCfg {
    pub max_retries: usize,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub max_jitter_ms: u64,
}

impl Default for RetryCfg {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            max_jitter_ms: 250,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheCfg {
    pub ttl_secs: u64,
    pub capacity: usize,
}

impl Default for CacheCfg {
    fn default() -> Self {
        Self {
            ttl_secs: 900,
            capacity: 256,
        }
    }
}

/// Load the configuration, falling back to defaults when `path` is `None`.
#[instrument(level = "info")]
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(AppConfig::default());
    };

    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_config(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    info!(
        stocks = config.stocks.len(),
        trusted_domains = config.trusted_domains.len(),
        "Loaded configuration"
    );
    Ok(config)
}

fn parse_config(text: &str) -> Result<AppConfig, serde_yaml::Error> {
    if text.trim().is_empty() {
        return Ok(AppConfig::default());
    }
    serde_yaml::from_str(text)
}
