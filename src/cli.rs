//! Command-line interface definitions for fno_news.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Backend credentials can be provided via flags or environment variables.

use crate::outputs::csv::DEFAULT_CSV_FILE;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Which news backend to query.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    /// Google News RSS search (no credentials)
    GoogleNews,
    /// NewsAPI `/v2/everything` (needs NEWSAPI_KEY)
    NewsApi,
    /// Google Custom Search over trusted domains (needs GOOGLE_API_KEY and GOOGLE_CSE_ID)
    CustomSearch,
}

/// Command-line arguments for fno_news.
///
/// # Examples
///
/// ```sh
/// # Default stocks, last month, Google News
/// fno_news
///
/// # Two stocks over six months, exported to CSV
/// fno_news -s Infosys -s Wipro --period "6 Months" --csv
///
/// # NewsAPI with the key from the environment
/// NEWSAPI_KEY=... fno_news --source news-api --all --json-output out/report.json
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Stock to fetch news for (repeatable); defaults to the head of the configured list
    #[arg(short, long = "stock", value_name = "NAME", conflicts_with = "all")]
    pub stocks: Vec<String>,

    /// Fetch news for every configured stock
    #[arg(long)]
    pub all: bool,

    /// Lookback window: "1 Month", "3 Months" or "6 Months"
    #[arg(short, long, default_value = "1 Month")]
    pub period: String,

    /// Maximum articles per stock (1-100)
    #[arg(short = 'n', long, default_value_t = 30)]
    pub max_results: usize,

    /// News backend
    #[arg(long, value_enum, default_value_t = SourceKind::GoogleNews)]
    pub source: SourceKind,

    /// Maximum stocks fetched at the same time
    #[arg(long, default_value_t = 1)]
    pub concurrency: usize,

    /// Time budget per stock, retries included
    #[arg(long, default_value_t = 60)]
    pub timeout_secs: u64,

    /// Export the results as CSV (to fno_news.csv when no path is given)
    #[arg(long, value_name = "PATH", num_args = 0..=1, default_missing_value = DEFAULT_CSV_FILE)]
    pub csv: Option<PathBuf>,

    /// Write a JSON report to this path
    #[arg(short, long, value_name = "PATH")]
    pub json_output: Option<PathBuf>,

    /// Optional path to a config.yaml file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print the configured stock list and exit
    #[arg(long)]
    pub list_stocks: bool,

    /// NewsAPI key
    #[arg(long, env = "NEWSAPI_KEY", hide_env_values = true)]
    pub newsapi_key: Option<String>,

    /// Google API key for Custom Search
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    pub google_api_key: Option<String>,

    /// Google Custom Search engine id
    #[arg(long, env = "GOOGLE_CSE_ID", hide_env_values = true)]
    pub google_cse_id: Option<String>,
}

impl Cli {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
