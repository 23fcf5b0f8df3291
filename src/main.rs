//! # fno_news
//!
//! Aggregates recent news for Indian F&O (futures and options) stocks from a
//! selectable backend, prints it as a table sorted newest first and
//! optionally exports it as CSV or a JSON report.
//!
//! ## Features
//!
//! - Three backends: Google News RSS, NewsAPI and site-restricted Google
//!   Custom Search
//! - Lookback windows of one, three or six months
//! - Per-stock failure isolation with an outcome summary
//! - Retry with exponential backoff and a TTL cache in front of the backend
//! - Bounded concurrency, per-stock timeouts and Ctrl-C cancellation
//!
//! ## Usage
//!
//! ```sh
//! fno_news -s Infosys -s Wipro --period "3 Months" --csv
//! ```
//!
//! ## Architecture
//!
//! 1. **Configuration**: CLI flags, environment credentials, optional YAML file
//! 2. **Fetching**: one backend query per stock, through retry and cache layers
//! 3. **Aggregation**: normalize, deduplicate, sort newest first
//! 4. **Output**: table on stdout, CSV and JSON files on request

use clap::Parser;
use std::error::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod cli;
mod config;
mod error;
mod models;
mod normalize;
mod outputs;
mod period;
mod pipeline;
mod sources;
mod utils;

use cli::{Cli, SourceKind};
use config::{load_config, AppConfig};
use error::ConfigError;
use models::Stock;
use outputs::{json, table};
use period::Period;
use pipeline::{Aggregation, Pipeline, PipelineOptions};
use sources::cache::Cached;
use sources::custom_search::CustomSearch;
use sources::google_news::GoogleNews;
use sources::newsapi::NewsApi;
use sources::retry::Retrying;
use sources::{http_client, Backend, NewsSource};
use utils::ensure_writable_parent;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    let args = Cli::parse();
    debug!(?args.source, period = %args.period, max_results = args.max_results, "Parsed CLI arguments");

    let config = load_config(args.config.as_deref())?;

    if args.list_stocks {
        for stock in config.stock_list() {
            println!("{stock}");
        }
        let periods: Vec<&str> = Period::ALL.iter().map(|p| p.label()).collect();
        eprintln!("periods: {}", periods.join(", "));
        return Ok(());
    }

    let stocks = if args.all {
        config.stock_list()
    } else {
        config.select_stocks(&args.stocks)?
    };

    // Early check: export paths are writable before any network work
    for path in args.csv.iter().chain(args.json_output.iter()) {
        if let Err(e) = ensure_writable_parent(path).await {
            error!(
                path = %path.display(),
                error = %e,
                "Output path is not writable (fix perms or choose a different path)"
            );
            return Err(e.into());
        }
    }

    let backend = select_backend(&args, &config)?;
    let source = Cached::from_config(Retrying::from_config(backend, &config.retry), &config.cache);
    let pipeline = Pipeline::new(
        source,
        PipelineOptions {
            concurrency: args.concurrency,
            fetch_timeout: args.fetch_timeout(),
        },
    );

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted; skipping remaining stocks");
                cancel.cancel();
            }
        }
    });

    let observer = |completed: usize, total: usize, stock: &Stock| {
        info!(completed, total, %stock, "Stock complete");
    };
    let aggregation = pipeline
        .aggregate(&stocks, &args.period, args.max_results, &observer, &cancel)
        .await?;

    print!("{}", table::render_table(&aggregation.articles));
    print_summary(&aggregation);

    if let Some(path) = &args.csv {
        if let Err(e) = outputs::csv::write_csv(&aggregation.articles, path).await {
            error!(path = %path.display(), error = %e, "Failed to write CSV");
            return Err(e.into());
        }
        println!("CSV written to {}", path.display());
    }

    if let Some(path) = &args.json_output {
        if let Err(e) = json::write_report(&aggregation, path).await {
            error!(path = %path.display(), error = %e, "Failed to write JSON report");
            return Err(e.into());
        }
        println!("JSON report written to {}", path.display());
    }

    let summary = aggregation.summary();
    info!(
        elapsed_ms = start_time.elapsed().as_millis(),
        articles = aggregation.articles.len(),
        "fno_news finished"
    );

    if summary.total() > 0 && summary.failed == summary.total() {
        return Err(format!("all {} stock fetches failed", summary.failed).into());
    }
    Ok(())
}

/// Build the backend chosen on the command line, checking its credentials.
fn select_backend(args: &Cli, config: &AppConfig) -> Result<Backend, Box<dyn Error>> {
    let client = http_client(&config.http)?;
    let backend = match args.source {
        SourceKind::GoogleNews => Backend::GoogleNews(GoogleNews::new(client, &config.google_news)?),
        SourceKind::NewsApi => {
            let key = require(args.newsapi_key.as_deref(), "news-api", "NEWSAPI_KEY")?;
            Backend::NewsApi(NewsApi::new(client, key)?)
        }
        SourceKind::CustomSearch => {
            let key = require(args.google_api_key.as_deref(), "custom-search", "GOOGLE_API_KEY")?;
            let engine = require(args.google_cse_id.as_deref(), "custom-search", "GOOGLE_CSE_ID")?;
            Backend::CustomSearch(CustomSearch::new(
                client,
                key,
                engine,
                config.trusted_domains.clone(),
            )?)
        }
    };
    info!(backend = backend.name(), "Selected news backend");
    Ok(backend)
}

/// A present, non-blank credential or [`ConfigError::MissingCredential`].
fn require(
    value: Option<&str>,
    backend: &'static str,
    name: &'static str,
) -> Result<String, ConfigError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(ConfigError::MissingCredential { backend, name })
}

fn print_summary(aggregation: &Aggregation) {
    let summary = aggregation.summary();
    let count = aggregation.articles.len();

    if count == 0 {
        if summary.failed > 0 && summary.succeeded == 0 && summary.empty == 0 {
            println!("All fetches failed; no news could be retrieved.");
        } else {
            println!("No news found for the selected stocks/time range.");
        }
    }

    println!(
        "{count} articles ({}, {} fetched): {} stocks with news, {} empty, {} failed, {} cancelled",
        aggregation.period.period,
        summary.fetched,
        summary.succeeded,
        summary.empty,
        summary.failed,
        summary.cancelled,
    );
    for (stock, e) in aggregation.failures() {
        println!("  failed: {stock}: {e}");
    }
}
