//! JSON report output.
//!
//! Serializes one run as a [`Report`](crate::models::Report):
//!
//! ```json
//! {
//!   "generated_at": "2024-03-31T10:00:00Z",
//!   "period": { "period": "1 Month", "token": "1m", "start": "2024-03-01", "end": "2024-03-31" },
//!   "summary": { "fetched": 40, "succeeded": 5, "empty": 1, "failed": 0, "cancelled": 0 },
//!   "failures": [],
//!   "articles": [ { "stock": "TCS", "title": "...", "published": "..." } ]
//! }
//! ```
//!
//! Parent directories are created when missing.

use crate::error::ExportError;
use crate::pipeline::Aggregation;
use std::path::Path;
use tokio::fs;
use tracing::{error, info, instrument};

/// Write the JSON report for `aggregation` to `path`.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_report(aggregation: &Aggregation, path: &Path) -> Result<(), ExportError> {
    let json = serde_json::to_string_pretty(&aggregation.report())?;

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        if let Err(e) = fs::create_dir_all(dir).await {
            error!(dir = %dir.display(), error = %e, "Failed to create JSON dir");
            return Err(e.into());
        }
    }

    fs::write(path, json).await?;
    info!(articles = aggregation.articles.len(), "Wrote JSON report");
    Ok(())
}
