//! CSV export of a [`ResultSet`].
//!
//! Columns are fixed, in this order:
//!
//! ```text
//! stock,title,publisher,published,url,description
//! ```
//!
//! Absent values become empty cells. `published` holds the RFC 3339 timestamp
//! when the date was parsed and the verbatim backend text otherwise.

use crate::error::ExportError;
use crate::models::{Article, ResultSet};
use serde::Serialize;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// File name used when `--csv` is given without a path.
pub const DEFAULT_CSV_FILE: &str = "fno_news.csv";

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    stock: &'a str,
    title: Option<&'a str>,
    publisher: Option<&'a str>,
    published: Option<String>,
    url: Option<&'a str>,
    description: Option<&'a str>,
}

impl<'a> From<&'a Article> for CsvRow<'a> {
    fn from(a: &'a Article) -> Self {
        Self {
            stock: a.stock.name(),
            title: a.title.as_deref(),
            publisher: a.publisher.as_deref(),
            published: a.published.to_text(),
            url: a.url.as_deref(),
            description: a.description.as_deref(),
        }
    }
}

/// Serialize the result set to UTF-8 CSV bytes with a header row.
pub fn to_csv(result: &ResultSet) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    if result.is_empty() {
        // serde only emits headers alongside the first record
        writer.write_record(["stock", "title", "publisher", "published", "url", "description"])?;
    }
    for article in result {
        writer.serialize(CsvRow::from(article))?;
    }
    writer.into_inner().map_err(|e| ExportError::Io(e.into_error()))
}

/// Write the CSV export to `path`.
#[instrument(level = "info", skip_all, fields(path = %path.display(), rows = result.len()))]
pub async fn write_csv(result: &ResultSet, path: &Path) -> Result<(), ExportError> {
    let bytes = to_csv(result)?;
    fs::write(path, bytes).await?;
    info!("Wrote CSV export");
    Ok(())
}
