//! Data models for stocks, raw backend records and normalized articles.
//!
//! This module defines the core data structures used throughout the application:
//! - [`Stock`]: a configured F&O stock, identified by its display name
//! - [`RawArticle`]: one backend record, already mapped to common field names
//! - [`Article`]: the canonical, normalized article
//! - [`ResultSet`]: deduplicated, sorted articles for one run
//! - [`Report`]: the JSON document written by the JSON exporter

use crate::period::PeriodSpec;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use std::fmt;

/// A stock, identified by its display name (e.g. "Reliance Industries").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Stock(String);

impl Stock {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Stock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One record as returned by a backend.
///
/// Each source maps its own wire format into these fields; values are kept
/// exactly as the backend sent them. Cleanup happens in
/// [`crate::normalize::normalize`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawArticle {
    pub title: Option<String>,
    pub url: Option<String>,
    pub publisher: Option<String>,
    /// Publication date string in whatever layout the backend uses.
    pub published: Option<String>,
    pub description: Option<String>,
}

/// Publication time of an [`Article`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Published {
    /// A parsed timestamp, normalized to UTC.
    Timestamp(DateTime<Utc>),
    /// A date string that could not be parsed, kept verbatim.
    Unparsed(String),
    /// The backend sent no date.
    Absent,
}

impl Published {
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Published::Timestamp(ts) => Some(*ts),
            Published::Unparsed(_) | Published::Absent => None,
        }
    }

    /// Text form for display and export; `None` when absent.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Published::Timestamp(ts) => Some(ts.to_rfc3339_opts(SecondsFormat::AutoSi, false)),
            Published::Unparsed(raw) => Some(raw.clone()),
            Published::Absent => None,
        }
    }
}

impl Serialize for Published {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.to_text() {
            Some(text) => serializer.serialize_str(&text),
            None => serializer.serialize_none(),
        }
    }
}

/// The canonical article shape every backend is normalized into.
///
/// Missing values are `None`, never empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Article {
    pub stock: Stock,
    pub title: Option<String>,
    pub url: Option<String>,
    pub publisher: Option<String>,
    pub published: Published,
    pub description: Option<String>,
}

/// Deduplicated articles, newest first.
///
/// Built by [`crate::pipeline::build_result_set`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResultSet(Vec<Article>);

impl ResultSet {
    pub(crate) fn from_sorted(articles: Vec<Article>) -> Self {
        Self(articles)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Article> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Article] {
        &self.0
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a Article;
    type IntoIter = std::slice::Iter<'a, Article>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Per-status stock counts for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeSummary {
    /// Records returned by the backend before dedup.
    pub fetched: usize,
    pub succeeded: usize,
    pub empty: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl OutcomeSummary {
    pub fn total(&self) -> usize {
        self.succeeded + self.empty + self.failed + self.cancelled
    }
}

/// A JSON snapshot of one run.
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub generated_at: DateTime<Utc>,
    pub period: &'a PeriodSpec,
    pub summary: OutcomeSummary,
    pub failures: Vec<FailureEntry<'a>>,
    pub articles: &'a ResultSet,
}

/// A stock whose fetch failed, with the error text.
#[derive(Debug, Serialize)]
pub struct FailureEntry<'a> {
    pub stock: &'a Stock,
    pub error: String,
}
