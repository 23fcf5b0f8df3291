//! NewsAPI `/v2/everything` backend.
//!
//! Searches for the quoted stock name within the explicit date range of the
//! period. Requires an API key (`NEWSAPI_KEY`).

use super::{check_status, NewsSource};
use crate::error::FetchError;
use crate::models::{RawArticle, Stock};
use crate::period::PeriodSpec;
use crate::utils::truncate_for_log;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://newsapi.org";

/// Largest `pageSize` the endpoint accepts.
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
struct EverythingResponse {
    status: String,
    #[serde(default)]
    articles: Vec<WireArticle>,
    code: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireArticle {
    source: Option<WireSource>,
    title: Option<String>,
    url: Option<String>,
    description: Option<String>,
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireSource {
    name: Option<String>,
}

impl WireArticle {
    fn into_raw(self) -> RawArticle {
        RawArticle {
            title: self.title,
            url: self.url,
            publisher: self.source.and_then(|s| s.name),
            published: self.published_at,
            description: self.description,
        }
    }
}

/// NewsAPI keyword search.
#[derive(Clone)]
pub struct NewsApi {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl std::fmt::Debug for NewsApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewsApi")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl NewsApi {
    pub fn new(client: Client, api_key: String) -> Result<Self, FetchError> {
        Ok(Self {
            client,
            base_url: Url::parse(DEFAULT_BASE_URL)?,
            api_key,
        })
    }

    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    /// Exact-phrase query for a stock.
    pub fn query(stock: &Stock) -> String {
        format!("\"{}\"", stock.name())
    }

    fn search_url(
        &self,
        stock: &Stock,
        period: &PeriodSpec,
        max_results: usize,
    ) -> Result<Url, FetchError> {
        let mut url = self.base_url.join("v2/everything")?;
        url.query_pairs_mut()
            .append_pair("q", &Self::query(stock))
            .append_pair("from", &period.start.format("%Y-%m-%d").to_string())
            .append_pair("to", &period.end.format("%Y-%m-%d").to_string())
            .append_pair("language", "en")
            .append_pair("sortBy", "publishedAt")
            .append_pair("pageSize", &max_results.min(MAX_PAGE_SIZE).to_string());
        Ok(url)
    }
}

impl NewsSource for NewsApi {
    fn name(&self) -> &'static str {
        "news-api"
    }

    #[instrument(level = "info", skip_all, fields(stock = %stock, from = %period.start, to = %period.end))]
    async fn fetch(
        &self,
        stock: &Stock,
        period: &PeriodSpec,
        max_results: usize,
    ) -> Result<Vec<RawArticle>, FetchError> {
        let url = self.search_url(stock, period, max_results)?;
        debug!(%url, "Querying NewsAPI");

        let response = self
            .client
            .get(url)
            .header("X-Api-Key", &self.api_key)
            .send()
            .await?;
        let response = check_status(response)?;
        let body = response.text().await?;
        let articles = parse_response(&body, max_results)?;

        info!(count = articles.len(), "Fetched NewsAPI articles");
        Ok(articles)
    }
}

fn parse_response(body: &str, max_results: usize) -> Result<Vec<RawArticle>, FetchError> {
    let parsed: EverythingResponse = serde_json::from_str(body).inspect_err(|e| {
        warn!(error = %e, body_preview = %truncate_for_log(body, 300), "Malformed NewsAPI payload");
    })?;
    if parsed.status != "ok" {
        return Err(FetchError::Api {
            code: parsed.code.unwrap_or_else(|| parsed.status.clone()),
            message: parsed.message.unwrap_or_default(),
        });
    }
    Ok(parsed
        .articles
        .into_iter()
        .take(max_results)
        .map(WireArticle::into_raw)
        .collect())
}
