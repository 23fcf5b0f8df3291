//! Google Custom Search JSON API backend.
//!
//! Restricts a boolean query to a fixed allow-list of trusted publisher
//! domains:
//!
//! ```text
//! "HDFC Bank" (site:economictimes.indiatimes.com OR site:livemint.com)
//! ```
//!
//! The API returns at most 10 items per page, so results are gathered page
//! by page via `start` until `max_results` items are collected or the
//! backend has nothing more. Requires an API key (`GOOGLE_API_KEY`) and a
//! search engine id (`GOOGLE_CSE_ID`).

use super::{check_status, NewsSource};
use crate::error::FetchError;
use crate::models::{RawArticle, Stock};
use crate::period::PeriodSpec;
use crate::utils::truncate_for_log;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com";

/// Carries the API key so it never appears in request URLs.
const API_KEY_HEADER: &str = "X-goog-api-key";

/// Items per page the API allows.
const PAGE_SIZE: usize = 10;

/// The API refuses `start` beyond this.
const MAX_START: usize = 91;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<WireItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireItem {
    title: Option<String>,
    link: Option<String>,
    snippet: Option<String>,
    display_link: Option<String>,
    pagemap: Option<PageMap>,
}

#[derive(Debug, Default, Deserialize)]
struct PageMap {
    #[serde(default)]
    metatags: Vec<HashMap<String, Value>>,
}

impl WireItem {
    fn metatag(&self, key: &str) -> Option<String> {
        self.pagemap
            .as_ref()?
            .metatags
            .iter()
            .find_map(|tags| tags.get(key).and_then(Value::as_str).map(str::to_string))
    }

    fn into_raw(self) -> RawArticle {
        let publisher = self.metatag("og:site_name").or_else(|| self.display_link.clone());
        let published = self.metatag("article:published_time");
        RawArticle {
            title: self.title,
            url: self.link,
            publisher,
            published,
            description: self.snippet,
        }
    }
}

/// Site-restricted Google Custom Search.
#[derive(Clone)]
pub struct CustomSearch {
    client: Client,
    base_url: Url,
    api_key: String,
    engine_id: String,
    trusted_domains: Vec<String>,
}

impl std::fmt::Debug for CustomSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomSearch")
            .field("base_url", &self.base_url.as_str())
            .field("engine_id", &self.engine_id)
            .field("api_key", &"<redacted>")
            .field("trusted_domains", &self.trusted_domains)
            .finish()
    }
}

impl CustomSearch {
    pub fn new(
        client: Client,
        api_key: String,
        engine_id: String,
        trusted_domains: Vec<String>,
    ) -> Result<Self, FetchError> {
        Ok(Self {
            client,
            base_url: Url::parse(DEFAULT_BASE_URL)?,
            api_key,
            engine_id,
            trusted_domains,
        })
    }

    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    /// Quoted stock name restricted to the trusted domains.
    pub fn query(&self, stock: &Stock) -> String {
        if self.trusted_domains.is_empty() {
            return format!("\"{}\"", stock.name());
        }
        let sites = self
            .trusted_domains
            .iter()
            .map(|d| format!("site:{d}"))
            .collect::<Vec<_>>()
            .join(" OR ");
        format!("\"{}\" ({})", stock.name(), sites)
    }

    fn page_url(
        &self,
        query: &str,
        period: &PeriodSpec,
        start: usize,
        num: usize,
    ) -> Result<Url, FetchError> {
        let mut url = self.base_url.join("customsearch/v1")?;
        url.query_pairs_mut()
            .append_pair("cx", &self.engine_id)
            .append_pair("q", query)
            .append_pair("dateRestrict", period.period.date_restrict())
            .append_pair("num", &num.to_string())
            .append_pair("start", &start.to_string());
        Ok(url)
    }
}

impl NewsSource for CustomSearch {
    fn name(&self) -> &'static str {
        "custom-search"
    }

    #[instrument(level = "info", skip_all, fields(stock = %stock, period = period.token))]
    async fn fetch(
        &self,
        stock: &Stock,
        period: &PeriodSpec,
        max_results: usize,
    ) -> Result<Vec<RawArticle>, FetchError> {
        let query = self.query(stock);
        let mut articles = Vec::new();
        let mut start = 1;

        while articles.len() < max_results && start <= MAX_START {
            let num = (max_results - articles.len()).min(PAGE_SIZE);
            let url = self.page_url(&query, period, start, num)?;
            debug!(start, num, "Querying Custom Search page");

            let response = self
                .client
                .get(url)
                .header(API_KEY_HEADER, &self.api_key)
                .send()
                .await?;
            let response = check_status(response)?;
            let body = response.text().await?;
            let page: SearchResponse = serde_json::from_str(&body).inspect_err(|e| {
                warn!(error = %e, body_preview = %truncate_for_log(&body, 300), "Malformed Custom Search payload");
            })?;
            let received = page.items.len();
            articles.extend(page.items.into_iter().take(num).map(WireItem::into_raw));

            if received < num {
                break;
            }
            start += PAGE_SIZE;
        }

        info!(count = articles.len(), "Fetched Custom Search items");
        Ok(articles)
    }
}
