//! Google News RSS search backend.
//!
//! Queries the public search feed at `https://news.google.com/rss/search`
//! with `"{stock} stock when:{token}"`. No credentials are needed, but the
//! feed is rate limited, so the pipeline defaults to one request at a time.
//!
//! Items look like:
//!
//! ```xml
//! <item>
//!   <title>Infosys shares rise after Q3 beat - Mint</title>
//!   <link>https://news.google.com/rss/articles/CBMi...</link>
//!   <pubDate>Tue, 05 Mar 2024 08:15:00 GMT</pubDate>
//!   <description>&lt;a href="..."&gt;Infosys shares rise...&lt;/a&gt;</description>
//!   <source url="https://www.livemint.com">Mint</source>
//! </item>
//! ```

use super::{check_status, NewsSource};
use crate::config::GoogleNewsCfg;
use crate::error::FetchError;
use crate::models::{RawArticle, Stock};
use crate::period::PeriodSpec;
use reqwest::Client;
use scraper::Html;
use serde::Deserialize;
use tracing::{debug, info, instrument};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://news.google.com";

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    source: Option<ItemSource>,
}

#[derive(Debug, Deserialize)]
struct ItemSource {
    #[serde(rename = "$text")]
    name: Option<String>,
}

impl Item {
    fn into_raw(self) -> RawArticle {
        RawArticle {
            title: self.title,
            url: self.link,
            publisher: self.source.and_then(|s| s.name),
            published: self.pub_date,
            description: self.description.map(|d| html_to_text(&d)),
        }
    }
}

/// Google News RSS search.
#[derive(Debug, Clone)]
pub struct GoogleNews {
    client: Client,
    base_url: Url,
    language: String,
    country: String,
}

impl GoogleNews {
    pub fn new(client: Client, cfg: &GoogleNewsCfg) -> Result<Self, FetchError> {
        Ok(Self {
            client,
            base_url: Url::parse(DEFAULT_BASE_URL)?,
            language: cfg.language.clone(),
            country: cfg.country.clone(),
        })
    }

    /// Point the backend at a different host (used by tests).
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    /// Free-text query for a stock, biased toward market coverage.
    pub fn query(stock: &Stock, period: &PeriodSpec) -> String {
        format!("{} stock when:{}", stock.name(), period.token)
    }

    fn search_url(&self, stock: &Stock, period: &PeriodSpec) -> Result<Url, FetchError> {
        let mut url = self.base_url.join("rss/search")?;
        url.query_pairs_mut()
            .append_pair("q", &Self::query(stock, period))
            .append_pair("hl", &self.language)
            .append_pair("gl", &self.country)
            .append_pair("ceid", &format!("{}:{}", self.country, self.language));
        Ok(url)
    }
}

impl NewsSource for GoogleNews {
    fn name(&self) -> &'static str {
        "google-news"
    }

    #[instrument(level = "info", skip_all, fields(stock = %stock, period = period.token))]
    async fn fetch(
        &self,
        stock: &Stock,
        period: &PeriodSpec,
        max_results: usize,
    ) -> Result<Vec<RawArticle>, FetchError> {
        let url = self.search_url(stock, period)?;
        debug!(%url, "Fetching Google News RSS");

        let response = check_status(self.client.get(url).send().await?)?;
        let body = response.text().await?;
        let articles = parse_feed(&body, max_results)?;

        info!(count = articles.len(), "Fetched Google News items");
        Ok(articles)
    }
}

/// Parse an RSS body into at most `max_results` records.
fn parse_feed(xml: &str, max_results: usize) -> Result<Vec<RawArticle>, FetchError> {
    let rss: Rss = quick_xml::de::from_str(xml)?;
    Ok(rss
        .channel
        .items
        .into_iter()
        .take(max_results)
        .map(Item::into_raw)
        .collect())
}

/// Flatten an HTML snippet to plain text with collapsed whitespace.
fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let text = fragment.root_element().text().collect::<Vec<_>>().join(" ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
