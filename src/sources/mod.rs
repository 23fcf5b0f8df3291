//! News backends and the decorators layered over them.
//!
//! Every backend implements [`NewsSource`]: given a stock and a resolved
//! period it returns up to `max_results` [`RawArticle`]s, mapping its own
//! wire format into common field names.
//!
//! # Supported Backends
//!
//! | Backend | Module | Method | Credentials |
//! |---------|--------|--------|-------------|
//! | Google News | [`google_news`] | RSS search feed | none |
//! | NewsAPI | [`newsapi`] | `/v2/everything` keyword + date range | API key |
//! | Google Custom Search | [`custom_search`] | site-restricted query | API key + engine id |
//!
//! # Decorators
//!
//! - [`retry::Retrying`]: exponential backoff on transient failures
//! - [`cache::Cached`]: bounded TTL cache keyed by (stock, period, max_results)
//!
//! Failures are returned as [`FetchError`] values; nothing here panics on a
//! bad response.

use crate::config::HttpCfg;
use crate::error::FetchError;
use crate::models::{RawArticle, Stock};
use crate::period::PeriodSpec;
use reqwest::{Client, Response};
use tracing::warn;

pub mod cache;
pub mod custom_search;
pub mod google_news;
pub mod newsapi;
pub mod retry;

/// A backend that can search news for one stock.
pub trait NewsSource {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Fetch at most `max_results` raw records about `stock` within `period`.
    async fn fetch(
        &self,
        stock: &Stock,
        period: &PeriodSpec,
        max_results: usize,
    ) -> Result<Vec<RawArticle>, FetchError>;
}

/// The backend selected at runtime.
#[derive(Debug)]
pub enum Backend {
    GoogleNews(google_news::GoogleNews),
    NewsApi(newsapi::NewsApi),
    CustomSearch(custom_search::CustomSearch),
}

impl NewsSource for Backend {
    fn name(&self) -> &'static str {
        match self {
            Backend::GoogleNews(s) => s.name(),
            Backend::NewsApi(s) => s.name(),
            Backend::CustomSearch(s) => s.name(),
        }
    }

    async fn fetch(
        &self,
        stock: &Stock,
        period: &PeriodSpec,
        max_results: usize,
    ) -> Result<Vec<RawArticle>, FetchError> {
        match self {
            Backend::GoogleNews(s) => s.fetch(stock, period, max_results).await,
            Backend::NewsApi(s) => s.fetch(stock, period, max_results).await,
            Backend::CustomSearch(s) => s.fetch(stock, period, max_results).await,
        }
    }
}

/// Build the shared HTTP client.
pub fn http_client(cfg: &HttpCfg) -> Result<Client, FetchError> {
    let client = Client::builder()
        .timeout(cfg.timeout())
        .user_agent(cfg.user_agent.clone())
        .build()?;
    Ok(client)
}

/// Turn a non-2xx response into [`FetchError::Status`]. The recorded url has
/// its query string removed.
pub(crate) fn check_status(response: Response) -> Result<Response, FetchError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        let mut url = response.url().clone();
        url.set_query(None);
        let url = url.to_string();
        warn!(status = status.as_u16(), %url, "Backend returned error status");
        Err(FetchError::Status {
            status: status.as_u16(),
            url,
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Helpers shared by backend tests.

    use crate::period::{resolve_at, PeriodSpec};
    use chrono::NaiveDate;

    pub fn one_month() -> PeriodSpec {
        resolve_at("1 Month", NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()).unwrap()
    }
}
