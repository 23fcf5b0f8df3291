//! Bounded time-to-live cache in front of a [`NewsSource`].
//!
//! Entries are keyed by `(stock, period, max_results)` and expire `ttl` after
//! they were stored. Expired entries are dropped when looked up; when
//! `capacity` is reached the least recently used entry is evicted. A capacity
//! of zero disables caching. Failed fetches are never cached.

use super::NewsSource;
use crate::config::CacheCfg;
use crate::error::FetchError;
use crate::models::{RawArticle, Stock};
use crate::period::{Period, PeriodSpec};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    stock: Stock,
    period: Period,
    max_results: usize,
}

/// Stored-at time and the fetched records.
type Entry = (Instant, Vec<RawArticle>);

/// Decorator that memoizes successful fetches for `ttl`.
#[derive(Debug)]
pub struct Cached<S> {
    inner: S,
    ttl: Duration,
    cache: Option<Mutex<LruCache<CacheKey, Entry>>>,
}

impl<S> Cached<S>
where
    S: NewsSource,
{
    pub fn new(inner: S, ttl: Duration, capacity: usize) -> Self {
        Self {
            inner,
            ttl,
            cache: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
        }
    }

    pub fn from_config(inner: S, cfg: &CacheCfg) -> Self {
        Self::new(inner, Duration::from_secs(cfg.ttl_secs), cfg.capacity)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.cache
            .as_ref()
            .and_then(|c| c.lock().ok().map(|c| c.len()))
            .unwrap_or(0)
    }

    fn lookup(&self, key: &CacheKey) -> Option<Vec<RawArticle>> {
        let mut cache = self.cache.as_ref()?.lock().ok()?;
        match cache.get(key) {
            Some((stored_at, articles)) if stored_at.elapsed() < self.ttl => {
                return Some(articles.clone());
            }
            Some(_) => {}
            None => return None,
        }
        // expired
        cache.pop(key);
        None
    }

    fn store(&self, key: CacheKey, articles: &[RawArticle]) {
        let Some(cache) = self.cache.as_ref() else {
            return;
        };
        if let Ok(mut cache) = cache.lock() {
            cache.put(key, (Instant::now(), articles.to_vec()));
        }
    }
}

impl<S> NewsSource for Cached<S>
where
    S: NewsSource,
{
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn fetch(
        &self,
        stock: &Stock,
        period: &PeriodSpec,
        max_results: usize,
    ) -> Result<Vec<RawArticle>, FetchError> {
        let key = CacheKey {
            stock: stock.clone(),
            period: period.period,
            max_results,
        };

        if let Some(hit) = self.lookup(&key) {
            debug!(%stock, count = hit.len(), "Cache hit");
            return Ok(hit);
        }

        let articles = self.inner.fetch(stock, period, max_results).await?;
        self.store(key, &articles);
        Ok(articles)
    }
}
