//! The news aggregation pipeline.
//!
//! # Algorithm
//!
//! 1. Resolve the period label and validate the request (fails fast with
//!    [`ConfigError`] before any network call)
//! 2. Fetch each stock in order with at most `concurrency` requests in
//!    flight, each under a per-fetch timeout; a cancelled token skips the
//!    stocks that have not started yet
//! 3. Normalize every record and record a per-stock [`StockOutcome`]
//! 4. Deduplicate by url (title when an article has no url), first wins
//! 5. Stable sort, newest first, undated and unparseable dates last
//!
//! A failing stock contributes zero articles and never aborts the batch.

use crate::error::{ConfigError, FetchError};
use crate::models::{Article, FailureEntry, OutcomeSummary, RawArticle, Report, ResultSet, Stock};
use crate::normalize::normalize;
use crate::period::{self, PeriodSpec};
use crate::sources::NewsSource;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use std::cmp::Ordering;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Upper bound on `max_results` accepted by every backend.
pub const MAX_RESULTS_LIMIT: usize = 100;

/// Receives one notification per stock, in completion order.
pub trait ProgressObserver {
    /// `completed` counts up from 1 to `total`.
    fn on_stock_complete(&self, completed: usize, total: usize, stock: &Stock);
}

impl<F> ProgressObserver for F
where
    F: Fn(usize, usize, &Stock),
{
    fn on_stock_complete(&self, completed: usize, total: usize, stock: &Stock) {
        self(completed, total, stock)
    }
}

/// What happened to one stock's fetch.
#[derive(Debug)]
pub enum StockStatus {
    /// The backend returned this many records.
    Succeeded(usize),
    /// The backend answered but had nothing.
    Empty,
    Failed(FetchError),
    /// Skipped or aborted because the run was cancelled.
    Cancelled,
}

#[derive(Debug)]
pub struct StockOutcome {
    pub stock: Stock,
    pub status: StockStatus,
}

/// Result of one pipeline run.
#[derive(Debug)]
pub struct Aggregation {
    pub period: PeriodSpec,
    pub articles: ResultSet,
    /// One entry per requested stock, in request order.
    pub outcomes: Vec<StockOutcome>,
}

impl Aggregation {
    pub fn summary(&self) -> OutcomeSummary {
        let mut summary = OutcomeSummary::default();
        for outcome in &self.outcomes {
            match outcome.status {
                StockStatus::Succeeded(count) => {
                    summary.succeeded += 1;
                    summary.fetched += count;
                }
                StockStatus::Empty => summary.empty += 1,
                StockStatus::Failed(_) => summary.failed += 1,
                StockStatus::Cancelled => summary.cancelled += 1,
            }
        }
        summary
    }

    pub fn failures(&self) -> impl Iterator<Item = (&Stock, &FetchError)> {
        self.outcomes.iter().filter_map(|o| match &o.status {
            StockStatus::Failed(e) => Some((&o.stock, e)),
            _ => None,
        })
    }

    pub fn report(&self) -> Report<'_> {
        Report {
            generated_at: Utc::now(),
            period: &self.period,
            summary: self.summary(),
            failures: self
                .failures()
                .map(|(stock, e)| FailureEntry {
                    stock,
                    error: e.to_string(),
                })
                .collect(),
            articles: &self.articles,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Maximum fetches in flight; 1 keeps requests strictly sequential.
    pub concurrency: usize,
    pub fetch_timeout: Duration,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            fetch_timeout: Duration::from_secs(60),
        }
    }
}

enum Fetched {
    Records(Vec<RawArticle>),
    Failed(FetchError),
    Cancelled,
}

/// Fetches, normalizes and merges news for a set of stocks.
#[derive(Debug)]
pub struct Pipeline<S> {
    source: S,
    options: PipelineOptions,
}

impl<S> Pipeline<S>
where
    S: NewsSource,
{
    pub fn new(source: S, options: PipelineOptions) -> Self {
        Self { source, options }
    }

    /// Aggregate news for `stocks` over the period named by `period_label`.
    pub async fn aggregate<P>(
        &self,
        stocks: &[Stock],
        period_label: &str,
        max_results: usize,
        observer: &P,
        cancel: &CancellationToken,
    ) -> Result<Aggregation, ConfigError>
    where
        P: ProgressObserver + ?Sized,
    {
        let period = period::resolve(period_label)?;
        self.aggregate_period(stocks, period, max_results, observer, cancel)
            .await
    }

    /// Same as [`Pipeline::aggregate`] with an already resolved period.
    #[instrument(level = "info", skip_all, fields(stocks = stocks.len(), period = %period.period))]
    pub async fn aggregate_period<P>(
        &self,
        stocks: &[Stock],
        period: PeriodSpec,
        max_results: usize,
        observer: &P,
        cancel: &CancellationToken,
    ) -> Result<Aggregation, ConfigError>
    where
        P: ProgressObserver + ?Sized,
    {
        validate_max_results(max_results)?;
        if self.options.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }

        let t0 = Instant::now();
        let total = stocks.len();
        info!(
            source = self.source.name(),
            total,
            max_results,
            concurrency = self.options.concurrency,
            from = %period.start,
            to = %period.end,
            "Starting aggregation"
        );

        let mut fetches = stream::iter(stocks)
            .map(|stock| self.fetch_stock(stock, &period, max_results, cancel))
            .buffered(self.options.concurrency);

        let mut accumulated: Vec<Article> = Vec::new();
        let mut outcomes = Vec::with_capacity(total);
        let mut completed = 0;

        while let Some((stock, fetched)) = fetches.next().await {
            completed += 1;
            let status = match fetched {
                Fetched::Records(records) if records.is_empty() => {
                    info!(%stock, "No articles found");
                    StockStatus::Empty
                }
                Fetched::Records(records) => {
                    let count = records.len();
                    accumulated.extend(records.iter().map(|raw| normalize(stock, raw)));
                    debug!(%stock, count, "Normalized articles");
                    StockStatus::Succeeded(count)
                }
                Fetched::Failed(e) => {
                    warn!(%stock, error = %e, "Fetch failed; continuing with remaining stocks");
                    StockStatus::Failed(e)
                }
                Fetched::Cancelled => StockStatus::Cancelled,
            };
            observer.on_stock_complete(completed, total, stock);
            outcomes.push(StockOutcome {
                stock: stock.clone(),
                status,
            });
        }
        drop(fetches);

        let articles = build_result_set(accumulated);
        let aggregation = Aggregation {
            period,
            articles,
            outcomes,
        };

        let summary = aggregation.summary();
        info!(
            fetched = summary.fetched,
            unique = aggregation.articles.len(),
            succeeded = summary.succeeded,
            empty = summary.empty,
            failed = summary.failed,
            cancelled = summary.cancelled,
            elapsed_ms = t0.elapsed().as_millis(),
            "Aggregation complete"
        );
        Ok(aggregation)
    }

    async fn fetch_stock<'a>(
        &'a self,
        stock: &'a Stock,
        period: &'a PeriodSpec,
        max_results: usize,
        cancel: &'a CancellationToken,
    ) -> (&'a Stock, Fetched) {
        if cancel.is_cancelled() {
            debug!(%stock, "Skipping stock; run cancelled");
            return (stock, Fetched::Cancelled);
        }

        let timeout = self.options.fetch_timeout;
        let fetch = tokio::time::timeout(timeout, self.source.fetch(stock, period, max_results));
        let fetched = tokio::select! {
            _ = cancel.cancelled() => Fetched::Cancelled,
            result = fetch => match result {
                Ok(Ok(records)) => Fetched::Records(records),
                Ok(Err(e)) => Fetched::Failed(e),
                Err(_) => Fetched::Failed(FetchError::Timeout(timeout)),
            },
        };
        (stock, fetched)
    }
}

/// Reject `max_results` outside `1..=MAX_RESULTS_LIMIT`.
pub fn validate_max_results(max_results: usize) -> Result<(), ConfigError> {
    if (1..=MAX_RESULTS_LIMIT).contains(&max_results) {
        Ok(())
    } else {
        Err(ConfigError::MaxResults {
            got: max_results,
            max: MAX_RESULTS_LIMIT,
        })
    }
}

#[derive(Debug, PartialEq, Eq, Hash)]
enum DedupKey {
    Url(String),
    Title(Option<String>),
}

fn dedup_key(article: &Article) -> DedupKey {
    match &article.url {
        Some(url) => DedupKey::Url(url.clone()),
        None => DedupKey::Title(article.title.clone()),
    }
}

/// Deduplicate and sort accumulated articles.
pub fn build_result_set(articles: Vec<Article>) -> ResultSet {
    let mut unique = dedup_articles(articles);
    sort_newest_first(&mut unique);
    ResultSet::from_sorted(unique)
}

/// Keep the first article per url; articles without a url are keyed by title.
pub fn dedup_articles(articles: Vec<Article>) -> Vec<Article> {
    articles.into_iter().unique_by(dedup_key).collect()
}

/// Stable sort by publication time, newest first. Articles without a parsed
/// timestamp go last in their original order.
pub fn sort_newest_first(articles: &mut [Article]) {
    articles.sort_by(|a, b| match (a.published.timestamp(), b.published.timestamp()) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Published;
    use chrono::TimeZone;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    enum Behavior {
        Records(Vec<RawArticle>),
        Fail(u16),
        Slow(Duration, Vec<RawArticle>),
    }

    #[derive(Default)]
    struct FakeSource {
        behaviors: HashMap<String, Behavior>,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl FakeSource {
        fn with(mut self, stock: &str, behavior: Behavior) -> Self {
            self.behaviors.insert(stock.to_string(), behavior);
            self
        }
    }

    impl NewsSource for FakeSource {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn fetch(
            &self,
            stock: &Stock,
            _period: &PeriodSpec,
            max_results: usize,
        ) -> Result<Vec<RawArticle>, FetchError> {
            self.calls.fetch_add(1, AtomicOrdering::SeqCst);
            let now = self.in_flight.fetch_add(1, AtomicOrdering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, AtomicOrdering::SeqCst);

            let result = match self.behaviors.get(stock.name()) {
                Some(Behavior::Records(records)) => {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    Ok(records.iter().take(max_results).cloned().collect())
                }
                Some(Behavior::Fail(status)) => Err(FetchError::Status {
                    status: *status,
                    url: format!("http://fake/{}", stock.name()),
                }),
                Some(Behavior::Slow(delay, records)) => {
                    tokio::time::sleep(*delay).await;
                    Ok(records.clone())
                }
                None => Ok(Vec::new()),
            };

            self.in_flight.fetch_sub(1, AtomicOrdering::SeqCst);
            result
        }
    }

    struct NoProgress;

    impl ProgressObserver for NoProgress {
        fn on_stock_complete(&self, _completed: usize, _total: usize, _stock: &Stock) {}
    }

    fn raw(title: &str, url: Option<&str>, published: Option<&str>) -> RawArticle {
        RawArticle {
            title: Some(title.to_string()),
            url: url.map(str::to_string),
            publisher: Some("Test Wire".to_string()),
            published: published.map(str::to_string),
            description: None,
        }
    }

    fn stocks(names: &[&str]) -> Vec<Stock> {
        names.iter().map(|n| Stock::new(*n)).collect()
    }

    fn article(title: &str, url: Option<&str>, published: Published) -> Article {
        Article {
            stock: Stock::new("TCS"),
            title: Some(title.to_string()),
            url: url.map(str::to_string),
            publisher: None,
            published,
            description: None,
        }
    }

    fn at(day: u32) -> Published {
        Published::Timestamp(Utc.with_ymd_and_hms(2024, 3, day, 0, 0, 0).unwrap())
    }

    fn titles(result: &ResultSet) -> Vec<&str> {
        result.iter().map(|a| a.title.as_deref().unwrap_or("")).collect()
    }

    #[tokio::test]
    async fn test_infosys_wipro_scenario() {
        let source = FakeSource::default()
            .with(
                "Infosys",
                Behavior::Records(vec![
                    raw("Infosys wins deal", Some("https://ex.com/infy"), Some("March 5, 2024")),
                    raw("Infosys wins big deal", Some("https://ex.com/infy"), Some("March 6, 2024")),
                ]),
            )
            .with("Wipro", Behavior::Records(Vec::new()));
        let pipeline = Pipeline::new(source, PipelineOptions::default());

        let progress = RefCell::new(Vec::new());
        let observer = |completed: usize, total: usize, stock: &Stock| {
            progress
                .borrow_mut()
                .push((completed, total, stock.name().to_string()));
        };

        let result = pipeline
            .aggregate(
                &stocks(&["Infosys", "Wipro"]),
                "1 Month",
                30,
                &observer,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(result.articles.len(), 1);
        let only = &result.articles.as_slice()[0];
        assert_eq!(only.stock.name(), "Infosys");
        assert_eq!(only.title.as_deref(), Some("Infosys wins deal"));
        assert_eq!(
            *progress.borrow(),
            vec![(1, 2, "Infosys".to_string()), (2, 2, "Wipro".to_string())]
        );

        let summary = result.summary();
        assert_eq!(summary.fetched, 2);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.empty, 1);
        assert_eq!(summary.failed, 0);
    }

    #[tokio::test]
    async fn test_failing_stock_is_isolated() {
        let source = FakeSource::default()
            .with("TCS", Behavior::Records(vec![raw("TCS a", Some("https://ex.com/tcs"), None)]))
            .with("ITC", Behavior::Fail(500))
            .with("NTPC", Behavior::Records(vec![raw("NTPC a", Some("https://ex.com/ntpc"), None)]));
        let pipeline = Pipeline::new(source, PipelineOptions::default());

        let result = pipeline
            .aggregate(
                &stocks(&["TCS", "ITC", "NTPC"]),
                "3 Months",
                10,
                &NoProgress,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(titles(&result.articles), vec!["TCS a", "NTPC a"]);
        let summary = result.summary();
        assert_eq!(summary.fetched, 2);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);

        let failures: Vec<_> = result.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0.name(), "ITC");
        assert!(matches!(failures[0].1, FetchError::Status { status: 500, .. }));
        assert!(matches!(result.outcomes[1].status, StockStatus::Failed(_)));
    }

    #[tokio::test]
    async fn test_slow_fetch_times_out_without_aborting_batch() {
        let source = FakeSource::default()
            .with(
                "ONGC",
                Behavior::Slow(Duration::from_secs(5), vec![raw("late", Some("https://ex.com/late"), None)]),
            )
            .with("BPCL", Behavior::Records(vec![raw("BPCL a", Some("https://ex.com/bpcl"), None)]));
        let options = PipelineOptions {
            concurrency: 1,
            fetch_timeout: Duration::from_millis(50),
        };
        let pipeline = Pipeline::new(source, options);

        let result = pipeline
            .aggregate(&stocks(&["ONGC", "BPCL"]), "1 Month", 10, &NoProgress, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(titles(&result.articles), vec!["BPCL a"]);
        assert!(matches!(
            result.outcomes[0].status,
            StockStatus::Failed(FetchError::Timeout(_))
        ));
    }

    #[tokio::test]
    async fn test_cancelled_before_start_fetches_nothing() {
        let pipeline = Pipeline::new(FakeSource::default(), PipelineOptions::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let progress = RefCell::new(0);
        let observer = |_: usize, _: usize, _: &Stock| *progress.borrow_mut() += 1;
        let result = pipeline
            .aggregate(&stocks(&["TCS", "ITC"]), "1 Month", 10, &observer, &cancel)
            .await
            .unwrap();

        assert_eq!(pipeline.source.calls.load(AtomicOrdering::SeqCst), 0);
        assert_eq!(result.summary().cancelled, 2);
        assert_eq!(*progress.borrow(), 2);
        assert!(result.articles.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_between_stocks() {
        let source = FakeSource::default()
            .with("TCS", Behavior::Records(vec![raw("TCS a", Some("https://ex.com/tcs"), None)]))
            .with("ITC", Behavior::Records(vec![raw("ITC a", Some("https://ex.com/itc"), None)]));
        let pipeline = Pipeline::new(source, PipelineOptions::default());
        let cancel = CancellationToken::new();
        let observer = |completed: usize, _: usize, _: &Stock| {
            if completed == 1 {
                cancel.cancel();
            }
        };

        let result = pipeline
            .aggregate(&stocks(&["TCS", "ITC"]), "1 Month", 10, &observer, &cancel)
            .await
            .unwrap();

        assert_eq!(titles(&result.articles), vec!["TCS a"]);
        assert!(matches!(result.outcomes[1].status, StockStatus::Cancelled));
        assert_eq!(pipeline.source.calls.load(AtomicOrdering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded_and_order_preserved() {
        let names = ["A", "B", "C", "D", "E", "F"];
        let mut source = FakeSource::default();
        for (i, name) in names.iter().enumerate() {
            let url = format!("https://ex.com/{name}");
            source = source.with(
                name,
                Behavior::Slow(
                    Duration::from_millis(30 - 4 * i as u64),
                    vec![raw(name, Some(&url), None)],
                ),
            );
        }
        let options = PipelineOptions {
            concurrency: 2,
            fetch_timeout: Duration::from_secs(5),
        };
        let pipeline = Pipeline::new(source, options);

        let progress = RefCell::new(Vec::new());
        let observer = |completed: usize, _: usize, _: &Stock| progress.borrow_mut().push(completed);
        let result = pipeline
            .aggregate(&stocks(&names), "6 Months", 10, &observer, &CancellationToken::new())
            .await
            .unwrap();

        assert!(pipeline.source.max_in_flight.load(AtomicOrdering::SeqCst) <= 2);
        assert_eq!(titles(&result.articles), names.to_vec());
        assert_eq!(*progress.borrow(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[tokio::test]
    async fn test_invalid_inputs_fail_before_fetching() {
        let pipeline = Pipeline::new(FakeSource::default(), PipelineOptions::default());
        let cancel = CancellationToken::new();
        let list = stocks(&["TCS"]);

        let err = pipeline
            .aggregate(&list, "2 Weeks", 10, &NoProgress, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownPeriod(_)));

        let err = pipeline
            .aggregate(&list, "1 Month", 0, &NoProgress, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::MaxResults { got: 0, .. }));

        let err = pipeline
            .aggregate(&list, "1 Month", 101, &NoProgress, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::MaxResults { got: 101, .. }));

        let zero = Pipeline::new(
            FakeSource::default(),
            PipelineOptions {
                concurrency: 0,
                ..PipelineOptions::default()
            },
        );
        let err = zero
            .aggregate(&list, "1 Month", 10, &NoProgress, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::ZeroConcurrency));

        assert_eq!(pipeline.source.calls.load(AtomicOrdering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_stock_list() {
        let pipeline = Pipeline::new(FakeSource::default(), PipelineOptions::default());
        let result = pipeline
            .aggregate(&[], "1 Month", 10, &NoProgress, &CancellationToken::new())
            .await
            .unwrap();
        assert!(result.articles.is_empty());
        assert_eq!(result.summary().total(), 0);
    }

    #[test]
    fn test_dedup_keeps_first_url() {
        let deduped = dedup_articles(vec![
            article("first", Some("https://ex.com/1"), Published::Absent),
            article("second", Some("https://ex.com/1"), Published::Absent),
            article("third", Some("https://ex.com/2"), Published::Absent),
        ]);
        let t: Vec<_> = deduped.iter().map(|a| a.title.as_deref().unwrap()).collect();
        assert_eq!(t, vec!["first", "third"]);
    }

    #[test]
    fn test_dedup_falls_back_to_title() {
        let deduped = dedup_articles(vec![
            article("same", None, Published::Absent),
            article("same", None, at(2)),
            article("other", None, Published::Absent),
        ]);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].published, Published::Absent);
    }

    #[test]
    fn test_urlless_articles_are_not_collapsed_together() {
        let deduped = dedup_articles(vec![
            article("linked", Some("https://ex.com/1"), Published::Absent),
            article("no link a", None, Published::Absent),
            article("no link b", None, Published::Absent),
        ]);
        assert_eq!(deduped.len(), 3);
    }

    #[test]
    fn test_sort_is_newest_first_and_stable() {
        let result = build_result_set(vec![
            article("undated 1", Some("u1"), Published::Absent),
            article("old", Some("u2"), at(1)),
            article("garbled", Some("u3"), Published::Unparsed("N/A".to_string())),
            article("new a", Some("u4"), at(9)),
            article("new b", Some("u5"), at(9)),
            article("mid", Some("u6"), at(5)),
            article("undated 2", Some("u7"), Published::Absent),
        ]);
        assert_eq!(
            titles(&result),
            vec!["new a", "new b", "mid", "old", "undated 1", "garbled", "undated 2"]
        );
    }

    #[test]
    fn test_report_lists_failures() {
        let aggregation = Aggregation {
            period: crate::sources::testing::one_month(),
            articles: ResultSet::default(),
            outcomes: vec![
                StockOutcome {
                    stock: Stock::new("ITC"),
                    status: StockStatus::Failed(FetchError::Timeout(Duration::from_secs(1))),
                },
                StockOutcome {
                    stock: Stock::new("TCS"),
                    status: StockStatus::Empty,
                },
            ],
        };
        let report = aggregation.report();
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].stock.name(), "ITC");
        assert_eq!(report.summary.empty, 1);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["period"]["token"], "1m");
        assert!(json["generated_at"].as_str().is_some());
    }
}
