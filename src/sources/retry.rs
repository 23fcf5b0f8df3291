//! Exponential backoff retry around any [`NewsSource`].
//!
//! # Retry Strategy
//!
//! - Only transient failures are retried (see [`FetchError::is_transient`])
//! - Exponential backoff starting at `base_delay`
//! - Delay capped at `max_delay`
//! - Random jitter (0..=`max_jitter`) added to spread out retries
//!
//! ```text
//! delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter
//! ```

use super::NewsSource;
use crate::config::RetryCfg;
use crate::error::FetchError;
use crate::models::{RawArticle, Stock};
use crate::period::PeriodSpec;
use rand::{rng, Rng};
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, instrument, warn};

/// Decorator that retries transient failures of the wrapped source.
pub struct Retrying<S> {
    inner: S,
    max_retries: usize,
    base_delay: Duration,
    max_delay: Duration,
    max_jitter: Duration,
}

impl<S> Retrying<S>
where
    S: NewsSource,
{
    pub fn new(inner: S, max_retries: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: Duration::from_secs(30),
            max_jitter: Duration::from_millis(250),
        }
    }

    pub fn from_config(inner: S, cfg: &RetryCfg) -> Self {
        Self::new(inner, cfg.max_retries, Duration::from_millis(cfg.base_delay_ms))
            .with_max_delay(Duration::from_millis(cfg.max_delay_ms))
            .with_max_jitter(Duration::from_millis(cfg.max_jitter_ms))
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn with_max_jitter(mut self, max_jitter: Duration) -> Self {
        self.max_jitter = max_jitter;
        self
    }

    fn backoff(&self, attempt: usize) -> Duration {
        let exponent = u32::try_from(attempt.saturating_sub(1)).unwrap_or(u32::MAX).min(16);
        let delay = self.base_delay.saturating_mul(1 << exponent).min(self.max_delay);
        let jitter_ms = u64::try_from(self.max_jitter.as_millis()).unwrap_or(u64::MAX);
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rng().random_range(0..=jitter_ms))
        };
        delay + jitter
    }
}

impl<S> fmt::Debug for Retrying<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retrying")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .field("max_jitter", &self.max_jitter)
            .finish()
    }
}

impl<S> NewsSource for Retrying<S>
where
    S: NewsSource,
{
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    #[instrument(level = "debug", skip_all, fields(stock = %stock))]
    async fn fetch(
        &self,
        stock: &Stock,
        period: &PeriodSpec,
        max_results: usize,
    ) -> Result<Vec<RawArticle>, FetchError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.fetch(stock, period, max_results).await {
                Ok(articles) => return Ok(articles),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) => {
                    attempt += 1;
                    let elapsed_ms_attempt = attempt_t0.elapsed().as_millis();
                    let elapsed_ms_total = total_t0.elapsed().as_millis();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt,
                            elapsed_ms_total,
                            error = %e,
                            "fetch exhausted retries"
                        );
                        return Err(e);
                    }

                    let delay = self.backoff(attempt);
                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt,
                        elapsed_ms_total,
                        ?delay,
                        error = %e,
                        "fetch attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}
