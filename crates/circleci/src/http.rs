//! Retry and pagination combinators shared by every CircleCI accessor.

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use pipeline_core::config::CircleCiConfig;

use crate::error::CiError;

/// Fixed-count retry with linear backoff (`base_delay * attempt`).
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn from_config(config: &CircleCiConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.retry_base_delay_ms),
        )
    }

    /// Delay after the given (1-based) failed attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(2000))
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or the
/// attempts are used up. The last error is returned as-is so it keeps the path and status.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    path: &str,
    mut operation: F,
) -> Result<T, CiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CiError>>,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if !err.is_retryable() => return Err(err),
            Err(err) if attempt >= policy.max_attempts => {
                warn!(
                    "Giving up on {} after {} attempts: {}",
                    path, attempt, err
                );
                return Err(err);
            }
            Err(err) => {
                let delay = policy.delay_for(attempt);
                warn!(
                    "Request {} failed (attempt {}/{}), retrying in {:?}: {}",
                    path, attempt, policy.max_attempts, delay, err
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// One page of a cursor-paginated listing.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Follow `next_page_token` until it is exhausted or `max_records` items were collected.
///
/// A token that was already requested ends the walk, so a misbehaving server cannot loop us.
pub async fn fetch_all_pages<T, F, Fut>(
    path: &str,
    max_records: usize,
    mut fetch_page: F,
) -> Result<Vec<T>, CiError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>, CiError>>,
{
    let mut items = Vec::new();
    let mut seen_tokens = HashSet::new();
    let mut token: Option<String> = None;
    let mut pages = 0;

    loop {
        let page = fetch_page(token.take()).await?;
        pages += 1;
        items.extend(page.items);

        if items.len() >= max_records {
            if items.len() > max_records || page.next_page_token.is_some() {
                warn!(
                    "Listing {} reached the {} record cap, remaining pages skipped",
                    path, max_records
                );
            }
            items.truncate(max_records);
            break;
        }

        match page.next_page_token.filter(|t| !t.is_empty()) {
            Some(next) if !seen_tokens.insert(next.clone()) => {
                warn!("Listing {} returned a repeated page token, stopping", path);
                break;
            }
            Some(next) => token = Some(next),
            None => break,
        }
    }

    debug!("Fetched {} records from {} in {} page(s)", items.len(), path, pages);
    Ok(items)
}
