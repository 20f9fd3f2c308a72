mod client;
mod headers;
mod profile;
mod retry;
mod tests;
mod utils;

pub mod types;

// Re-export types for public use
pub use retry::{Sleeper, ThreadSleeper};
pub use types::*;

use crate::engine::SnapshotSource;
use crate::error::{Result, SubcountError};
use crate::services::log::{note, ActivityLogger, LogLevel};
use crate::types::SubscriberSnapshot;
use chrono::{DateTime, Local};
use reqwest::blocking::Client;
use reqwest::header::HeaderMap;
use retry::backoff_delay;
use url::Url;

/// Default attempt budget for one fetch.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Fetches community metadata from the public about endpoint.
///
/// Transport and status failures are retried with `2^attempt` units of backoff;
/// a response that arrives but doesn't parse fails immediately.
///
/// # Examples
/// ```no_run
/// use subcount::tools::fetch::{FetchOptions, RedditFetcher};
/// use subcount::SnapshotSource;
///
/// # fn example() -> subcount::Result<()> {
/// let fetcher = RedditFetcher::new(FetchOptions::default());
/// let snap = fetcher.fetch("rust", 3)?;
/// println!("{} subscribers", snap.subscriber_count);
/// # Ok(())
/// # }
/// ```
pub struct RedditFetcher {
    options: FetchOptions,
    sleeper: Box<dyn Sleeper>,
    logger: Option<ActivityLogger>,
}

impl RedditFetcher {
    pub fn new(options: FetchOptions) -> Self {
        Self {
            options,
            sleeper: Box::new(ThreadSleeper),
            logger: None,
        }
    }

    pub fn with_sleeper(mut self, sleeper: impl Sleeper + 'static) -> Self {
        self.sleeper = Box::new(sleeper);
        self
    }

    pub fn with_logger(mut self, logger: ActivityLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    fn fetch_with_retry(&self, community: &str, max_attempts: u32) -> Result<SubscriberSnapshot> {
        let max_attempts = max_attempts.max(1);
        let page_url = self.options.community_url(community);
        let data_url = self.options.about_url(community);
        let headers = headers::data_headers(self.options.policy, page_url.as_str());
        let client = client::build_client(&self.options)?;

        let mut attempt = 1u32;
        loop {
            if attempt == 1 && self.options.policy.warms_up() {
                self.warm_up(&client, &page_url, community);
                self.sleeper.sleep(self.options.backoff_unit);
            }

            let err = match try_once(&client, &data_url, headers.clone()) {
                Ok(body) => {
                    let snapshot = parse_snapshot(&body)?;
                    note(
                        self.logger.as_ref(),
                        LogLevel::Info,
                        community,
                        "fetch",
                        &format!(
                            "{} subscribers after {} attempt(s) via {}",
                            snapshot.subscriber_count,
                            attempt,
                            self.options.policy.name()
                        ),
                    );
                    return Ok(snapshot);
                }
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => e,
            };

            if attempt >= max_attempts {
                return Err(SubcountError::Retrieval {
                    attempts: attempt,
                    source: Box::new(err),
                });
            }

            let delay = backoff_delay(attempt, self.options.backoff_unit);
            note(
                self.logger.as_ref(),
                LogLevel::Error,
                community,
                "retry",
                &format!(
                    "attempt {}/{} failed: {}; sleeping {:?}",
                    attempt, max_attempts, err, delay
                ),
            );
            self.sleeper.sleep(delay);
            attempt += 1;
        }
    }

    /// Visit the community page so the cookie store picks up a session.
    ///
    /// Failures are logged and otherwise ignored; only the cookies matter.
    fn warm_up(&self, client: &Client, page_url: &Url, community: &str) {
        let result = client
            .get(page_url.clone())
            .headers(headers::warmup_headers())
            .send()
            .map_err(|e| e.to_string())
            .and_then(|resp| {
                let status = resp.status();
                resp.bytes().map_err(|e| e.to_string())?;
                utils::check_status(page_url.as_str(), status).map_err(|e| e.to_string())
            });
        if let Err(reason) = result {
            note(
                self.logger.as_ref(),
                LogLevel::Error,
                community,
                "warmup",
                &reason,
            );
        }
    }
}

impl SnapshotSource for RedditFetcher {
    fn name(&self) -> &'static str {
        "reddit-about"
    }

    fn fetch(&self, identifier: &str, max_attempts: u32) -> Result<SubscriberSnapshot> {
        self.fetch_with_retry(identifier, max_attempts)
    }
}

/// One data request: body text on 2xx, `HttpStatus`/`Transport` otherwise.
fn try_once(client: &Client, url: &Url, headers: HeaderMap) -> Result<String> {
    let resp = client
        .get(url.clone())
        .headers(headers)
        .send()
        .map_err(|e| SubcountError::transport(url.as_str(), e))?;

    utils::check_status(url.as_str(), resp.status())?;

    resp.text()
        .map_err(|e| SubcountError::transport(url.as_str(), e))
}

/// Pull `data.subscribers` and `data.created` out of an about.json body.
pub(crate) fn parse_snapshot(body: &str) -> Result<SubscriberSnapshot> {
    let about: AboutResponse = serde_json::from_str(body)?;
    let created_at = local_from_epoch(about.data.created)?;
    Ok(SubscriberSnapshot {
        subscriber_count: about.data.subscribers,
        created_at,
        fetched_at: Local::now(),
    })
}

fn local_from_epoch(secs: f64) -> Result<DateTime<Local>> {
    if !secs.is_finite() {
        return Err(SubcountError::MalformedResponse(format!(
            "created is not a finite number: {}",
            secs
        )));
    }
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::from_timestamp(whole as i64, nanos)
        .map(|utc| utc.with_timezone(&Local))
        .ok_or_else(|| {
            SubcountError::MalformedResponse(format!("created out of range: {}", secs))
        })
}
