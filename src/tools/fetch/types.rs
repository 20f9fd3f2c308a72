use crate::error::{Result, SubcountError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

pub use super::profile::FetchPolicy;

const WWW_BASE: &str = "https://www.reddit.com/";
const OLD_BASE: &str = "https://old.reddit.com/";
const DEFAULT_BACKOFF_UNIT: Duration = Duration::from_secs(1);

/// Which public host serves the about endpoint.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ApiHost {
    #[default]
    Www,
    /// Legacy host, blocked less often.
    Old,
}

impl ApiHost {
    pub fn base_url(&self) -> Url {
        let raw = match self {
            Self::Www => WWW_BASE,
            Self::Old => OLD_BASE,
        };
        Url::parse(raw).expect("static base url")
    }
}

/// Everything a fetcher needs besides the community name.
///
/// # Examples
/// ```
/// use subcount::tools::fetch::{ApiHost, FetchOptions, FetchPolicy};
///
/// let opts = FetchOptions::new(FetchPolicy::Plain).with_host(ApiHost::Old);
/// assert_eq!(opts.base_url.as_str(), "https://old.reddit.com/");
/// assert!(opts.request_timeout.is_none());
/// ```
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub policy: FetchPolicy,
    pub base_url: Url,
    /// One "time unit": the warm-up pause, and the base of the 2, 4, 8, … backoff.
    pub backoff_unit: Duration,
    pub request_timeout: Option<Duration>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self::new(FetchPolicy::default())
    }
}

impl FetchOptions {
    pub fn new(policy: FetchPolicy) -> Self {
        Self {
            policy,
            base_url: ApiHost::default().base_url(),
            backoff_unit: DEFAULT_BACKOFF_UNIT,
            request_timeout: policy.request_timeout(),
        }
    }

    pub fn with_host(mut self, host: ApiHost) -> Self {
        self.base_url = host.base_url();
        self
    }

    pub fn with_base_url(mut self, raw: &str) -> Result<Self> {
        self.base_url = Url::parse(raw).map_err(|e| SubcountError::Client(format!("invalid base url {}: {}", raw, e)))?;
        if self.base_url.cannot_be_a_base() {
            return Err(SubcountError::Client(format!("invalid base url {}", raw)));
        }
        Ok(self)
    }

    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    /// Override the policy's per-request timeout; `None` keeps the HTTP library default.
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// `{base}/r/{community}/` — the human-facing page.
    pub fn community_url(&self, community: &str) -> Url {
        self.url_for(&["r", community, ""])
    }

    /// `{base}/r/{community}/about.json` — the metadata endpoint.
    pub fn about_url(&self, community: &str) -> Url {
        self.url_for(&["r", community, "about.json"])
    }

    fn url_for(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        url.set_query(None);
        url.set_fragment(None);
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

/// Shape of `about.json`; only the fields we read.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AboutResponse {
    pub data: AboutData,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AboutData {
    pub subscribers: u64,
    /// Seconds since the Unix epoch; the API sends a float.
    pub created: f64,
}
