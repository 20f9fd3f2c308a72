//! Fetch Policies
//!
//! Each policy fixes the request signature and session handling used against the about endpoint:
//! - `Plain` → one identifying User-Agent, no warm-up, library default timeout
//! - `Hardened` → desktop Chrome header set, cookie warm-up on the first attempt, 10s per request

use serde::{Deserialize, Serialize};
use std::time::Duration;

const HARDENED_TIMEOUT_SECS: u64 = 10;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum FetchPolicy {
    /// Identify honestly with a short User-Agent
    Plain,

    /// Look like an interactive browser session
    #[default]
    Hardened,
}

impl FetchPolicy {
    /// Fetch Policy Name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Plain => "Plain",
            Self::Hardened => "Hardened (Chrome)",
        }
    }

    /// Whether the first attempt visits the community page to collect cookies.
    pub fn warms_up(&self) -> bool {
        matches!(self, Self::Hardened)
    }

    /// Per-request timeout; `None` keeps the HTTP library default.
    pub fn request_timeout(&self) -> Option<Duration> {
        match self {
            Self::Plain => None,
            Self::Hardened => Some(Duration::from_secs(HARDENED_TIMEOUT_SECS)),
        }
    }
}
