//! Environment-backed settings, read once at process start.

use crate::error::{Result, SubcountError};

pub const HOST_VAR: &str = "DATABRICKS_SERVER_HOSTNAME";
pub const CLIENT_ID_VAR: &str = "DATABRICKS_CLIENT_ID";
pub const CLIENT_SECRET_VAR: &str = "DATABRICKS_CLIENT_SECRET";
pub const HTTP_PATH_VAR: &str = "DATABRICKS_HTTP_PATH";

/// Raw warehouse settings; any of them may be missing until the sink is used.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub host: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub http_path: Option<String>,
}

/// Complete sink configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkConfig {
    pub host: String,
    pub client_id: String,
    pub client_secret: String,
    pub warehouse_id: String,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any variable lookup; blank values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Self {
            host: get(HOST_VAR),
            client_id: get(CLIENT_ID_VAR),
            client_secret: get(CLIENT_SECRET_VAR),
            http_path: get(HTTP_PATH_VAR),
        }
    }

    /// Validate into a [`SinkConfig`]; the warehouse id is the last segment of the HTTP path.
    pub fn sink_config(&self) -> Result<SinkConfig> {
        let host = required(&self.host, HOST_VAR)?;
        let host = host
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/')
            .to_string();
        let client_id = required(&self.client_id, CLIENT_ID_VAR)?.to_string();
        let client_secret = required(&self.client_secret, CLIENT_SECRET_VAR)?.to_string();
        let http_path = required(&self.http_path, HTTP_PATH_VAR)?;
        let warehouse_id = http_path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                SubcountError::sink(format!("{} has no warehouse id: {}", HTTP_PATH_VAR, http_path))
            })?
            .to_string();

        Ok(SinkConfig {
            host,
            client_id,
            client_secret,
            warehouse_id,
        })
    }
}

fn required<'a>(value: &'a Option<String>, var: &str) -> Result<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| SubcountError::sink(format!("missing environment variable {}", var)))
}
