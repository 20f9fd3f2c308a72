use super::{is_identifier, validate_table_name, RowSink};
use crate::config::{Settings, SinkConfig};
use crate::error::{Result, SubcountError};
use crate::types::{ColumnValue, Row};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const TOKEN_PATH: &str = "/oidc/v1/token";
const STATEMENTS_PATH: &str = "/api/2.0/sql/statements";
const WAIT_TIMEOUT: &str = "30s";
const HTTP_TIMEOUT_SECS: u64 = 60;

/// Appends rows through the Databricks SQL statement execution API.
///
/// Authenticates with OAuth client credentials and sends values as typed named
/// parameters, so nothing from the row is spliced into the SQL text.
pub struct DatabricksSink {
    config: SinkConfig,
    base_url: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Serialize)]
struct StatementRequest<'a> {
    warehouse_id: &'a str,
    statement: String,
    wait_timeout: &'static str,
    parameters: Vec<StatementParameter>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct StatementParameter {
    name: String,
    value: String,
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct StatementResponse {
    #[serde(default)]
    statement_id: Option<String>,
    status: StatementStatus,
}

#[derive(Debug, Deserialize)]
struct StatementStatus {
    state: String,
    #[serde(default)]
    error: Option<StatementError>,
}

#[derive(Debug, Deserialize)]
struct StatementError {
    #[serde(default)]
    message: Option<String>,
}

impl DatabricksSink {
    pub fn new(config: SinkConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| SubcountError::Client(format!("failed to build client: {}", e)))?;
        let base_url = format!("https://{}", config.host);
        Ok(Self {
            config,
            base_url,
            client,
        })
    }

    /// Point at a different workspace URL (scheme included).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn access_token(&self) -> Result<String> {
        let url = format!("{}{}", self.base_url, TOKEN_PATH);
        let resp = self
            .client
            .post(&url)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&[("grant_type", "client_credentials"), ("scope", "all-apis")])
            .send()
            .map_err(|e| SubcountError::sink(format!("token request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SubcountError::sink(format!(
                "token request rejected with status {}",
                status.as_u16()
            )));
        }
        let token: TokenResponse = resp
            .json()
            .map_err(|e| SubcountError::sink(format!("unreadable token response: {}", e)))?;
        Ok(token.access_token)
    }

    fn execute(&self, token: &str, request: &StatementRequest<'_>) -> Result<()> {
        let url = format!("{}{}", self.base_url, STATEMENTS_PATH);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(request)
            .send()
            .map_err(|e| SubcountError::sink(format!("statement request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(SubcountError::sink(format!(
                "statement rejected with status {}: {}",
                status.as_u16(),
                body.trim()
            )));
        }

        let parsed: StatementResponse = resp
            .json()
            .map_err(|e| SubcountError::sink(format!("unreadable statement response: {}", e)))?;
        check_state(&parsed)
    }
}

impl RowSink for DatabricksSink {
    fn name(&self) -> &'static str {
        "databricks-sql"
    }

    fn append_row(&self, table: &str, row: &Row) -> Result<()> {
        let (statement, parameters) = build_insert(table, row)?;
        let token = self.access_token()?;
        let request = StatementRequest {
            warehouse_id: &self.config.warehouse_id,
            statement,
            wait_timeout: WAIT_TIMEOUT,
            parameters,
        };
        self.execute(&token, &request)
    }
}

/// Builds a [`DatabricksSink`] on each append from settings captured at start-up.
///
/// Missing configuration therefore fails the append, not the whole invocation up front.
pub struct LazyDatabricksSink {
    settings: Settings,
}

impl LazyDatabricksSink {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }
}

impl RowSink for LazyDatabricksSink {
    fn name(&self) -> &'static str {
        "databricks-sql"
    }

    fn append_row(&self, table: &str, row: &Row) -> Result<()> {
        let config = self.settings.sink_config()?;
        DatabricksSink::new(config)?.append_row(table, row)
    }
}

/// `INSERT INTO t (a, b) VALUES (:a, :b)` plus one typed parameter per column.
fn build_insert(table: &str, row: &Row) -> Result<(String, Vec<StatementParameter>)> {
    validate_table_name(table)?;
    if row.is_empty() {
        return Err(SubcountError::sink("refusing to insert an empty row"));
    }

    let mut columns = Vec::with_capacity(row.0.len());
    let mut placeholders = Vec::with_capacity(row.0.len());
    let mut parameters = Vec::with_capacity(row.0.len());
    for (column, value) in &row.0 {
        if !is_identifier(column) {
            return Err(SubcountError::sink(format!("malformed column name: {:?}", column)));
        }
        columns.push(column.as_str());
        placeholders.push(format!(":{}", column));
        let (value, kind) = match value {
            ColumnValue::Int(n) => (n.to_string(), "BIGINT"),
            ColumnValue::Text(s) => (s.clone(), "STRING"),
        };
        parameters.push(StatementParameter {
            name: column.clone(),
            value,
            kind,
        });
    }

    let statement = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        columns.join(", "),
        placeholders.join(", ")
    );
    Ok((statement, parameters))
}

/// PENDING/RUNNING mean the insert was accepted but outlived the wait timeout.
fn check_state(resp: &StatementResponse) -> Result<()> {
    match resp.status.state.as_str() {
        "SUCCEEDED" | "PENDING" | "RUNNING" => Ok(()),
        state => {
            let message = resp
                .status
                .error
                .as_ref()
                .and_then(|e| e.message.as_deref())
                .unwrap_or("no error message");
            Err(SubcountError::sink(format!(
                "statement {} ended {}: {}",
                resp.statement_id.as_deref().unwrap_or("?"),
                state,
                message
            )))
        }
    }
}
