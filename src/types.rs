use crate::error::{Result, SubcountError};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Format used for every human-facing and warehouse timestamp.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Community used when the caller names none.
pub const DEFAULT_COMMUNITY: &str = "Overemployed";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Community(pub String);

impl Community {
    /// Build a Community from raw user text (CLI, API callers, etc.)
    ///
    /// Strips surrounding whitespace, one leading `/` and one leading `r/` routing marker.
    pub fn from_raw(raw: &str) -> Result<Self> {
        let name = raw.trim();
        let name = name.strip_prefix('/').unwrap_or(name);
        let name = match name.get(..2) {
            Some(prefix) if prefix.eq_ignore_ascii_case("r/") => &name[2..],
            _ => name,
        };
        let name = name.trim_end_matches('/');

        if name.is_empty() || name.contains('/') || name.chars().any(char::is_whitespace) {
            return Err(SubcountError::InvalidCommunity(raw.to_string()));
        }
        Ok(Community(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Community {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "r/{}", self.0)
    }
}

/// Point-in-time subscriber count for one community.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriberSnapshot {
    pub subscriber_count: u64,
    pub created_at: DateTime<Local>,
    pub fetched_at: DateTime<Local>,
}

impl SubscriberSnapshot {
    /// Row appended to the warehouse table for this snapshot.
    ///
    /// Counts past `i64::MAX` don't fit a BIGINT column and are refused.
    pub fn to_row(&self) -> Result<Row> {
        let count = i64::try_from(self.subscriber_count).map_err(|_| {
            SubcountError::sink(format!(
                "membership_count {} does not fit a BIGINT column",
                self.subscriber_count
            ))
        })?;
        Ok(Row::new()
            .with("membership_count", ColumnValue::Int(count))
            .with(
                "as_of_date",
                ColumnValue::Text(self.fetched_at.format(TIMESTAMP_FORMAT).to_string()),
            )
            .with(
                "created_date",
                ColumnValue::Text(self.created_at.format(TIMESTAMP_FORMAT).to_string()),
            ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnValue {
    Int(i64),
    Text(String),
}

/// Ordered column name → value pairs handed to a sink.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row(pub Vec<(String, ColumnValue)>);

impl Row {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn with(mut self, column: &str, value: ColumnValue) -> Self {
        self.0.push((column.to_string(), value));
        self
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Render a count with `,` thousands separators.
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
