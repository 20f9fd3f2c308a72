//! Sink Tools
//!
//! Append-only tabular destinations for snapshots.

mod databricks;

pub use databricks::{DatabricksSink, LazyDatabricksSink};

use crate::error::{Result, SubcountError};
use crate::types::Row;

/// Append one row to a named table. Implementations do not retry.
pub trait RowSink {
    fn name(&self) -> &'static str;
    fn append_row(&self, table: &str, row: &Row) -> Result<()>;
}

const MAX_TABLE_PARTS: usize = 3;

/// Accept `table`, `schema.table` or `catalog.schema.table` made of `[A-Za-z0-9_]`.
pub(crate) fn validate_table_name(table: &str) -> Result<()> {
    let parts: Vec<&str> = table.split('.').collect();
    let well_formed = parts.len() <= MAX_TABLE_PARTS
        && parts.iter().all(|p| is_identifier(p));
    if well_formed {
        Ok(())
    } else {
        Err(SubcountError::sink(format!("malformed table name: {:?}", table)))
    }
}

pub(crate) fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
