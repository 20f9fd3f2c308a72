use crate::error::Result;
use crate::services::log::{note, ActivityLogger, LogLevel};
use crate::tools::fetch::DEFAULT_MAX_ATTEMPTS;
use crate::tools::sink::RowSink;
use crate::types::*;
use std::io::Write;

/// Anything that can produce a snapshot for a community name.
pub trait SnapshotSource {
    fn name(&self) -> &'static str;
    fn fetch(&self, identifier: &str, max_attempts: u32) -> Result<SubscriberSnapshot>;
}

#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub max_attempts: u32,
    /// Fully-qualified table to append to; `None` skips the sink.
    pub table: Option<String>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            table: None,
        }
    }
}

/// One invocation: fetch, report, optionally append.
pub struct Engine<'a> {
    pub source: &'a dyn SnapshotSource,
    pub sink: Option<&'a dyn RowSink>,
    pub logger: Option<&'a ActivityLogger>,
    pub opts: EngineOptions,
}

impl<'a> Engine<'a> {
    pub fn new(source: &'a dyn SnapshotSource, opts: EngineOptions) -> Self {
        Self {
            source,
            sink: None,
            logger: None,
            opts,
        }
    }

    pub fn with_sink(mut self, sink: &'a dyn RowSink) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_logger(mut self, logger: &'a ActivityLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Fetch and print the two report lines, then hand the row to the sink.
    ///
    /// The report is written before the sink runs, so it stays on `out` even if the sink fails.
    pub fn run(&self, community: &Community, out: &mut dyn Write) -> anyhow::Result<SubscriberSnapshot> {
        let snapshot = match self.source.fetch(community.as_str(), self.opts.max_attempts) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                note(
                    self.logger,
                    LogLevel::Error,
                    community.as_str(),
                    "fetch",
                    &format!("{} failed: {}", self.source.name(), e),
                );
                return Err(e.into());
            }
        };

        writeln!(
            out,
            "{} has {} members",
            community,
            format_count(snapshot.subscriber_count)
        )?;
        writeln!(
            out,
            "Subreddit created on: {}",
            snapshot.created_at.format(TIMESTAMP_FORMAT)
        )?;

        if let Some(table) = self.opts.table.as_deref() {
            let sink = self.sink.ok_or_else(|| {
                crate::SubcountError::sink(format!("no sink configured for table {}", table))
            })?;
            match snapshot.to_row().and_then(|row| sink.append_row(table, &row)) {
                Ok(()) => note(
                    self.logger,
                    LogLevel::Info,
                    community.as_str(),
                    "sink",
                    &format!(
                        "appended {} snapshot to {} via {}",
                        self.source.name(),
                        table,
                        sink.name()
                    ),
                ),
                Err(e) => {
                    note(self.logger, LogLevel::Error, community.as_str(), "sink", &e.to_string());
                    return Err(e.into());
                }
            }
        }

        Ok(snapshot)
    }
}
