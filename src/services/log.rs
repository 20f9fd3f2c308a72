use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LogLevel {
    Info,
    Error,
}

impl LogLevel {
    fn marker(&self) -> &'static str {
        match self {
            LogLevel::Info => "🟢",
            LogLevel::Error => "🔴",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub community: Option<String>,
    pub event: String,
    pub details: Option<String>,
}

/// Append-only activity log, one line per event.
#[derive(Debug, Clone)]
pub struct ActivityLogger {
    log_path: PathBuf,
}

impl ActivityLogger {
    /// Log to `~/.subcount/activity.log`.
    pub fn new() -> crate::Result<Self> {
        let user_dirs = directories::UserDirs::new().ok_or_else(|| {
            crate::SubcountError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "could not determine home directory",
            ))
        })?;
        Self::at(user_dirs.home_dir().join(".subcount").join("activity.log"))
    }

    /// Log to an explicit file, creating its parent directory.
    pub fn at(path: impl Into<PathBuf>) -> crate::Result<Self> {
        let log_path = path.into();
        if let Some(parent) = log_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(Self { log_path })
    }

    pub fn log(
        &self,
        level: LogLevel,
        community: Option<&str>,
        event: &str,
        details: Option<&str>,
    ) -> crate::Result<()> {
        let entry = LogEntry {
            timestamp: Utc::now(),
            level,
            community: community.map(|c| c.to_string()),
            event: event.to_string(),
            details: details.map(|d| d.to_string()),
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;

        let community_str = entry
            .community
            .as_deref()
            .map(|c| format!("r/{}", c))
            .unwrap_or_else(|| "*".to_string());
        let details_str = entry.details.as_deref().unwrap_or("");

        writeln!(
            file,
            "{} {} {} {} {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            entry.level.marker(),
            entry.event,
            community_str,
            details_str
        )?;

        Ok(())
    }

    pub fn read_logs(
        &self,
        community_filter: Option<&str>,
        errors_only: bool,
    ) -> crate::Result<Vec<String>> {
        if !self.log_path.exists() {
            return Ok(vec![]);
        }

        let file = fs::File::open(&self.log_path)?;
        let reader = BufReader::new(file);
        let mut matching_lines = Vec::new();
        let needle = community_filter.map(|c| format!(" r/{} ", c));

        for line in reader.lines() {
            let line = line?;

            if errors_only && !line.contains(LogLevel::Error.marker()) {
                continue;
            }

            if let Some(ref needle) = needle {
                if !line.contains(needle.as_str()) {
                    continue;
                }
            }

            matching_lines.push(line);
        }

        // Most recent first
        matching_lines.reverse();
        Ok(matching_lines)
    }

    pub fn info(
        &self,
        community: Option<&str>,
        event: &str,
        details: Option<&str>,
    ) -> crate::Result<()> {
        self.log(LogLevel::Info, community, event, details)
    }

    pub fn error(
        &self,
        community: Option<&str>,
        event: &str,
        details: Option<&str>,
    ) -> crate::Result<()> {
        self.log(LogLevel::Error, community, event, details)
    }
}

/// Best-effort logging for call sites where a broken log must not fail the run.
pub(crate) fn note(logger: Option<&ActivityLogger>, level: LogLevel, community: &str, event: &str, details: &str) {
    if let Some(logger) = logger {
        let _ = logger.log(level, Some(community), event, Some(details));
    }
}
