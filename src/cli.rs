use crate::config::Settings;
use crate::engine::{Engine, EngineOptions};
use crate::services::log::{note, ActivityLogger, LogLevel};
use crate::tools::fetch::{ApiHost, FetchOptions, FetchPolicy, RedditFetcher, DEFAULT_MAX_ATTEMPTS};
use crate::tools::sink::LazyDatabricksSink;
use crate::types::{Community, DEFAULT_COMMUNITY};
use clap::error::ErrorKind;
use clap::Parser;
use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "subcount",
    version,
    about = "Print a community's subscriber count, optionally appending it to a warehouse table"
)]
pub struct Cli {
    /// Community name, with or without a leading r/
    #[arg(default_value = DEFAULT_COMMUNITY)]
    pub community: String,

    /// Attempts before giving up on transport/status errors
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_attempts: u32,

    /// Request signature: plain User-Agent, or browser headers with a cookie warm-up
    #[arg(long, value_enum, default_value_t = FetchPolicy::Hardened)]
    pub policy: FetchPolicy,

    /// Per-request timeout in seconds, replacing the policy's own
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Public host to query
    #[arg(long, value_enum, default_value_t = ApiHost::Www)]
    pub host: ApiHost,

    /// Override the API base URL (proxies, local testing)
    #[arg(long, hide = true)]
    pub base_url: Option<String>,

    /// Fully-qualified table to append the snapshot to (needs DATABRICKS_* variables)
    #[arg(long)]
    pub table: Option<String>,

    /// Activity log file (default: ~/.subcount/activity.log)
    #[arg(long)]
    pub log: Option<PathBuf>,
}

pub fn run() -> ExitCode {
    let settings = Settings::from_env();
    let mut stdout = std::io::stdout();
    ExitCode::from(run_from(std::env::args_os(), &settings, &mut stdout))
}

/// Parse `args` and run. Usage errors become one line on `out` and status 1;
/// `--help`/`--version` print as usual and succeed.
pub fn run_from<I, T>(args: I, settings: &Settings, out: &mut dyn Write) -> u8
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match Cli::try_parse_from(args) {
        Ok(cli) => run_with(cli, settings, out),
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            0
        }
        Err(e) => {
            let rendered = e.to_string();
            let first = rendered.lines().next().unwrap_or_default();
            let message = first.strip_prefix("error: ").unwrap_or(first);
            let _ = writeln!(out, "Error parsing arguments: {}", message);
            1
        }
    }
}

/// Run one invocation, writing every user-facing line to `out`. Returns the exit status.
pub fn run_with(cli: Cli, settings: &Settings, out: &mut dyn Write) -> u8 {
    let logger = match &cli.log {
        Some(path) => ActivityLogger::at(path).ok(),
        None => ActivityLogger::new().ok(),
    };

    let community = match Community::from_raw(&cli.community) {
        Ok(c) => c,
        Err(e) => {
            let label = raw_label(&cli.community);
            note(
                logger.as_ref(),
                LogLevel::Error,
                label.trim_start_matches("r/"),
                "error",
                &e.to_string(),
            );
            let _ = writeln!(out, "Error fetching data for {}: {}", label, e);
            return 1;
        }
    };

    let options = match &cli.base_url {
        Some(base) => FetchOptions::new(cli.policy).with_base_url(base),
        None => Ok(FetchOptions::new(cli.policy).with_host(cli.host)),
    };
    let options = match options {
        Ok(o) => match cli.timeout {
            Some(secs) => o.with_request_timeout(Some(Duration::from_secs(secs))),
            None => o,
        },
        Err(e) => {
            let _ = writeln!(out, "Error fetching data for {}: {}", community, e);
            return 1;
        }
    };

    let mut fetcher = RedditFetcher::new(options);
    if let Some(logger) = &logger {
        fetcher = fetcher.with_logger(logger.clone());
    }
    let sink = LazyDatabricksSink::new(settings.clone());

    let opts = EngineOptions {
        max_attempts: cli.max_attempts,
        table: cli.table.clone(),
    };
    let mut engine = Engine::new(&fetcher, opts).with_sink(&sink);
    if let Some(logger) = &logger {
        engine = engine.with_logger(logger);
    }

    match engine.run(&community, out) {
        Ok(_) => 0,
        Err(e) => {
            let _ = writeln!(out, "Error fetching data for {}: {}", community, e);
            1
        }
    }
}

/// `r/`-prefixed form of input that didn't normalize, without doubling a prefix already typed.
fn raw_label(raw: &str) -> String {
    let name = raw.trim();
    let name = name.strip_prefix('/').unwrap_or(name);
    match name.get(..2) {
        Some(prefix) if prefix.eq_ignore_ascii_case("r/") => format!("r/{}", &name[2..]),
        _ => format!("r/{}", name),
    }
}
