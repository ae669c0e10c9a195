//! Logging setup
//!
//! Log lines go to stdout and, optionally, to a log file inside the output
//! directory. Both sinks use the `[<timestamp>] <message>` line format.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Name of the log file written inside the output directory
pub const LOG_FILE_NAME: &str = "_crawl.log";

/// Local-time timestamp in brackets, e.g. `[2024-05-01 12:00:00,123]`
#[derive(Debug, Clone, Copy, Default)]
pub struct BracketedTime;

impl FormatTime for BracketedTime {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        write!(
            w,
            "[{}]",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S,%3f")
        )
    }
}

/// Filter directives for a verbosity level
pub fn filter_directives(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "sumi_harvest=info,warn",
        1 => "sumi_harvest=debug,info",
        2 => "sumi_harvest=trace,debug",
        _ => "trace",
    }
}

/// Installs the global subscriber
///
/// When `log_file` is given, its parent directory is created and lines are
/// appended to it. Installing twice is a no-op.
pub fn init_logging(verbose: u8, quiet: bool, log_file: Option<&Path>) -> io::Result<()> {
    let file_layer = match log_file {
        Some(path) => {
            let file = open_log_file(path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_timer(BracketedTime)
                    .with_target(false)
                    .with_level(false),
            )
        }
        None => None,
    };

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_timer(BracketedTime)
        .with_target(false)
        .with_level(false)
        .with_thread_ids(false)
        .with_file(false);

    let _ = tracing_subscriber::registry()
        .with(EnvFilter::new(filter_directives(verbose, quiet)))
        .with(stdout_layer)
        .with(file_layer)
        .try_init();

    Ok(())
}

fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    OpenOptions::new().create(true).append(true).open(path)
}
