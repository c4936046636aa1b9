use std::ffi::OsStr;
use std::str::FromStr;

use log::LevelFilter;
use simple_logger::SimpleLogger;

/// Environment variable selecting the log level.
pub const LOG_VAR: &str = "LC3_LOG";

const DEFAULT_LEVEL: LevelFilter = LevelFilter::Warn;

/// Install the logger. Must only be called once per process.
pub fn init() {
    let level = log_level();
    // Only fails if a logger is already installed, which leaves logging working anyway
    let _ = SimpleLogger::new()
        .with_level(level)
        .without_timestamps()
        .init();
}

/// Level named by `LC3_LOG`, falling back to warnings for anything unset or unparsable.
pub fn log_level() -> LevelFilter {
    var(LOG_VAR)
        .and_then(|v| LevelFilter::from_str(v.trim()).ok())
        .unwrap_or(DEFAULT_LEVEL)
}

fn var(name: impl AsRef<OsStr>) -> Option<String> {
    std::env::var(name.as_ref()).ok()
}
