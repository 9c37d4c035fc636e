//! Stderr logger for the `log` facade.
//!
//! Human output: `HH:MM:SS LEVEL [target] message`
//! JSON output: one object per line with `ts`, `level`, `target`, `message`.
//!
//! Filter syntax (comma-separated, `!` negation, trailing `*` glob):
//!   "sweep::*"                : only sweep scopes
//!   "!sweep::exec"            : everything except sweep::exec
//!   "sweep,config"            : sweep OR config
//!   "!sweep::exec,!config::*" : exclude both

use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Colored, human-readable
    Human,
    /// One JSON object per line, machine-readable
    Json,
}

struct Settings {
    format: LogFormat,
    filter: Option<String>,
}

static SETTINGS: OnceLock<Settings> = OnceLock::new();

struct SweepLogger;

impl log::Log for SweepLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let Some(settings) = SETTINGS.get() else {
            return;
        };

        if let Some(filter) = &settings.filter {
            if !filter.is_empty() && filter != "*" && !matches_filter(filter, record.target()) {
                return;
            }
        }

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();

        match settings.format {
            LogFormat::Human => {
                let sec_of_day = now.as_secs() % 86400;
                let h = sec_of_day / 3600;
                let m = (sec_of_day % 3600) / 60;
                let s = sec_of_day % 60;
                eprintln!(
                    "{:02}:{:02}:{:02} {} [{}] {}",
                    h,
                    m,
                    s,
                    colored_level(record.level()),
                    record.target(),
                    record.args()
                );
            }
            LogFormat::Json => {
                let line = serde_json::json!({
                    "ts": now.as_secs_f64(),
                    "level": record.level().as_str(),
                    "target": record.target(),
                    "message": record.args().to_string(),
                });
                eprintln!("{line}");
            }
        }
    }

    fn flush(&self) {}
}

fn colored_level(level: log::Level) -> String {
    let code = match level {
        log::Level::Error => "31",
        log::Level::Warn => "33",
        log::Level::Info => "32",
        log::Level::Debug => "36",
        log::Level::Trace => "90",
    };
    format!("\x1b[{code}m{:<5}\x1b[0m", level.as_str())
}

/// Whether a log target such as `sweep::exec` or `config` falls under one
/// filter pattern: `*` takes everything, `sweep*` any target starting with
/// `sweep`, anything else must equal the target.
fn pattern_covers(pattern: &str, target: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => target.starts_with(prefix),
        None => !pattern.is_empty() && target == pattern,
    }
}

/// Decide whether `target` passes `filter` (`--log-filter`).
///
/// Any matching `!pattern` drops the record. Otherwise, if the filter names
/// at least one plain pattern, one of them has to match.
pub fn matches_filter(filter: &str, target: &str) -> bool {
    let patterns = filter.split(',').map(str::trim).filter(|p| !p.is_empty());

    let mut wanted = None;
    for pattern in patterns {
        match pattern.strip_prefix('!') {
            Some(excluded) if pattern_covers(excluded, target) => return false,
            Some(_) => {}
            None => {
                let hit = pattern_covers(pattern, target);
                wanted = Some(wanted.unwrap_or(false) || hit);
            }
        }
    }
    wanted.unwrap_or(true)
}

/// Map a `-v` count onto a level filter (0 = warn, 1 = info, 2 = debug, 3+ = trace).
pub fn level_for_verbosity(verbose: u8) -> log::LevelFilter {
    match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

static LOGGER: SweepLogger = SweepLogger;

/// Install the logger. Later calls only adjust the level.
pub fn init(level: log::LevelFilter, format: LogFormat, filter: Option<&str>) {
    let _ = SETTINGS.set(Settings {
        format,
        filter: filter.map(str::to_string),
    });
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(level);
}
