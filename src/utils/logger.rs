use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::time::SystemTime;

const RESET: &str = "\x1b[0m";
const BLUE: &str = "\x1b[34m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";

static LOGGER: Logger = Logger {};

/// Console backend for the `log` facade: `HH:MM:SS.mmm | LEVEL| message`.
pub struct Logger {}

impl Logger {
    /// Installs the logger as the global `log` backend.
    ///
    /// Fails if another backend was installed first.
    pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_logger(&LOGGER)?;
        log::set_max_level(level);
        Ok(())
    }

    fn get_timestamp() -> String {
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default();

        let secs = now.as_secs();
        let millis = now.subsec_millis();

        let hours = (secs / 3600) % 24;
        let minutes = (secs / 60) % 60;
        let seconds = secs % 60;

        format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
    }

    fn format_line(level: Level, message: &str) -> String {
        let (level_str, color) = match level {
            Level::Trace | Level::Debug => ("DEBUG", BLUE),
            Level::Info => ("INFO ", GREEN),
            Level::Warn => ("WARN ", YELLOW),
            Level::Error => ("ERROR", RED),
        };

        format!(
            "{} | {}{:5}{}| {}",
            Self::get_timestamp(),
            color,
            level_str,
            RESET,
            message
        )
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let line = Self::format_line(record.level(), &record.args().to_string());

        // Diagnostics go to stderr so stdout stays usable for reports.
        eprintln!("{}", line);
    }

    fn flush(&self) {}
}
