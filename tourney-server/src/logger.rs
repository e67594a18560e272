use std::io::{self, Write};

use chrono::Local;
use log::{set_logger, set_max_level, Level, LevelFilter, Log, Metadata, Record};

/// Installs the [`Logger`] as the global logger. Calling this more than once has no effect.
pub fn init(level: LevelFilter) {
    if set_logger(&Logger).is_ok() {
        set_max_level(level);
    }
}

#[derive(Copy, Clone, Debug)]
pub struct Logger;

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let now = Local::now().format("%Y-%m-%d %H:%M:%S");

        let level = match record.level() {
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        };

        // Errors while writing to stderr cannot be reported anywhere.
        let _ = writeln!(
            io::stderr().lock(),
            "[{}] [{}] [{}:{}] {}",
            now,
            level,
            record.target(),
            record.line().unwrap_or(0),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}
