use crate::log::{log_level::LogLevel, log_sink::LogSink};

use std::io::{self, Write};
use std::time::{SystemTime, UNIX_EPOCH};

/// Sink that writes every message to stderr, one line each.
#[derive(Debug, Clone, Default)]
pub struct ConsoleLogSink;

impl LogSink for ConsoleLogSink {
    fn log(&self, level: LogLevel, msg: &str, target: &'static str) {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let mut err = io::stderr().lock();
        let _ = writeln!(err, "[{millis}] [{}] {target}: {msg}", level.as_str());
    }
}
