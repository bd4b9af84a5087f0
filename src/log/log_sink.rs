use crate::log::log_level::LogLevel;

/// Defines a destination (sink) for log messages.
///
/// This trait acts as an interface for concrete logging backends, such as
/// console output or file storage.
///
/// Implementations must be `Send` and `Sync` so that the pipeline workers can
/// share one sink across threads.
pub trait LogSink: Send + Sync {
    /// Records a log message.
    ///
    /// # Arguments
    ///
    /// * `level` - The severity level of the log message.
    /// * `msg` - The content of the log message.
    /// * `target` - The static source of the log (e.g., module path).
    fn log(&self, level: LogLevel, msg: &str, target: &'static str);
}

/// Sink that swallows every message.
///
/// The zero-cost choice for tests and for hosts that wire their own sink in
/// later; handing `Arc<NoopLogSink>` to a pipeline keeps all logging paths
/// compiled but silent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NoopLogSink;

impl LogSink for NoopLogSink {
    fn log(&self, _: LogLevel, _: &str, _: &'static str) {}
}
