//! Deferred logging for validation steps.
//!
//! Validators never write to a logger directly. They record [`LogDetails`]
//! (a level plus an unrendered [`MessageDetails`]) on the result they return,
//! in the order the events happened. Whoever owns the result decides where the
//! logs go by handing a [`LogSink`] to `emit_logs`.
//!
//! # Properties
//!
//! - The sink is asked `is_level_enabled` before any message is rendered
//! - A disabled level costs one virtual call and no formatting
//! - Rendered fields are truncated to [`MAX_FIELD_OUTPUT_LEN`] bytes before
//!   they reach `tracing`, with a visible indicator

use crate::MessageDetails;
use std::borrow::Cow;
use std::fmt;

/// Maximum length for any individual field in formatted output (DoS prevention)
pub const MAX_FIELD_OUTPUT_LEN: usize = 1024;

/// Truncation indicator appended to truncated strings
pub const TRUNCATION_INDICATOR: &str = "...[TRUNCATED]";

/// Event severity, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    /// Always written, regardless of configured level.
    LogAlways,
    Critical,
    Error,
    Warning,
    Informational,
    Verbose,
}

impl LogLevel {
    /// Stable label for structured output.
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LogAlways => "LogAlways",
            Self::Critical => "Critical",
            Self::Error => "Error",
            Self::Warning => "Warning",
            Self::Informational => "Informational",
            Self::Verbose => "Verbose",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Destination for rendered validation logs.
pub trait LogSink: Send + Sync {
    /// Whether `level` would be written. Queried before rendering.
    fn is_level_enabled(&self, level: LogLevel) -> bool;

    /// Write an already-rendered message.
    fn write(&self, level: LogLevel, message: &str);
}

/// A log event waiting to be written.
///
/// Immutable after construction and owned by the result that recorded it.
#[derive(Debug, Clone)]
pub struct LogDetails {
    level: LogLevel,
    message: MessageDetails,
}

impl LogDetails {
    /// Pair a message with its severity.
    #[inline]
    pub fn new(message: MessageDetails, level: LogLevel) -> Self {
        Self { level, message }
    }

    #[inline]
    pub const fn level(&self) -> LogLevel {
        self.level
    }

    #[inline]
    pub const fn message(&self) -> &MessageDetails {
        &self.message
    }

    /// Write to `sink` if it accepts this level. Returns whether it was written.
    pub fn emit(&self, sink: &dyn LogSink) -> bool {
        if !sink.is_level_enabled(self.level) {
            return false;
        }
        sink.write(self.level, self.message.render());
        true
    }
}

/// [`LogSink`] that forwards to the `tracing` macros.
///
/// `LogAlways` and `Critical` map to `ERROR`, `Informational` to `INFO`,
/// `Verbose` to `DEBUG`.
#[derive(Debug, Clone, Copy)]
pub struct TracingSink {
    max_level: LogLevel,
}

impl TracingSink {
    /// Sink that writes everything at `max_level` or more severe.
    #[inline]
    pub const fn new(max_level: LogLevel) -> Self {
        Self { max_level }
    }
}

impl Default for TracingSink {
    fn default() -> Self {
        Self::new(LogLevel::Informational)
    }
}

impl LogSink for TracingSink {
    fn is_level_enabled(&self, level: LogLevel) -> bool {
        level <= self.max_level
    }

    fn write(&self, level: LogLevel, message: &str) {
        let message = truncate_with_indicator(message);
        match level {
            LogLevel::LogAlways | LogLevel::Critical | LogLevel::Error => {
                tracing::error!(target: "palisade_validation", event_level = %level, "{}", message)
            }
            LogLevel::Warning => {
                tracing::warn!(target: "palisade_validation", event_level = %level, "{}", message)
            }
            LogLevel::Informational => {
                tracing::info!(target: "palisade_validation", event_level = %level, "{}", message)
            }
            LogLevel::Verbose => {
                tracing::debug!(target: "palisade_validation", event_level = %level, "{}", message)
            }
        }
    }
}

/// Truncate a string for display to prevent DoS via extremely long messages.
///
/// Returns a Cow<str> to avoid allocation when no truncation is needed.
pub fn truncate_with_indicator(s: &str) -> Cow<'_, str> {
    if s.len() <= MAX_FIELD_OUTPUT_LEN {
        return Cow::Borrowed(s);
    }

    let max_content_len = MAX_FIELD_OUTPUT_LEN.saturating_sub(TRUNCATION_INDICATOR.len());

    let mut idx = max_content_len;
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }

    if idx == 0 {
        return Cow::Borrowed(TRUNCATION_INDICATOR);
    }

    let mut result = String::with_capacity(idx + TRUNCATION_INDICATOR.len());
    result.push_str(&s[..idx]);
    result.push_str(TRUNCATION_INDICATOR);
    Cow::Owned(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MessageArg, definitions};
    use std::sync::Mutex;

    struct RecordingSink {
        max_level: LogLevel,
        queried: Mutex<Vec<LogLevel>>,
        written: Mutex<Vec<(LogLevel, String)>>,
    }

    impl RecordingSink {
        fn new(max_level: LogLevel) -> Self {
            Self {
                max_level,
                queried: Mutex::new(Vec::new()),
                written: Mutex::new(Vec::new()),
            }
        }
    }

    impl LogSink for RecordingSink {
        fn is_level_enabled(&self, level: LogLevel) -> bool {
            self.queried.lock().unwrap().push(level);
            level <= self.max_level
        }

        fn write(&self, level: LogLevel, message: &str) {
            self.written.lock().unwrap().push((level, message.to_string()));
        }
    }

    fn validated(issuer: &'static str) -> LogDetails {
        LogDetails::new(
            MessageDetails::new(&definitions::IDX10236, [MessageArg::text(issuer)]),
            LogLevel::Informational,
        )
    }

    #[test]
    fn levels_order_by_severity() {
        assert!(LogLevel::Critical < LogLevel::Warning);
        assert!(LogLevel::Verbose > LogLevel::Informational);
        assert_eq!(LogLevel::Warning.to_string(), "Warning");
    }

    #[test]
    fn disabled_level_is_not_rendered() {
        let sink = RecordingSink::new(LogLevel::Warning);
        let log = validated("iss");

        assert!(!log.emit(&sink));
        assert!(!log.message().is_rendered());
        assert_eq!(*sink.queried.lock().unwrap(), vec![LogLevel::Informational]);
        assert!(sink.written.lock().unwrap().is_empty());
    }

    #[test]
    fn enabled_level_writes_rendered_text() {
        let sink = RecordingSink::new(LogLevel::Verbose);
        let log = validated("iss");

        assert!(log.emit(&sink));
        let written = sink.written.lock().unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].0, LogLevel::Informational);
        assert_eq!(written[0].1, "IDX10236: Issuer Validated.Issuer: 'iss'");
    }

    #[test]
    fn tracing_sink_respects_max_level() {
        let sink = TracingSink::new(LogLevel::Warning);
        assert!(sink.is_level_enabled(LogLevel::Error));
        assert!(sink.is_level_enabled(LogLevel::Warning));
        assert!(!sink.is_level_enabled(LogLevel::Informational));
        // No subscriber installed: writing must still be harmless.
        sink.write(LogLevel::Error, "IDX10205: test");
    }

    #[test]
    fn truncate_ascii() {
        let s = "a".repeat(MAX_FIELD_OUTPUT_LEN + 10);
        let truncated = truncate_with_indicator(&s);
        assert!(truncated.len() <= MAX_FIELD_OUTPUT_LEN);
        assert!(truncated.ends_with(TRUNCATION_INDICATOR));
    }

    #[test]
    fn no_truncate_when_under_limit() {
        let truncated = truncate_with_indicator("short string");
        assert!(matches!(truncated, Cow::Borrowed(_)));
    }

    #[test]
    fn truncate_utf8_boundary() {
        let s = "й".repeat(MAX_FIELD_OUTPUT_LEN);
        let truncated = truncate_with_indicator(&s);
        assert!(truncated.len() <= MAX_FIELD_OUTPUT_LEN);
        assert!(truncated.ends_with(TRUNCATION_INDICATOR));
    }

    #[test]
    fn exactly_at_limit() {
        let s = "a".repeat(MAX_FIELD_OUTPUT_LEN);
        let truncated = truncate_with_indicator(&s);
        assert!(matches!(truncated, Cow::Borrowed(_)));
        assert_eq!(truncated.len(), MAX_FIELD_OUTPUT_LEN);
    }
}
