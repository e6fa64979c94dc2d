// src/ring_buffer.rs
//! Ring buffer sink for bounded in-memory log capture.
//!
//! Keeps the most recent validation logs with FIFO eviction. Useful for
//! diagnostics endpoints and tests, and safe under floods of failed
//! validations: memory is fixed by entry count and per-entry byte cap.
//!
//! # Design Principles
//!
//! - **Bounded memory**: Fixed maximum size regardless of validation volume
//! - **FIFO eviction**: Oldest entries dropped first
//! - **Per-entry size caps**: No single message can dominate the buffer
//! - **RwLock-based**: Concurrent readers, exclusive writers
//!
//! # Example
//!
//! ```rust
//! use palisade_validation::{LogLevel, LogSink, RingBufferSink};
//!
//! let sink = RingBufferSink::new(100, 512, LogLevel::Informational);
//! sink.write(LogLevel::Warning, "IDX10204: no trust source");
//!
//! let recent = sink.get_recent(10);
//! assert_eq!(recent[0].message.as_ref(), "IDX10204: no trust source");
//! ```

use crate::{LogLevel, LogSink};
use std::borrow::Cow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{SystemTime, UNIX_EPOCH};

/// A single captured log line.
///
/// Uses Arc<str> so `get_recent()` clones are refcount increments.
#[derive(Clone, Debug)]
pub struct LogEntry {
    /// Unix timestamp of capture
    pub timestamp: u64,
    pub level: LogLevel,
    /// Rendered message, truncated to the entry cap
    pub message: Arc<str>,
    /// Stored payload size in bytes
    pub size_bytes: usize,
}

/// Fixed-size ring buffer with exact allocation (no growth).
struct RingBuffer {
    entries: Box<[Option<LogEntry>]>,
    /// Write position
    tail: usize,
    /// Oldest entry position
    head: usize,
    len: usize,
}

impl RingBuffer {
    fn new(capacity: usize) -> Self {
        Self {
            entries: std::iter::repeat_with(|| None)
                .take(capacity)
                .collect::<Box<[Option<LogEntry>]>>(),
            tail: 0,
            head: 0,
            len: 0,
        }
    }

    fn push(&mut self, entry: LogEntry) -> Option<LogEntry> {
        let evicted = self.entries[self.tail].replace(entry);
        self.tail = (self.tail + 1) % self.entries.len();

        if self.len < self.entries.len() {
            self.len += 1;
        } else {
            self.head = (self.head + 1) % self.entries.len();
        }

        evicted
    }

    fn iter(&self) -> impl DoubleEndedIterator<Item = &LogEntry> {
        let head = self.head;
        let cap = self.entries.len();

        (0..self.len).filter_map(move |i| self.entries[(head + i) % cap].as_ref())
    }

    fn clear(&mut self) {
        for entry in self.entries.iter_mut() {
            *entry = None;
        }
        self.head = 0;
        self.tail = 0;
        self.len = 0;
    }
}

/// [`LogSink`] that keeps the last `max_entries` lines in memory.
///
/// Clones share the same buffer.
#[derive(Clone)]
pub struct RingBufferSink {
    buffer: Arc<RwLock<RingBuffer>>,
    max_entries: usize,
    max_entry_bytes: usize,
    max_level: LogLevel,
    eviction_count: Arc<AtomicU64>,
}

impl RingBufferSink {
    /// Create a sink holding at most `max_entries` lines of `max_entry_bytes`
    /// each, accepting `max_level` and anything more severe.
    pub fn new(max_entries: usize, max_entry_bytes: usize, max_level: LogLevel) -> Self {
        let bounded_entries = max_entries.max(1);
        Self {
            buffer: Arc::new(RwLock::new(RingBuffer::new(bounded_entries))),
            max_entries: bounded_entries,
            max_entry_bytes,
            max_level,
            eviction_count: Arc::new(AtomicU64::new(0)),
        }
    }

    #[inline]
    fn read_buffer(&self) -> RwLockReadGuard<'_, RingBuffer> {
        match self.buffer.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[inline]
    fn write_buffer(&self) -> RwLockWriteGuard<'_, RingBuffer> {
        match self.buffer.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// The N most recent entries, newest first.
    pub fn get_recent(&self, count: usize) -> Vec<LogEntry> {
        let buffer = self.read_buffer();
        buffer.iter().rev().take(count).cloned().collect()
    }

    /// All entries, oldest first (emission order).
    pub fn get_all(&self) -> Vec<LogEntry> {
        let buffer = self.read_buffer();
        buffer.iter().cloned().collect()
    }

    /// Entries matching a predicate, oldest first.
    pub fn get_filtered<F>(&self, predicate: F) -> Vec<LogEntry>
    where
        F: Fn(&LogEntry) -> bool,
    {
        let buffer = self.read_buffer();
        buffer.iter().filter(|e| predicate(e)).cloned().collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.read_buffer().len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total stored payload bytes.
    pub fn payload_bytes(&self) -> usize {
        let buffer = self.read_buffer();
        buffer.iter().map(|e| e.size_bytes).sum()
    }

    /// Number of entries evicted since creation.
    #[inline]
    pub fn eviction_count(&self) -> u64 {
        self.eviction_count.load(Ordering::Relaxed)
    }

    pub fn clear(&self) {
        self.write_buffer().clear();
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.max_entries
    }
}

impl LogSink for RingBufferSink {
    fn is_level_enabled(&self, level: LogLevel) -> bool {
        level <= self.max_level
    }

    fn write(&self, level: LogLevel, message: &str) {
        let message = truncate_to_bytes(message, self.max_entry_bytes);
        let entry = LogEntry {
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_or(0, |d| d.as_secs()),
            level,
            size_bytes: message.len(),
            message: Arc::from(message.as_ref()),
        };

        if self.write_buffer().push(entry).is_some() {
            self.eviction_count.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Truncate to at most `max_bytes`, respecting UTF-8 boundaries.
fn truncate_to_bytes(s: &str, max_bytes: usize) -> Cow<'_, str> {
    if s.len() <= max_bytes {
        return Cow::Borrowed(s);
    }

    let mut idx = max_bytes;
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }

    Cow::Borrowed(&s[..idx])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_capture() {
        let sink = RingBufferSink::new(10, 1024, LogLevel::Verbose);
        sink.write(LogLevel::Informational, "IDX10236: Issuer Validated.Issuer: 'a'");

        assert_eq!(sink.len(), 1);
        let entries = sink.get_all();
        assert_eq!(entries[0].level, LogLevel::Informational);
        assert!(entries[0].message.contains("'a'"));
    }

    #[test]
    fn fifo_eviction() {
        let sink = RingBufferSink::new(3, 1024, LogLevel::Verbose);
        for i in 0..5 {
            sink.write(LogLevel::Warning, &format!("line {}", i));
        }

        assert_eq!(sink.len(), 3);
        assert_eq!(sink.eviction_count(), 2);

        let all = sink.get_all();
        assert_eq!(all[0].message.as_ref(), "line 2");
        assert_eq!(all[2].message.as_ref(), "line 4");

        let recent = sink.get_recent(1);
        assert_eq!(recent[0].message.as_ref(), "line 4");
    }

    #[test]
    fn entry_size_is_capped() {
        let sink = RingBufferSink::new(4, 64, LogLevel::Verbose);
        sink.write(LogLevel::Error, &"X".repeat(10_000));
        assert!(sink.payload_bytes() <= 64);
    }

    #[test]
    fn level_gate() {
        let sink = RingBufferSink::new(4, 64, LogLevel::Warning);
        assert!(sink.is_level_enabled(LogLevel::Critical));
        assert!(!sink.is_level_enabled(LogLevel::Informational));
    }

    #[test]
    fn clones_share_storage() {
        let sink = RingBufferSink::new(4, 64, LogLevel::Verbose);
        let other = sink.clone();
        other.write(LogLevel::Verbose, "shared");
        assert_eq!(sink.len(), 1);

        sink.clear();
        assert!(other.is_empty());
    }

    #[test]
    fn filtered_by_level() {
        let sink = RingBufferSink::new(8, 64, LogLevel::Verbose);
        sink.write(LogLevel::Warning, "w");
        sink.write(LogLevel::Informational, "i");
        sink.write(LogLevel::Warning, "w2");

        let warnings = sink.get_filtered(|e| e.level == LogLevel::Warning);
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn truncation_respects_utf8() {
        let s = "é".repeat(10);
        let cut = truncate_to_bytes(&s, 5);
        assert_eq!(cut.len(), 4);
    }
}
