//! Drainable session log.
//!
//! The log is shared by every thread that emits a record. It either writes
//! straight to a stream (stdout, stderr, or a file opened for write) or
//! accumulates records in a bounded in-memory FIFO that external code drains
//! through [`Logger::has_entries`] and [`Logger::pop`]. Logging never fails
//! and never grows without bound.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, Write};
use std::time::SystemTime;

use chrono::{DateTime, Local};
use parking_lot::Mutex;

use crate::Fault;

/// Records held in buffered mode before the oldest are dropped.
pub const MEMORY_LOG_CAPACITY: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
    Critical,
}

impl LogLevel {
    pub fn name(self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone)]
pub struct LogRecord {
    pub timestamp: SystemTime,
    pub level: LogLevel,
    pub text: String,
}

enum Sink {
    Stream(Box<dyn Write + Send>),
    Memory {
        records: VecDeque<LogRecord>,
        capacity: usize,
        // True while overflow is dropping records; keeps the truncation
        // marker at the head from being inserted more than once.
        truncating: bool,
    },
}

pub struct Logger {
    sink: Mutex<Sink>,
}

impl Logger {
    /// Open a logger for the given destination: `"stdout"`, `"stderr"`, any
    /// filesystem path (created for write), or `None` for in-memory
    /// buffering at the default capacity.
    pub fn open(path: Option<&str>) -> Result<Self, Fault> {
        match path {
            None => Ok(Self::in_memory(MEMORY_LOG_CAPACITY)),
            Some("stdout") => Ok(Self::stream(Box::new(io::stdout()))),
            Some("stderr") => Ok(Self::stream(Box::new(io::stderr()))),
            Some(path) => {
                let file = File::create(path)?;
                Ok(Self::stream(Box::new(file)))
            }
        }
    }

    /// Buffered logger holding at most `capacity` records.
    pub fn in_memory(capacity: usize) -> Self {
        Self {
            sink: Mutex::new(Sink::Memory {
                records: VecDeque::with_capacity(capacity.max(2)),
                capacity: capacity.max(2),
                truncating: false,
            }),
        }
    }

    fn stream(writer: Box<dyn Write + Send>) -> Self {
        Self {
            sink: Mutex::new(Sink::Stream(writer)),
        }
    }

    /// Append one record. Thread-safe, never fails; write errors on stream
    /// sinks are swallowed since there is nowhere left to report them.
    pub fn log(&self, level: LogLevel, file: &str, line: u32, text: &str) {
        let now = SystemTime::now();
        let mut sink = self.sink.lock();
        match &mut *sink {
            Sink::Stream(writer) => {
                let stamp: DateTime<Local> = now.into();
                let _ = writeln!(
                    writer,
                    "{} [{}] {}:{} - {}",
                    stamp.format("%Y-%m-%d %H:%M:%S"),
                    level,
                    file,
                    line,
                    text
                );
                let _ = writer.flush();
            }
            Sink::Memory {
                records,
                capacity,
                truncating,
            } => {
                if records.len() >= *capacity {
                    if *truncating {
                        // Marker stays pinned at the head; evict the oldest
                        // real record behind it.
                        records.remove(1);
                    } else {
                        records.pop_front();
                        records.pop_front();
                        records.push_front(LogRecord {
                            timestamp: now,
                            level: LogLevel::Warn,
                            text: "log buffer full, oldest records dropped".into(),
                        });
                        *truncating = true;
                    }
                }
                records.push_back(LogRecord {
                    timestamp: now,
                    level,
                    text: text.to_string(),
                });
            }
        }
    }

    /// True when buffered records are waiting to be drained. Always false
    /// for stream sinks.
    pub fn has_entries(&self) -> bool {
        match &*self.sink.lock() {
            Sink::Stream(_) => false,
            Sink::Memory { records, .. } => !records.is_empty(),
        }
    }

    /// Remove and return the oldest buffered record. `None` for stream
    /// sinks or an empty buffer.
    pub fn pop(&self) -> Option<(LogLevel, String)> {
        match &mut *self.sink.lock() {
            Sink::Stream(_) => None,
            Sink::Memory {
                records, truncating, ..
            } => {
                let record = records.pop_front()?;
                if records.is_empty() {
                    *truncating = false;
                }
                Some((record.level, record.text))
            }
        }
    }
}

/// Append a record at an explicit level, capturing the call site.
#[macro_export]
macro_rules! log_event {
    ($logger:expr, $level:expr, $($arg:tt)*) => {
        $logger.log($level, file!(), line!(), &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $($arg:tt)*) => {
        $crate::log_event!($logger, $crate::LogLevel::Debug, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_info {
    ($logger:expr, $($arg:tt)*) => {
        $crate::log_event!($logger, $crate::LogLevel::Info, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_warn {
    ($logger:expr, $($arg:tt)*) => {
        $crate::log_event!($logger, $crate::LogLevel::Warn, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_error {
    ($logger:expr, $($arg:tt)*) => {
        $crate::log_event!($logger, $crate::LogLevel::Error, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_critical {
    ($logger:expr, $($arg:tt)*) => {
        $crate::log_event!($logger, $crate::LogLevel::Critical, $($arg)*)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffered_records_drain_in_order() {
        let logger = Logger::open(None).unwrap();
        assert!(!logger.has_entries());

        log_info!(logger, "first {}", 1);
        log_warn!(logger, "second");
        assert!(logger.has_entries());

        let (level, text) = logger.pop().unwrap();
        assert_eq!(level, LogLevel::Info);
        assert_eq!(text, "first 1");
        let (level, text) = logger.pop().unwrap();
        assert_eq!(level, LogLevel::Warn);
        assert_eq!(text, "second");
        assert!(logger.pop().is_none());
        assert!(!logger.has_entries());
    }

    #[test]
    fn overflow_drops_oldest_and_marks_once() {
        let logger = Logger::in_memory(4);
        for i in 0..10 {
            log_info!(logger, "record {i}");
        }

        let (level, text) = logger.pop().unwrap();
        assert_eq!(level, LogLevel::Warn);
        assert!(text.contains("log buffer full"));

        // The remaining records are the newest ones, still in order.
        let mut rest = Vec::new();
        while let Some((_, text)) = logger.pop() {
            rest.push(text);
        }
        assert_eq!(rest, vec!["record 7", "record 8", "record 9"]);

        // Draining to empty re-arms the marker.
        for i in 0..6 {
            log_info!(logger, "again {i}");
        }
        let (_, text) = logger.pop().unwrap();
        assert!(text.contains("log buffer full"));
    }

    #[test]
    fn file_sink_writes_formatted_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.log");
        let logger = Logger::open(Some(path.to_str().unwrap())).unwrap();

        logger.log(LogLevel::Error, "assembler.rs", 42, "sync lost");
        assert!(!logger.has_entries());
        assert!(logger.pop().is_none());
        drop(logger);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[ERROR] assembler.rs:42 - sync lost"));
    }

    #[test]
    fn missing_directory_fails_open() {
        let result = Logger::open(Some("/definitely/not/a/dir/session.log"));
        assert!(matches!(result, Err(Fault::Io(_))));
    }

    #[test]
    fn shared_across_threads() {
        let logger = std::sync::Arc::new(Logger::in_memory(64));
        let mut handles = Vec::new();
        for t in 0..4 {
            let logger = logger.clone();
            handles.push(std::thread::spawn(move || {
                for i in 0..8 {
                    log_info!(logger, "thread {t} record {i}");
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        let mut count = 0;
        while logger.pop().is_some() {
            count += 1;
        }
        assert_eq!(count, 32);
    }
}
