//! Fault taxonomy for the capture engine.
//!
//! Workers never surface a fault mid-operation: each loop iteration either
//! succeeds, absorbs a `Retry`, or escalates to a `Reboot` of the sensor.
//! Faults that cross the public surface carry enough context for the
//! session's fault handler to emit one log record and return a status code.

use std::time::Duration;

use thiserror::Error;

/// Source location a worker-internal fault was raised from, captured by the
/// [`retry!`](crate::retry) and [`reboot!`](crate::reboot) macros.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultSite {
    pub file: &'static str,
    pub line: u32,
}

impl std::fmt::Display for FaultSite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

#[derive(Debug, Error)]
pub enum Fault {
    #[error("I/O fault: {0}")]
    Io(#[from] std::io::Error),

    /// Recoverable capture fault; the worker backs off and retries.
    #[error("recoverable capture fault: {reason}")]
    Retry { reason: String, at: FaultSite },

    /// The sensor must be power cycled before capture can continue.
    #[error("sensor reboot required: {reason}")]
    Reboot { reason: String, at: FaultSite },

    /// The underlying channel is exhausted; replay and scripted adapters
    /// raise this so workers can exit cleanly.
    #[error("end of stream")]
    EndOfStream,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Public call raced or followed a shutdown.
    #[error("session is shutting down")]
    Shutting,

    #[error("worker did not signal running within {waited:?}")]
    StartupTimeout { waited: Duration },

    #[error("{queued} events queued but caller provided room for {capacity}")]
    Overflow { queued: usize, capacity: usize },
}

impl Fault {
    /// The raising site, for faults that carry one.
    pub fn location(&self) -> Option<FaultSite> {
        match self {
            Fault::Retry { at, .. } | Fault::Reboot { at, .. } => Some(*at),
            _ => None,
        }
    }

    /// Status code for the public surface: -2 for caller errors, -1 for
    /// everything else.
    pub fn status_code(&self) -> i32 {
        match self {
            Fault::InvalidArgument(_) => -2,
            _ => -1,
        }
    }
}

/// Raise a [`Fault::Retry`] from the current location.
#[macro_export]
macro_rules! retry {
    ($($arg:tt)*) => {
        return Err($crate::Fault::Retry {
            reason: format!($($arg)*),
            at: $crate::FaultSite { file: file!(), line: line!() },
        })
    };
}

/// Raise a [`Fault::Reboot`] from the current location.
#[macro_export]
macro_rules! reboot {
    ($($arg:tt)*) => {
        return Err($crate::Fault::Reboot {
            reason: format!($($arg)*),
            at: $crate::FaultSite { file: file!(), line: line!() },
        })
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raises_retry() -> Result<(), Fault> {
        retry!("index {} out of order", 7);
    }

    fn raises_reboot() -> Result<(), Fault> {
        reboot!("stale frames");
    }

    #[test]
    fn retry_macro_captures_site() {
        let fault = raises_retry().unwrap_err();
        let at = fault.location().expect("retry carries a site");
        assert!(at.file.ends_with("fault.rs"));
        assert!(at.line > 0);
        assert_eq!(fault.to_string(), "recoverable capture fault: index 7 out of order");
    }

    #[test]
    fn reboot_macro_captures_site() {
        let fault = raises_reboot().unwrap_err();
        assert!(fault.location().is_some());
        assert_eq!(fault.status_code(), -1);
    }

    #[test]
    fn status_codes_split_caller_errors() {
        assert_eq!(Fault::InvalidArgument("null".into()).status_code(), -2);
        assert_eq!(Fault::Shutting.status_code(), -1);
        assert_eq!(Fault::EndOfStream.status_code(), -1);
        assert_eq!(
            Fault::Overflow { queued: 10, capacity: 4 }.status_code(),
            -1
        );
    }

    #[test]
    fn io_faults_convert() {
        fn read() -> Result<(), Fault> {
            Err(std::io::Error::new(std::io::ErrorKind::TimedOut, "spi timeout"))?;
            Ok(())
        }
        let fault = read().unwrap_err();
        assert!(matches!(fault, Fault::Io(_)));
        assert!(fault.location().is_none());
    }
}
