//! Monotonic time source shared by both capture streams.
//!
//! Frame and strike timestamps come from this clock so a consumer can
//! correlate the two streams by time alone. Wallclock time appears only in
//! log records.

use std::sync::OnceLock;
use std::time::Instant;

static EPOCH: OnceLock<Instant> = OnceLock::new();

/// Nanoseconds on a monotonic clock since an unspecified process-local epoch.
pub fn now_ns() -> u64 {
    let epoch = *EPOCH.get_or_init(Instant::now);
    epoch.elapsed().as_nanos() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_ns_is_nondecreasing() {
        let a = now_ns();
        let b = now_ns();
        let c = now_ns();
        assert!(a <= b && b <= c);
    }

    #[test]
    fn now_ns_advances() {
        let a = now_ns();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let b = now_ns();
        assert!(b - a >= 4_000_000, "clock advanced only {} ns", b - a);
    }
}
