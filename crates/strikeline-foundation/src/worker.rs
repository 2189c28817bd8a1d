//! Handles for the capture worker threads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::Fault;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A spawned worker thread plus the `running` flag it raises on entry and
/// clears on exit.
pub struct WorkerHandle {
    handle: JoinHandle<()>,
    running: Arc<AtomicBool>,
}

impl WorkerHandle {
    pub fn new(handle: JoinHandle<()>, running: Arc<AtomicBool>) -> Self {
        Self { handle, running }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Block until the worker signals `running`. A worker that has already
    /// finished counts as started; it ran, however briefly.
    pub fn wait_running(&self, timeout: Duration) -> Result<(), Fault> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.running.load(Ordering::SeqCst) || self.handle.is_finished() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(Fault::StartupTimeout { waited: timeout });
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    /// Join with a bounded wait. Returns true when the worker exited in
    /// time; on timeout the thread is left detached for the caller to
    /// report.
    pub fn join_within(self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while !self.handle.is_finished() {
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(POLL_INTERVAL);
        }
        self.handle.join().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn spawn_worker(
        delay: Duration,
        work: Duration,
    ) -> WorkerHandle {
        let running = Arc::new(AtomicBool::new(false));
        let flag = running.clone();
        let handle = thread::spawn(move || {
            thread::sleep(delay);
            flag.store(true, Ordering::SeqCst);
            thread::sleep(work);
            flag.store(false, Ordering::SeqCst);
        });
        WorkerHandle::new(handle, running)
    }

    #[test]
    fn wait_running_sees_prompt_start() {
        let worker = spawn_worker(Duration::ZERO, Duration::from_millis(200));
        assert!(worker.wait_running(Duration::from_secs(1)).is_ok());
        assert!(worker.join_within(Duration::from_secs(1)));
    }

    #[test]
    fn wait_running_times_out_on_stuck_worker() {
        let worker = spawn_worker(Duration::from_millis(500), Duration::ZERO);
        let fault = worker.wait_running(Duration::from_millis(50)).unwrap_err();
        assert!(matches!(fault, Fault::StartupTimeout { .. }));
        assert!(worker.join_within(Duration::from_secs(2)));
    }

    #[test]
    fn finished_worker_counts_as_started() {
        let worker = spawn_worker(Duration::ZERO, Duration::ZERO);
        thread::sleep(Duration::from_millis(100));
        assert!(worker.wait_running(Duration::from_millis(50)).is_ok());
        assert!(worker.join_within(Duration::from_millis(200)));
    }

    #[test]
    fn join_within_reports_timeout() {
        let worker = spawn_worker(Duration::ZERO, Duration::from_secs(2));
        assert!(!worker.join_within(Duration::from_millis(50)));
    }
}
