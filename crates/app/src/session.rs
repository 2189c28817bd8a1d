//! Session orchestrator: owns the two capture workers and every shared
//! structure, and exposes the public lifecycle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use strikeline_audio::{
    AudioSource, DetectorConfig, EventQueue, StrikeDetector, StrikeEvent,
};
use strikeline_foundation::{
    log_critical, log_info, Fault, LogLevel, Logger, WorkerHandle, MEMORY_LOG_CAPACITY,
};
use strikeline_thermal::{
    CloseReason, ControlBus, Frame, FrameAssembler, FrameMailbox, FRAME_HEIGHT, FRAME_WIDTH,
};

/// How long each worker gets to signal that it is running.
pub const STARTUP_TIMEOUT: Duration = Duration::from_secs(5);
/// Bounded wait for workers to exit at shutdown; sized to cover one
/// in-flight power cycle of the sensor.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(6);

/// Driver identity and frame geometry handed back from [`Session::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DriverInfo {
    pub version_major: u8,
    pub version_minor: u8,
    pub frame_width: u16,
    pub frame_height: u16,
}

impl DriverInfo {
    fn current() -> Self {
        Self {
            version_major: env!("CARGO_PKG_VERSION_MAJOR").parse().unwrap_or(0),
            version_minor: env!("CARGO_PKG_VERSION_MINOR").parse().unwrap_or(0),
            frame_width: FRAME_WIDTH as u16,
            frame_height: FRAME_HEIGHT as u16,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub detector: DetectorConfig,
    /// Records held by the in-memory session log before the oldest drop.
    pub log_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            detector: DetectorConfig::default(),
            log_capacity: MEMORY_LOG_CAPACITY,
        }
    }
}

/// One live capture session. The session exclusively owns both workers and
/// all shared structures; dropping it shuts everything down.
pub struct Session {
    pub(crate) logger: Arc<Logger>,
    mailbox: Arc<FrameMailbox>,
    events: Arc<EventQueue>,
    shutdown_requested: Arc<AtomicBool>,
    thermal: Option<WorkerHandle>,
    audio: Option<WorkerHandle>,
}

impl Session {
    /// Construct the log, start both capture workers and wait for them to
    /// come up. On any failure every partially constructed resource is
    /// released before returning.
    pub fn start(
        config: SessionConfig,
        bus: Box<dyn ControlBus>,
        source: Box<dyn AudioSource>,
        log_path: Option<&str>,
    ) -> Result<(Self, DriverInfo), Fault> {
        let info = DriverInfo::current();
        let logger = Arc::new(match log_path {
            None => Logger::in_memory(config.log_capacity),
            Some(path) => Logger::open(Some(path))?,
        });
        log_info!(
            logger,
            "driver v{}.{} starting up ({}x{} frames)",
            info.version_major,
            info.version_minor,
            info.frame_width,
            info.frame_height
        );

        let shutdown_requested = Arc::new(AtomicBool::new(false));
        let mailbox = Arc::new(FrameMailbox::new());
        let events = Arc::new(EventQueue::new(config.detector.queue_size));

        let thermal = FrameAssembler::new(
            bus,
            Arc::clone(&mailbox),
            Arc::clone(&logger),
            Arc::clone(&shutdown_requested),
        )
        .spawn()?;
        if let Err(fault) = thermal.wait_running(STARTUP_TIMEOUT) {
            release_partial(&shutdown_requested, &mailbox, [Some(thermal), None]);
            return Err(fault);
        }

        let detector = StrikeDetector::new(
            source,
            config.detector,
            Arc::clone(&events),
            Arc::clone(&logger),
            Arc::clone(&shutdown_requested),
        );
        let audio = match detector.spawn() {
            Ok(handle) => handle,
            Err(fault) => {
                release_partial(&shutdown_requested, &mailbox, [Some(thermal), None]);
                return Err(fault);
            }
        };
        if let Err(fault) = audio.wait_running(STARTUP_TIMEOUT) {
            release_partial(&shutdown_requested, &mailbox, [Some(thermal), Some(audio)]);
            return Err(fault);
        }

        log_info!(logger, "session running");
        Ok((
            Self {
                logger,
                mailbox,
                events,
                shutdown_requested,
                thermal: Some(thermal),
                audio: Some(audio),
            },
            info,
        ))
    }

    /// Block until the next unique frame and copy it out. Fails with
    /// [`Fault::Shutting`] once shutdown is requested and with
    /// [`Fault::EndOfStream`] after the thermal stream ends.
    pub fn get_frame(&mut self, frame: &mut Frame) -> Result<(), Fault> {
        if self.shutdown_requested.load(Ordering::SeqCst) {
            return Err(Fault::Shutting);
        }
        self.mailbox.take(frame)
    }

    /// Non-blocking drain of up to `max` strike events, oldest first. Fails
    /// with [`Fault::Overflow`] (draining nothing) when more are queued.
    pub fn get_events(&self, out: &mut Vec<StrikeEvent>, max: usize) -> Result<(), Fault> {
        if self.shutdown_requested.load(Ordering::SeqCst) {
            return Err(Fault::Shutting);
        }
        self.events.drain_up_to(out, max)
    }

    pub fn log_has_entries(&self) -> bool {
        self.logger.has_entries()
    }

    pub fn log_pop(&self) -> Option<(LogLevel, String)> {
        self.logger.pop()
    }

    /// Signal both workers, join them with a bounded wait and release the
    /// session's resources. Idempotent.
    pub fn shutdown(&mut self) -> Result<(), Fault> {
        if self.shutdown_requested.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        log_info!(self.logger, "shutdown requested");
        self.mailbox.close(CloseReason::Shutdown);

        for (name, worker) in [
            ("thermal assembler", self.thermal.take()),
            ("strike detector", self.audio.take()),
        ] {
            if let Some(handle) = worker {
                if !handle.join_within(SHUTDOWN_TIMEOUT) {
                    log_critical!(
                        self.logger,
                        "{name} did not exit within {SHUTDOWN_TIMEOUT:?}, detaching it"
                    );
                }
            }
        }

        log_info!(self.logger, "shutdown complete");
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

/// Teardown for a half-built session: signal shutdown, wake the mailbox and
/// join whatever workers exist.
fn release_partial(
    shutdown_requested: &Arc<AtomicBool>,
    mailbox: &Arc<FrameMailbox>,
    workers: [Option<WorkerHandle>; 2],
) {
    shutdown_requested.store(true, Ordering::SeqCst);
    mailbox.close(CloseReason::Shutdown);
    for worker in workers.into_iter().flatten() {
        worker.join_within(SHUTDOWN_TIMEOUT);
    }
}
