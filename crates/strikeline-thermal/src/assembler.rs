//! The thermal frame assembler worker.
//!
//! Runs on its own thread, locking onto the 60-packet frame boundary in the
//! SPI stream, validating each packet header, converting centi-Kelvin words
//! to °F, suppressing duplicate frames and escalating through retry, sensor
//! reboot and finally surrender when the stream stays broken. Every loop
//! iteration is a transaction: it publishes a fresh unique frame, absorbs a
//! recoverable fault, or power cycles the sensor.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use strikeline_foundation::{
    log_debug, log_error, log_info, log_warn, now_ns, reboot, retry, Fault, Logger, WorkerHandle,
};

use crate::bus::ControlBus;
use crate::mailbox::{CloseReason, FrameMailbox};
use crate::packet::{self, RawPacket, FRAME_WIDTH, PACKETS_PER_FRAME, PACKET_SIZE, PIXELS_PER_FRAME};

/// Consecutive recoverable faults tolerated before escalating to a reboot.
pub const MAX_RETRIES: u32 = 20;
/// Discarded packets tolerated while hunting for a frame boundary.
pub const MAX_SYNC_ATTEMPTS: u32 = 300;
/// Identical frames tolerated before the sensor is presumed wedged. The
/// imager naturally repeats each image on a 3:1 cadence, so the threshold
/// sits near a full second of SPI frames at ~27 Hz.
pub const MAX_STALE_FRAMES: u32 = 27;

/// Backoff after a recoverable capture fault.
const RETRY_BACKOFF: Duration = Duration::from_millis(50);
/// Backoff between unsynchronized packet reads.
const SYNC_BACKOFF: Duration = Duration::from_millis(10);

pub struct FrameAssembler<B: ControlBus> {
    bus: B,
    mailbox: Arc<FrameMailbox>,
    logger: Arc<Logger>,
    shutdown: Arc<AtomicBool>,
    prev_frame: Vec<f32>,
    stale_count: u32,
    retry_count: u32,
    seq: u32,
}

impl<B: ControlBus + 'static> FrameAssembler<B> {
    pub fn new(
        bus: B,
        mailbox: Arc<FrameMailbox>,
        logger: Arc<Logger>,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            bus,
            mailbox,
            logger,
            shutdown,
            prev_frame: vec![0.0; PIXELS_PER_FRAME],
            stale_count: 0,
            retry_count: 0,
            seq: 0,
        }
    }

    /// Start the worker on a dedicated thread.
    pub fn spawn(self) -> Result<WorkerHandle, Fault> {
        let running = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&running);
        let handle = thread::Builder::new()
            .name("thermal-assembler".into())
            .spawn(move || self.thread_main(flag))?;
        Ok(WorkerHandle::new(handle, running))
    }

    fn thread_main(mut self, running: Arc<AtomicBool>) {
        running.store(true, Ordering::SeqCst);
        log_info!(self.logger, "thermal assembler running");

        if let Err(fault) = self.run() {
            match fault.location() {
                Some(at) => log_error!(self.logger, "thermal assembler failed at {at}: {fault}"),
                None => log_error!(self.logger, "thermal assembler failed: {fault}"),
            }
        }

        let reason = if self.shutdown.load(Ordering::SeqCst) {
            CloseReason::Shutdown
        } else {
            CloseReason::StreamEnded
        };
        self.mailbox.close(reason);
        running.store(false, Ordering::SeqCst);
        log_info!(self.logger, "thermal assembler exiting");
    }

    fn run(&mut self) -> Result<(), Fault> {
        let mut pixels = vec![0.0f32; PIXELS_PER_FRAME];

        while !self.shutdown.load(Ordering::SeqCst) {
            match self.iterate(&mut pixels) {
                Ok(()) => {}
                // The stream is done; exit cleanly.
                Err(Fault::EndOfStream) => return Ok(()),
                Err(Fault::Retry { reason, at }) => {
                    log_debug!(self.logger, "capture retry at {at}: {reason}");
                    self.retry_count += 1;
                    thread::sleep(RETRY_BACKOFF);
                }
                Err(Fault::Io(err)) => {
                    // Hard I/O faults are recoverable inside the worker.
                    log_warn!(self.logger, "I/O fault during capture: {err}");
                    self.retry_count += 1;
                    thread::sleep(RETRY_BACKOFF);
                }
                Err(fault @ Fault::Reboot { .. }) => self.reboot_sensor(&fault)?,
                Err(fault) => return Err(fault),
            }
        }
        Ok(())
    }

    /// One capture transaction: sync, assemble, convert, dedup, publish.
    fn iterate(&mut self, pixels: &mut [f32]) -> Result<(), Fault> {
        if self.retry_count > MAX_RETRIES {
            reboot!("{} consecutive capture retries", self.retry_count);
        }

        let mut pkt: RawPacket = [0; PACKET_SIZE];

        // Hunt for the frame boundary: a data packet claiming row 0.
        self.bus.read_packet(&mut pkt)?;
        let mut attempts: u32 = 0;
        while packet::is_discard(&pkt) || packet::packet_index(&pkt) != 0 {
            attempts += 1;
            if attempts > MAX_SYNC_ATTEMPTS {
                reboot!("no frame boundary after {attempts} packets");
            }
            thread::sleep(SYNC_BACKOFF);
            self.bus.read_packet(&mut pkt)?;
        }
        packet::decode_row(&pkt, &mut pixels[..FRAME_WIDTH]);

        // The boundary packet fixed the frame phase; every remaining row
        // must arrive in order or the whole frame is suspect.
        for row in 1..PACKETS_PER_FRAME {
            self.bus.read_packet(&mut pkt)?;
            if packet::is_discard(&pkt) || packet::packet_index(&pkt) as usize != row {
                retry!(
                    "packet {} while reading row {row}/{PACKETS_PER_FRAME}",
                    packet::packet_index(&pkt)
                );
            }
            packet::decode_row(&pkt, &mut pixels[row * FRAME_WIDTH..(row + 1) * FRAME_WIDTH]);
        }

        // Exact equality is intentional: the centi-Kelvin conversion is
        // deterministic, so a repeated frame is bit-identical.
        let matches = pixels[..] == self.prev_frame[..];
        self.prev_frame.copy_from_slice(pixels);

        if matches {
            self.stale_count += 1;
            if self.stale_count > MAX_STALE_FRAMES {
                reboot!("sensor repeated the same frame {} times", self.stale_count);
            }
            return Ok(());
        }

        self.mailbox.publish(pixels, now_ns(), self.seq);
        self.seq += 1;
        self.stale_count = 0;
        self.retry_count = 0;
        Ok(())
    }

    /// Power cycle the sensor and restart capture from a clean slate.
    fn reboot_sensor(&mut self, fault: &Fault) -> Result<(), Fault> {
        log_error!(self.logger, "rebooting sensor: {fault}");
        self.bus.power_off()?;
        self.bus.power_on()?;
        self.prev_frame.fill(0.0);
        self.retry_count = 0;
        self.stale_count = 0;
        Ok(())
    }
}
