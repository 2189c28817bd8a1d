//! Acoustic strike detection worker.
//!
//! A strike is a broadband transient: after high-pass filtering, any block
//! whose RMS clears the floor counts as a hit, and a refractory period keeps
//! one physical strike from registering more than once. Events land in a
//! bounded queue the consumer drains at its own pace; the detector never
//! blocks on the consumer.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use strikeline_foundation::{log_error, log_info, Fault, Logger, WorkerHandle};

use crate::filter::ButterworthHighPass;
use crate::source::AudioSource;

/// Detector tuning. Compiled-in defaults; the sample rate comes from the
/// source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Samples per analysis block.
    pub block_size: usize,
    /// Bounded event queue capacity; the oldest events are evicted on
    /// overflow.
    pub queue_size: usize,
    /// High-pass cutoff isolating the strike transient band.
    pub cutoff_hz: f32,
    /// Minimum spacing between two accepted strikes, in seconds.
    pub refractory_s: f32,
    /// RMS floor below which a block never registers a strike.
    pub min_thresh: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            block_size: 2048,
            queue_size: 256,
            cutoff_hz: 15_000.0,
            refractory_s: 1.0,
            min_thresh: 0.03,
        }
    }
}

/// One accepted strike.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrikeEvent {
    /// Monotonic timestamp from the source's clock.
    pub t_ns: u64,
    /// Strictly monotonic hit counter, starting at 1.
    pub seq: u32,
    /// RMS of the high-passed block that registered the hit.
    pub rms: f32,
}

/// Bounded FIFO between the detector thread and the consumer.
pub struct EventQueue {
    events: Mutex<VecDeque<StrikeEvent>>,
    capacity: usize,
}

impl EventQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Append an event, evicting the oldest when full. Never blocks.
    pub fn push(&self, event: StrikeEvent) {
        let mut events = self.events.lock();
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Atomically move up to `max` queued events into `out`, oldest first.
    /// Fails without draining anything when more than `max` are queued.
    pub fn drain_up_to(&self, out: &mut Vec<StrikeEvent>, max: usize) -> Result<(), Fault> {
        let mut events = self.events.lock();
        if events.len() > max {
            return Err(Fault::Overflow {
                queued: events.len(),
                capacity: max,
            });
        }
        out.extend(events.drain(..));
        Ok(())
    }
}

pub struct StrikeDetector<S: AudioSource> {
    source: S,
    config: DetectorConfig,
    queue: Arc<EventQueue>,
    logger: Arc<Logger>,
    shutdown: Arc<AtomicBool>,
}

impl<S: AudioSource + 'static> StrikeDetector<S> {
    pub fn new(
        source: S,
        config: DetectorConfig,
        queue: Arc<EventQueue>,
        logger: Arc<Logger>,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            source,
            config,
            queue,
            logger,
            shutdown,
        }
    }

    /// Start the worker on a dedicated thread.
    pub fn spawn(self) -> Result<WorkerHandle, Fault> {
        let running = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&running);
        let handle = thread::Builder::new()
            .name("strike-detector".into())
            .spawn(move || self.thread_main(flag))?;
        Ok(WorkerHandle::new(handle, running))
    }

    fn thread_main(mut self, running: Arc<AtomicBool>) {
        running.store(true, Ordering::SeqCst);
        log_info!(
            self.logger,
            "strike detector running at {} Hz",
            self.source.sample_rate()
        );

        if let Err(fault) = self.run() {
            match fault.location() {
                Some(at) => log_error!(self.logger, "strike detector failed at {at}: {fault}"),
                None => log_error!(self.logger, "strike detector failed: {fault}"),
            }
        }

        running.store(false, Ordering::SeqCst);
        log_info!(self.logger, "strike detector exiting");
    }

    fn run(&mut self) -> Result<(), Fault> {
        let mut block = vec![0.0f32; self.config.block_size];
        let mut filter = ButterworthHighPass::new(self.config.cutoff_hz, self.source.sample_rate());
        let refractory_ns = (self.config.refractory_s as f64 * 1e9) as u64;
        let mut last_hit: u64 = 0;
        let mut seq: u32 = 0;

        while !self.shutdown.load(Ordering::SeqCst) && !self.source.is_eof() {
            self.source.read(&mut block)?;
            filter.process(&mut block);

            let mean_square = block.iter().map(|&s| s as f64 * s as f64).sum::<f64>()
                / block.len() as f64;
            let rms = (mean_square + 1e-12).sqrt() as f32;

            let t = self.source.now_ns();
            // The first hit is always allowed; afterwards the refractory
            // window gates re-triggering on the same strike's ringdown.
            let gated = last_hit != 0 && t.saturating_sub(last_hit) < refractory_ns;
            if !gated && rms > self.config.min_thresh {
                seq += 1;
                last_hit = t;
                self.queue.push(StrikeEvent { t_ns: t, seq, rms });
            }
        }
        Ok(())
    }
}
