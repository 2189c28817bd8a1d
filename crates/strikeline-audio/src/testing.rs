//! Deterministic audio sources for tests.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use strikeline_foundation::{now_ns, Fault};

use crate::source::AudioSource;

struct State {
    samples: Vec<f32>,
    pos: usize,
    finished: bool,
    eof: bool,
}

struct Inner {
    state: Mutex<State>,
    changed: Condvar,
}

/// Source fed from pre-programmed samples with a synthetic clock that
/// advances with the samples handed out. Clones share the same script, so a
/// test can keep feeding a source it has already handed to a worker.
#[derive(Clone)]
pub struct ScriptedSource {
    inner: Arc<Inner>,
    sample_rate: u32,
}

impl ScriptedSource {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    samples: Vec::new(),
                    pos: 0,
                    finished: false,
                    eof: false,
                }),
                changed: Condvar::new(),
            }),
            sample_rate,
        }
    }

    pub fn push_samples(&self, samples: &[f32]) {
        let mut state = self.inner.state.lock();
        state.samples.extend_from_slice(samples);
        self.inner.changed.notify_all();
    }

    /// No more samples will arrive; the next short read zero-pads and
    /// latches EOF.
    pub fn finish(&self) {
        self.inner.state.lock().finished = true;
        self.inner.changed.notify_all();
    }
}

impl AudioSource for ScriptedSource {
    fn read(&mut self, block: &mut [f32]) -> Result<(), Fault> {
        let mut state = self.inner.state.lock();
        while state.pos + block.len() > state.samples.len() && !state.finished {
            self.inner.changed.wait(&mut state);
        }

        let available = (state.samples.len() - state.pos).min(block.len());
        block[..available].copy_from_slice(&state.samples[state.pos..state.pos + available]);
        block[available..].fill(0.0);
        state.pos += available;
        if state.finished && state.pos == state.samples.len() {
            state.eof = true;
        }
        Ok(())
    }

    fn now_ns(&self) -> u64 {
        let state = self.inner.state.lock();
        state.pos as u64 * 1_000_000_000 / self.sample_rate as u64
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn is_eof(&self) -> bool {
        self.inner.state.lock().eof
    }
}

/// A live source that never speaks and never ends: zero samples delivered
/// at a realistic pace. Useful when a session needs a running audio worker
/// that produces no events.
pub struct SilentSource {
    sample_rate: u32,
}

impl SilentSource {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }
}

impl AudioSource for SilentSource {
    fn read(&mut self, block: &mut [f32]) -> Result<(), Fault> {
        block.fill(0.0);
        let nanos = block.len() as u64 * 1_000_000_000 / self.sample_rate as u64;
        std::thread::sleep(Duration::from_nanos(nanos));
        Ok(())
    }

    fn now_ns(&self) -> u64 {
        now_ns()
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn is_eof(&self) -> bool {
        false
    }
}
