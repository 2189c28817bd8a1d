//! Abstraction over the audio capture backend.

use strikeline_foundation::Fault;

/// A single-channel sample source with its own monotonic clock.
///
/// Implementations deliver mono samples in [-1, 1]. The clock must stay
/// aligned with the samples handed out so far so strike timestamps can be
/// correlated with thermal frames.
pub trait AudioSource: Send {
    /// Fill `block` with the next samples. Blocks until the block is
    /// complete; a source that runs out mid-block zero-fills the tail and
    /// reports EOF afterwards.
    fn read(&mut self, block: &mut [f32]) -> Result<(), Fault>;

    /// Monotonic nanoseconds at the end of the samples read so far.
    fn now_ns(&self) -> u64;

    fn sample_rate(&self) -> u32;

    /// True once the source is exhausted; live sources never are.
    fn is_eof(&self) -> bool;
}

impl<T: AudioSource + ?Sized> AudioSource for Box<T> {
    fn read(&mut self, block: &mut [f32]) -> Result<(), Fault> {
        (**self).read(block)
    }

    fn now_ns(&self) -> u64 {
        (**self).now_ns()
    }

    fn sample_rate(&self) -> u32 {
        (**self).sample_rate()
    }

    fn is_eof(&self) -> bool {
        (**self).is_eof()
    }
}
