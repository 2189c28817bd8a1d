//! Lock-free sample ring between the capture callback and the detector.

use rtrb::{Consumer, Producer, RingBuffer};
use tracing::warn;

/// Create the two ends of a ring holding at most `capacity` samples.
pub fn channel(capacity: usize) -> (SampleProducer, SampleConsumer) {
    let (producer, consumer) = RingBuffer::new(capacity);
    (SampleProducer { producer }, SampleConsumer { consumer })
}

/// Callback-side half. Writes are all-or-nothing: the capture callback
/// cannot wait, so a block that does not fit is dropped whole rather than
/// leaving a torn block in the ring.
pub struct SampleProducer {
    producer: Producer<f32>,
}

impl SampleProducer {
    pub fn write(&mut self, samples: &[f32]) -> Result<usize, ()> {
        if self.producer.slots() < samples.len() {
            warn!("sample ring full, dropping a {}-sample block", samples.len());
            return Err(());
        }
        match self.producer.write_chunk_uninit(samples.len()) {
            Ok(chunk) => Ok(chunk.fill_from_iter(samples.iter().copied())),
            Err(_) => Err(()),
        }
    }

    pub fn slots(&self) -> usize {
        self.producer.slots()
    }
}

/// Reader-side half.
pub struct SampleConsumer {
    consumer: Consumer<f32>,
}

impl SampleConsumer {
    /// Copy out whatever is available, up to `buffer.len()`, returning the
    /// number of samples delivered. Never blocks.
    pub fn read(&mut self, buffer: &mut [f32]) -> usize {
        let wanted = self.consumer.slots().min(buffer.len());
        if wanted == 0 {
            return 0;
        }
        let Ok(chunk) = self.consumer.read_chunk(wanted) else {
            return 0;
        };
        // Iterating the chunk commits the consumed slots back to the
        // producer, wrap-around included.
        for (slot, sample) in buffer.iter_mut().zip(chunk) {
            *slot = sample;
        }
        wanted
    }

    pub fn slots(&self) -> usize {
        self.consumer.slots()
    }
}
