pub mod detector;
pub mod filter;
pub mod pcm;
pub mod ring;
pub mod source;
pub mod testing;
pub mod wav;

pub use detector::{DetectorConfig, EventQueue, StrikeDetector, StrikeEvent};
pub use filter::ButterworthHighPass;
pub use pcm::PcmSource;
pub use source::AudioSource;
pub use wav::WavSource;
