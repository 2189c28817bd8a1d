//! WAV-backed audio source for replay and fixtures.

use std::path::Path;

use tracing::info;

use strikeline_foundation::Fault;

use crate::source::AudioSource;

/// Plays a mono WAV file through the [`AudioSource`] contract with a
/// synthetic clock: time advances with the samples handed out, so replayed
/// strike timestamps land where they sit in the file.
pub struct WavSource {
    samples: Vec<f32>,
    sample_rate: u32,
    pos: usize,
    eof: bool,
}

impl WavSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Fault> {
        let path = path.as_ref();
        let mut reader = hound::WavReader::open(path).map_err(wav_fault)?;
        let spec = reader.spec();
        if spec.channels != 1 {
            return Err(Fault::InvalidArgument(format!(
                "expected a mono WAV, got {} channels",
                spec.channels
            )));
        }

        let samples: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
            (hound::SampleFormat::Float, 32) => reader
                .samples::<f32>()
                .collect::<Result<_, _>>()
                .map_err(wav_fault)?,
            (hound::SampleFormat::Int, 16) => reader
                .samples::<i16>()
                .map(|s| s.map(|s| s as f32 / 32_768.0))
                .collect::<Result<_, _>>()
                .map_err(wav_fault)?,
            (format, bits) => {
                return Err(Fault::InvalidArgument(format!(
                    "unsupported WAV encoding: {bits}-bit {format:?}"
                )))
            }
        };

        info!(
            path = %path.display(),
            sample_rate = spec.sample_rate,
            samples = samples.len(),
            "WAV source loaded"
        );
        Ok(Self::from_samples(samples, spec.sample_rate))
    }

    /// Build a source directly from samples; fixtures use this to skip the
    /// filesystem.
    pub fn from_samples(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
            pos: 0,
            eof: false,
        }
    }

    pub fn duration_s(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

impl AudioSource for WavSource {
    fn read(&mut self, block: &mut [f32]) -> Result<(), Fault> {
        let available = (self.samples.len() - self.pos).min(block.len());
        block[..available].copy_from_slice(&self.samples[self.pos..self.pos + available]);
        block[available..].fill(0.0);
        self.pos += available;
        if self.pos == self.samples.len() {
            self.eof = true;
        }
        Ok(())
    }

    fn now_ns(&self) -> u64 {
        self.pos as u64 * 1_000_000_000 / self.sample_rate as u64
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn is_eof(&self) -> bool {
        self.eof
    }
}

fn wav_fault(err: hound::Error) -> Fault {
    match err {
        hound::Error::IoError(io) => Fault::Io(io),
        other => Fault::InvalidArgument(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &sample in samples {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn float_wav_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixture.wav");
        let samples: Vec<f32> = (0..1000).map(|i| (i as f32 / 1000.0) - 0.5).collect();
        write_wav(&path, &samples, 48_000);

        let mut source = WavSource::open(&path).unwrap();
        assert_eq!(source.sample_rate(), 48_000);

        let mut block = vec![0.0f32; 1000];
        source.read(&mut block).unwrap();
        assert_eq!(block, samples);
        assert!(source.is_eof());
        assert_eq!(source.now_ns(), 1000 * 1_000_000_000 / 48_000);
    }

    #[test]
    fn stereo_wav_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 48_000,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        writer.write_sample(0.0f32).unwrap();
        writer.write_sample(0.0f32).unwrap();
        writer.finalize().unwrap();

        assert!(matches!(
            WavSource::open(&path),
            Err(Fault::InvalidArgument(_))
        ));
    }

    #[test]
    fn missing_file_is_io_fault() {
        assert!(matches!(
            WavSource::open("/no/such/fixture.wav"),
            Err(Fault::Io(_))
        ));
    }

    #[test]
    fn final_short_block_zero_pads() {
        let mut source = WavSource::from_samples(vec![0.25; 10], 48_000);
        let mut block = vec![1.0f32; 16];
        source.read(&mut block).unwrap();
        assert!(block[..10].iter().all(|&s| s == 0.25));
        assert!(block[10..].iter().all(|&s| s == 0.0));
        assert!(source.is_eof());
    }
}
