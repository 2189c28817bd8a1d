//! High-pass prefilter for the strike detector.
//!
//! Strikes live in the top of the band while handling noise, rumble and
//! speech sit below; a 4th-order Butterworth high-pass strips the latter
//! before the RMS stage. The filter is designed once at startup from the
//! cutoff/sample-rate ratio.

use std::f32::consts::PI;

/// One direct-form-I biquad section.
#[derive(Debug, Clone, Copy)]
struct Biquad {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl Biquad {
    /// Cookbook high-pass section at the given normalized cutoff
    /// (cutoff_hz / sample_rate) and section Q.
    fn highpass(normalized_cutoff: f32, q: f32) -> Self {
        let w0 = 2.0 * PI * normalized_cutoff;
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 / (2.0 * q);
        let a0 = 1.0 + alpha;
        Self {
            b0: ((1.0 + cos_w0) / 2.0) / a0,
            b1: -(1.0 + cos_w0) / a0,
            b2: ((1.0 + cos_w0) / 2.0) / a0,
            a1: (-2.0 * cos_w0) / a0,
            a2: (1.0 - alpha) / a0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    #[inline]
    fn step(&mut self, x: f32) -> f32 {
        let y = self.b0 * x + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }

    fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}

/// Section Qs for the order-4 Butterworth prototype:
/// 1/(2 cos(pi/8)) and 1/(2 cos(3 pi/8)).
const SECTION_Q: [f32; 2] = [0.541_196_1, 1.306_563_0];

/// 4th-order Butterworth high-pass as a cascade of two biquad sections.
/// Unit gain in the passband; the 24 dB/octave rolloff puts the stopband
/// more than 60 dB down within three octaves of the cutoff.
pub struct ButterworthHighPass {
    sections: [Biquad; 2],
}

impl ButterworthHighPass {
    pub fn new(cutoff_hz: f32, sample_rate: u32) -> Self {
        let normalized = cutoff_hz / sample_rate as f32;
        Self {
            sections: [
                Biquad::highpass(normalized, SECTION_Q[0]),
                Biquad::highpass(normalized, SECTION_Q[1]),
            ],
        }
    }

    /// Filter the block in place.
    pub fn process(&mut self, block: &mut [f32]) {
        for sample in block.iter_mut() {
            let mut y = *sample;
            for section in &mut self.sections {
                y = section.step(y);
            }
            *sample = y;
        }
    }

    pub fn reset(&mut self) {
        for section in &mut self.sections {
            section.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: u32 = 48_000;
    const CUTOFF_HZ: f32 = 15_000.0;

    fn tone(freq_hz: f32, samples: usize) -> Vec<f32> {
        (0..samples)
            .map(|i| (2.0 * PI * freq_hz * i as f32 / SAMPLE_RATE as f32).sin())
            .collect()
    }

    fn rms(block: &[f32]) -> f32 {
        (block.iter().map(|&s| s * s).sum::<f32>() / block.len() as f32).sqrt()
    }

    #[test]
    fn blocks_dc() {
        let mut filter = ButterworthHighPass::new(CUTOFF_HZ, SAMPLE_RATE);
        let mut block = vec![1.0f32; 8192];
        filter.process(&mut block);
        // Skip the step transient, then the tail must be essentially zero.
        assert!(rms(&block[4096..]) < 1e-4);
    }

    #[test]
    fn stopband_is_down_sixty_db() {
        let mut filter = ButterworthHighPass::new(CUTOFF_HZ, SAMPLE_RATE);
        let mut block = tone(1_000.0, 48_000);
        filter.process(&mut block);
        let out = rms(&block[24_000..]);
        let reference = rms(&tone(1_000.0, 48_000)[24_000..]);
        assert!(
            out / reference < 1e-3,
            "1 kHz leaked through at {:.1} dB",
            20.0 * (out / reference).log10()
        );
    }

    #[test]
    fn passband_is_near_unity() {
        let mut filter = ButterworthHighPass::new(CUTOFF_HZ, SAMPLE_RATE);
        let mut block = tone(22_000.0, 48_000);
        let reference = rms(&block[24_000..]);
        filter.process(&mut block);
        let out = rms(&block[24_000..]);
        let ratio = out / reference;
        assert!(
            (0.9..=1.1).contains(&ratio),
            "passband gain was {ratio:.3}"
        );
    }

    #[test]
    fn reset_clears_state() {
        let mut filter = ButterworthHighPass::new(CUTOFF_HZ, SAMPLE_RATE);
        let mut block = tone(20_000.0, 1024);
        filter.process(&mut block);
        filter.reset();

        let mut silent = vec![0.0f32; 1024];
        filter.process(&mut silent);
        assert!(silent.iter().all(|&s| s == 0.0));
    }
}
