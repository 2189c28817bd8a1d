//! End-to-end detector runs over WAV fixtures with known transients.

use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use strikeline_audio::testing::ScriptedSource;
use strikeline_audio::{DetectorConfig, EventQueue, StrikeDetector, StrikeEvent, WavSource};
use strikeline_foundation::Logger;

const SAMPLE_RATE: u32 = 48_000;
const TOLERANCE_NS: u64 = 50_000_000;

/// Lay a 10 ms full-band transient into `samples` at `at_s` seconds.
fn lay_transient(samples: &mut [f32], at_s: f64) {
    let start = (at_s * SAMPLE_RATE as f64) as usize;
    let len = SAMPLE_RATE as usize / 100;
    for (i, sample) in samples[start..start + len].iter_mut().enumerate() {
        *sample = if i % 2 == 0 { 0.8 } else { -0.8 };
    }
}

fn write_fixture(path: &Path, transient_times_s: &[f64]) {
    let last = transient_times_s.last().copied().unwrap_or(0.0);
    let mut samples = vec![0.0f32; ((last + 1.0) * SAMPLE_RATE as f64) as usize];
    for &at_s in transient_times_s {
        lay_transient(&mut samples, at_s);
    }

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for &sample in &samples {
        writer.write_sample(sample).unwrap();
    }
    writer.finalize().unwrap();
}

fn detect(source: impl strikeline_audio::AudioSource + 'static, config: DetectorConfig) -> Vec<StrikeEvent> {
    let queue = Arc::new(EventQueue::new(config.queue_size));
    let logger = Arc::new(Logger::in_memory(64));
    let shutdown = Arc::new(AtomicBool::new(false));
    let worker = StrikeDetector::new(source, config, queue.clone(), logger, shutdown)
        .spawn()
        .expect("spawn detector");
    assert!(
        worker.join_within(Duration::from_secs(10)),
        "detector did not finish the fixture"
    );

    let mut events = Vec::new();
    queue.drain_up_to(&mut events, usize::MAX).unwrap();
    events
}

fn assert_strikes_at(fixture: &[f64], events: &[StrikeEvent]) {
    assert_eq!(
        events.len(),
        fixture.len(),
        "expected {} strikes, got {:?}",
        fixture.len(),
        events
    );
    for (event, &nominal_s) in events.iter().zip(fixture) {
        let nominal_ns = (nominal_s * 1e9) as u64;
        let delta = event.t_ns.abs_diff(nominal_ns);
        assert!(
            delta <= TOLERANCE_NS,
            "strike {} landed {} ms from nominal {:.3} s",
            event.seq,
            delta / 1_000_000,
            nominal_s
        );
    }
    for pair in events.windows(2) {
        assert!(pair[1].seq == pair[0].seq + 1);
        assert!(pair[1].t_ns - pair[0].t_ns >= 1_000_000_000);
    }
}

#[test]
fn five_transient_fixture_yields_five_events() {
    let times = [1.30, 2.60, 4.10, 5.55, 7.00];
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("strikes-five.wav");
    write_fixture(&path, &times);

    let events = detect(WavSource::open(&path).unwrap(), DetectorConfig::default());
    assert_strikes_at(&times, &events);
}

#[test]
fn six_transient_fixture_yields_six_events() {
    let times = [0.90, 2.10, 3.40, 4.80, 6.30, 7.70];
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("strikes-six.wav");
    write_fixture(&path, &times);

    let events = detect(WavSource::open(&path).unwrap(), DetectorConfig::default());
    assert_strikes_at(&times, &events);
}

#[test]
fn undrained_queue_keeps_the_newest_events() {
    // Twenty strikes into a queue of eight: the retained events must be the
    // most recent eight, still in order.
    let config = DetectorConfig {
        queue_size: 8,
        refractory_s: 0.1,
        ..DetectorConfig::default()
    };

    let mut samples = vec![0.0f32; SAMPLE_RATE as usize * 6];
    for i in 0..20 {
        lay_transient(&mut samples, 0.25 * (i + 1) as f64);
    }
    let source = ScriptedSource::new(SAMPLE_RATE);
    source.push_samples(&samples);
    source.finish();

    let events = detect(source, config);
    assert_eq!(events.len(), 8);
    let seqs: Vec<u32> = events.iter().map(|e| e.seq).collect();
    assert_eq!(seqs, vec![13, 14, 15, 16, 17, 18, 19, 20]);
}
