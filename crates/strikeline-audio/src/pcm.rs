//! Live microphone source over cpal.
//!
//! The cpal stream is not `Send`, so it lives on a small capture thread
//! that feeds the sample ring; [`PcmSource`] itself just drains the ring
//! and can move onto the detector thread.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use parking_lot::RwLock;
use tracing::{error, info};

use strikeline_foundation::{now_ns, Fault};

use crate::ring::{self, SampleConsumer, SampleProducer};
use crate::source::AudioSource;

const STARTUP_WAIT: Duration = Duration::from_secs(3);

type StartupResult = Option<Result<u32, String>>;

pub struct PcmSource {
    consumer: SampleConsumer,
    sample_rate: u32,
    stop: Arc<AtomicBool>,
    failed: Arc<AtomicBool>,
    capture_thread: Option<JoinHandle<()>>,
}

impl PcmSource {
    /// Open the default input device and start capturing.
    pub fn open(block_size: usize) -> Result<Self, Fault> {
        let (producer, consumer) = ring::channel((block_size * 16).max(8192));
        let stop = Arc::new(AtomicBool::new(false));
        let failed = Arc::new(AtomicBool::new(false));
        let startup: Arc<RwLock<StartupResult>> = Arc::new(RwLock::new(None));

        let thread_stop = Arc::clone(&stop);
        let thread_failed = Arc::clone(&failed);
        let thread_startup = Arc::clone(&startup);
        let capture_thread = thread::Builder::new()
            .name("pcm-capture".into())
            .spawn(move || capture_main(producer, thread_stop, thread_failed, thread_startup))?;

        let deadline = Instant::now() + STARTUP_WAIT;
        let sample_rate = loop {
            if let Some(result) = startup.read().clone() {
                match result {
                    Ok(rate) => break rate,
                    Err(message) => {
                        let _ = capture_thread.join();
                        return Err(Fault::Io(io::Error::other(message)));
                    }
                }
            }
            if Instant::now() >= deadline {
                stop.store(true, Ordering::SeqCst);
                let _ = capture_thread.join();
                return Err(Fault::Io(io::Error::other(
                    "audio input did not start in time",
                )));
            }
            thread::sleep(Duration::from_millis(50));
        };

        Ok(Self {
            consumer,
            sample_rate,
            stop,
            failed,
            capture_thread: Some(capture_thread),
        })
    }
}

impl AudioSource for PcmSource {
    fn read(&mut self, block: &mut [f32]) -> Result<(), Fault> {
        let mut filled = 0;
        while filled < block.len() {
            if self.failed.load(Ordering::SeqCst) {
                return Err(Fault::Io(io::Error::other("audio input stream failed")));
            }
            let n = self.consumer.read(&mut block[filled..]);
            if n == 0 {
                thread::sleep(Duration::from_millis(1));
            }
            filled += n;
        }
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

impl Drop for PcmSource {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.capture_thread.take() {
            let _ = handle.join();
        }
    }
}

fn capture_main(
    mut producer: SampleProducer,
    stop: Arc<AtomicBool>,
    failed: Arc<AtomicBool>,
    startup: Arc<RwLock<StartupResult>>,
) {
    let host = cpal::default_host();
    let Some(device) = host.default_input_device() else {
        *startup.write() = Some(Err("no default audio input device".into()));
        return;
    };
    let default_config = match device.default_input_config() {
        Ok(config) => config,
        Err(e) => {
            *startup.write() = Some(Err(format!("no supported input config: {e}")));
            return;
        }
    };
    let sample_format = default_config.sample_format();
    let config = StreamConfig {
        channels: default_config.channels(),
        sample_rate: default_config.sample_rate(),
        buffer_size: cpal::BufferSize::Default,
    };
    let channels = config.channels as usize;
    if let Ok(name) = device.name() {
        info!(
            device = %name,
            sample_rate = config.sample_rate.0,
            channels,
            "audio input stream opening"
        );
    }

    let err_failed = Arc::clone(&failed);
    let err_fn = move |err: cpal::StreamError| {
        error!("audio input stream error: {err}");
        err_failed.store(true, Ordering::SeqCst);
    };

    // Downmix interleaved frames to mono by averaging; drops are counted by
    // the ring, not here, to keep the callback allocation-free after warmup.
    let mut mono: Vec<f32> = Vec::new();
    let mut push = move |data: &[f32]| {
        if channels == 1 {
            let _ = producer.write(data);
            return;
        }
        mono.clear();
        mono.extend(
            data.chunks_exact(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32),
        );
        let _ = producer.write(&mono);
    };

    let stream = match sample_format {
        SampleFormat::F32 => device.build_input_stream(
            &config,
            move |data: &[f32], _: &_| push(data),
            err_fn,
            None,
        ),
        SampleFormat::I16 => {
            let mut scratch: Vec<f32> = Vec::new();
            device.build_input_stream(
                &config,
                move |data: &[i16], _: &_| {
                    scratch.clear();
                    scratch.extend(data.iter().map(|&s| s as f32 / 32_768.0));
                    push(&scratch);
                },
                err_fn,
                None,
            )
        }
        SampleFormat::U16 => {
            let mut scratch: Vec<f32> = Vec::new();
            device.build_input_stream(
                &config,
                move |data: &[u16], _: &_| {
                    scratch.clear();
                    scratch.extend(data.iter().map(|&s| (s as f32 - 32_768.0) / 32_768.0));
                    push(&scratch);
                },
                err_fn,
                None,
            )
        }
        other => {
            *startup.write() = Some(Err(format!("unsupported sample format {other:?}")));
            return;
        }
    };

    let stream = match stream {
        Ok(stream) => stream,
        Err(e) => {
            *startup.write() = Some(Err(format!("failed to build input stream: {e}")));
            return;
        }
    };
    if let Err(e) = stream.play() {
        *startup.write() = Some(Err(format!("failed to start input stream: {e}")));
        return;
    }
    *startup.write() = Some(Ok(config.sample_rate.0));

    while !stop.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(100));
    }
    drop(stream);
    info!("audio input stream closed");
}
