use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use strikeline_app::{Session, SessionConfig};
use strikeline_audio::{AudioSource, PcmSource, WavSource};
use strikeline_foundation::Fault;
use strikeline_thermal::{FileBus, Frame};

/// Replay a captured sensor session: a raw SPI dump through the frame
/// assembler and a mono WAV through the strike detector.
#[derive(Parser, Debug)]
#[command(name = "strikeline", version)]
struct Args {
    /// Raw SPI capture file to replay
    #[arg(long)]
    spi: PathBuf,

    /// Mono WAV file to run strike detection on; omit to capture from the
    /// default microphone instead
    #[arg(long)]
    wav: Option<PathBuf>,

    /// Log destination: "stdout", "stderr" or a file path; unset buffers
    /// in memory and prints the buffer at exit
    #[arg(long)]
    log_path: Option<String>,

    /// Stop after this many frames (0 = run until the capture ends)
    #[arg(long, default_value_t = 0)]
    frames: u32,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();

    let args = Args::parse();
    let config = SessionConfig::default();
    let bus = FileBus::open(&args.spi)?;
    let source: Box<dyn AudioSource> = match &args.wav {
        Some(path) => {
            let wav = WavSource::open(path)?;
            info!("replaying {:.1} s of audio", wav.duration_s());
            Box::new(wav)
        }
        None => {
            info!("capturing from the default microphone");
            Box::new(PcmSource::open(config.detector.block_size)?)
        }
    };

    let (mut session, driver_info) = Session::start(
        config,
        Box::new(bus),
        source,
        args.log_path.as_deref(),
    )?;
    println!(
        "driver v{}.{}, {}x{} frames",
        driver_info.version_major,
        driver_info.version_minor,
        driver_info.frame_width,
        driver_info.frame_height
    );

    let mut frame = Frame::new();
    let mut delivered = 0u32;
    loop {
        if args.frames != 0 && delivered >= args.frames {
            break;
        }
        match session.get_frame(&mut frame) {
            Ok(()) => {
                let (mut min, mut max) = (f32::INFINITY, f32::NEG_INFINITY);
                for &px in &frame.pixels {
                    min = min.min(px);
                    max = max.max(px);
                }
                println!(
                    "frame {:>5}  t={:>14} ns  {:6.2}..{:6.2} °F",
                    frame.seq, frame.t_ns, min, max
                );
                delivered += 1;
            }
            Err(Fault::EndOfStream) => {
                println!("capture ended after {delivered} frames");
                break;
            }
            Err(fault) => return Err(fault.into()),
        }
    }

    // Give the detector a moment to chew through the tail of the WAV.
    std::thread::sleep(std::time::Duration::from_millis(200));
    let mut events = Vec::new();
    session.get_events(&mut events, usize::MAX)?;
    println!("{} strike events", events.len());
    for event in &events {
        println!(
            "strike {:>3}  t={:>14} ns  rms={:.4}",
            event.seq, event.t_ns, event.rms
        );
    }

    session.shutdown()?;

    while let Some((level, text)) = session.log_pop() {
        println!("[{level}] {text}");
    }
    Ok(())
}
