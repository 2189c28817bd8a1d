//! Hardware adapter: spidev data channel plus vendor-port power sequencing.

use std::io::Read;
use std::thread;
use std::time::Duration;

use spidev::{SpiModeFlags, Spidev, SpidevOptions};
use tracing::info;

use strikeline_foundation::Fault;

use crate::bus::{CameraStatus, CciPort, ControlBus, FfcShutterMode};
use crate::packet::RawPacket;

pub const SPI_DEVICE: &str = "/dev/spidev0.0";
pub const SPI_SPEED_HZ: u32 = 10_000_000;

/// Interval between vendor-port polls while power sequencing.
const CONTROL_POLL: Duration = Duration::from_millis(250);
/// Settle time after the power-up command is accepted.
const POWER_ON_SETTLE: Duration = Duration::from_secs(1);

/// The physical sensor: SPI video stream plus the vendor control port.
pub struct SpiSensorBus<P: CciPort> {
    spi: Spidev,
    port: P,
}

impl<P: CciPort> SpiSensorBus<P> {
    /// Open and configure the SPI data channel, then push the startup
    /// configuration over the vendor port: AGC off, radiometry on, manual
    /// FFC shutter on a 60 s period, one normalization run, video enabled.
    pub fn open(port: P) -> Result<Self, Fault> {
        let mut spi = Spidev::open(SPI_DEVICE)?;
        let options = SpidevOptions::new()
            .bits_per_word(8)
            .max_speed_hz(SPI_SPEED_HZ)
            .mode(SpiModeFlags::SPI_MODE_3)
            .build();
        spi.configure(&options)?;
        info!(
            device = SPI_DEVICE,
            speed_hz = SPI_SPEED_HZ,
            "SPI data channel configured"
        );

        let mut bus = Self { spi, port };
        bus.port.set_agc(false)?;
        bus.port.set_radiometry(true)?;
        bus.port.set_ffc_shutter_mode(FfcShutterMode::default())?;
        bus.port.run_ffc_normalization()?;
        bus.port.set_video_output(true)?;
        info!("sensor configured: AGC off, radiometry on, manual FFC");
        Ok(bus)
    }
}

impl<P: CciPort> ControlBus for SpiSensorBus<P> {
    fn power_on(&mut self) -> Result<(), Fault> {
        run_power_on(&mut self.port)
    }

    fn power_off(&mut self) -> Result<(), Fault> {
        run_power_off(&mut self.port)
    }

    fn read_packet(&mut self, packet: &mut RawPacket) -> Result<(), Fault> {
        self.spi.read_exact(packet)?;
        Ok(())
    }
}

/// Power-up sequence against the vendor port. Rejected commands and
/// transient status errors are retried on the poll interval; the camera
/// decides when it is READY.
fn run_power_on(port: &mut impl CciPort) -> Result<(), Fault> {
    while port.power_up().is_err() {
        thread::sleep(CONTROL_POLL);
    }
    thread::sleep(POWER_ON_SETTLE);
    wait_for_ready(port);
    port.run_ffc_normalization()?;
    port.set_video_output(true)
}

fn run_power_off(port: &mut impl CciPort) -> Result<(), Fault> {
    while port.power_down().is_err() {
        thread::sleep(CONTROL_POLL);
    }
    wait_for_ready(port);
    Ok(())
}

fn wait_for_ready(port: &mut impl CciPort) {
    loop {
        match port.status() {
            Ok(CameraStatus::Ready) => return,
            _ => thread::sleep(CONTROL_POLL),
        }
    }
}
