//! Capability traits over the sensor's two channels.
//!
//! The frame assembler only ever sees [`ControlBus`]; concrete adapters wire
//! it to real SPI hardware, a replayed capture file, or a scripted byte
//! stream for tests. The vendor command/control channel behind power
//! sequencing is modeled by [`CciPort`] and treated as an opaque
//! collaborator.

use strikeline_foundation::Fault;

use crate::packet::RawPacket;

/// Camera status as reported over the vendor command channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraStatus {
    Ready,
    Busy,
    FlatFieldInProgress,
    PoweredOff,
}

/// Shutter configuration pushed at startup: manual flat field correction on
/// a fixed period, with video left running during the correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FfcShutterMode {
    pub manual: bool,
    pub video_freeze_during_ffc: bool,
    pub desired_ffc_period_ms: u32,
}

impl Default for FfcShutterMode {
    fn default() -> Self {
        Self {
            manual: true,
            video_freeze_during_ffc: false,
            desired_ffc_period_ms: 60_000,
        }
    }
}

/// The vendor command/control port. The reference hardware port sits on the
/// CCI/TWI bus at 400 kHz, device address 0x2A; implementations come from
/// the vendor SDK glue and are out of scope here.
pub trait CciPort: Send {
    fn power_up(&mut self) -> Result<(), Fault>;
    fn power_down(&mut self) -> Result<(), Fault>;
    fn status(&mut self) -> Result<CameraStatus, Fault>;
    fn set_agc(&mut self, enabled: bool) -> Result<(), Fault>;
    fn set_radiometry(&mut self, enabled: bool) -> Result<(), Fault>;
    fn set_ffc_shutter_mode(&mut self, mode: FfcShutterMode) -> Result<(), Fault>;
    fn run_ffc_normalization(&mut self) -> Result<(), Fault>;
    fn set_video_output(&mut self, enabled: bool) -> Result<(), Fault>;
}

/// What the frame assembler needs from the sensor.
pub trait ControlBus: Send {
    /// Bring the sensor back to streaming: power-up sequence, wait for
    /// READY, flat-field normalization, video output on.
    fn power_on(&mut self) -> Result<(), Fault>;

    /// Power the sensor down and wait until the command channel reports
    /// READY-idle again.
    fn power_off(&mut self) -> Result<(), Fault>;

    /// Exactly one full 164-byte transfer. Fails with
    /// [`Fault::EndOfStream`] when the underlying channel is exhausted and
    /// [`Fault::Io`] on hard I/O faults.
    fn read_packet(&mut self, packet: &mut RawPacket) -> Result<(), Fault>;
}

impl<T: ControlBus + ?Sized> ControlBus for Box<T> {
    fn power_on(&mut self) -> Result<(), Fault> {
        (**self).power_on()
    }

    fn power_off(&mut self) -> Result<(), Fault> {
        (**self).power_off()
    }

    fn read_packet(&mut self, packet: &mut RawPacket) -> Result<(), Fault> {
        (**self).read_packet(packet)
    }
}
