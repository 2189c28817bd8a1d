pub mod assembler;
pub mod bus;
#[cfg(target_os = "linux")]
pub mod hardware;
pub mod mailbox;
pub mod packet;
pub mod replay;
pub mod testing;

pub use assembler::{FrameAssembler, MAX_RETRIES, MAX_STALE_FRAMES, MAX_SYNC_ATTEMPTS};
pub use bus::{CameraStatus, CciPort, ControlBus, FfcShutterMode};
pub use mailbox::{CloseReason, Frame, FrameMailbox};
pub use packet::{
    FRAME_HEIGHT, FRAME_WIDTH, PACKETS_PER_FRAME, PACKET_SIZE, PIXELS_PER_FRAME, RawPacket,
};
pub use replay::FileBus;
