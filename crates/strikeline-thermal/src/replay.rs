//! Replay adapter over a raw SPI capture.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use tracing::info;

use strikeline_foundation::Fault;

use crate::bus::ControlBus;
use crate::packet::RawPacket;

/// Replays packets from any byte stream, typically a capture file recorded
/// off the real sensor. Power operations are no-ops; the stream position
/// carries all sensor state.
pub struct FileBus<R> {
    stream: R,
}

impl FileBus<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Fault> {
        let path = path.as_ref();
        let file = File::open(path)?;
        info!(path = %path.display(), "replaying SPI capture");
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: Read + Send> FileBus<R> {
    pub fn new(stream: R) -> Self {
        Self { stream }
    }
}

impl<R: Read + Send> ControlBus for FileBus<R> {
    fn power_on(&mut self) -> Result<(), Fault> {
        Ok(())
    }

    fn power_off(&mut self) -> Result<(), Fault> {
        Ok(())
    }

    fn read_packet(&mut self, packet: &mut RawPacket) -> Result<(), Fault> {
        match self.stream.read_exact(packet) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(Fault::EndOfStream),
            Err(e) => Err(Fault::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::PACKET_SIZE;
    use std::io::Cursor;

    #[test]
    fn reads_whole_packets_then_ends() {
        let mut data = vec![0u8; PACKET_SIZE];
        data[1] = 0;
        data.extend_from_slice(&[0xAA; PACKET_SIZE / 2]); // trailing partial packet

        let mut bus = FileBus::new(Cursor::new(data));
        let mut packet: RawPacket = [0xFF; PACKET_SIZE];
        bus.read_packet(&mut packet).unwrap();
        assert_eq!(packet[0], 0);

        assert!(matches!(
            bus.read_packet(&mut packet),
            Err(Fault::EndOfStream)
        ));
    }

    #[test]
    fn empty_stream_is_end_of_stream() {
        let mut bus = FileBus::new(Cursor::new(Vec::new()));
        let mut packet: RawPacket = [0; PACKET_SIZE];
        assert!(matches!(
            bus.read_packet(&mut packet),
            Err(Fault::EndOfStream)
        ));
    }
}
