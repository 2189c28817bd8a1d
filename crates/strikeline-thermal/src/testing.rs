//! Scripted control bus for exercising the assembler without hardware.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use strikeline_foundation::Fault;

use crate::bus::ControlBus;
use crate::packet::{FRAME_WIDTH, PACKETS_PER_FRAME, PACKET_SIZE, RawPacket};

struct Script {
    data: Vec<u8>,
    offset: usize,
    finished: bool,
    at_eof: bool,
}

struct Inner {
    script: Mutex<Script>,
    changed: Condvar,
    power_on_count: AtomicU32,
    power_off_count: AtomicU32,
}

/// A control bus backed by a byte script the test appends to. Reads block
/// until a full packet is available or [`ScriptedBus::finish`] is called;
/// power operations only count invocations. Clones share the same script,
/// so a test can keep feeding a bus it has already handed to a worker.
#[derive(Clone)]
pub struct ScriptedBus {
    inner: Arc<Inner>,
}

impl ScriptedBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                script: Mutex::new(Script {
                    data: Vec::new(),
                    offset: 0,
                    finished: false,
                    at_eof: false,
                }),
                changed: Condvar::new(),
                power_on_count: AtomicU32::new(0),
                power_off_count: AtomicU32::new(0),
            }),
        }
    }

    /// Append one well-formed frame with every pixel set to `value`
    /// centi-Kelvin.
    pub fn push_good_frame(&self, value: u16) {
        self.push_frame(good_frame_bytes(value));
    }

    /// Append a frame whose every packet claims row 0.
    pub fn push_bad_frame_all_rows(&self, value: u16) {
        let mut frame = good_frame_bytes(value);
        for row in 0..PACKETS_PER_FRAME {
            frame[row * PACKET_SIZE + 1] = 0;
        }
        self.push_frame(frame);
    }

    /// Append a frame with a single corrupted row index (row 10 claims 0).
    pub fn push_bad_frame_one_row(&self, value: u16) {
        let mut frame = good_frame_bytes(value);
        frame[10 * PACKET_SIZE + 1] = 0;
        self.push_frame(frame);
    }

    fn push_frame(&self, frame: Vec<u8>) {
        let mut script = self.inner.script.lock();
        script.data.extend_from_slice(&frame);
        self.inner.changed.notify_all();
    }

    /// No more data will arrive; readers see `EndOfStream` once the script
    /// is drained.
    pub fn finish(&self) {
        self.inner.script.lock().finished = true;
        self.inner.changed.notify_all();
    }

    /// Block until a reader has observed the end of the script.
    pub fn wait_drained(&self) {
        let mut script = self.inner.script.lock();
        while !script.at_eof {
            self.inner.changed.wait(&mut script);
        }
    }

    pub fn power_on_count(&self) -> u32 {
        self.inner.power_on_count.load(Ordering::SeqCst)
    }

    pub fn power_off_count(&self) -> u32 {
        self.inner.power_off_count.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlBus for ScriptedBus {
    fn power_on(&mut self) -> Result<(), Fault> {
        self.inner.power_on_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn power_off(&mut self) -> Result<(), Fault> {
        self.inner.power_off_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn read_packet(&mut self, packet: &mut RawPacket) -> Result<(), Fault> {
        let mut script = self.inner.script.lock();
        while script.offset + PACKET_SIZE > script.data.len() && !script.finished {
            self.inner.changed.wait(&mut script);
        }
        if script.offset + PACKET_SIZE > script.data.len() {
            // Finished and drained (a trailing partial packet counts too).
            script.at_eof = true;
            self.inner.changed.notify_all();
            return Err(Fault::EndOfStream);
        }
        packet.copy_from_slice(&script.data[script.offset..script.offset + PACKET_SIZE]);
        script.offset += PACKET_SIZE;
        Ok(())
    }
}

/// Wire bytes for one well-formed frame with every pixel at `value`
/// centi-Kelvin, usable for building capture files as well as scripts.
pub fn good_frame_bytes(value: u16) -> Vec<u8> {
    let mut frame = vec![0u8; PACKETS_PER_FRAME * PACKET_SIZE];
    for row in 0..PACKETS_PER_FRAME {
        let packet = &mut frame[row * PACKET_SIZE..(row + 1) * PACKET_SIZE];
        packet[0] = 0;
        packet[1] = row as u8;
        for c in 0..FRAME_WIDTH {
            packet[4 + 2 * c..4 + 2 * c + 2].copy_from_slice(&value.to_be_bytes());
        }
    }
    frame
}
