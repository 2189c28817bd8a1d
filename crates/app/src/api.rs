//! Status-code surface mirrored by the language bindings.
//!
//! Every call returns 0 on success, -1 on an operational fault and -2 on a
//! caller error (undersized buffer and the like). Operational faults are
//! routed through one handler that records the fault's origin in the
//! session log; caller errors are returned without logging. The
//! out-of-process marshaling layer wraps these functions one to one.

use strikeline_audio::{AudioSource, StrikeEvent};
use strikeline_foundation::{log_error, Fault, LogLevel};
use strikeline_thermal::{ControlBus, Frame, PIXELS_PER_FRAME};

use crate::session::{DriverInfo, Session, SessionConfig};

fn report(session: &Session, op: &str, fault: &Fault) -> i32 {
    let code = fault.status_code();
    if code == -1 {
        match fault.location() {
            Some(at) => log_error!(session.logger, "{op} failed at {at}: {fault}"),
            None => log_error!(session.logger, "{op} failed: {fault}"),
        }
    }
    code
}

/// Construct a session over the supplied adapters, filling `info_out` and
/// `session_out`. The binding glue chooses the adapters: hardware wiring on
/// the instrument, a capture file and a WAV for replay.
pub fn init(
    bus: Box<dyn ControlBus>,
    source: Box<dyn AudioSource>,
    log_path: Option<&str>,
    info_out: &mut DriverInfo,
    session_out: &mut Option<Session>,
) -> i32 {
    match Session::start(SessionConfig::default(), bus, source, log_path) {
        Ok((session, info)) => {
            *info_out = info;
            *session_out = Some(session);
            0
        }
        Err(fault) => {
            // No session log exists yet, so the failure goes to tracing.
            tracing::error!("init failed: {fault}");
            fault.status_code()
        }
    }
}

/// Block for the next unique frame, filling the caller's pixel buffer and
/// the sequence/timestamp outputs.
pub fn get_frame(
    session: &mut Session,
    pixels_out: &mut [f32],
    seq_out: &mut u32,
    t_ns_out: &mut u64,
) -> i32 {
    if pixels_out.len() < PIXELS_PER_FRAME {
        return -2;
    }
    let mut frame = Frame::new();
    match session.get_frame(&mut frame) {
        Ok(()) => {
            pixels_out[..PIXELS_PER_FRAME].copy_from_slice(&frame.pixels);
            *seq_out = frame.seq;
            *t_ns_out = frame.t_ns;
            0
        }
        Err(fault) => report(session, "get_frame", &fault),
    }
}

/// Drain queued strike timestamps into the caller's buffer.
pub fn get_events(session: &Session, times_out: &mut [u64], count_out: &mut usize) -> i32 {
    let mut events: Vec<StrikeEvent> = Vec::with_capacity(times_out.len());
    match session.get_events(&mut events, times_out.len()) {
        Ok(()) => {
            for (slot, event) in times_out.iter_mut().zip(&events) {
                *slot = event.t_ns;
            }
            *count_out = events.len();
            0
        }
        Err(fault) => report(session, "get_events", &fault),
    }
}

pub fn log_has_entries(session: &Session, flag_out: &mut bool) -> i32 {
    *flag_out = session.log_has_entries();
    0
}

/// Pop the oldest buffered log record. An empty buffer clears `text_out`
/// and still succeeds, matching the drain contract.
pub fn log_pop(session: &Session, level_out: &mut LogLevel, text_out: &mut String) -> i32 {
    match session.log_pop() {
        Some((level, text)) => {
            *level_out = level;
            *text_out = text;
        }
        None => text_out.clear(),
    }
    0
}

pub fn shutdown(session: &mut Session) -> i32 {
    match session.shutdown() {
        Ok(()) => 0,
        Err(fault) => report(session, "shutdown", &fault),
    }
}
