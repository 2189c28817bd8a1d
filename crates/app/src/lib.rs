pub mod api;
pub mod session;

pub use session::{DriverInfo, Session, SessionConfig, SHUTDOWN_TIMEOUT, STARTUP_TIMEOUT};
