pub mod clock;
pub mod fault;
pub mod logger;
pub mod worker;

pub use clock::now_ns;
pub use fault::{Fault, FaultSite};
pub use logger::{LogLevel, LogRecord, Logger, MEMORY_LOG_CAPACITY};
pub use worker::WorkerHandle;
