pub use periodic_flusher::PeriodicFlusher;
pub use record_buffer::{RecordBuffer, TextSink};
pub use watchdog::{WatchdogState, WatchdogTimer};

mod periodic_flusher;
mod record_buffer;
mod watchdog;
