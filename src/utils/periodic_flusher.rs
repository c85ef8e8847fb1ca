use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{trace, warn};

use super::{RecordBuffer, TextSink};
use crate::{AppError, AppResult};

#[derive(Debug, Default)]
struct StopSignal {
    stopped: Mutex<bool>,
    cond: Condvar,
}

impl StopSignal {
    /// Sleeps until `deadline`; `true` when woken by a stop instead.
    fn wait_until(&self, deadline: Instant) -> bool {
        let mut stopped = self.stopped.lock();
        while !*stopped {
            if self.cond.wait_until(&mut stopped, deadline).timed_out() {
                return *stopped;
            }
        }
        true
    }

    fn stop(&self) {
        *self.stopped.lock() = true;
        self.cond.notify_all();
    }
}

struct Running {
    signal: Arc<StopSignal>,
    handle: JoinHandle<()>,
}

/// Forwards new buffer content to a sink on a fixed cadence.
///
/// The sink only hears about the buffer when something was appended since
/// the previous flush. Stopping performs one last flush so nothing appended
/// before `stop` is lost.
pub struct PeriodicFlusher {
    name: String,
    interval: Duration,
    buffer: Arc<RecordBuffer>,
    sink: Arc<dyn TextSink>,
    running: Mutex<Option<Running>>,
}

impl PeriodicFlusher {
    pub fn new(
        name: impl Into<String>,
        interval: Duration,
        buffer: Arc<RecordBuffer>,
        sink: Arc<dyn TextSink>,
    ) -> Self {
        PeriodicFlusher {
            name: name.into(),
            interval,
            buffer,
            sink,
            running: Mutex::new(None),
        }
    }

    pub fn buffer(&self) -> &Arc<RecordBuffer> {
        &self.buffer
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    /// Starts the timer thread; a no-op when it already runs.
    ///
    /// A zero interval is rejected, the timer would never sleep.
    pub fn start(&self) -> AppResult<()> {
        if self.interval.is_zero() {
            return Err(AppError::InvalidValue(
                "flush interval",
                format!("{:?}", self.interval),
            ));
        }
        let mut running = self.running.lock();
        if running.is_some() {
            return Ok(());
        }

        let signal = Arc::new(StopSignal::default());
        let thread_signal = Arc::clone(&signal);
        let buffer = Arc::clone(&self.buffer);
        let sink = Arc::clone(&self.sink);
        let interval = self.interval;
        let handle = thread::Builder::new()
            .name(format!("{}-flusher", self.name))
            .spawn(move || {
                let mut next = Instant::now() + interval;
                while !thread_signal.wait_until(next) {
                    flush_once(&buffer, sink.as_ref());
                    next += interval;
                    let now = Instant::now();
                    if next < now {
                        next = now + interval;
                    }
                }
                flush_once(&buffer, sink.as_ref());
            })?;

        trace!("flusher '{}' started, interval {:?}", self.name, self.interval);
        *running = Some(Running { signal, handle });
        Ok(())
    }

    /// Stops the timer thread after a final flush. Safe to call repeatedly.
    pub fn stop(&self) {
        let Some(running) = self.running.lock().take() else {
            return;
        };
        running.signal.stop();
        if running.handle.thread().id() == thread::current().id() {
            return;
        }
        if running.handle.join().is_err() {
            warn!("flusher '{}' thread panicked", self.name);
        }
        trace!("flusher '{}' stopped", self.name);
    }
}

impl Drop for PeriodicFlusher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn flush_once(buffer: &RecordBuffer, sink: &dyn TextSink) -> bool {
    match buffer.drain() {
        Some(content) => {
            sink.replace_text(&content);
            true
        }
        None => false,
    }
}
