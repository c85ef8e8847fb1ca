use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone};

use crate::{AppResult, ListenerConfig};

pub use consumer_listener::ConsumerListener;
pub use registry::Listeners;

mod consumer_listener;
mod registry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerLifecycleState {
    Stopped,
    Starting,
    Running,
    StoppingRequested,
}

impl ListenerLifecycleState {
    /// Stopped -> Starting -> Running -> StoppingRequested -> Stopped.
    ///
    /// A run that fails (or is asked to stop) before its subscription
    /// completes goes straight from Starting to StoppingRequested.
    pub fn can_transition_to(self, next: ListenerLifecycleState) -> bool {
        use ListenerLifecycleState::*;
        matches!(
            (self, next),
            (Stopped, Starting)
                | (Starting, Running)
                | (Starting, StoppingRequested)
                | (Running, StoppingRequested)
                | (StoppingRequested, Stopped)
        )
    }
}

impl Display for ListenerLifecycleState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// One record returned by a poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumedRecord {
    pub key: Option<String>,
    pub value: Option<String>,
    pub partition: i32,
    pub offset: i64,
    /// milliseconds since the unix epoch
    pub timestamp_ms: i64,
}

/// A subscribed consumer the listener drives from its own thread.
///
/// `poll` blocks; every other method must be callable while it does.
pub trait MessageConsumer: Send + Sync {
    fn subscribe(&self, topics: &[String]) -> AppResult<()>;

    /// Waits up to `timeout` for records. Fails with
    /// [`AppError::ConsumerInterrupted`] when [`wakeup`](Self::wakeup) was
    /// called during the wait, or before it if that wakeup was not consumed yet.
    ///
    /// [`AppError::ConsumerInterrupted`]: crate::AppError::ConsumerInterrupted
    fn poll(&self, timeout: Duration) -> AppResult<Vec<ConsumedRecord>>;

    /// Commits the offsets of the records returned so far.
    fn commit(&self) -> AppResult<()>;

    /// Interrupts a blocked or upcoming poll.
    fn wakeup(&self);

    fn unsubscribe(&self) -> AppResult<()>;

    fn close(&self) -> AppResult<()>;
}

pub trait ConsumerFactory: Send + Sync {
    fn create(&self, config: &ListenerConfig) -> AppResult<Arc<dyn MessageConsumer>>;
}

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Renders a record the way it is shown to the operator.
pub fn format_record_line(record: &ConsumedRecord, now: DateTime<Local>) -> String {
    let timestamp = Local
        .timestamp_millis_opt(record.timestamp_ms)
        .single()
        .map(|ts| ts.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_else(|| record.timestamp_ms.to_string());
    format!(
        "[{}] ConsumerRecord: (key:{},  partition:{}, offset:{}, timestamp:{})\nvalue '{}'\n",
        now.format(TIMESTAMP_FORMAT),
        record.key.as_deref().unwrap_or("null"),
        record.partition,
        record.offset,
        timestamp,
        record.value.as_deref().unwrap_or("null"),
    )
}
