pub mod cluster;
pub mod listener;
pub mod service;
pub mod utils;

pub use cluster::{
    BrokerAdmin, ClusterStateCollector, ClusterStateSnapshot, HostPort, TriStateConfigValue,
};
pub use listener::{
    ConsumedRecord, ConsumerFactory, ConsumerListener, ListenerLifecycleState, Listeners,
    MessageConsumer,
};
pub use service::{
    setup_local_tracing, setup_tracing, AppError, AppResult, ClusterConfig, ListenerConfig,
    OffsetReset, TimeoutConfig, ToolConfig,
};
pub use utils::{PeriodicFlusher, RecordBuffer, TextSink, WatchdogTimer};
