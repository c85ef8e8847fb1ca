pub use app_error::{AppError, AppResult};
pub use config::{
    ClusterConfig, ListenerConfig, OffsetReset, TimeoutConfig, ToolConfig,
    DEFAULT_CONSUMER_GROUP_ID, DEFAULT_HOSTNAME, DEFAULT_PORT,
};
pub use tracing_config::{setup_local_tracing, setup_tracing, verbosity_filter};

mod app_error;
mod config;
mod tracing_config;
