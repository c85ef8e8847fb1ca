use std::borrow::Cow;

use crate::cluster::ApiKey;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// general errors
    #[error("illegal state: {0}")]
    IllegalStateError(Cow<'static, str>),

    #[error("invalid value: {0}: {1}")]
    InvalidValue(&'static str, String),

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("config file error: {0}")]
    ConfigFileError(#[from] config::ConfigError),

    #[error("tracing subscriber error: {0}")]
    SubscriberError(#[from] tracing::subscriber::SetGlobalDefaultError),

    /// cluster errors
    #[error("{message}")]
    ClusterConfiguration {
        message: String,
        unreachable: Vec<String>,
    },

    #[error("{operation} did not complete within {timeout_ms} ms")]
    RpcTimeout {
        operation: Cow<'static, str>,
        timeout_ms: u64,
    },

    #[error("broker {broker_id} does not support {api:?}")]
    UnsupportedCapability { broker_id: i32, api: ApiKey },

    #[error("broker error: {0}")]
    Broker(String),

    /// consumer errors
    #[error("consumer interrupted by wakeup")]
    ConsumerInterrupted,

    #[error("consumer error: {0}")]
    Consumer(String),
}

impl AppError {
    /// Whether re-invoking the failed operation may succeed without operator action.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::RpcTimeout { .. } | AppError::Broker(_) | AppError::IoError(_)
        )
    }
}
