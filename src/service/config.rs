extern crate config as _;

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{AppError, AppResult};

pub const DEFAULT_CONSUMER_GROUP_ID: &str = "kmt-cg";
pub const DEFAULT_HOSTNAME: &str = "localhost";
pub const DEFAULT_PORT: u16 = 9092;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// `host:port` pairs used to reach the cluster.
    pub bootstrap_servers: Vec<String>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        ClusterConfig {
            bootstrap_servers: vec![format!("{}:{}", DEFAULT_HOSTNAME, DEFAULT_PORT)],
        }
    }
}

/// Upper bounds for every broker call made during a refresh.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// less than 2000 ms makes slow resolvers report reachable brokers as dead
    pub reachability_ms: u64,
    pub rpc_ms: u64,
    pub describe_group_ms: u64,
    pub close_ms: u64,
    pub delete_topic_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        TimeoutConfig {
            reachability_ms: 2000,
            rpc_ms: 5000,
            describe_group_ms: 2000,
            close_ms: 2000,
            delete_topic_ms: 2000,
        }
    }
}

impl TimeoutConfig {
    pub fn reachability(&self) -> Duration {
        Duration::from_millis(self.reachability_ms)
    }
    pub fn rpc(&self) -> Duration {
        Duration::from_millis(self.rpc_ms)
    }
    pub fn describe_group(&self) -> Duration {
        Duration::from_millis(self.describe_group_ms)
    }
    pub fn close(&self) -> Duration {
        Duration::from_millis(self.close_ms)
    }
    pub fn delete_topic(&self) -> Duration {
        Duration::from_millis(self.delete_topic_ms)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OffsetReset {
    Earliest,
    #[default]
    Latest,
}

impl OffsetReset {
    pub fn as_str(&self) -> &'static str {
        match self {
            OffsetReset::Earliest => "earliest",
            OffsetReset::Latest => "latest",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// also used as the consumer's client id
    pub name: String,
    pub topic: Option<String>,
    /// `host:port` of the broker the listener bootstraps from
    pub broker_host: Option<String>,
    pub consumer_group: String,
    pub poll_timeout_ms: u64,
    /// extra time a poll may overrun before the watchdog wakes it up
    pub wakeup_grace_ms: u64,
    pub flush_interval_ms: u64,
    /// keep only the most recent lines; 0 keeps everything
    pub max_buffered_records: usize,
    pub offset_reset: OffsetReset,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        ListenerConfig {
            name: "listener".to_string(),
            topic: None,
            broker_host: None,
            consumer_group: DEFAULT_CONSUMER_GROUP_ID.to_string(),
            poll_timeout_ms: 5000,
            wakeup_grace_ms: 2000,
            flush_interval_ms: 500,
            max_buffered_records: 0,
            offset_reset: OffsetReset::default(),
        }
    }
}

impl ListenerConfig {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn wakeup_grace(&self) -> Duration {
        Duration::from_millis(self.wakeup_grace_ms)
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    /// A listener can only run with both a topic and a broker to read it from.
    pub fn is_complete(&self) -> bool {
        let present = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.trim().is_empty());
        present(&self.topic) && present(&self.broker_host)
    }
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ToolConfig {
    pub cluster: ClusterConfig,
    pub timeouts: TimeoutConfig,
    pub listener: ListenerConfig,
}

impl ToolConfig {
    pub fn set_up_config<P: AsRef<Path>>(path: P) -> AppResult<ToolConfig> {
        let path_str = path.as_ref().to_str().ok_or(AppError::InvalidValue(
            "config file path",
            path.as_ref().to_string_lossy().to_string(),
        ))?;
        let config = ::config::Config::builder()
            .add_source(::config::File::with_name(path_str))
            .add_source(
                ::config::Environment::with_prefix("KAFKASCOPE")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        let tool_config: ToolConfig = config.try_deserialize()?;
        Ok(tool_config)
    }
}
