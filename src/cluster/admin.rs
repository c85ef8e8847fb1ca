use std::collections::HashMap;

use async_trait::async_trait;

use super::{
    ApiVersionRange, ConfigEntry, ConsumerGroupId, HostPort, MemberSummary, NewTopic, Node,
    TopicDescription, TopicPartition,
};
use crate::AppResult;

/// Result of describe-cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterDescription {
    pub cluster_id: String,
    pub controller_id: i32,
    pub nodes: Vec<Node>,
}

/// Administrative calls the inspector makes against a cluster.
///
/// Implementations talk the broker protocol; callers never rely on an
/// implementation bounding its own wait. The collector wraps every call in a
/// deadline and turns an overrun into [`AppError::RpcTimeout`].
///
/// [`AppError::RpcTimeout`]: crate::AppError::RpcTimeout
#[async_trait]
pub trait BrokerAdmin: Send + Sync {
    /// Endpoints brokers advertise to clients.
    async fn advertised_listeners(&self) -> AppResult<Vec<HostPort>>;

    async fn describe_cluster(&self) -> AppResult<ClusterDescription>;

    async fn api_versions(&self, node: &Node) -> AppResult<Vec<ApiVersionRange>>;

    async fn describe_broker_config(&self, broker_id: i32) -> AppResult<Vec<ConfigEntry>>;

    /// Every topic with partition metadata and topic-level configuration.
    async fn describe_topics(&self) -> AppResult<Vec<TopicDescription>>;

    async fn list_consumer_groups(&self) -> AppResult<Vec<ConsumerGroupId>>;

    async fn describe_consumer_group(&self, group_id: &str) -> AppResult<Vec<MemberSummary>>;

    /// Committed offsets of the group; partitions without a commit are absent.
    async fn list_group_offsets(&self, group_id: &str)
        -> AppResult<HashMap<TopicPartition, i64>>;

    async fn create_topic(&self, topic: &NewTopic) -> AppResult<()>;

    async fn delete_topic(&self, topic_name: &str) -> AppResult<()>;

    async fn close(&self) -> AppResult<()>;
}
