pub use admin::{BrokerAdmin, ClusterDescription};
pub use api_key::{ApiKey, ApiVersionRange};
pub use capability::{BrokerCapabilityRegistry, NodeApiVersions};
pub use collector::{classify_group_members, with_deadline, ClusterStateCollector};
pub use consistency::{
    ClusterConfigConsistencyChecker, TriStateConfigValue, AUTO_CREATE_TOPICS_KEY,
    DELETE_TOPIC_KEY,
};
pub use model::{
    offset_for_partition, AssignedConsumerInfo, BrokerConfigEntry, BrokerNode, ConfigEntry,
    ConsumerGroupId, HostPort, MemberSummary, NewTopic, Node, PartitionMetadata,
    TopicDescription, TopicPartition, TopicSummary, UnassignedConsumerInfo, OFFSET_NOT_FOUND,
};
pub use reachability::{ensure_any_reachable, ReachabilityProbe, TcpReachabilityProbe};
pub use snapshot::{ClusterStateSnapshot, SnapshotBuilder};

mod admin;
mod api_key;
mod capability;
mod collector;
mod consistency;
mod model;
mod reachability;
mod snapshot;
