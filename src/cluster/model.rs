use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use tracing::trace;

use crate::{AppError, AppResult};

/// Offset reported for an assigned partition the group never committed.
pub const OFFSET_NOT_FOUND: &str = "NOT_FOUND";

pub type ConsumerGroupId = String;

/// A `host:port` pair, as found in advertised listeners and bootstrap lists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostPort {
    pub host: String,
    pub port: u16,
}

impl HostPort {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        HostPort {
            host: host.into(),
            port,
        }
    }
}

impl Display for HostPort {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for HostPort {
    type Err = AppError;

    fn from_str(s: &str) -> AppResult<Self> {
        let error = || AppError::InvalidValue("host:port", s.to_string());
        let (host, port) = s.trim().rsplit_once(':').ok_or_else(error)?;
        // ipv6 literals come bracketed, the socket address wants the bare address
        let host = match host.strip_prefix('[') {
            Some(bracketed) => bracketed.strip_suffix(']').ok_or_else(error)?,
            None => host,
        };
        if host.is_empty() {
            return Err(error());
        }
        let port = port.parse::<u16>().map_err(|_| error())?;
        Ok(HostPort::new(host, port))
    }
}

/// Broker address as returned by the cluster description.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Node {
    pub id: i32,
    pub host: String,
    pub port: u16,
}

impl Node {
    pub fn new(id: i32, host: impl Into<String>, port: u16) -> Self {
        Node {
            id,
            host: host.into(),
            port,
        }
    }
}

impl Display for Node {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} (id: {})", self.host, self.port, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BrokerNode {
    pub id: i32,
    pub host: String,
    pub port: u16,
    pub is_controller: bool,
}

impl BrokerNode {
    pub fn from_node(node: &Node, controller_id: i32) -> Self {
        BrokerNode {
            id: node.id,
            host: node.host.clone(),
            port: node.port,
            is_controller: node.id == controller_id,
        }
    }
}

/// A single configuration key as reported by a broker or a topic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConfigEntry {
    pub name: String,
    /// sensitive entries come back without a value
    pub value: Option<String>,
}

impl ConfigEntry {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        ConfigEntry {
            name: name.into(),
            value: Some(value.into()),
        }
    }
}

impl Display for ConfigEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}={}",
            self.name,
            self.value.as_deref().unwrap_or("<null>")
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BrokerConfigEntry {
    pub broker_id: i32,
    pub key: String,
    pub value: Option<String>,
}

#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TopicPartition {
    pub topic: String,
    pub partition: i32,
}

impl TopicPartition {
    pub fn new(topic: impl Into<String>, partition: i32) -> Self {
        TopicPartition {
            topic: topic.into(),
            partition,
        }
    }
}

impl Display for TopicPartition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.topic, self.partition)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionMetadata {
    pub partition: i32,
    pub leader: Option<i32>,
    pub replicas: Vec<i32>,
    pub isr: Vec<i32>,
}

/// Topic as returned by the admin seam, before aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicDescription {
    pub name: String,
    pub internal: bool,
    pub partitions: Vec<PartitionMetadata>,
    pub config: Vec<ConfigEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSummary {
    pub name: String,
    pub internal: bool,
    pub partition_count: usize,
    /// distinct broker ids holding any replica of the topic
    pub replica_brokers: Vec<i32>,
    /// partitions whose in-sync set is smaller than their replica set
    pub under_replicated_partitions: usize,
    /// partitions without an elected leader
    pub offline_partitions: usize,
    pub partitions: Vec<PartitionMetadata>,
}

impl TopicSummary {
    pub fn from_description(description: &TopicDescription) -> Self {
        let mut partitions = description.partitions.clone();
        partitions.sort_by_key(|p| p.partition);

        let mut replica_brokers: Vec<i32> = partitions
            .iter()
            .flat_map(|p| p.replicas.iter().copied())
            .collect();
        replica_brokers.sort_unstable();
        replica_brokers.dedup();

        TopicSummary {
            name: description.name.clone(),
            internal: description.internal,
            partition_count: partitions.len(),
            replica_brokers,
            under_replicated_partitions: partitions
                .iter()
                .filter(|p| p.isr.len() < p.replicas.len())
                .count(),
            offline_partitions: partitions.iter().filter(|p| p.leader.is_none()).count(),
            partitions,
        }
    }
}

/// Member of a consumer group as reported by describe-group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberSummary {
    pub consumer_id: String,
    pub client_id: String,
    pub host: String,
    pub assignment: Vec<TopicPartition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssignedConsumerInfo {
    pub group_id: ConsumerGroupId,
    pub consumer_id: String,
    pub client_id: String,
    pub host: String,
    pub topic: String,
    pub partition: i32,
    /// committed offset, or [`OFFSET_NOT_FOUND`]
    pub offset: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnassignedConsumerInfo {
    pub group_id: ConsumerGroupId,
    pub consumer_id: String,
    pub client_id: String,
    pub host: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTopic {
    pub name: String,
    pub partitions: i32,
    pub replication_factor: i16,
    pub config: Vec<ConfigEntry>,
}

/// Committed offset of `topic_partition` rendered for display.
pub fn offset_for_partition(
    offsets: &HashMap<TopicPartition, i64>,
    topic_partition: &TopicPartition,
) -> String {
    match offsets.get(topic_partition) {
        Some(offset) => {
            trace!("found offset {} for {}", offset, topic_partition);
            offset.to_string()
        }
        None => {
            trace!("no committed offset for {}", topic_partition);
            OFFSET_NOT_FOUND.to_string()
        }
    }
}
