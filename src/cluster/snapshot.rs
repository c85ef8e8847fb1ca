use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use super::{
    AssignedConsumerInfo, BrokerConfigEntry, BrokerNode, ClusterConfigConsistencyChecker,
    ConfigEntry, TopicDescription, TopicSummary, TriStateConfigValue, UnassignedConsumerInfo,
};

/// Everything learned about the cluster in one refresh.
///
/// A snapshot is never modified after it is built. The collector publishes a
/// new one as a whole, so a reader either sees the previous refresh or the
/// next one, never a mix of both.
#[derive(Debug, Clone, Default)]
pub struct ClusterStateSnapshot {
    cluster_id: String,
    controller_id: Option<i32>,
    nodes: Vec<BrokerNode>,
    topics: BTreeMap<String, TopicSummary>,
    assigned_consumers: BTreeSet<AssignedConsumerInfo>,
    unassigned_consumers: BTreeSet<UnassignedConsumerInfo>,
    topic_configs: BTreeMap<String, Vec<ConfigEntry>>,
    broker_configs: BTreeMap<i32, Vec<BrokerConfigEntry>>,
    consistency: ClusterConfigConsistencyChecker,
    refreshed_at: Option<DateTime<Utc>>,
}

impl ClusterStateSnapshot {
    pub fn builder(cluster_id: impl Into<String>, controller_id: i32) -> SnapshotBuilder {
        SnapshotBuilder {
            snapshot: ClusterStateSnapshot {
                cluster_id: cluster_id.into(),
                controller_id: Some(controller_id),
                ..Default::default()
            },
        }
    }

    pub fn cluster_id(&self) -> &str {
        &self.cluster_id
    }

    pub fn controller_id(&self) -> Option<i32> {
        self.controller_id
    }

    /// `None` until the first successful refresh.
    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.refreshed_at
    }

    pub fn nodes(&self) -> &[BrokerNode] {
        &self.nodes
    }

    pub fn controller(&self) -> Option<&BrokerNode> {
        self.nodes.iter().find(|node| node.is_controller)
    }

    pub fn topics(&self) -> impl Iterator<Item = &TopicSummary> {
        self.topics.values()
    }

    pub fn topic(&self, topic_name: &str) -> Option<&TopicSummary> {
        self.topics.get(topic_name)
    }

    pub fn has_topic(&self, topic_name: &str) -> bool {
        self.topics.contains_key(topic_name)
    }

    /// Zero for topics the cluster does not know.
    pub fn partitions_for_topic(&self, topic_name: &str) -> usize {
        self.topics
            .get(topic_name)
            .map_or(0, |topic| topic.partition_count)
    }

    pub fn topic_properties(&self, topic_name: &str) -> &[ConfigEntry] {
        self.topic_configs
            .get(topic_name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn assigned_consumers(&self) -> &BTreeSet<AssignedConsumerInfo> {
        &self.assigned_consumers
    }

    pub fn consumers_for_topic(&self, topic_name: &str) -> Vec<&AssignedConsumerInfo> {
        self.assigned_consumers
            .iter()
            .filter(|info| info.topic == topic_name)
            .collect()
    }

    pub fn unassigned_consumers(&self) -> &BTreeSet<UnassignedConsumerInfo> {
        &self.unassigned_consumers
    }

    pub fn broker_configs(&self) -> &BTreeMap<i32, Vec<BrokerConfigEntry>> {
        &self.broker_configs
    }

    pub fn config_consistency(&self) -> &ClusterConfigConsistencyChecker {
        &self.consistency
    }

    pub fn is_topic_auto_creation_enabled(&self) -> TriStateConfigValue {
        self.consistency.topic_auto_creation_enabled()
    }

    pub fn is_topic_deletion_enabled(&self) -> TriStateConfigValue {
        self.consistency.topic_deletion_enabled()
    }
}

/// Staging area for a snapshot under construction. The snapshot only becomes
/// readable through [`build`](Self::build), and is immutable from then on.
#[derive(Debug)]
pub struct SnapshotBuilder {
    snapshot: ClusterStateSnapshot,
}

impl SnapshotBuilder {
    pub fn add_node(&mut self, node: BrokerNode) -> &mut Self {
        self.snapshot.nodes.push(node);
        self
    }

    pub fn add_broker_config(&mut self, broker_id: i32, entries: Vec<BrokerConfigEntry>) -> &mut Self {
        self.snapshot.broker_configs.insert(broker_id, entries);
        self
    }

    pub fn add_topic(&mut self, description: &TopicDescription) -> &mut Self {
        let summary = TopicSummary::from_description(description);
        self.snapshot
            .topic_configs
            .insert(description.name.clone(), description.config.clone());
        self.snapshot.topics.insert(summary.name.clone(), summary);
        self
    }

    pub fn add_assigned_consumer(&mut self, info: AssignedConsumerInfo) -> &mut Self {
        self.snapshot.assigned_consumers.insert(info);
        self
    }

    pub fn add_unassigned_consumer(&mut self, info: UnassignedConsumerInfo) -> &mut Self {
        self.snapshot.unassigned_consumers.insert(info);
        self
    }

    pub fn build(mut self) -> ClusterStateSnapshot {
        self.snapshot.nodes.sort_by_key(|node| node.id);
        self.snapshot.consistency = ClusterConfigConsistencyChecker::from_entries(
            self.snapshot.broker_configs.values().flatten(),
        );
        self.snapshot.refreshed_at = Some(Utc::now());
        self.snapshot
    }
}
