use std::borrow::Cow;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::sync::Mutex;
use tokio::time;
use tracing::{debug, info, trace, warn};

use super::reachability::{ensure_any_reachable, ReachabilityProbe, TcpReachabilityProbe};
use super::{
    offset_for_partition, ApiKey, ApiVersionRange, AssignedConsumerInfo, BrokerAdmin,
    BrokerCapabilityRegistry, BrokerConfigEntry, BrokerNode, ClusterStateSnapshot, HostPort,
    MemberSummary, NewTopic, Node, SnapshotBuilder, TopicPartition, TriStateConfigValue,
    UnassignedConsumerInfo,
};
use crate::{AppError, AppResult, TimeoutConfig};

/// Awaits `call` for at most `timeout`.
pub async fn with_deadline<T, F>(
    operation: impl Into<Cow<'static, str>>,
    timeout: Duration,
    call: F,
) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(AppError::RpcTimeout {
            operation: operation.into(),
            timeout_ms: timeout.as_millis() as u64,
        }),
    }
}

/// Splits the members of one group into assigned and unassigned consumers.
///
/// A member with N assigned partitions yields exactly N assigned records; a
/// member with none yields one unassigned record and nothing else.
pub fn classify_group_members(
    group_id: &str,
    members: &[MemberSummary],
    offsets: &HashMap<TopicPartition, i64>,
) -> (Vec<AssignedConsumerInfo>, Vec<UnassignedConsumerInfo>) {
    let mut assigned = Vec::new();
    let mut unassigned = Vec::new();

    for member in members {
        debug!("consumer summary {:?}", member);
        if member.assignment.is_empty() {
            unassigned.push(UnassignedConsumerInfo {
                group_id: group_id.to_string(),
                consumer_id: member.consumer_id.clone(),
                client_id: member.client_id.clone(),
                host: member.host.clone(),
            });
            continue;
        }
        for topic_partition in &member.assignment {
            assigned.push(AssignedConsumerInfo {
                group_id: group_id.to_string(),
                consumer_id: member.consumer_id.clone(),
                client_id: member.client_id.clone(),
                host: member.host.clone(),
                topic: topic_partition.topic.clone(),
                partition: topic_partition.partition,
                offset: offset_for_partition(offsets, topic_partition),
            });
        }
    }
    (assigned, unassigned)
}

/// Builds [`ClusterStateSnapshot`]s out of admin calls and publishes them.
///
/// The capability registry and every collected map belong to this instance
/// and are rebuilt from scratch on each refresh. Nothing is retried here; a
/// failed refresh keeps the last published snapshot in place and the caller
/// decides whether to try again.
pub struct ClusterStateCollector {
    admin: Arc<dyn BrokerAdmin>,
    probe: Arc<dyn ReachabilityProbe>,
    timeouts: TimeoutConfig,
    capabilities: ArcSwap<BrokerCapabilityRegistry>,
    snapshot: ArcSwap<ClusterStateSnapshot>,
    refresh_lock: Mutex<()>,
}

impl ClusterStateCollector {
    pub fn new(admin: Arc<dyn BrokerAdmin>, timeouts: TimeoutConfig) -> Self {
        Self::with_probe(admin, Arc::new(TcpReachabilityProbe), timeouts)
    }

    pub fn with_probe(
        admin: Arc<dyn BrokerAdmin>,
        probe: Arc<dyn ReachabilityProbe>,
        timeouts: TimeoutConfig,
    ) -> Self {
        ClusterStateCollector {
            admin,
            probe,
            timeouts,
            capabilities: ArcSwap::from_pointee(BrokerCapabilityRegistry::new()),
            snapshot: ArcSwap::from_pointee(ClusterStateSnapshot::default()),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Last published snapshot; empty before the first successful refresh.
    pub fn snapshot(&self) -> Arc<ClusterStateSnapshot> {
        self.snapshot.load_full()
    }

    pub fn capabilities(&self) -> Arc<BrokerCapabilityRegistry> {
        self.capabilities.load_full()
    }

    pub async fn refresh(&self) -> AppResult<Arc<ClusterStateSnapshot>> {
        let _refreshing = self.refresh_lock.lock().await;

        self.ensure_reachable().await?;

        let description = with_deadline(
            "describe cluster",
            self.timeouts.rpc(),
            self.admin.describe_cluster(),
        )
        .await?;
        let mut builder =
            ClusterStateSnapshot::builder(&description.cluster_id, description.controller_id);
        for node in &description.nodes {
            builder.add_node(BrokerNode::from_node(node, description.controller_id));
        }

        let capabilities = self.probe_capabilities(&description.nodes).await;
        self.collect_broker_configs(&description.nodes, &capabilities, &mut builder)
            .await;

        let topics = with_deadline(
            "describe topics",
            self.timeouts.rpc(),
            self.admin.describe_topics(),
        )
        .await?;
        for topic in &topics {
            builder.add_topic(topic);
        }

        self.collect_consumer_groups(&mut builder).await?;

        let snapshot = Arc::new(builder.build());
        self.capabilities.store(Arc::new(capabilities));
        self.snapshot.store(Arc::clone(&snapshot));
        info!(
            "cluster '{}' refreshed: {} brokers, {} topics",
            snapshot.cluster_id(),
            snapshot.nodes().len(),
            topics.len()
        );
        Ok(snapshot)
    }

    /// Fails unless at least one advertised listener accepts a connection.
    pub async fn ensure_reachable(&self) -> AppResult<HostPort> {
        trace!("looking up advertised listeners");
        let endpoints = with_deadline(
            "find all brokers",
            self.timeouts.rpc(),
            self.admin.advertised_listeners(),
        )
        .await?;
        ensure_any_reachable(self.probe.as_ref(), &endpoints, self.timeouts.reachability()).await
    }

    /// Hands a message to `reporter` when brokers disagree on their configuration.
    pub fn report_invalid_cluster_configuration(&self, reporter: impl FnOnce(String)) {
        let snapshot = self.snapshot();
        if let Some(message) = snapshot.config_consistency().inconsistency_message() {
            reporter(message);
        }
    }

    pub fn is_topic_auto_creation_enabled(&self) -> TriStateConfigValue {
        self.snapshot().is_topic_auto_creation_enabled()
    }

    pub fn is_topic_deletion_enabled(&self) -> TriStateConfigValue {
        self.snapshot().is_topic_deletion_enabled()
    }

    pub async fn create_topic(&self, topic: &NewTopic) -> AppResult<()> {
        info!(
            "creating topic '{}' ({} partitions, replication factor {})",
            topic.name, topic.partitions, topic.replication_factor
        );
        with_deadline(
            format!("create topic '{}'", topic.name),
            self.timeouts.rpc(),
            self.admin.create_topic(topic),
        )
        .await
    }

    pub async fn delete_topic(&self, topic_name: &str) -> AppResult<()> {
        info!("deleting topic '{}'", topic_name);
        with_deadline(
            format!("delete topic '{}'", topic_name),
            self.timeouts.delete_topic(),
            self.admin.delete_topic(topic_name),
        )
        .await
    }

    pub async fn close(&self) -> AppResult<()> {
        trace!("closing kafka admin client");
        with_deadline("close admin client", self.timeouts.close(), self.admin.close()).await?;
        trace!("closing done");
        Ok(())
    }

    async fn probe_capabilities(&self, nodes: &[Node]) -> BrokerCapabilityRegistry {
        let mut registry = BrokerCapabilityRegistry::new();
        for node in nodes {
            let probed = with_deadline(
                format!("api versions of broker {}", node.id),
                self.timeouts.rpc(),
                self.admin.api_versions(node),
            )
            .await;
            match probed {
                Ok(ranges) => {
                    log_api_versions(node, &ranges);
                    registry.record(node.id, &ranges);
                }
                Err(err) => {
                    warn!("could not read api versions of node '{}': {}", node, err);
                    registry.mark_unprobed(node.id);
                }
            }
        }
        registry
    }

    async fn collect_broker_configs(
        &self,
        nodes: &[Node],
        capabilities: &BrokerCapabilityRegistry,
        builder: &mut SnapshotBuilder,
    ) {
        for node in nodes {
            if let Err(err) = capabilities.require(node.id, ApiKey::DescribeConfigs) {
                warn!("{}. Cannot show cluster properties", err);
                continue;
            }
            let described = with_deadline(
                format!("describe config of broker {}", node.id),
                self.timeouts.rpc(),
                self.admin.describe_broker_config(node.id),
            )
            .await;
            match described {
                Ok(entries) => {
                    let entries = entries
                        .into_iter()
                        .map(|entry| BrokerConfigEntry {
                            broker_id: node.id,
                            key: entry.name,
                            value: entry.value,
                        })
                        .collect();
                    builder.add_broker_config(node.id, entries);
                }
                Err(err) => warn!("skipping configuration of node '{}': {}", node, err),
            }
        }
    }

    async fn collect_consumer_groups(&self, builder: &mut SnapshotBuilder) -> AppResult<()> {
        let group_ids = with_deadline(
            "list consumer groups",
            self.timeouts.rpc(),
            self.admin.list_consumer_groups(),
        )
        .await?;

        for group_id in group_ids {
            let members = with_deadline(
                format!("describe consumer group '{}'", group_id),
                self.timeouts.describe_group(),
                self.admin.describe_consumer_group(&group_id),
            )
            .await;
            let members = match members {
                Ok(members) => members,
                Err(err) => {
                    warn!("skipping consumer group '{}': {}", group_id, err);
                    continue;
                }
            };

            let offsets = with_deadline(
                format!("list offsets of consumer group '{}'", group_id),
                self.timeouts.rpc(),
                self.admin.list_group_offsets(&group_id),
            )
            .await;
            let offsets = match offsets {
                Ok(offsets) => offsets,
                Err(err) => {
                    warn!("skipping consumer group '{}': {}", group_id, err);
                    continue;
                }
            };
            debug!(
                "fetched partitions for consumer group '{}' -> '{:?}'",
                group_id, offsets
            );

            let (assigned, unassigned) = classify_group_members(&group_id, &members, &offsets);
            for info in assigned {
                builder.add_assigned_consumer(info);
            }
            for info in unassigned {
                builder.add_unassigned_consumer(info);
            }
        }
        Ok(())
    }
}

fn log_api_versions(node: &Node, ranges: &[ApiVersionRange]) {
    if !tracing::enabled!(tracing::Level::DEBUG) {
        return;
    }
    let mut dump = format!("\n### Api version for node {} ###\n", node);
    for range in ranges {
        dump.push_str(&range.to_string());
        dump.push('\n');
    }
    debug!("{}", dump);
}
