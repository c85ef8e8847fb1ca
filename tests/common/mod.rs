#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::{Condvar, Mutex};

use kafkascope::cluster::{
    ApiKey, ApiVersionRange, BrokerAdmin, ClusterDescription, ConfigEntry, ConsumerGroupId,
    HostPort, MemberSummary, NewTopic, Node, PartitionMetadata, ReachabilityProbe,
    TopicDescription, TopicPartition,
};
use kafkascope::listener::{ConsumedRecord, ConsumerFactory, MessageConsumer};
use kafkascope::{AppError, AppResult, ListenerConfig, TextSink};

pub const STALL: Duration = Duration::from_secs(3600);

/// Console logging for test runs, filtered by `RUST_LOG`.
pub fn init_tracing() {
    kafkascope::setup_local_tracing().unwrap();
}

pub fn full_api_versions() -> Vec<ApiVersionRange> {
    vec![
        ApiVersionRange::new(ApiKey::Metadata, 0, 12),
        ApiVersionRange::new(ApiKey::ApiVersions, 0, 3),
        ApiVersionRange::new(ApiKey::DescribeConfigs, 0, 4),
    ]
}

pub fn legacy_api_versions() -> Vec<ApiVersionRange> {
    vec![
        ApiVersionRange::new(ApiKey::Metadata, 0, 5),
        ApiVersionRange::new(ApiKey::ApiVersions, 0, 1),
    ]
}

pub fn topic(name: &str, partitions: i32) -> TopicDescription {
    TopicDescription {
        name: name.to_string(),
        internal: false,
        partitions: (0..partitions)
            .map(|partition| PartitionMetadata {
                partition,
                leader: Some(1),
                replicas: vec![1, 2],
                isr: vec![1, 2],
            })
            .collect(),
        config: vec![ConfigEntry::new("retention.ms", "604800000")],
    }
}

pub fn member(id: &str, assignment: Vec<TopicPartition>) -> MemberSummary {
    MemberSummary {
        consumer_id: id.to_string(),
        client_id: format!("{}-client", id),
        host: "/10.1.1.1".to_string(),
        assignment,
    }
}

/// In-memory cluster. Every field can be changed between refreshes.
pub struct FakeAdmin {
    pub listeners: Mutex<Vec<HostPort>>,
    pub description: Mutex<ClusterDescription>,
    /// brokers missing here fail their api versions call
    pub api_versions: Mutex<HashMap<i32, Vec<ApiVersionRange>>>,
    pub broker_configs: Mutex<HashMap<i32, Vec<ConfigEntry>>>,
    pub topics: Mutex<Vec<TopicDescription>>,
    pub groups: Mutex<BTreeMap<ConsumerGroupId, Vec<MemberSummary>>>,
    pub offsets: Mutex<HashMap<ConsumerGroupId, HashMap<TopicPartition, i64>>>,
    pub failing_groups: Mutex<HashSet<ConsumerGroupId>>,
    pub fail_topics: AtomicBool,
    pub stall_describe_cluster: AtomicBool,
    pub describe_config_calls: Mutex<Vec<i32>>,
    pub created: Mutex<Vec<NewTopic>>,
    pub deleted: Mutex<Vec<String>>,
    pub closed: AtomicBool,
}

impl FakeAdmin {
    /// Two brokers sharing identical configuration, one topic, no groups.
    pub fn two_brokers() -> Self {
        let nodes = vec![Node::new(1, "kafka-1", 9092), Node::new(2, "kafka-2", 9092)];
        let shared_config = vec![
            ConfigEntry::new("auto.create.topics.enable", "true"),
            ConfigEntry::new("delete.topic.enable", "true"),
            ConfigEntry::new("log.retention.hours", "168"),
        ];
        FakeAdmin {
            listeners: Mutex::new(vec![
                HostPort::new("kafka-1", 9092),
                HostPort::new("kafka-2", 9092),
            ]),
            description: Mutex::new(ClusterDescription {
                cluster_id: "cluster-1".to_string(),
                controller_id: 1,
                nodes,
            }),
            api_versions: Mutex::new(HashMap::from([
                (1, full_api_versions()),
                (2, full_api_versions()),
            ])),
            broker_configs: Mutex::new(HashMap::from([
                (1, shared_config.clone()),
                (2, shared_config),
            ])),
            topics: Mutex::new(vec![topic("orders", 3)]),
            groups: Mutex::new(BTreeMap::new()),
            offsets: Mutex::new(HashMap::new()),
            failing_groups: Mutex::new(HashSet::new()),
            fail_topics: AtomicBool::new(false),
            stall_describe_cluster: AtomicBool::new(false),
            describe_config_calls: Mutex::new(Vec::new()),
            created: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl BrokerAdmin for FakeAdmin {
    async fn advertised_listeners(&self) -> AppResult<Vec<HostPort>> {
        Ok(self.listeners.lock().clone())
    }

    async fn describe_cluster(&self) -> AppResult<ClusterDescription> {
        if self.stall_describe_cluster.load(Ordering::SeqCst) {
            tokio::time::sleep(STALL).await;
        }
        Ok(self.description.lock().clone())
    }

    async fn api_versions(&self, node: &Node) -> AppResult<Vec<ApiVersionRange>> {
        self.api_versions
            .lock()
            .get(&node.id)
            .cloned()
            .ok_or_else(|| AppError::Broker(format!("node {} disconnected", node.id)))
    }

    async fn describe_broker_config(&self, broker_id: i32) -> AppResult<Vec<ConfigEntry>> {
        self.describe_config_calls.lock().push(broker_id);
        Ok(self
            .broker_configs
            .lock()
            .get(&broker_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn describe_topics(&self) -> AppResult<Vec<TopicDescription>> {
        if self.fail_topics.load(Ordering::SeqCst) {
            return Err(AppError::Broker("metadata request failed".to_string()));
        }
        Ok(self.topics.lock().clone())
    }

    async fn list_consumer_groups(&self) -> AppResult<Vec<ConsumerGroupId>> {
        Ok(self.groups.lock().keys().cloned().collect())
    }

    async fn describe_consumer_group(&self, group_id: &str) -> AppResult<Vec<MemberSummary>> {
        let stalls = self.failing_groups.lock().contains(group_id);
        if stalls {
            tokio::time::sleep(STALL).await;
        }
        Ok(self.groups.lock().get(group_id).cloned().unwrap_or_default())
    }

    async fn list_group_offsets(
        &self,
        group_id: &str,
    ) -> AppResult<HashMap<TopicPartition, i64>> {
        Ok(self.offsets.lock().get(group_id).cloned().unwrap_or_default())
    }

    async fn create_topic(&self, topic: &NewTopic) -> AppResult<()> {
        self.created.lock().push(topic.clone());
        Ok(())
    }

    async fn delete_topic(&self, topic_name: &str) -> AppResult<()> {
        self.deleted.lock().push(topic_name.to_string());
        Ok(())
    }

    async fn close(&self) -> AppResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Probe answering from a fixed set of reachable endpoints.
#[derive(Default)]
pub struct FakeProbe {
    pub reachable: Mutex<HashSet<HostPort>>,
    pub probed: Mutex<Vec<HostPort>>,
}

impl FakeProbe {
    pub fn reaching(endpoints: &[HostPort]) -> Self {
        FakeProbe {
            reachable: Mutex::new(endpoints.iter().cloned().collect()),
            probed: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ReachabilityProbe for FakeProbe {
    async fn is_reachable(&self, endpoint: &HostPort, _timeout: Duration) -> bool {
        self.probed.lock().push(endpoint.clone());
        self.reachable.lock().contains(endpoint)
    }
}

/// What one call to `poll` does.
#[derive(Debug, Clone)]
pub enum PollStep {
    Records(Vec<ConsumedRecord>),
    /// ignores its timeout and only returns when woken up
    Hang,
    Fail(String),
}

pub fn record(offset: i64, value: &str) -> ConsumedRecord {
    ConsumedRecord {
        key: Some(format!("key-{}", offset)),
        value: Some(value.to_string()),
        partition: 0,
        offset,
        timestamp_ms: 1_700_000_000_000 + offset,
    }
}

/// Consumer that plays back a script of poll outcomes, then idles.
#[derive(Default)]
pub struct ScriptedConsumer {
    script: Mutex<VecDeque<PollStep>>,
    woken: Mutex<bool>,
    wake: Condvar,
    pub fail_subscribe: AtomicBool,
    pub subscribed: Mutex<Vec<String>>,
    pub polls: AtomicUsize,
    pub commits: AtomicUsize,
    pub wakeups: AtomicUsize,
    pub closed: AtomicBool,
}

impl ScriptedConsumer {
    pub fn with_script(steps: Vec<PollStep>) -> Self {
        ScriptedConsumer {
            script: Mutex::new(steps.into()),
            ..Default::default()
        }
    }

    /// Waits until woken or `deadline`; `true` when woken.
    fn wait_for_wakeup(&self, deadline: Option<Instant>) -> bool {
        let mut woken = self.woken.lock();
        loop {
            if *woken {
                *woken = false;
                return true;
            }
            match deadline {
                Some(deadline) => {
                    if self.wake.wait_until(&mut woken, deadline).timed_out() {
                        let was_woken = *woken;
                        *woken = false;
                        return was_woken;
                    }
                }
                None => self.wake.wait(&mut woken),
            }
        }
    }
}

impl MessageConsumer for ScriptedConsumer {
    fn subscribe(&self, topics: &[String]) -> AppResult<()> {
        if self.fail_subscribe.load(Ordering::SeqCst) {
            return Err(AppError::Consumer("topic authorization failed".to_string()));
        }
        self.subscribed.lock().extend_from_slice(topics);
        Ok(())
    }

    fn poll(&self, timeout: Duration) -> AppResult<Vec<ConsumedRecord>> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let step = self.script.lock().pop_front();
        match step {
            Some(PollStep::Records(records)) => {
                if std::mem::take(&mut *self.woken.lock()) {
                    return Err(AppError::ConsumerInterrupted);
                }
                Ok(records)
            }
            Some(PollStep::Fail(message)) => Err(AppError::Consumer(message)),
            Some(PollStep::Hang) => {
                self.wait_for_wakeup(None);
                Err(AppError::ConsumerInterrupted)
            }
            None => {
                if self.wait_for_wakeup(Some(Instant::now() + timeout)) {
                    Err(AppError::ConsumerInterrupted)
                } else {
                    Ok(Vec::new())
                }
            }
        }
    }

    fn commit(&self) -> AppResult<()> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn wakeup(&self) {
        self.wakeups.fetch_add(1, Ordering::SeqCst);
        *self.woken.lock() = true;
        self.wake.notify_all();
    }

    fn unsubscribe(&self) -> AppResult<()> {
        Ok(())
    }

    fn close(&self) -> AppResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Hands out consumers built from the same script and remembers them.
#[derive(Default)]
pub struct ScriptedFactory {
    pub script: Mutex<Vec<PollStep>>,
    pub fail_subscribe: AtomicBool,
    pub created: Mutex<Vec<Arc<ScriptedConsumer>>>,
}

impl ScriptedFactory {
    pub fn with_script(steps: Vec<PollStep>) -> Self {
        ScriptedFactory {
            script: Mutex::new(steps),
            ..Default::default()
        }
    }

    pub fn last(&self) -> Option<Arc<ScriptedConsumer>> {
        self.created.lock().last().cloned()
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().len()
    }
}

impl ConsumerFactory for ScriptedFactory {
    fn create(&self, _config: &ListenerConfig) -> AppResult<Arc<dyn MessageConsumer>> {
        let consumer = Arc::new(ScriptedConsumer::with_script(self.script.lock().clone()));
        consumer
            .fail_subscribe
            .store(self.fail_subscribe.load(Ordering::SeqCst), Ordering::SeqCst);
        self.created.lock().push(Arc::clone(&consumer));
        Ok(consumer as Arc<dyn MessageConsumer>)
    }
}

/// Sink remembering the last text it was given.
#[derive(Default)]
pub struct CollectingSink {
    pub text: Mutex<String>,
    pub updates: AtomicUsize,
}

impl TextSink for CollectingSink {
    fn replace_text(&self, text: &str) {
        *self.text.lock() = text.to_string();
        self.updates.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn listener_config(name: &str) -> ListenerConfig {
    ListenerConfig {
        name: name.to_string(),
        topic: Some("orders".to_string()),
        broker_host: Some("localhost:9092".to_string()),
        poll_timeout_ms: 50,
        wakeup_grace_ms: 50,
        flush_interval_ms: 20,
        ..Default::default()
    }
}

/// Polls `condition` every few milliseconds until it holds or `within` passes.
pub fn eventually(within: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + within;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}
