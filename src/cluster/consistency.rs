use std::collections::{BTreeMap, BTreeSet};

use super::BrokerConfigEntry;

pub const AUTO_CREATE_TOPICS_KEY: &str = "auto.create.topics.enable";
pub const DELETE_TOPIC_KEY: &str = "delete.topic.enable";

/// A boolean broker setting seen across the whole cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriStateConfigValue {
    True,
    False,
    /// brokers disagree
    Inconsistent,
}

/// Compares configuration values reported by every broker and finds keys
/// whose values differ between brokers.
#[derive(Debug, Clone, Default)]
pub struct ClusterConfigConsistencyChecker {
    brokers: BTreeSet<i32>,
    values: BTreeMap<String, BTreeSet<Option<String>>>,
}

impl ClusterConfigConsistencyChecker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a BrokerConfigEntry>) -> Self {
        let mut checker = Self::new();
        for entry in entries {
            checker.add_entry(entry);
        }
        checker
    }

    pub fn add_entry(&mut self, entry: &BrokerConfigEntry) {
        self.brokers.insert(entry.broker_id);
        self.values
            .entry(entry.key.clone())
            .or_default()
            .insert(entry.value.clone());
    }

    /// Number of brokers that contributed at least one entry.
    pub fn broker_count(&self) -> usize {
        self.brokers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.brokers.is_empty()
    }

    pub fn clear(&mut self) {
        self.brokers.clear();
        self.values.clear();
    }

    pub fn inconsistent_keys(&self) -> BTreeSet<String> {
        self.values
            .iter()
            .filter(|(_, values)| values.len() > 1)
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Inconsistent keys together with every distinct value seen for them.
    pub fn inconsistent_values(&self) -> BTreeMap<String, BTreeSet<Option<String>>> {
        self.values
            .iter()
            .filter(|(_, values)| values.len() > 1)
            .map(|(key, values)| (key.clone(), values.clone()))
            .collect()
    }

    pub fn topic_auto_creation_enabled(&self) -> TriStateConfigValue {
        self.flag(AUTO_CREATE_TOPICS_KEY)
    }

    pub fn topic_deletion_enabled(&self) -> TriStateConfigValue {
        self.flag(DELETE_TOPIC_KEY)
    }

    /// With no broker observed, or the key never reported, the answer is `False`.
    pub fn flag(&self, key: &str) -> TriStateConfigValue {
        let Some(values) = self.values.get(key) else {
            return TriStateConfigValue::False;
        };
        if values.len() > 1 {
            return TriStateConfigValue::Inconsistent;
        }
        match values.iter().next() {
            Some(Some(value)) if value.trim().eq_ignore_ascii_case("true") => {
                TriStateConfigValue::True
            }
            _ => TriStateConfigValue::False,
        }
    }

    /// Human readable report of the inconsistent keys, `None` when brokers agree.
    pub fn inconsistency_message(&self) -> Option<String> {
        let keys = self.inconsistent_keys();
        if keys.is_empty() {
            return None;
        }
        let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
        Some(format!(
            "Cluster configuration is inconsistent!\n\
             Below properties are different between nodes but should be the same:\n\n\
             [{}] ",
            keys.join(", ")
        ))
    }
}
