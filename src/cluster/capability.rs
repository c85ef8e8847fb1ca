use std::collections::HashMap;

use super::{ApiKey, ApiVersionRange};
use crate::{AppError, AppResult};

/// ApiVersions response of a single broker, keyed by raw api key.
#[derive(Debug, Clone, Default)]
pub struct NodeApiVersions {
    ranges: HashMap<i16, (i16, i16)>,
}

impl NodeApiVersions {
    pub fn new(ranges: &[ApiVersionRange]) -> Self {
        NodeApiVersions {
            ranges: ranges
                .iter()
                .map(|r| (r.api_key, (r.min_version, r.max_version)))
                .collect(),
        }
    }

    pub fn supports(&self, api: ApiKey) -> bool {
        self.version_range(api)
            .is_some_and(|(min, max)| min <= max)
    }

    pub fn version_range(&self, api: ApiKey) -> Option<(i16, i16)> {
        self.ranges.get(&api.as_i16()).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

/// Which optional admin calls each broker accepts.
///
/// Brokers that were never probed, or whose probe failed, are treated as
/// supporting nothing.
#[derive(Debug, Clone, Default)]
pub struct BrokerCapabilityRegistry {
    nodes: HashMap<i32, NodeApiVersions>,
}

impl BrokerCapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, broker_id: i32, ranges: &[ApiVersionRange]) {
        self.nodes.insert(broker_id, NodeApiVersions::new(ranges));
    }

    pub fn mark_unprobed(&mut self, broker_id: i32) {
        self.nodes.insert(broker_id, NodeApiVersions::default());
    }

    pub fn supports(&self, broker_id: i32, api: ApiKey) -> bool {
        self.nodes
            .get(&broker_id)
            .is_some_and(|versions| versions.supports(api))
    }

    pub fn supports_describe_config(&self, broker_id: i32) -> bool {
        self.supports(broker_id, ApiKey::DescribeConfigs)
    }

    /// Same as [`supports`](Self::supports) but as an error the caller can log.
    pub fn require(&self, broker_id: i32, api: ApiKey) -> AppResult<()> {
        if self.supports(broker_id, api) {
            Ok(())
        } else {
            Err(AppError::UnsupportedCapability { broker_id, api })
        }
    }

    pub fn node(&self, broker_id: i32) -> Option<&NodeApiVersions> {
        self.nodes.get(&broker_id)
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
