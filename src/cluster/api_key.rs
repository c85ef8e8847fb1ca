use std::fmt::{Display, Formatter};

use crate::{AppError, AppResult};

/// Request types a broker may advertise in its ApiVersions response.
///
/// Only the keys the inspector reasons about are listed; brokers report many
/// more, and those are kept as raw numbers in [`ApiVersionRange`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ApiKey {
    Produce = 0,
    Fetch = 1,
    ListOffsets = 2,
    Metadata = 3,
    OffsetCommit = 8,
    OffsetFetch = 9,
    FindCoordinator = 10,
    JoinGroup = 11,
    Heartbeat = 12,
    LeaveGroup = 13,
    SyncGroup = 14,
    DescribeGroups = 15,
    ListGroups = 16,
    ApiVersions = 18,
    CreateTopics = 19,
    DeleteTopics = 20,
    DescribeConfigs = 32,
}

impl ApiKey {
    pub fn from_i16(value: i16) -> AppResult<Self> {
        match value {
            0 => Ok(ApiKey::Produce),
            1 => Ok(ApiKey::Fetch),
            2 => Ok(ApiKey::ListOffsets),
            3 => Ok(ApiKey::Metadata),
            8 => Ok(ApiKey::OffsetCommit),
            9 => Ok(ApiKey::OffsetFetch),
            10 => Ok(ApiKey::FindCoordinator),
            11 => Ok(ApiKey::JoinGroup),
            12 => Ok(ApiKey::Heartbeat),
            13 => Ok(ApiKey::LeaveGroup),
            14 => Ok(ApiKey::SyncGroup),
            15 => Ok(ApiKey::DescribeGroups),
            16 => Ok(ApiKey::ListGroups),
            18 => Ok(ApiKey::ApiVersions),
            19 => Ok(ApiKey::CreateTopics),
            20 => Ok(ApiKey::DeleteTopics),
            32 => Ok(ApiKey::DescribeConfigs),
            invalid => Err(AppError::InvalidValue("api key", invalid.to_string())),
        }
    }

    pub fn as_i16(&self) -> i16 {
        *self as i16
    }
}

impl Display for ApiKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// One entry of a broker's ApiVersions response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiVersionRange {
    pub api_key: i16,
    pub min_version: i16,
    pub max_version: i16,
}

impl ApiVersionRange {
    pub fn new(api_key: ApiKey, min_version: i16, max_version: i16) -> Self {
        ApiVersionRange {
            api_key: api_key.as_i16(),
            min_version,
            max_version,
        }
    }
}

impl Display for ApiVersionRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match ApiKey::from_i16(self.api_key) {
            Ok(key) => write!(
                f,
                "ApiKey '{}', min:{} .. max:{}",
                key, self.min_version, self.max_version
            ),
            Err(_) => write!(
                f,
                "ApiKey '{}', min:{} .. max:{}",
                self.api_key, self.min_version, self.max_version
            ),
        }
    }
}
