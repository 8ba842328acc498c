//! Basic service (composite compute workload) entity records

use decort_core::status::{Status, TechStatus};
use serde::{Deserialize, Serialize};

/// Full service record as returned by `bservice/get`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicServiceRecord {
    pub id: u64,
    pub name: String,
    #[serde(rename = "rgId")]
    pub rg_id: u64,
    #[serde(rename = "sshUser", default)]
    pub ssh_user: String,
    #[serde(rename = "sshKey", default)]
    pub ssh_key: String,
    pub status: Status,
    #[serde(rename = "techStatus", default)]
    pub tech_status: TechStatus,
    #[serde(default)]
    pub groups: Vec<ServiceGroupRecord>,
    #[serde(default)]
    pub snapshots: Vec<ServiceSnapshotRecord>,
}

/// One compute group of a service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceGroupRecord {
    pub id: u64,
    pub name: String,
    #[serde(rename = "computesCount", default)]
    pub computes_count: u32,
    #[serde(default)]
    pub cpu: u32,
    #[serde(default)]
    pub ram: u32,
    #[serde(default)]
    pub disk: u32,
    #[serde(rename = "imageId", default)]
    pub image_id: u64,
    #[serde(default)]
    pub driver: String,
    #[serde(default)]
    pub role: String,
    #[serde(rename = "timeoutStart", default)]
    pub timeout_start: u32,
    #[serde(default)]
    pub parents: Vec<u64>,
    #[serde(default)]
    pub extnets: Vec<u64>,
    #[serde(default)]
    pub vinses: Vec<u64>,
    #[serde(default)]
    pub computes: Vec<GroupComputeRecord>,
    #[serde(default)]
    pub status: Status,
}

/// Compute entry within a service group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupComputeRecord {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "ipAddresses", default)]
    pub ip_addresses: Vec<String>,
}

/// Service-wide snapshot. Identity is the platform-assigned guid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSnapshotRecord {
    pub guid: String,
    pub label: String,
    #[serde(default)]
    pub timestamp: u64,
    #[serde(default)]
    pub valid: bool,
}

/// Entry of `bservice/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicServiceListItem {
    pub id: u64,
    pub name: String,
    #[serde(rename = "rgId")]
    pub rg_id: u64,
    pub status: Status,
}
