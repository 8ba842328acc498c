//! Kubernetes cluster entity records

use decort_core::status::{Status, TechStatus};
use serde::{Deserialize, Serialize};

/// Full cluster record as returned by `k8s/get`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct K8sRecord {
    pub id: u64,
    pub name: String,
    #[serde(rename = "rgId")]
    pub rg_id: u64,
    /// Catalog item the cluster was built from.
    #[serde(rename = "ciId", default)]
    pub ci_id: u64,
    /// Load balancer fronting the API endpoint, when created with one.
    #[serde(rename = "lbId", default)]
    pub lb_id: u64,
    #[serde(rename = "vinsId", default)]
    pub vins_id: u64,
    #[serde(default)]
    pub desc: String,
    pub status: Status,
    #[serde(rename = "techStatus", default)]
    pub tech_status: TechStatus,
    #[serde(rename = "k8sGroups", default)]
    pub groups: Option<K8sGroupsRecord>,
}

/// Master group plus worker groups of one cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct K8sGroupsRecord {
    pub masters: MasterGroupRecord,
    #[serde(default)]
    pub workers: Vec<WorkerGroupRecord>,
}

/// Master group spec; immutable after create.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterGroupRecord {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub name: String,
    pub num: u32,
    pub cpu: u32,
    pub ram: u32,
    pub disk: u32,
    #[serde(rename = "detailedInfo", default)]
    pub detailed_info: Vec<NodeRecord>,
}

/// One worker group; `num` is mutable by resize, the rest is fixed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerGroupRecord {
    pub id: u64,
    pub name: String,
    pub num: u32,
    pub cpu: u32,
    pub ram: u32,
    pub disk: u32,
    /// In steady state this list's length equals `num`.
    #[serde(rename = "detailedInfo", default)]
    pub detailed_info: Vec<NodeRecord>,
}

/// One cluster node, backed by a compute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: Status,
    #[serde(rename = "techStatus", default)]
    pub tech_status: TechStatus,
    #[serde(rename = "ipAddress", default)]
    pub ip_address: String,
}

/// Entry of `k8s/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct K8sListItem {
    pub id: u64,
    pub name: String,
    #[serde(rename = "rgId")]
    pub rg_id: u64,
    pub status: Status,
}
