//! Load balancer entity records

use decort_core::status::{Status, TechStatus};
use serde::{Deserialize, Serialize};

/// Load balancer record as returned by `lb/get`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LbRecord {
    pub id: u64,
    pub name: String,
    #[serde(rename = "rgId")]
    pub rg_id: u64,
    #[serde(rename = "vinsId", default)]
    pub vins_id: u64,
    #[serde(rename = "extNetId", default)]
    pub ext_net_id: u64,
    #[serde(rename = "primaryNode", default)]
    pub primary_node: String,
    #[serde(rename = "frontendIp", default)]
    pub frontend_ip: String,
    pub status: Status,
    #[serde(rename = "techStatus", default)]
    pub tech_status: TechStatus,
    #[serde(default)]
    pub frontends: Vec<LbFrontendRecord>,
    #[serde(default)]
    pub backends: Vec<LbBackendRecord>,
}

/// Listener side of the balancer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LbFrontendRecord {
    pub name: String,
    #[serde(default)]
    pub backend: String,
    #[serde(default)]
    pub bindings: Vec<LbBindingRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LbBindingRecord {
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub port: u16,
}

/// Server pool side of the balancer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LbBackendRecord {
    pub name: String,
    #[serde(default)]
    pub algorithm: String,
    #[serde(default)]
    pub servers: Vec<LbServerRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LbServerRecord {
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub check: String,
}
