//! Compute entity records

use decort_core::status::{Status, TechStatus};
use serde::{Deserialize, Serialize};

/// Network a compute interface is plugged into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NetType {
    #[serde(rename = "EXTNET")]
    ExtNet,
    #[serde(rename = "VINS")]
    Vins,
}

impl NetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NetType::ExtNet => "EXTNET",
            NetType::Vins => "VINS",
        }
    }
}

/// Full compute record as returned by `compute/get`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputeRecord {
    pub id: u64,
    pub name: String,
    #[serde(rename = "rgId")]
    pub rg_id: u64,
    #[serde(default)]
    pub driver: String,
    pub cpus: u32,
    pub ram: u32,
    #[serde(rename = "imageId", default)]
    pub image_id: u64,
    #[serde(default)]
    pub desc: String,
    pub status: Status,
    #[serde(rename = "techStatus", default)]
    pub tech_status: TechStatus,
    #[serde(default)]
    pub disks: Vec<ComputeDiskRecord>,
    #[serde(default)]
    pub interfaces: Vec<InterfaceRecord>,
    #[serde(rename = "osUsers", default)]
    pub os_users: Vec<OsUserRecord>,
}

impl ComputeRecord {
    /// The boot disk is implicitly owned by the compute and attached once.
    pub fn boot_disk(&self) -> Option<&ComputeDiskRecord> {
        self.disks.iter().find(|d| d.disk_type == DiskType::Boot)
    }

    pub fn data_disks(&self) -> impl Iterator<Item = &ComputeDiskRecord> {
        self.disks.iter().filter(|d| d.disk_type == DiskType::Data)
    }
}

/// Disk role on the platform: `B` boot, `D` data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiskType {
    #[serde(rename = "B")]
    Boot,
    #[serde(rename = "D")]
    Data,
}

/// Disk entry inside a compute record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputeDiskRecord {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub disk_type: DiskType,
    #[serde(rename = "sizeMax", default)]
    pub size_max: u32,
    #[serde(rename = "sepId", default)]
    pub sep_id: u64,
    #[serde(default)]
    pub pool: String,
}

/// Network interface entry inside a compute record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceRecord {
    #[serde(rename = "netType")]
    pub net_type: NetType,
    #[serde(rename = "netId")]
    pub net_id: u64,
    #[serde(rename = "ipAddress", default)]
    pub ip_address: String,
    #[serde(default)]
    pub mac: String,
}

/// Guest OS account provisioned by the platform; always server-computed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OsUserRecord {
    #[serde(default)]
    pub guid: String,
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub password: String,
    #[serde(rename = "pubkey", default)]
    pub public_key: String,
}

/// Entry of `compute/list`; carries enough to probe by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputeListItem {
    pub id: u64,
    pub name: String,
    #[serde(rename = "rgId")]
    pub rg_id: u64,
    pub status: Status,
}
