//! Standalone disk entity records

use decort_core::status::{Status, TechStatus};
use serde::{Deserialize, Serialize};

use crate::compute::DiskType;

/// Full disk record as returned by `disks/get`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskRecord {
    pub id: u64,
    pub name: String,
    #[serde(rename = "accountId")]
    pub account_id: u64,
    #[serde(default)]
    pub gid: u64,
    #[serde(rename = "type")]
    pub disk_type: DiskType,
    #[serde(rename = "sizeMax")]
    pub size_max: u32,
    #[serde(rename = "sizeUsed", default)]
    pub size_used: u32,
    #[serde(rename = "sepId", default)]
    pub sep_id: u64,
    #[serde(default)]
    pub pool: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub shareable: bool,
    /// Compute the disk is attached to; zero when detached. A data disk is
    /// attached to at most one compute at a time.
    #[serde(rename = "computeId", default)]
    pub compute_id: u64,
    pub status: Status,
    #[serde(rename = "techStatus", default)]
    pub tech_status: TechStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detached_disk_has_zero_compute_id() {
        let body = r#"{
            "id": 42, "name": "data-0", "accountId": 9, "gid": 212,
            "type": "D", "sizeMax": 20, "sepId": 1, "pool": "vmstor",
            "status": "CREATED"
        }"#;
        let rec: DiskRecord = serde_json::from_str(body).unwrap();
        assert_eq!(rec.compute_id, 0);
        assert_eq!(rec.disk_type, DiskType::Data);
    }
}
