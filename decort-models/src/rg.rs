//! Resource group entity records

use decort_core::status::Status;
use serde::{Deserialize, Serialize};

/// Full resource-group record as returned by `rg/get`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RgRecord {
    pub id: u64,
    pub name: String,
    #[serde(rename = "accountId")]
    pub account_id: u64,
    pub gid: u64,
    #[serde(default)]
    pub desc: String,
    pub status: Status,
    #[serde(rename = "defNetType", default)]
    pub def_net_type: String,
    #[serde(rename = "defNetId", default)]
    pub def_net_id: i64,
    #[serde(rename = "resourceLimits", default)]
    pub resource_limits: QuotaRecord,
}

/// Quota record; `-1` means unlimited, matching the platform convention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaRecord {
    /// CPU cores.
    #[serde(rename = "CU_C", default = "unlimited")]
    pub cpu: i64,
    /// RAM in MB.
    #[serde(rename = "CU_M", default = "unlimited")]
    pub ram: i64,
    /// Disk space in GB.
    #[serde(rename = "CU_DM", default = "unlimited")]
    pub disk: i64,
    /// External IP addresses.
    #[serde(rename = "CU_I", default = "unlimited")]
    pub ext_ips: i64,
    /// External network traffic in GB.
    #[serde(rename = "CU_NP", default = "unlimited")]
    pub ext_traffic: i64,
    /// GPU units.
    #[serde(rename = "gpu_units", default = "unlimited")]
    pub gpu_units: i64,
}

fn unlimited() -> i64 {
    -1
}

impl Default for QuotaRecord {
    fn default() -> Self {
        Self {
            cpu: -1,
            ram: -1,
            disk: -1,
            ext_ips: -1,
            ext_traffic: -1,
            gpu_units: -1,
        }
    }
}

/// Entry of `rg/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RgListItem {
    pub id: u64,
    pub name: String,
    #[serde(rename = "accountId")]
    pub account_id: u64,
    pub status: Status,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_quota_fields_default_to_unlimited() {
        let body = r#"{
            "id": 3, "name": "prod", "accountId": 9, "gid": 212,
            "status": "CREATED", "resourceLimits": {"CU_C": 16, "CU_M": 32768}
        }"#;
        let rec: RgRecord = serde_json::from_str(body).unwrap();
        assert_eq!(rec.resource_limits.cpu, 16);
        assert_eq!(rec.resource_limits.disk, -1);
    }
}
