//! Virtual network segment (ViNS) entity records

use decort_core::status::Status;
use serde::{Deserialize, Serialize};

/// Full ViNS record as returned by `vins/get`.
///
/// The parent is either a resource group or an account; exactly one of the
/// ids is non-zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VinsRecord {
    pub id: u64,
    pub name: String,
    #[serde(rename = "rgId", default)]
    pub rg_id: u64,
    #[serde(rename = "accountId", default)]
    pub account_id: u64,
    /// Network CIDR; non-empty whenever the ViNS is enabled.
    #[serde(default)]
    pub network: String,
    #[serde(rename = "extNetId", default)]
    pub ext_net_id: i64,
    #[serde(rename = "extNetIp", default)]
    pub ext_net_ip: String,
    pub status: Status,
    #[serde(rename = "vnfDev", default)]
    pub vnf_dev: Option<VnfDevRecord>,
    #[serde(default)]
    pub reservations: Vec<ReservationRecord>,
    #[serde(rename = "natRules", default)]
    pub nat_rules: Vec<NatRuleRecord>,
}

/// VNF appliance backing the ViNS routing and NAT functions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VnfDevRecord {
    pub id: u64,
    #[serde(default)]
    pub status: Status,
    #[serde(rename = "techStatus", default)]
    pub tech_status: String,
}

/// DHCP reservation row. Identity is the ip address, or the mac when the ip
/// is left to the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationRecord {
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub mac: String,
    #[serde(rename = "type", default)]
    pub res_type: String,
    #[serde(rename = "computeId", default)]
    pub compute_id: u64,
}

/// NAT (port forwarding) rule row. The platform assigns `rule_id` on add;
/// deletion is by that id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NatRuleRecord {
    #[serde(rename = "ruleId", default)]
    pub rule_id: u64,
    #[serde(rename = "localIp")]
    pub local_ip: String,
    #[serde(rename = "localPort")]
    pub local_port: u16,
    #[serde(rename = "publicPortStart")]
    pub public_port_start: u16,
    #[serde(rename = "publicPortEnd", default)]
    pub public_port_end: u16,
    #[serde(default)]
    pub protocol: String,
}

/// Entry of `vins/list` and `vins/search`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VinsListItem {
    pub id: u64,
    pub name: String,
    #[serde(rename = "rgId", default)]
    pub rg_id: u64,
    #[serde(rename = "accountId", default)]
    pub account_id: u64,
    pub status: Status,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enabled_vins_reports_network() {
        let body = r#"{
            "id": 31, "name": "backend", "rgId": 3, "accountId": 0,
            "network": "192.168.5.0/24", "extNetId": -1, "extNetIp": "",
            "status": "ENABLED",
            "vnfDev": {"id": 77, "status": "ENABLED", "techStatus": "STARTED"},
            "reservations": [{"ip": "192.168.5.5", "mac": "52:54:00:00:00:01", "type": "DHCP", "computeId": 101}],
            "natRules": [{"ruleId": 11, "localIp": "10.0.0.5", "localPort": 80, "publicPortStart": 8080, "publicPortEnd": 8080, "protocol": "tcp"}]
        }"#;
        let rec: VinsRecord = serde_json::from_str(body).unwrap();
        assert!(!rec.network.is_empty());
        assert_eq!(rec.nat_rules[0].rule_id, 11);
        assert_eq!(rec.vnf_dev.unwrap().id, 77);
    }
}
