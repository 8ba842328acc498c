//! OS image entity records

use decort_core::status::Status;
use serde::{Deserialize, Serialize};

/// Full image record as returned by `image/get`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: u64,
    pub name: String,
    #[serde(rename = "url", default)]
    pub url: String,
    pub gid: u64,
    #[serde(rename = "type", default)]
    pub image_type: String,
    #[serde(rename = "bootType", default)]
    pub boot_type: String,
    #[serde(default)]
    pub architecture: String,
    #[serde(default)]
    pub drivers: Vec<String>,
    #[serde(rename = "accountId", default)]
    pub account_id: u64,
    #[serde(rename = "sepId", default)]
    pub sep_id: u64,
    #[serde(default)]
    pub pool: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// For a virtual image, the real image it currently links to.
    #[serde(rename = "linkTo", default)]
    pub link_to: u64,
    pub status: Status,
}

/// Entry of `image/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageListItem {
    pub id: u64,
    pub name: String,
    pub status: Status,
}
