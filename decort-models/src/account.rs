//! Account entity records

use decort_core::status::Status;
use serde::{Deserialize, Serialize};

/// Account record as returned by `account/get` and `account/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountRecord {
    pub id: u64,
    pub name: String,
    pub status: Status,
    #[serde(rename = "createdTime", default)]
    pub created_time: u64,
    #[serde(rename = "updatedTime", default)]
    pub updated_time: u64,
}
