//! Compute data source

use async_trait::async_trait;
use decort_client::Form;
use decort_core::context::ReconcileContext;
use decort_core::diagnostics::Diagnostics;
use decort_core::error::{ProviderError, ProviderResult};
use decort_core::lifecycle::DataSource;
use decort_models::compute::{ComputeListItem, ComputeRecord};
use serde::{Deserialize, Serialize};

use crate::api::Api;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputeQuery {
    #[serde(default)]
    pub compute_id: Option<u64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub rg_id: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputeData {
    pub id: u64,
    pub name: String,
    pub rg_id: u64,
    pub cpu: u32,
    pub ram: u32,
    pub image_id: u64,
    pub boot_disk_id: u64,
    pub boot_disk_size: u32,
    pub ip_addresses: Vec<String>,
    pub status: String,
    pub tech_status: String,
}

/// Compute data source.
#[derive(Debug, Clone)]
pub struct ComputeDataSource {
    api: Api,
}

impl ComputeDataSource {
    pub fn new(api: Api) -> Self {
        Self { api }
    }
}

#[async_trait]
impl DataSource for ComputeDataSource {
    type Query = ComputeQuery;
    type Output = ComputeData;

    fn type_name(&self) -> &'static str {
        "decort_compute"
    }

    async fn read(
        &self,
        ctx: &ReconcileContext,
        _diags: &mut Diagnostics,
        query: &ComputeQuery,
    ) -> ProviderResult<ComputeData> {
        let record: ComputeRecord = match (query.compute_id, &query.name, query.rg_id) {
            (Some(id), _, _) if id != 0 => {
                self.api
                    .fetch(ctx, "compute", "get", &Form::new().uint("computeId", id))
                    .await?
            }
            (_, Some(name), Some(rg_id)) if !name.is_empty() && rg_id != 0 => {
                let listed: Vec<ComputeListItem> = self
                    .api
                    .fetch(ctx, "compute", "list", &Form::new().uint("rgId", rg_id))
                    .await?;
                let hit = listed
                    .iter()
                    .find(|c| &c.name == name && c.rg_id == rg_id && !c.status.is_destroyed())
                    .ok_or_else(|| {
                        ProviderError::not_found(format!("no compute named `{name}`"))
                    })?;
                self.api
                    .fetch(ctx, "compute", "get", &Form::new().uint("computeId", hit.id))
                    .await?
            }
            _ => {
                return Err(ProviderError::validation(
                    "compute lookup needs an id, or a name plus a resource group",
                ));
            }
        };

        let boot = record.boot_disk();
        Ok(ComputeData {
            id: record.id,
            name: record.name.clone(),
            rg_id: record.rg_id,
            cpu: record.cpus,
            ram: record.ram,
            image_id: record.image_id,
            boot_disk_id: boot.map(|d| d.id).unwrap_or_default(),
            boot_disk_size: boot.map(|d| d.size_max).unwrap_or_default(),
            ip_addresses: record
                .interfaces
                .iter()
                .map(|i| i.ip_address.clone())
                .filter(|ip| !ip.is_empty())
                .collect(),
            status: record.status.to_string(),
            tech_status: record.tech_status.as_str().to_string(),
        })
    }
}
