//! Resource group data source

use async_trait::async_trait;
use decort_client::Form;
use decort_core::context::ReconcileContext;
use decort_core::diagnostics::Diagnostics;
use decort_core::error::{ProviderError, ProviderResult};
use decort_core::lifecycle::DataSource;
use decort_models::compute::ComputeListItem;
use decort_models::rg::{RgListItem, RgRecord};
use serde::{Deserialize, Serialize};

use crate::api::Api;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RgQuery {
    #[serde(default)]
    pub rg_id: Option<u64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub account_id: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RgData {
    pub id: u64,
    pub name: String,
    pub account_id: u64,
    pub gid: u64,
    pub status: String,
    pub def_net_type: String,
    pub def_net_id: i64,
    /// Computes currently parented by the group.
    pub compute_ids: Vec<u64>,
}

/// Resource-group data source with a compute fan-out.
#[derive(Debug, Clone)]
pub struct RgDataSource {
    api: Api,
}

impl RgDataSource {
    pub fn new(api: Api) -> Self {
        Self { api }
    }
}

#[async_trait]
impl DataSource for RgDataSource {
    type Query = RgQuery;
    type Output = RgData;

    fn type_name(&self) -> &'static str {
        "decort_resgroup"
    }

    async fn read(
        &self,
        ctx: &ReconcileContext,
        _diags: &mut Diagnostics,
        query: &RgQuery,
    ) -> ProviderResult<RgData> {
        let record: RgRecord = match (query.rg_id, &query.name, query.account_id) {
            (Some(id), _, _) if id != 0 => {
                self.api
                    .fetch(ctx, "rg", "get", &Form::new().uint("rgId", id))
                    .await?
            }
            (_, Some(name), Some(account_id)) if !name.is_empty() && account_id != 0 => {
                let listed: Vec<RgListItem> = self
                    .api
                    .fetch(ctx, "rg", "list", &Form::new().uint("accountId", account_id))
                    .await?;
                let hit = listed
                    .iter()
                    .find(|r| &r.name == name && !r.status.is_destroyed())
                    .ok_or_else(|| {
                        ProviderError::not_found(format!("no resource group named `{name}`"))
                    })?;
                self.api
                    .fetch(ctx, "rg", "get", &Form::new().uint("rgId", hit.id))
                    .await?
            }
            _ => {
                return Err(ProviderError::validation(
                    "resource group lookup needs an id, or a name plus an account",
                ));
            }
        };

        let computes: Vec<ComputeListItem> = self
            .api
            .fetch(
                ctx,
                "rg",
                "listComputes",
                &Form::new().uint("rgId", record.id),
            )
            .await?;

        Ok(RgData {
            id: record.id,
            name: record.name,
            account_id: record.account_id,
            gid: record.gid,
            status: record.status.to_string(),
            def_net_type: record.def_net_type,
            def_net_id: record.def_net_id,
            compute_ids: computes
                .into_iter()
                .filter(|c| !c.status.is_destroyed())
                .map(|c| c.id)
                .collect(),
        })
    }
}
