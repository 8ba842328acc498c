//! ViNS data source

use async_trait::async_trait;
use decort_client::Form;
use decort_core::context::ReconcileContext;
use decort_core::diagnostics::Diagnostics;
use decort_core::error::{ProviderError, ProviderResult};
use decort_core::lifecycle::DataSource;
use decort_models::vins::{VinsListItem, VinsRecord};
use serde::{Deserialize, Serialize};

use crate::api::Api;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VinsQuery {
    #[serde(default)]
    pub vins_id: Option<u64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub rg_id: Option<u64>,
    #[serde(default)]
    pub account_id: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VinsData {
    pub id: u64,
    pub name: String,
    pub rg_id: u64,
    pub account_id: u64,
    pub cidr: String,
    pub ext_net_id: i64,
    pub ext_net_ip: String,
    pub status: String,
}

/// ViNS data source.
#[derive(Debug, Clone)]
pub struct VinsDataSource {
    api: Api,
}

impl VinsDataSource {
    pub fn new(api: Api) -> Self {
        Self { api }
    }
}

#[async_trait]
impl DataSource for VinsDataSource {
    type Query = VinsQuery;
    type Output = VinsData;

    fn type_name(&self) -> &'static str {
        "decort_vins"
    }

    async fn read(
        &self,
        ctx: &ReconcileContext,
        _diags: &mut Diagnostics,
        query: &VinsQuery,
    ) -> ProviderResult<VinsData> {
        let record: VinsRecord = if let Some(id) = query.vins_id.filter(|id| *id != 0) {
            self.api
                .fetch(ctx, "vins", "get", &Form::new().uint("vinsId", id))
                .await?
        } else {
            let name = query
                .name
                .as_deref()
                .filter(|n| !n.is_empty())
                .ok_or_else(|| {
                    ProviderError::validation("vins lookup needs an id or a name with a parent")
                })?;
            let form = match (query.rg_id, query.account_id) {
                (Some(rg), _) if rg != 0 => Form::new().uint("rgId", rg),
                (_, Some(acc)) if acc != 0 => Form::new().uint("accountId", acc),
                _ => {
                    return Err(ProviderError::validation(
                        "vins lookup by name needs rg_id or account_id",
                    ));
                }
            };
            let listed: Vec<VinsListItem> = self.api.fetch(ctx, "vins", "search", &form).await?;
            let hit = listed
                .iter()
                .find(|v| v.name == name && !v.status.is_destroyed())
                .ok_or_else(|| ProviderError::not_found(format!("no vins named `{name}`")))?;
            self.api
                .fetch(ctx, "vins", "get", &Form::new().uint("vinsId", hit.id))
                .await?
        };

        Ok(VinsData {
            id: record.id,
            name: record.name,
            rg_id: record.rg_id,
            account_id: record.account_id,
            cidr: record.network,
            ext_net_id: record.ext_net_id,
            ext_net_ip: record.ext_net_ip,
            status: record.status.to_string(),
        })
    }
}
