//! Load balancer data source

use async_trait::async_trait;
use decort_client::Form;
use decort_core::context::ReconcileContext;
use decort_core::diagnostics::Diagnostics;
use decort_core::error::ProviderResult;
use decort_core::lifecycle::DataSource;
use decort_models::lb::LbRecord;
use serde::{Deserialize, Serialize};

use crate::api::Api;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LbQuery {
    pub lb_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LbData {
    pub id: u64,
    pub name: String,
    pub rg_id: u64,
    pub vins_id: u64,
    pub ext_net_id: u64,
    pub frontend_ip: String,
    pub status: String,
    pub backend_names: Vec<String>,
    pub frontend_names: Vec<String>,
}

/// Load-balancer data source.
#[derive(Debug, Clone)]
pub struct LbDataSource {
    api: Api,
}

impl LbDataSource {
    pub fn new(api: Api) -> Self {
        Self { api }
    }
}

#[async_trait]
impl DataSource for LbDataSource {
    type Query = LbQuery;
    type Output = LbData;

    fn type_name(&self) -> &'static str {
        "decort_lb"
    }

    async fn read(
        &self,
        ctx: &ReconcileContext,
        _diags: &mut Diagnostics,
        query: &LbQuery,
    ) -> ProviderResult<LbData> {
        let record: LbRecord = self
            .api
            .fetch(ctx, "lb", "get", &Form::new().uint("lbId", query.lb_id))
            .await?;
        Ok(LbData {
            id: record.id,
            name: record.name,
            rg_id: record.rg_id,
            vins_id: record.vins_id,
            ext_net_id: record.ext_net_id,
            frontend_ip: record.frontend_ip,
            status: record.status.to_string(),
            backend_names: record.backends.into_iter().map(|b| b.name).collect(),
            frontend_names: record.frontends.into_iter().map(|f| f.name).collect(),
        })
    }
}
