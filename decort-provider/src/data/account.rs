//! Account data source

use async_trait::async_trait;
use decort_client::Form;
use decort_core::context::ReconcileContext;
use decort_core::diagnostics::Diagnostics;
use decort_core::error::{ProviderError, ProviderResult};
use decort_core::lifecycle::DataSource;
use decort_models::account::AccountRecord;
use serde::{Deserialize, Serialize};

use crate::api::Api;

/// Lookup by id, or by exact name over the caller's account list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountQuery {
    #[serde(default)]
    pub account_id: Option<u64>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountData {
    pub id: u64,
    pub name: String,
    pub status: String,
}

/// Account data source.
#[derive(Debug, Clone)]
pub struct AccountDataSource {
    api: Api,
}

impl AccountDataSource {
    pub fn new(api: Api) -> Self {
        Self { api }
    }
}

#[async_trait]
impl DataSource for AccountDataSource {
    type Query = AccountQuery;
    type Output = AccountData;

    fn type_name(&self) -> &'static str {
        "decort_account"
    }

    async fn read(
        &self,
        ctx: &ReconcileContext,
        _diags: &mut Diagnostics,
        query: &AccountQuery,
    ) -> ProviderResult<AccountData> {
        let record: AccountRecord = match (query.account_id, &query.name) {
            (Some(id), _) if id != 0 => {
                self.api
                    .fetch(ctx, "account", "get", &Form::new().uint("accountId", id))
                    .await?
            }
            (_, Some(name)) if !name.is_empty() => {
                let listed: Vec<AccountRecord> =
                    self.api.fetch(ctx, "account", "list", &Form::new()).await?;
                listed
                    .into_iter()
                    .find(|a| &a.name == name && !a.status.is_destroyed())
                    .ok_or_else(|| {
                        ProviderError::not_found(format!("no account named `{name}`"))
                    })?
            }
            _ => {
                return Err(ProviderError::validation(
                    "account lookup needs an id or a name",
                ));
            }
        };
        Ok(AccountData {
            id: record.id,
            name: record.name,
            status: record.status.to_string(),
        })
    }
}
