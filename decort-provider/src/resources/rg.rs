//! Resource group lifecycle
//!
//! Groups own a quota record; updates compare quota fields one by one and
//! send only the changed ones. Deletion honors the force and permanence
//! flags and a host-supplied reason.

use async_trait::async_trait;
use decort_client::Form;
use decort_core::context::ReconcileContext;
use decort_core::diagnostics::Diagnostics;
use decort_core::error::{ProviderError, ProviderResult};
use decort_core::lifecycle::Lifecycle;
use decort_core::status::{Status, StatusAction, classify};
use decort_models::rg::{QuotaRecord, RgListItem, RgRecord};
use serde::{Deserialize, Serialize};

use crate::api::Api;
use crate::resources::settle;

/// Declared quota; `-1` leaves a dimension unlimited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaSpec {
    #[serde(default = "unlimited")]
    pub cpu: i64,
    #[serde(default = "unlimited")]
    pub ram: i64,
    #[serde(default = "unlimited")]
    pub disk: i64,
    #[serde(default = "unlimited")]
    pub ext_ips: i64,
    #[serde(default = "unlimited")]
    pub ext_traffic: i64,
    #[serde(default = "unlimited")]
    pub gpu_units: i64,
}

fn unlimited() -> i64 {
    -1
}

impl Default for QuotaSpec {
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

impl From<&QuotaRecord> for QuotaSpec {
    fn from(q: &QuotaRecord) -> Self {
        Self {
            cpu: q.cpu,
            ram: q.ram,
            disk: q.disk,
            ext_ips: q.ext_ips,
            ext_traffic: q.ext_traffic,
            gpu_units: q.gpu_units,
        }
    }
}

/// Desired resource-group state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RgSpec {
    pub name: String,
    pub account_id: u64,
    #[serde(default)]
    pub gid: Option<u64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub quota: Option<QuotaSpec>,
    #[serde(default)]
    pub def_net_type: Option<String>,
    /// Delete-time flags.
    #[serde(default)]
    pub force: bool,
    #[serde(default)]
    pub permanently: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Persisted resource-group state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RgState {
    pub id: u64,
    pub name: String,
    pub account_id: u64,
    pub gid: u64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub quota: QuotaSpec,
    #[serde(default)]
    pub def_net_type: String,
    #[serde(default)]
    pub def_net_id: i64,
    #[serde(default)]
    pub status: Status,
}

/// Resource-group lifecycle handler.
#[derive(Debug, Clone)]
pub struct RgResource {
    api: Api,
}

impl RgResource {
    pub fn new(api: Api) -> Self {
        Self { api }
    }

    async fn get(&self, ctx: &ReconcileContext, id: u64) -> ProviderResult<RgRecord> {
        self.api
            .fetch(ctx, "rg", "get", &Form::new().uint("rgId", id))
            .await
    }

    async fn find(
        &self,
        ctx: &ReconcileContext,
        id: u64,
        name: &str,
        account_id: u64,
    ) -> ProviderResult<Option<RgRecord>> {
        if id != 0 {
            return match self.get(ctx, id).await {
                Ok(record) => Ok(Some(record)),
                Err(err) if err.is_not_found() => Ok(None),
                Err(err) => Err(err),
            };
        }
        let listed: Vec<RgListItem> = self
            .api
            .fetch(ctx, "rg", "list", &Form::new().uint("accountId", account_id))
            .await?;
        match listed
            .iter()
            .find(|r| r.name == name && r.account_id == account_id && !r.status.is_destroyed())
        {
            None => Ok(None),
            Some(hit) => Ok(Some(self.get(ctx, hit.id).await?)),
        }
    }

    fn state_from_record(record: &RgRecord) -> RgState {
        RgState {
            id: record.id,
            name: record.name.clone(),
            account_id: record.account_id,
            gid: record.gid,
            description: if record.desc.is_empty() {
                None
            } else {
                Some(record.desc.clone())
            },
            quota: QuotaSpec::from(&record.resource_limits),
            def_net_type: record.def_net_type.clone(),
            def_net_id: record.def_net_id,
            status: record.status.clone(),
        }
    }

    /// Append only the quota fields that differ from the recorded ones.
    fn quota_changes(form: Form, prior: &QuotaSpec, desired: &QuotaSpec) -> Form {
        let mut form = form;
        if desired.cpu != prior.cpu {
            form = form.int("maxCpuCapacity", desired.cpu);
        }
        if desired.ram != prior.ram {
            form = form.int("maxMemoryCapacity", desired.ram);
        }
        if desired.disk != prior.disk {
            form = form.int("maxVDiskCapacity", desired.disk);
        }
        if desired.ext_ips != prior.ext_ips {
            form = form.int("maxNumPublicIP", desired.ext_ips);
        }
        if desired.ext_traffic != prior.ext_traffic {
            form = form.int("maxNetworkPeerTransfer", desired.ext_traffic);
        }
        if desired.gpu_units != prior.gpu_units {
            form = form.int("maxNumGpuUnits", desired.gpu_units);
        }
        form
    }
}

#[async_trait]
impl Lifecycle for RgResource {
    type Spec = RgSpec;
    type State = RgState;

    fn type_name(&self) -> &'static str {
        "decort_resgroup"
    }

    async fn create(
        &self,
        ctx: &ReconcileContext,
        _diags: &mut Diagnostics,
        spec: &RgSpec,
    ) -> ProviderResult<RgState> {
        if spec.name.is_empty() || spec.account_id == 0 {
            return Err(ProviderError::validation(
                "resource group needs a name and an account",
            ));
        }
        let gid = spec
            .gid
            .or(ctx.default_grid_id())
            .ok_or_else(|| ProviderError::validation("no grid id declared and no default grid"))?;

        let mut form = Form::new()
            .uint("accountId", spec.account_id)
            .uint("gid", gid)
            .text("name", spec.name.clone())
            .opt_text("desc", spec.description.as_deref())
            .opt_text("defNetType", spec.def_net_type.as_deref());
        if let Some(quota) = &spec.quota {
            // On create every declared limit is new.
            let everything_unset = QuotaSpec {
                cpu: i64::MIN,
                ram: i64::MIN,
                disk: i64::MIN,
                ext_ips: i64::MIN,
                ext_traffic: i64::MIN,
                gpu_units: i64::MIN,
            };
            form = Self::quota_changes(form, &everything_unset, quota);
        }

        let id = self.api.call_id(ctx, "rg", "create", &form).await?;
        tracing::info!(rg = id, name = %spec.name, "resource group created");

        let record = self.get(ctx, id).await?;
        Ok(Self::state_from_record(&record))
    }

    async fn read(
        &self,
        ctx: &ReconcileContext,
        diags: &mut Diagnostics,
        prior: &RgState,
    ) -> ProviderResult<Option<RgState>> {
        let (record, action) = settle(ctx, "resource group", || async move {
            match self.find(ctx, prior.id, &prior.name, prior.account_id).await? {
                None => Ok((None, StatusAction::Proceed)),
                Some(record) => {
                    let action = classify(&record.status);
                    Ok((Some(record), action))
                }
            }
        })
        .await?;
        let Some(record) = record else {
            return Ok(None);
        };

        match action {
            StatusAction::Proceed => {}
            StatusAction::ProceedWithWarning => {
                diags.warn(format!("resource group {} is {}", record.id, record.status));
            }
            StatusAction::Restore => {
                diags.warn(format!(
                    "resource group {} is soft-deleted; an update will restore it",
                    record.id
                ));
            }
            StatusAction::Recreate => {
                if self.api.client().config().recreate_destroyed {
                    return Ok(None);
                }
                return Err(ProviderError::fatal(format!(
                    "resource group {} is destroyed and recreate-on-destroyed is off",
                    record.id
                )));
            }
            StatusAction::Fatal => {
                return Err(ProviderError::fatal(format!(
                    "resource group {} needs operator attention",
                    record.id
                )));
            }
            StatusAction::WaitAndRetry => unreachable!("settled observations are never transitional"),
        }

        Ok(Some(Self::state_from_record(&record)))
    }

    async fn update(
        &self,
        ctx: &ReconcileContext,
        diags: &mut Diagnostics,
        prior: &RgState,
        spec: &RgSpec,
    ) -> ProviderResult<RgState> {
        let id = prior.id;
        let (record, action) = settle(ctx, "resource group", || async move {
            match self.find(ctx, id, &prior.name, prior.account_id).await? {
                None => Ok((None, StatusAction::Proceed)),
                Some(record) => {
                    let action = classify(&record.status);
                    Ok((Some(record), action))
                }
            }
        })
        .await?;
        if record.is_none() {
            return Err(ProviderError::fatal(format!(
                "resource group {id} disappeared from the platform"
            )));
        }
        match action {
            StatusAction::Proceed | StatusAction::ProceedWithWarning => {}
            StatusAction::Restore => {
                self.api
                    .call(ctx, "rg", "restore", &Form::new().uint("rgId", id))
                    .await?;
                self.api
                    .call(ctx, "rg", "enable", &Form::new().uint("rgId", id))
                    .await?;
            }
            StatusAction::Recreate => {
                return Err(ProviderError::fatal(format!(
                    "resource group {id} is destroyed; it must be recreated, not updated"
                )));
            }
            StatusAction::Fatal => {
                return Err(ProviderError::fatal(format!(
                    "resource group {id} needs operator attention"
                )));
            }
            StatusAction::WaitAndRetry => unreachable!("settled observations are never transitional"),
        }

        let mut form = Form::new().uint("rgId", id);
        let mut dirty = false;
        if spec.name != prior.name {
            form = form.text("name", spec.name.clone());
            dirty = true;
        }
        if spec.description != prior.description {
            form = form.text("desc", spec.description.clone().unwrap_or_default());
            dirty = true;
        }
        let desired_quota = spec.quota.clone().unwrap_or_default();
        if desired_quota != prior.quota {
            form = Self::quota_changes(form, &prior.quota, &desired_quota);
            dirty = true;
        }
        if dirty {
            self.api.call(ctx, "rg", "update", &form).await?;
        } else {
            diags.warn("nothing to update for resource group");
        }

        let record = self.get(ctx, id).await?;
        Ok(Self::state_from_record(&record))
    }

    async fn delete(
        &self,
        ctx: &ReconcileContext,
        _diags: &mut Diagnostics,
        prior: &RgState,
        spec: &RgSpec,
    ) -> ProviderResult<()> {
        if prior.id == 0 {
            return Ok(());
        }
        let form = Form::new()
            .uint("rgId", prior.id)
            .boolean("force", spec.force)
            .boolean("permanently", spec.permanently)
            .text("reason", spec.reason.clone().unwrap_or_default());
        match self.api.call(ctx, "rg", "delete", &form).await {
            Ok(_) => Ok(()),
            Err(err) if err.is_not_found() => Ok(()),
            Err(err) => Err(err),
        }
    }

    async fn import(
        &self,
        ctx: &ReconcileContext,
        _diags: &mut Diagnostics,
        id: &str,
    ) -> ProviderResult<RgState> {
        let id: u64 = id
            .parse()
            .map_err(|_| ProviderError::validation(format!("`{id}` is not a resource group id")))?;
        let record = self.get(ctx, id).await?;
        Ok(Self::state_from_record(&record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_changes_emit_only_the_diff() {
        let prior = QuotaSpec {
            cpu: 16,
            ram: 32768,
            ..QuotaSpec::default()
        };
        let desired = QuotaSpec {
            cpu: 32,
            ram: 32768,
            disk: 500,
            ..QuotaSpec::default()
        };
        let form = RgResource::quota_changes(Form::new(), &prior, &desired);
        assert_eq!(form.get("maxCpuCapacity"), Some("32"));
        assert_eq!(form.get("maxVDiskCapacity"), Some("500"));
        assert!(!form.contains("maxMemoryCapacity"));
        assert!(!form.contains("maxNumPublicIP"));
    }

    #[test]
    fn equal_quotas_emit_nothing() {
        let quota = QuotaSpec::default();
        let form = RgResource::quota_changes(Form::new(), &quota, &quota.clone());
        assert!(form.is_empty());
    }
}
