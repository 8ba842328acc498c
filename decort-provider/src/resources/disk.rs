//! Standalone disk lifecycle
//!
//! Disks created on their own are data disks pinned to an account and grid,
//! optionally to a storage endpoint and pool. Size only grows; renames go
//! through a dedicated endpoint; attachment to computes is reconciled by the
//! compute that declares the disk.

use async_trait::async_trait;
use decort_client::Form;
use decort_core::context::ReconcileContext;
use decort_core::diagnostics::Diagnostics;
use decort_core::error::{ProviderError, ProviderResult};
use decort_core::lifecycle::Lifecycle;
use decort_core::status::{Status, StatusAction, classify};
use decort_models::disk::DiskRecord;
use serde::{Deserialize, Serialize};

use crate::api::Api;
use crate::resources::settle;

/// Desired disk state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskSpec {
    pub name: String,
    pub account_id: u64,
    #[serde(default)]
    pub gid: Option<u64>,
    pub size: u32,
    #[serde(default)]
    pub sep_id: Option<u64>,
    #[serde(default)]
    pub pool: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Delete-time flags.
    #[serde(default)]
    pub detach: bool,
    #[serde(default)]
    pub permanently: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Persisted disk state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskState {
    pub id: u64,
    pub name: String,
    pub account_id: u64,
    pub gid: u64,
    pub size: u32,
    #[serde(default)]
    pub sep_id: u64,
    #[serde(default)]
    pub pool: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub compute_id: u64,
    #[serde(default)]
    pub status: Status,
}

/// Disk lifecycle handler.
#[derive(Debug, Clone)]
pub struct DiskResource {
    api: Api,
}

impl DiskResource {
    pub fn new(api: Api) -> Self {
        Self { api }
    }

    async fn get(&self, ctx: &ReconcileContext, id: u64) -> ProviderResult<DiskRecord> {
        self.api
            .fetch(ctx, "disks", "get", &Form::new().uint("diskId", id))
            .await
    }

    async fn find(
        &self,
        ctx: &ReconcileContext,
        id: u64,
        name: &str,
        account_id: u64,
    ) -> ProviderResult<Option<DiskRecord>> {
        if id != 0 {
            return match self.get(ctx, id).await {
                Ok(record) => Ok(Some(record)),
                Err(err) if err.is_not_found() => Ok(None),
                Err(err) => Err(err),
            };
        }
        let listed: Vec<DiskRecord> = self
            .api
            .fetch(
                ctx,
                "disks",
                "list",
                &Form::new().uint("accountId", account_id),
            )
            .await?;
        Ok(listed
            .into_iter()
            .find(|d| d.name == name && d.account_id == account_id && !d.status.is_destroyed()))
    }

    fn state_from_record(record: &DiskRecord) -> DiskState {
        DiskState {
            id: record.id,
            name: record.name.clone(),
            account_id: record.account_id,
            gid: record.gid,
            size: record.size_max,
            sep_id: record.sep_id,
            pool: record.pool.clone(),
            description: if record.desc.is_empty() {
                None
            } else {
                Some(record.desc.clone())
            },
            compute_id: record.compute_id,
            status: record.status.clone(),
        }
    }
}

#[async_trait]
impl Lifecycle for DiskResource {
    type Spec = DiskSpec;
    type State = DiskState;

    fn type_name(&self) -> &'static str {
        "decort_disk"
    }

    async fn create(
        &self,
        ctx: &ReconcileContext,
        _diags: &mut Diagnostics,
        spec: &DiskSpec,
    ) -> ProviderResult<DiskState> {
        if spec.name.is_empty() || spec.account_id == 0 || spec.size == 0 {
            return Err(ProviderError::validation(
                "disk needs a name, an account and a non-zero size",
            ));
        }
        let gid = spec
            .gid
            .or(ctx.default_grid_id())
            .ok_or_else(|| ProviderError::validation("no grid id declared and no default grid"))?;

        let form = Form::new()
            .uint("accountId", spec.account_id)
            .uint("gid", gid)
            .text("name", spec.name.clone())
            .uint("size", u64::from(spec.size))
            .text("type", "D")
            .opt_uint("sepId", spec.sep_id)
            .opt_text("pool", spec.pool.as_deref())
            .opt_text("desc", spec.description.as_deref());
        let id = self.api.call_id(ctx, "disks", "create", &form).await?;
        tracing::info!(disk = id, name = %spec.name, "disk created");

        let record = self.get(ctx, id).await?;
        Ok(Self::state_from_record(&record))
    }

    async fn read(
        &self,
        ctx: &ReconcileContext,
        diags: &mut Diagnostics,
        prior: &DiskState,
    ) -> ProviderResult<Option<DiskState>> {
        let (record, action) = settle(ctx, "disk", || async move {
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
            StatusAction::Proceed | StatusAction::ProceedWithWarning => {}
            StatusAction::Restore => {
                diags.warn(format!(
                    "disk {} is soft-deleted; an update will restore it",
                    record.id
                ));
            }
            StatusAction::Recreate => {
                if self.api.client().config().recreate_destroyed {
                    return Ok(None);
                }
                return Err(ProviderError::fatal(format!(
                    "disk {} is destroyed and recreate-on-destroyed is off",
                    record.id
                )));
            }
            StatusAction::Fatal => {
                return Err(ProviderError::fatal(format!(
                    "disk {} needs operator attention",
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
        prior: &DiskState,
        spec: &DiskSpec,
    ) -> ProviderResult<DiskState> {
        let id = prior.id;

        if prior.status.is_deleted() {
            self.api
                .call(ctx, "disks", "restore", &Form::new().uint("diskId", id))
                .await?;
        }

        if spec.size > prior.size {
            let form = Form::new().uint("diskId", id).uint("size", u64::from(spec.size));
            self.api.call(ctx, "disks", "resize", &form).await?;
        } else if spec.size < prior.size {
            diags.warn(format!(
                "shrinking disk `{}` is not allowed: keeping {} GB, requested {} GB",
                prior.name, prior.size, spec.size
            ));
        }

        if spec.name != prior.name {
            let form = Form::new()
                .uint("diskId", id)
                .text("name", spec.name.clone());
            self.api.call(ctx, "disks", "rename", &form).await?;
        }

        let record = self.get(ctx, id).await?;
        Ok(Self::state_from_record(&record))
    }

    async fn delete(
        &self,
        ctx: &ReconcileContext,
        _diags: &mut Diagnostics,
        prior: &DiskState,
        spec: &DiskSpec,
    ) -> ProviderResult<()> {
        if prior.id == 0 {
            return Ok(());
        }
        let form = Form::new()
            .uint("diskId", prior.id)
            .boolean("detach", spec.detach)
            .boolean("permanently", spec.permanently)
            .text("reason", spec.reason.clone().unwrap_or_default());
        match self.api.call(ctx, "disks", "delete", &form).await {
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
    ) -> ProviderResult<DiskState> {
        let id: u64 = id
            .parse()
            .map_err(|_| ProviderError::validation(format!("`{id}` is not a disk id")))?;
        let record = self.get(ctx, id).await?;
        Ok(Self::state_from_record(&record))
    }
}
