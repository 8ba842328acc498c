//! Basic service lifecycle
//!
//! A basic service is a parent entity plus compute groups plus a snapshot
//! set. Every table reconciles by set diff with its own endpoints: snapshots
//! by label (guid assigned by the platform), group parents by id, group
//! ext-net and vins bindings wholesale, compute removals one by one.

use async_trait::async_trait;
use decort_client::Form;
use decort_core::context::ReconcileContext;
use decort_core::diagnostics::Diagnostics;
use decort_core::diff::diff_by_key;
use decort_core::error::{ProviderError, ProviderResult};
use decort_core::lifecycle::Lifecycle;
use decort_core::status::{Status, StatusAction, TechStatus, classify};
use decort_models::bservice::{BasicServiceListItem, BasicServiceRecord, ServiceGroupRecord};
use serde::{Deserialize, Serialize};

use crate::api::Api;
use crate::resources::settle;

fn default_true() -> bool {
    true
}

/// Declared service-wide snapshot. Identity is the label on the declared
/// side, resolved to the platform guid through prior state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotSpec {
    pub label: String,
    /// Edge-triggered on false to true; reset after the rollback fires.
    #[serde(default)]
    pub rollback: bool,
}

/// Declared compute group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSpec {
    pub name: String,
    pub count: u32,
    pub cpu: u32,
    pub ram: u32,
    pub disk: u32,
    pub image_id: u64,
    #[serde(default)]
    pub driver: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub timeout_start: u32,
    #[serde(default)]
    pub parents: Vec<u64>,
    #[serde(default)]
    pub extnets: Vec<u64>,
    #[serde(default)]
    pub vinses: Vec<u64>,
    /// Computes to evict from the group on the next reconciliation.
    #[serde(default)]
    pub remove_computes: Vec<u64>,
}

/// Desired service state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicServiceSpec {
    pub name: String,
    pub rg_id: u64,
    #[serde(default)]
    pub ssh_user: Option<String>,
    #[serde(default)]
    pub ssh_key: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub started: bool,
    /// Edge-triggered on false to true.
    #[serde(default)]
    pub restore: bool,
    #[serde(default)]
    pub snapshots: Vec<SnapshotSpec>,
    #[serde(default)]
    pub groups: Vec<GroupSpec>,
    #[serde(default)]
    pub permanently: bool,
}

/// Observed snapshot with its platform guid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotState {
    pub guid: String,
    pub label: String,
    pub timestamp: u64,
}

/// Observed compute group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupState {
    pub id: u64,
    pub name: String,
    pub count: u32,
    pub cpu: u32,
    pub ram: u32,
    pub disk: u32,
    pub image_id: u64,
    #[serde(default)]
    pub parents: Vec<u64>,
    #[serde(default)]
    pub extnets: Vec<u64>,
    #[serde(default)]
    pub vinses: Vec<u64>,
    #[serde(default)]
    pub compute_ids: Vec<u64>,
}

/// Persisted service state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicServiceState {
    pub id: u64,
    pub name: String,
    pub rg_id: u64,
    #[serde(default)]
    pub ssh_user: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub started: bool,
    #[serde(default)]
    pub snapshots: Vec<SnapshotState>,
    #[serde(default)]
    pub groups: Vec<GroupState>,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub tech_status: TechStatus,
}

/// Basic-service lifecycle handler.
#[derive(Debug, Clone)]
pub struct BasicServiceResource {
    api: Api,
}

impl BasicServiceResource {
    pub fn new(api: Api) -> Self {
        Self { api }
    }

    async fn get(&self, ctx: &ReconcileContext, id: u64) -> ProviderResult<BasicServiceRecord> {
        self.api
            .fetch(ctx, "bservice", "get", &Form::new().uint("serviceId", id))
            .await
    }

    async fn find(
        &self,
        ctx: &ReconcileContext,
        id: u64,
        name: &str,
        rg_id: u64,
    ) -> ProviderResult<Option<BasicServiceRecord>> {
        if id != 0 {
            return match self.get(ctx, id).await {
                Ok(record) => Ok(Some(record)),
                Err(err) if err.is_not_found() => Ok(None),
                Err(err) => Err(err),
            };
        }
        let listed: Vec<BasicServiceListItem> = self
            .api
            .fetch(ctx, "bservice", "list", &Form::new().uint("rgId", rg_id))
            .await?;
        match listed
            .iter()
            .find(|s| s.name == name && s.rg_id == rg_id && !s.status.is_destroyed())
        {
            None => Ok(None),
            Some(hit) => Ok(Some(self.get(ctx, hit.id).await?)),
        }
    }

    fn state_from_record(record: &BasicServiceRecord) -> BasicServiceState {
        BasicServiceState {
            id: record.id,
            name: record.name.clone(),
            rg_id: record.rg_id,
            ssh_user: record.ssh_user.clone(),
            enabled: !matches!(record.status, Status::Disabled),
            started: record.tech_status.is_started(),
            snapshots: record
                .snapshots
                .iter()
                .map(|s| SnapshotState {
                    guid: s.guid.clone(),
                    label: s.label.clone(),
                    timestamp: s.timestamp,
                })
                .collect(),
            groups: record.groups.iter().map(Self::group_state).collect(),
            status: record.status.clone(),
            tech_status: record.tech_status.clone(),
        }
    }

    fn group_state(group: &ServiceGroupRecord) -> GroupState {
        GroupState {
            id: group.id,
            name: group.name.clone(),
            count: group.computes_count,
            cpu: group.cpu,
            ram: group.ram,
            disk: group.disk,
            image_id: group.image_id,
            parents: group.parents.clone(),
            extnets: group.extnets.clone(),
            vinses: group.vinses.clone(),
            compute_ids: group.computes.iter().map(|c| c.id).collect(),
        }
    }

    async fn add_group(
        &self,
        ctx: &ReconcileContext,
        service_id: u64,
        group: &GroupSpec,
    ) -> ProviderResult<()> {
        let form = Form::new()
            .uint("serviceId", service_id)
            .text("name", group.name.clone())
            .uint("count", u64::from(group.count))
            .uint("cpu", u64::from(group.cpu))
            .uint("ram", u64::from(group.ram))
            .uint("disk", u64::from(group.disk))
            .uint("imageId", group.image_id)
            .opt_text("driver", group.driver.as_deref())
            .opt_text("role", group.role.as_deref())
            .uint("timeoutStart", u64::from(group.timeout_start))
            .json_list("extnets", &group.extnets)
            .json_list("vinses", &group.vinses);
        self.api.call(ctx, "bservice", "groupAdd", &form).await?;
        Ok(())
    }

    /// Reconcile one matched group against its declared shape; every table
    /// has its own endpoint.
    async fn reconcile_group(
        &self,
        ctx: &ReconcileContext,
        diags: &mut Diagnostics,
        service_id: u64,
        prior: &GroupState,
        desired: &GroupSpec,
    ) -> ProviderResult<()> {
        let group_form = || {
            Form::new()
                .uint("serviceId", service_id)
                .uint("compgroupId", prior.id)
        };

        if desired.count != prior.count {
            let form = group_form()
                .uint("count", u64::from(desired.count))
                .boolean("force", true);
            self.api.call(ctx, "bservice", "groupResize", &form).await?;
        }

        if desired.cpu != prior.cpu
            || desired.ram != prior.ram
            || desired.disk != prior.disk
        {
            let form = group_form()
                .uint("cpu", u64::from(desired.cpu))
                .uint("ram", u64::from(desired.ram))
                .uint("disk", u64::from(desired.disk))
                .boolean("force", true);
            self.api.call(ctx, "bservice", "groupUpdate", &form).await?;
        }

        // Parents: one endpoint per direction.
        let parents_diff = diff_by_key(&prior.parents, &desired.parents, |p| *p);
        let mut failed = 0usize;
        let mut last_err: Option<ProviderError> = None;
        for parent in &parents_diff.removed {
            ctx.check()?;
            let form = group_form().uint("parentId", **parent);
            if let Err(err) = self
                .api
                .call(ctx, "bservice", "groupParentRemove", &form)
                .await
            {
                failed += 1;
                last_err = Some(err);
            }
        }
        for parent in &parents_diff.added {
            ctx.check()?;
            let form = group_form().uint("parentId", **parent);
            if let Err(err) = self.api.call(ctx, "bservice", "groupParentAdd", &form).await {
                failed += 1;
                last_err = Some(err);
            }
        }
        if let Some(err) = last_err {
            diags.partial_update("group parent reconciliation", failed, &err);
        }

        // Ext-net and vins bindings are replaced wholesale; the platform
        // diffs internally, the provider only detects the change.
        let extnet_diff = diff_by_key(&prior.extnets, &desired.extnets, |n| *n);
        if !extnet_diff.is_empty() {
            let form = group_form().json_list("extnets", &desired.extnets);
            self.api
                .call(ctx, "bservice", "groupUpdateExtnets", &form)
                .await?;
        }
        let vins_diff = diff_by_key(&prior.vinses, &desired.vinses, |n| *n);
        if !vins_diff.is_empty() {
            let form = group_form().json_list("vinses", &desired.vinses);
            self.api
                .call(ctx, "bservice", "groupUpdateVinses", &form)
                .await?;
        }

        // Evictions are listed explicitly by the host.
        for compute in &desired.remove_computes {
            if !prior.compute_ids.contains(compute) {
                continue;
            }
            ctx.check()?;
            let form = group_form().uint("computeId", *compute);
            self.api
                .call(ctx, "bservice", "groupComputeRemove", &form)
                .await?;
        }

        Ok(())
    }
}

#[async_trait]
impl Lifecycle for BasicServiceResource {
    type Spec = BasicServiceSpec;
    type State = BasicServiceState;

    fn type_name(&self) -> &'static str {
        "decort_bservice"
    }

    async fn create(
        &self,
        ctx: &ReconcileContext,
        diags: &mut Diagnostics,
        spec: &BasicServiceSpec,
    ) -> ProviderResult<BasicServiceState> {
        if spec.name.is_empty() || spec.rg_id == 0 {
            return Err(ProviderError::validation(
                "service needs a name and a resource group",
            ));
        }
        let form = Form::new()
            .text("name", spec.name.clone())
            .uint("rgId", spec.rg_id)
            .opt_text("sshUser", spec.ssh_user.as_deref())
            .opt_text("sshKey", spec.ssh_key.as_deref());
        let id = self.api.call_id(ctx, "bservice", "create", &form).await?;
        tracing::info!(service = id, name = %spec.name, "basic service created");

        for group in &spec.groups {
            ctx.check()?;
            self.add_group(ctx, id, group).await?;
        }

        let mut failed = 0usize;
        let mut last_err: Option<ProviderError> = None;
        for snapshot in &spec.snapshots {
            ctx.check()?;
            let form = Form::new()
                .uint("serviceId", id)
                .text("label", snapshot.label.clone());
            if let Err(err) = self.api.call(ctx, "bservice", "snapshotCreate", &form).await {
                failed += 1;
                last_err = Some(err);
            }
        }
        if let Some(err) = last_err {
            diags.partial_update("service snapshot provisioning", failed, &err);
        }

        if !spec.enabled {
            self.api
                .call(ctx, "bservice", "disable", &Form::new().uint("serviceId", id))
                .await?;
        }
        if spec.started {
            self.api
                .call(ctx, "bservice", "start", &Form::new().uint("serviceId", id))
                .await?;
        }

        let record = self.get(ctx, id).await?;
        Ok(Self::state_from_record(&record))
    }

    async fn read(
        &self,
        ctx: &ReconcileContext,
        diags: &mut Diagnostics,
        prior: &BasicServiceState,
    ) -> ProviderResult<Option<BasicServiceState>> {
        let (record, action) = settle(ctx, "basic service", || async move {
            match self.find(ctx, prior.id, &prior.name, prior.rg_id).await? {
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
                    "service {} is soft-deleted; an update will restore it",
                    record.id
                ));
            }
            StatusAction::Recreate => {
                if self.api.client().config().recreate_destroyed {
                    return Ok(None);
                }
                return Err(ProviderError::fatal(format!(
                    "service {} is destroyed and recreate-on-destroyed is off",
                    record.id
                )));
            }
            StatusAction::Fatal => {
                return Err(ProviderError::fatal(format!(
                    "service {} needs operator attention",
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
        prior: &BasicServiceState,
        spec: &BasicServiceSpec,
    ) -> ProviderResult<BasicServiceState> {
        let id = prior.id;
        let service_form = || Form::new().uint("serviceId", id);

        // Lifecycle flags first.
        if spec.restore && prior.status.is_deleted() {
            self.api
                .call(ctx, "bservice", "restore", &service_form())
                .await?;
            self.api
                .call(ctx, "bservice", "enable", &service_form())
                .await?;
        }
        if spec.enabled != prior.enabled {
            let verb = if spec.enabled { "enable" } else { "disable" };
            self.api.call(ctx, "bservice", verb, &service_form()).await?;
        }
        if spec.started != prior.started {
            let verb = if spec.started { "start" } else { "stop" };
            self.api.call(ctx, "bservice", verb, &service_form()).await?;
        }

        // Snapshots: declared labels against recorded ones.
        let prior_labels: Vec<String> =
            prior.snapshots.iter().map(|s| s.label.clone()).collect();
        let desired_labels: Vec<String> =
            spec.snapshots.iter().map(|s| s.label.clone()).collect();
        let snap_diff = diff_by_key(&prior_labels, &desired_labels, |l| l.clone());
        let mut failed = 0usize;
        let mut last_err: Option<ProviderError> = None;
        for label in &snap_diff.removed {
            ctx.check()?;
            let form = service_form().text("label", (*label).clone());
            if let Err(err) = self.api.call(ctx, "bservice", "snapshotDelete", &form).await {
                failed += 1;
                last_err = Some(err);
            }
        }
        for label in &snap_diff.added {
            ctx.check()?;
            let form = service_form().text("label", (*label).clone());
            if let Err(err) = self.api.call(ctx, "bservice", "snapshotCreate", &form).await {
                failed += 1;
                last_err = Some(err);
            }
        }
        if let Some(err) = last_err {
            diags.partial_update("snapshot reconciliation", failed, &err);
        }

        // Rollback edges fire for snapshots that exist on both sides.
        for snapshot in &spec.snapshots {
            if !snapshot.rollback {
                continue;
            }
            if prior.snapshots.iter().any(|s| s.label == snapshot.label) {
                ctx.check()?;
                let form = service_form().text("label", snapshot.label.clone());
                self.api
                    .call(ctx, "bservice", "snapshotRollback", &form)
                    .await?;
                tracing::info!(service = id, label = %snapshot.label, "service rolled back to snapshot");
            } else {
                diags.warn(format!(
                    "cannot roll back to unknown snapshot `{}`",
                    snapshot.label
                ));
            }
        }

        // Groups by name: removed, added, then per-group tables.
        let prior_names: Vec<String> = prior.groups.iter().map(|g| g.name.clone()).collect();
        let desired_names: Vec<String> = spec.groups.iter().map(|g| g.name.clone()).collect();
        let group_diff = diff_by_key(&prior_names, &desired_names, |n| n.clone());
        for name in &group_diff.removed {
            ctx.check()?;
            if let Some(group) = prior.groups.iter().find(|g| &g.name == *name) {
                let form = service_form().uint("compgroupId", group.id);
                self.api.call(ctx, "bservice", "groupRemove", &form).await?;
            }
        }
        for name in &group_diff.added {
            ctx.check()?;
            if let Some(group) = spec.groups.iter().find(|g| &g.name == *name) {
                self.add_group(ctx, id, group).await?;
            }
        }
        for desired in &spec.groups {
            if let Some(prior_group) = prior.groups.iter().find(|g| g.name == desired.name) {
                self.reconcile_group(ctx, diags, id, prior_group, desired)
                    .await?;
            }
        }

        // The rollback flag is write-only and never round-trips: refreshed
        // state carries only labels and guids, so the next false-to-true
        // edge can fire again.
        let record = self.get(ctx, id).await?;
        Ok(Self::state_from_record(&record))
    }

    async fn delete(
        &self,
        ctx: &ReconcileContext,
        _diags: &mut Diagnostics,
        prior: &BasicServiceState,
        spec: &BasicServiceSpec,
    ) -> ProviderResult<()> {
        if prior.id == 0 {
            return Ok(());
        }
        let form = Form::new()
            .uint("serviceId", prior.id)
            .boolean("permanently", spec.permanently);
        match self.api.call(ctx, "bservice", "delete", &form).await {
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
    ) -> ProviderResult<BasicServiceState> {
        let id: u64 = id
            .parse()
            .map_err(|_| ProviderError::validation(format!("`{id}` is not a service id")))?;
        let record = self.get(ctx, id).await?;
        Ok(Self::state_from_record(&record))
    }
}
