//! Compute lifecycle
//!
//! A compute is a compound entity: boot disk, extra disks, network
//! interfaces, power state, guest image. Creation builds it stopped, wires
//! the pieces one call at a time and only then starts it; updates work from
//! set diffs and stop the machine before any data-disk removal.

use async_trait::async_trait;
use decort_client::Form;
use decort_core::compensation::CompensationStack;
use decort_core::context::ReconcileContext;
use decort_core::diagnostics::Diagnostics;
use decort_core::diff::{diff_by_key, diff_with_updates};
use decort_core::error::{ProviderError, ProviderResult};
use decort_core::lifecycle::Lifecycle;
use decort_core::status::{Status, StatusAction, TechStatus, classify};
use decort_models::compute::{ComputeListItem, ComputeRecord, NetType};
use serde::{Deserialize, Serialize};

use crate::api::Api;
use crate::resources::settle;

fn default_true() -> bool {
    true
}

/// Declared network interface. Identity is `(net_type, net_id)`; the address
/// may be requested but is otherwise computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NicSpec {
    pub net_type: NetType,
    pub net_id: u64,
    #[serde(default)]
    pub ip_address: Option<String>,
}

/// Declared data disk created through the compute (the `disks` table).
/// Identity is the disk name; size may grow in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataDiskSpec {
    pub name: String,
    pub size: u32,
    #[serde(default)]
    pub sep_id: Option<u64>,
    #[serde(default)]
    pub pool: Option<String>,
    #[serde(default)]
    pub permanently: bool,
}

/// Desired compute state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputeSpec {
    pub name: String,
    pub rg_id: u64,
    pub driver: String,
    pub cpu: u32,
    pub ram: u32,
    pub image_id: u64,
    pub boot_disk_size: u32,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cloud_init: Option<String>,
    #[serde(default)]
    pub sep_id: Option<u64>,
    #[serde(default)]
    pub pool: Option<String>,
    /// Pre-existing disks attached by id.
    #[serde(default)]
    pub extra_disks: Vec<u64>,
    #[serde(default)]
    pub interfaces: Vec<NicSpec>,
    /// Data disks owned by this compute.
    #[serde(default)]
    pub disks: Vec<DataDiskSpec>,
    #[serde(default = "default_true")]
    pub started: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Delete-time flags.
    #[serde(default)]
    pub detach_disks: bool,
    #[serde(default)]
    pub permanently: bool,
}

/// Observed interface with server-computed address fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NicState {
    pub net_type: NetType,
    pub net_id: u64,
    pub ip_address: String,
    pub mac: String,
}

/// Observed data-disk row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataDiskState {
    pub disk_id: u64,
    pub name: String,
    pub size: u32,
    pub sep_id: u64,
    pub pool: String,
}

/// Guest OS user; always server-computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsUserState {
    pub login: String,
    pub password: String,
    pub public_key: String,
}

/// Persisted compute state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputeState {
    pub id: u64,
    pub name: String,
    pub rg_id: u64,
    pub driver: String,
    pub cpu: u32,
    pub ram: u32,
    pub image_id: u64,
    pub boot_disk_size: u32,
    #[serde(default)]
    pub boot_disk_id: u64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cloud_init: Option<String>,
    #[serde(default)]
    pub extra_disks: Vec<u64>,
    #[serde(default)]
    pub interfaces: Vec<NicState>,
    #[serde(default)]
    pub disks: Vec<DataDiskState>,
    #[serde(default)]
    pub os_users: Vec<OsUserState>,
    #[serde(default = "default_true")]
    pub started: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub tech_status: TechStatus,
}

/// Compute lifecycle handler.
#[derive(Debug, Clone)]
pub struct ComputeResource {
    api: Api,
}

impl ComputeResource {
    pub fn new(api: Api) -> Self {
        Self { api }
    }

    /// Presence probe: by id when known, else by name within the resource
    /// group, skipping destroyed records. On multiple name matches the first
    /// in server order wins; no deduplication is attempted.
    async fn find(
        &self,
        ctx: &ReconcileContext,
        id: u64,
        name: &str,
        rg_id: u64,
    ) -> ProviderResult<Option<ComputeRecord>> {
        if id != 0 {
            return match self.get(ctx, id).await {
                Ok(record) => Ok(Some(record)),
                Err(err) if err.is_not_found() => Ok(None),
                Err(err) => Err(err),
            };
        }
        let listed: Vec<ComputeListItem> = self
            .api
            .fetch(ctx, "compute", "list", &Form::new().uint("rgId", rg_id))
            .await?;
        match listed
            .iter()
            .find(|c| c.name == name && c.rg_id == rg_id && !c.status.is_destroyed())
        {
            None => Ok(None),
            Some(hit) => Ok(Some(self.get(ctx, hit.id).await?)),
        }
    }

    async fn get(&self, ctx: &ReconcileContext, id: u64) -> ProviderResult<ComputeRecord> {
        self.api
            .fetch(ctx, "compute", "get", &Form::new().uint("computeId", id))
            .await
    }

    /// Probe plus classification, waiting out transitional statuses.
    async fn observe(
        &self,
        ctx: &ReconcileContext,
        id: u64,
        name: &str,
        rg_id: u64,
    ) -> ProviderResult<(Option<ComputeRecord>, StatusAction)> {
        settle(ctx, "compute", || async move {
            match self.find(ctx, id, name, rg_id).await? {
                None => Ok((None, StatusAction::Proceed)),
                Some(record) => {
                    let action = classify(&record.status);
                    Ok((Some(record), action))
                }
            }
        })
        .await
    }

    fn validate(spec: &ComputeSpec) -> ProviderResult<()> {
        if spec.name.is_empty() {
            return Err(ProviderError::validation("compute name must not be empty"));
        }
        if spec.rg_id == 0 {
            return Err(ProviderError::validation("compute needs a resource group"));
        }
        if spec.image_id == 0 {
            return Err(ProviderError::validation("compute needs a boot image"));
        }
        if spec.cpu == 0 || spec.ram == 0 || spec.boot_disk_size == 0 {
            return Err(ProviderError::validation(
                "cpu, ram and boot disk size must all be non-zero",
            ));
        }
        Ok(())
    }

    /// Steps 4-8 of the create flow, run after the id exists.
    async fn provision(
        &self,
        ctx: &ReconcileContext,
        diags: &mut Diagnostics,
        spec: &ComputeSpec,
        id: u64,
    ) -> ProviderResult<()> {
        // Extra disks may be attached while stopped. Failures here are
        // accumulated so every disk gets its attempt before the abort.
        let mut failed = 0usize;
        let mut last_err: Option<ProviderError> = None;
        for disk_id in &spec.extra_disks {
            ctx.check()?;
            let form = Form::new().uint("computeId", id).uint("diskId", *disk_id);
            if let Err(err) = self.api.call(ctx, "compute", "diskAttach", &form).await {
                tracing::warn!(compute = id, disk = disk_id, error = %err, "disk attach failed");
                failed += 1;
                last_err = Some(err);
            }
        }
        if let Some(err) = last_err {
            diags.partial_update("extra disk attach", failed, &err);
            return Err(err);
        }

        // The first nic was consumed by the create call itself.
        for nic in spec.interfaces.iter().skip(1) {
            ctx.check()?;
            let form = Form::new()
                .uint("computeId", id)
                .text("netType", nic.net_type.as_str())
                .uint("netId", nic.net_id)
                .opt_text("ipAddr", nic.ip_address.as_deref());
            self.api.call(ctx, "compute", "netAttach", &form).await?;
        }

        for disk in &spec.disks {
            ctx.check()?;
            self.api
                .call(ctx, "compute", "diskAdd", &Self::disk_add_form(id, disk))
                .await?;
        }

        // Starting must come after all attachments so the guest sees a
        // stable device set on first boot.
        if spec.started {
            self.api
                .call(ctx, "compute", "start", &Form::new().uint("computeId", id))
                .await?;
        }
        let verb = if spec.enabled { "enable" } else { "disable" };
        self.api
            .call(ctx, "compute", verb, &Form::new().uint("computeId", id))
            .await?;
        Ok(())
    }

    fn disk_add_form(id: u64, disk: &DataDiskSpec) -> Form {
        Form::new()
            .uint("computeId", id)
            .text("diskName", disk.name.clone())
            .uint("size", u64::from(disk.size))
            .opt_uint("sepId", disk.sep_id)
            .opt_text("pool", disk.pool.as_deref())
    }

    /// Map the platform record into persisted state.
    ///
    /// Data disks declared in the `disks` table are matched by name; data
    /// disks the table does not declare are treated as attached extras.
    fn state_from_record(
        record: &ComputeRecord,
        cloud_init: Option<String>,
        declared_disk_names: &[String],
    ) -> ComputeState {
        let boot = record.boot_disk();
        let disks: Vec<DataDiskState> = record
            .data_disks()
            .filter(|d| declared_disk_names.iter().any(|n| n == &d.name))
            .map(|d| DataDiskState {
                disk_id: d.id,
                name: d.name.clone(),
                size: d.size_max,
                sep_id: d.sep_id,
                pool: d.pool.clone(),
            })
            .collect();
        let extra_disks: Vec<u64> = record
            .data_disks()
            .filter(|d| !declared_disk_names.iter().any(|n| n == &d.name))
            .map(|d| d.id)
            .collect();

        ComputeState {
            id: record.id,
            name: record.name.clone(),
            rg_id: record.rg_id,
            driver: record.driver.clone(),
            cpu: record.cpus,
            ram: record.ram,
            image_id: record.image_id,
            boot_disk_size: boot.map(|d| d.size_max).unwrap_or_default(),
            boot_disk_id: boot.map(|d| d.id).unwrap_or_default(),
            description: if record.desc.is_empty() {
                None
            } else {
                Some(record.desc.clone())
            },
            cloud_init,
            extra_disks,
            interfaces: record
                .interfaces
                .iter()
                .map(|i| NicState {
                    net_type: i.net_type,
                    net_id: i.net_id,
                    ip_address: i.ip_address.clone(),
                    mac: i.mac.clone(),
                })
                .collect(),
            disks,
            os_users: record
                .os_users
                .iter()
                .map(|u| OsUserState {
                    login: u.login.clone(),
                    password: u.password.clone(),
                    public_key: u.public_key.clone(),
                })
                .collect(),
            started: record.tech_status.is_started(),
            enabled: !matches!(record.status, Status::Disabled),
            status: record.status.clone(),
            tech_status: record.tech_status.clone(),
        }
    }

    fn declared_names(spec: &ComputeSpec) -> Vec<String> {
        spec.disks.iter().map(|d| d.name.clone()).collect()
    }

    async fn refreshed_state(
        &self,
        ctx: &ReconcileContext,
        id: u64,
        spec: &ComputeSpec,
    ) -> ProviderResult<ComputeState> {
        let record = self.get(ctx, id).await?;
        Ok(Self::state_from_record(
            &record,
            spec.cloud_init.clone(),
            &Self::declared_names(spec),
        ))
    }
}

#[async_trait]
impl Lifecycle for ComputeResource {
    type Spec = ComputeSpec;
    type State = ComputeState;

    fn type_name(&self) -> &'static str {
        "decort_compute"
    }

    async fn create(
        &self,
        ctx: &ReconcileContext,
        diags: &mut Diagnostics,
        spec: &ComputeSpec,
    ) -> ProviderResult<ComputeState> {
        Self::validate(spec)?;

        let mut form = Form::new()
            .text("name", spec.name.clone())
            .uint("rgId", spec.rg_id)
            .uint("cpu", u64::from(spec.cpu))
            .uint("ram", u64::from(spec.ram))
            .uint("imageId", spec.image_id)
            .uint("bootDisk", u64::from(spec.boot_disk_size))
            .text("driver", spec.driver.clone())
            .opt_text("desc", spec.description.as_deref())
            .opt_text("userdata", spec.cloud_init.as_deref())
            .opt_uint("sepId", spec.sep_id)
            .opt_text("pool", spec.pool.as_deref());
        if let Some(first) = spec.interfaces.first() {
            form = form
                .text("netType", first.net_type.as_str())
                .uint("netId", first.net_id)
                .opt_text("ipAddr", first.ip_address.as_deref());
        }
        // Always created stopped; the start transition comes after the
        // remaining pieces are attached.
        form = form.boolean("start", false);

        let id = self.api.call_id(ctx, "compute", "create", &form).await?;
        tracing::info!(compute = id, name = %spec.name, "compute created");

        let mut cleanup = CompensationStack::new();
        {
            let api = self.api.clone();
            cleanup.push("destroy partially created compute", move || async move {
                // The unwind may be running because the original context was
                // cancelled, so the cleanup call gets its own deadline.
                let cleanup_ctx = ReconcileContext::background()
                    .with_timeout(api.client().config().timeouts.delete);
                let form = Form::new()
                    .uint("computeId", id)
                    .boolean("permanently", true)
                    .boolean("detachDisks", true);
                api.call(&cleanup_ctx, "compute", "delete", &form)
                    .await
                    .map(|_| ())
            });
        }

        match self.provision(ctx, diags, spec, id).await {
            Ok(()) => cleanup.disarm(),
            Err(err) => {
                tracing::warn!(compute = id, error = %err, "create step failed, unwinding");
                for (label, undo_err) in cleanup.unwind().await {
                    diags.warn_with_detail(
                        format!("compensation `{label}` failed"),
                        undo_err.to_string(),
                    );
                }
                return Err(err);
            }
        }

        self.refreshed_state(ctx, id, spec).await
    }

    async fn read(
        &self,
        ctx: &ReconcileContext,
        diags: &mut Diagnostics,
        prior: &ComputeState,
    ) -> ProviderResult<Option<ComputeState>> {
        let (record, action) = self
            .observe(ctx, prior.id, &prior.name, prior.rg_id)
            .await?;
        let Some(record) = record else {
            return Ok(None);
        };

        match action {
            StatusAction::Proceed => {}
            StatusAction::ProceedWithWarning => {
                diags.warn(format!(
                    "compute {} is {}; updates may fail until it is enabled",
                    record.id, record.status
                ));
            }
            // Read is read-only: recovery happens on the next update.
            StatusAction::Restore => {
                diags.warn(format!(
                    "compute {} is soft-deleted; an update will restore it",
                    record.id
                ));
            }
            StatusAction::Recreate => {
                if self.api.client().config().recreate_destroyed {
                    diags.warn(format!(
                        "compute {} is destroyed; dropping it from state for recreation",
                        record.id
                    ));
                    return Ok(None);
                }
                return Err(ProviderError::fatal(format!(
                    "compute {} is destroyed and recreate-on-destroyed is off",
                    record.id
                )));
            }
            StatusAction::Fatal => {
                return Err(ProviderError::fatal(format!(
                    "compute {} is in status {} and needs operator attention",
                    record.id, record.status
                )));
            }
            StatusAction::WaitAndRetry => unreachable!("settled observations are never transitional"),
        }

        let declared: Vec<String> = prior.disks.iter().map(|d| d.name.clone()).collect();
        Ok(Some(Self::state_from_record(
            &record,
            prior.cloud_init.clone(),
            &declared,
        )))
    }

    async fn update(
        &self,
        ctx: &ReconcileContext,
        diags: &mut Diagnostics,
        prior: &ComputeState,
        spec: &ComputeSpec,
    ) -> ProviderResult<ComputeState> {
        Self::validate(spec)?;
        let id = prior.id;
        let (record, action) = self.observe(ctx, id, &prior.name, prior.rg_id).await?;
        let Some(record) = record else {
            return Err(ProviderError::fatal(format!(
                "compute {id} disappeared from the platform; refresh state before updating"
            )));
        };

        match action {
            StatusAction::Proceed => {}
            StatusAction::ProceedWithWarning => {
                diags.warn(format!(
                    "compute {id} is {}; some updates may be rejected",
                    record.status
                ));
            }
            StatusAction::Restore => {
                self.api
                    .call(ctx, "compute", "restore", &Form::new().uint("computeId", id))
                    .await?;
                self.api
                    .call(ctx, "compute", "enable", &Form::new().uint("computeId", id))
                    .await?;
                tracing::info!(compute = id, "restored soft-deleted compute");
            }
            StatusAction::Recreate => {
                return Err(ProviderError::fatal(format!(
                    "compute {id} is destroyed; it must be recreated, not updated"
                )));
            }
            StatusAction::Fatal => {
                return Err(ProviderError::fatal(format!(
                    "compute {id} is in status {} and needs operator attention",
                    record.status
                )));
            }
            StatusAction::WaitAndRetry => unreachable!("settled observations are never transitional"),
        }

        // 1. Enable/disable first: most other calls fail on a disabled node.
        if spec.enabled != prior.enabled {
            let verb = if spec.enabled { "enable" } else { "disable" };
            self.api
                .call(ctx, "compute", verb, &Form::new().uint("computeId", id))
                .await?;
        }

        // 2. CPU / RAM.
        if spec.cpu != prior.cpu || spec.ram != prior.ram {
            let form = Form::new()
                .uint("computeId", id)
                .uint("cpu", u64::from(spec.cpu))
                .uint("ram", u64::from(spec.ram))
                .boolean("force", true);
            self.api.call(ctx, "compute", "resize", &form).await?;
        }

        // 3. Boot disk grows only.
        if spec.boot_disk_size > prior.boot_disk_size {
            let form = Form::new()
                .uint("diskId", prior.boot_disk_id)
                .uint("size", u64::from(spec.boot_disk_size));
            self.api.call(ctx, "compute", "diskResize", &form).await?;
        } else if spec.boot_disk_size < prior.boot_disk_size {
            diags.warn(format!(
                "shrinking boot disk is not allowed: keeping {} GB, requested {} GB",
                prior.boot_disk_size, spec.boot_disk_size
            ));
        }

        // 4. Extra disks by id.
        let disk_diff = diff_by_key(&prior.extra_disks, &spec.extra_disks, |d| *d);
        let mut failed = 0usize;
        let mut last_err: Option<ProviderError> = None;
        for disk_id in &disk_diff.removed {
            ctx.check()?;
            let form = Form::new().uint("computeId", id).uint("diskId", **disk_id);
            if let Err(err) = self.api.call(ctx, "compute", "diskDetach", &form).await {
                failed += 1;
                last_err = Some(err);
            }
        }
        for disk_id in &disk_diff.added {
            ctx.check()?;
            let form = Form::new().uint("computeId", id).uint("diskId", **disk_id);
            if let Err(err) = self.api.call(ctx, "compute", "diskAttach", &form).await {
                failed += 1;
                last_err = Some(err);
            }
        }
        if let Some(err) = last_err {
            diags.partial_update("extra disk reconciliation", failed, &err);
        }

        // 5. Network interfaces by (net_type, net_id). Detach uses the
        // observed address pair, attach the declared one.
        let prior_keys: Vec<(NetType, u64)> = prior
            .interfaces
            .iter()
            .map(|n| (n.net_type, n.net_id))
            .collect();
        let desired_keys: Vec<(NetType, u64)> = spec
            .interfaces
            .iter()
            .map(|n| (n.net_type, n.net_id))
            .collect();
        let nic_diff = diff_by_key(&prior_keys, &desired_keys, |k| *k);
        let mut failed = 0usize;
        let mut last_err: Option<ProviderError> = None;
        for key in &nic_diff.removed {
            ctx.check()?;
            if let Some(nic) = prior
                .interfaces
                .iter()
                .find(|n| (n.net_type, n.net_id) == **key)
            {
                let form = Form::new()
                    .uint("computeId", id)
                    .text("ipAddr", nic.ip_address.clone())
                    .text("mac", nic.mac.clone());
                if let Err(err) = self.api.call(ctx, "compute", "netDetach", &form).await {
                    failed += 1;
                    last_err = Some(err);
                }
            }
        }
        for key in &nic_diff.added {
            ctx.check()?;
            if let Some(nic) = spec
                .interfaces
                .iter()
                .find(|n| (n.net_type, n.net_id) == **key)
            {
                let form = Form::new()
                    .uint("computeId", id)
                    .text("netType", nic.net_type.as_str())
                    .uint("netId", nic.net_id)
                    .opt_text("ipAddr", nic.ip_address.as_deref());
                if let Err(err) = self.api.call(ctx, "compute", "netAttach", &form).await {
                    failed += 1;
                    last_err = Some(err);
                }
            }
        }
        if let Some(err) = last_err {
            diags.partial_update("network interface reconciliation", failed, &err);
        }

        // 6. Name and description.
        let desc_changed = spec.description != prior.description;
        if spec.name != prior.name || desc_changed {
            let form = Form::new()
                .uint("computeId", id)
                .text("name", spec.name.clone())
                .text("desc", spec.description.clone().unwrap_or_default());
            self.api.call(ctx, "compute", "update", &form).await?;
        }

        // 7. Power state.
        if spec.started != prior.started {
            let verb = if spec.started { "start" } else { "stop" };
            self.api
                .call(ctx, "compute", verb, &Form::new().uint("computeId", id))
                .await?;
        }

        // 8. The data-disk table. Removal requires a stopped guest; the
        // stop/start pair brackets the deletions in the same reconciliation.
        #[derive(Clone, PartialEq)]
        struct DiskRow {
            name: String,
            size: u32,
            disk_id: u64,
            sep_id: Option<u64>,
            pool: Option<String>,
            permanently: bool,
        }
        let prior_rows: Vec<DiskRow> = prior
            .disks
            .iter()
            .map(|d| DiskRow {
                name: d.name.clone(),
                size: d.size,
                disk_id: d.disk_id,
                sep_id: Some(d.sep_id),
                pool: Some(d.pool.clone()),
                permanently: false,
            })
            .collect();
        let desired_rows: Vec<DiskRow> = spec
            .disks
            .iter()
            .map(|d| DiskRow {
                name: d.name.clone(),
                size: d.size,
                disk_id: 0,
                sep_id: d.sep_id,
                pool: d.pool.clone(),
                permanently: d.permanently,
            })
            .collect();
        let table_diff = diff_with_updates(
            &prior_rows,
            &desired_rows,
            |d| d.name.clone(),
            |o, n| o.size != n.size,
        );

        if !table_diff.removed.is_empty() || !table_diff.added.is_empty() {
            self.api
                .call(ctx, "compute", "stop", &Form::new().uint("computeId", id))
                .await?;
            for row in &table_diff.removed {
                // Boot disks never live in the table, but a mis-read state
                // must not take the boot volume with it.
                if row.disk_id == prior.boot_disk_id {
                    continue;
                }
                ctx.check()?;
                let form = Form::new()
                    .uint("computeId", id)
                    .uint("diskId", row.disk_id)
                    .boolean("permanently", row.permanently);
                self.api.call(ctx, "compute", "diskDel", &form).await?;
            }
            self.api
                .call(ctx, "compute", "start", &Form::new().uint("computeId", id))
                .await?;
            for row in &table_diff.added {
                ctx.check()?;
                let disk = DataDiskSpec {
                    name: row.name.clone(),
                    size: row.size,
                    sep_id: row.sep_id,
                    pool: row.pool.clone(),
                    permanently: row.permanently,
                };
                self.api
                    .call(ctx, "compute", "diskAdd", &Self::disk_add_form(id, &disk))
                    .await?;
            }
        }
        for (old, new) in &table_diff.updated {
            if new.size > old.size {
                let form = Form::new()
                    .uint("diskId", old.disk_id)
                    .uint("size", u64::from(new.size));
                self.api.call(ctx, "compute", "diskResize", &form).await?;
            } else {
                diags.warn(format!(
                    "shrinking data disk `{}` is not allowed: keeping {} GB",
                    old.name, old.size
                ));
            }
        }

        self.refreshed_state(ctx, id, spec).await
    }

    async fn delete(
        &self,
        ctx: &ReconcileContext,
        _diags: &mut Diagnostics,
        prior: &ComputeState,
        spec: &ComputeSpec,
    ) -> ProviderResult<()> {
        if prior.id == 0 {
            return Ok(());
        }
        let form = Form::new()
            .uint("computeId", prior.id)
            .boolean("permanently", spec.permanently)
            .boolean("detachDisks", spec.detach_disks);
        match self.api.call(ctx, "compute", "delete", &form).await {
            Ok(_) => Ok(()),
            // Deleting an absent compute is a success.
            Err(err) if err.is_not_found() => Ok(()),
            Err(err) => Err(err),
        }
    }

    async fn import(
        &self,
        ctx: &ReconcileContext,
        _diags: &mut Diagnostics,
        id: &str,
    ) -> ProviderResult<ComputeState> {
        let id: u64 = id
            .parse()
            .map_err(|_| ProviderError::validation(format!("`{id}` is not a compute id")))?;
        let record = self.get(ctx, id).await?;
        Ok(Self::state_from_record(&record, None, &[]))
    }
}
