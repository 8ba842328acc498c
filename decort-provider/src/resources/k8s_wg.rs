//! Standalone worker-group lifecycle
//!
//! Additional worker groups of an existing cluster are managed as their own
//! resource: a synchronous add on create, count reconciliation on update,
//! group delete on destroy.

use async_trait::async_trait;
use decort_client::Form;
use decort_core::context::ReconcileContext;
use decort_core::diagnostics::Diagnostics;
use decort_core::error::{ProviderError, ProviderResult};
use decort_core::lifecycle::Lifecycle;
use decort_models::k8s::{K8sRecord, WorkerGroupRecord};
use serde::{Deserialize, Serialize};

use crate::api::Api;

/// Desired worker-group state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerGroupSpec {
    pub k8s_id: u64,
    pub name: String,
    pub num: u32,
    pub cpu: u32,
    pub ram: u32,
    pub disk: u32,
}

/// Persisted worker-group state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerGroupState {
    pub id: u64,
    pub k8s_id: u64,
    pub name: String,
    pub num: u32,
    pub cpu: u32,
    pub ram: u32,
    pub disk: u32,
    #[serde(default)]
    pub worker_ids: Vec<u64>,
}

/// Worker-group lifecycle handler.
#[derive(Debug, Clone)]
pub struct WorkerGroupResource {
    api: Api,
}

impl WorkerGroupResource {
    pub fn new(api: Api) -> Self {
        Self { api }
    }

    /// Locate the group inside its cluster record, by id when known.
    async fn find(
        &self,
        ctx: &ReconcileContext,
        k8s_id: u64,
        wg_id: u64,
        name: &str,
    ) -> ProviderResult<Option<WorkerGroupRecord>> {
        let record: K8sRecord = match self
            .api
            .fetch(ctx, "k8s", "get", &Form::new().uint("k8sId", k8s_id))
            .await
        {
            Ok(record) => record,
            Err(err) if err.is_not_found() => return Ok(None),
            Err(err) => return Err(err),
        };
        let Some(groups) = record.groups else {
            return Ok(None);
        };
        Ok(groups
            .workers
            .into_iter()
            .find(|w| if wg_id != 0 { w.id == wg_id } else { w.name == name }))
    }

    fn state_from_group(k8s_id: u64, group: &WorkerGroupRecord) -> WorkerGroupState {
        WorkerGroupState {
            id: group.id,
            k8s_id,
            name: group.name.clone(),
            num: group.num,
            cpu: group.cpu,
            ram: group.ram,
            disk: group.disk,
            worker_ids: group.detailed_info.iter().map(|n| n.id).collect(),
        }
    }

    async fn must_find(
        &self,
        ctx: &ReconcileContext,
        k8s_id: u64,
        wg_id: u64,
        name: &str,
    ) -> ProviderResult<WorkerGroupRecord> {
        self.find(ctx, k8s_id, wg_id, name).await?.ok_or_else(|| {
            ProviderError::not_found(format!("worker group `{name}` is gone from cluster {k8s_id}"))
        })
    }
}

#[async_trait]
impl Lifecycle for WorkerGroupResource {
    type Spec = WorkerGroupSpec;
    type State = WorkerGroupState;

    fn type_name(&self) -> &'static str {
        "decort_k8s_wg"
    }

    async fn create(
        &self,
        ctx: &ReconcileContext,
        _diags: &mut Diagnostics,
        spec: &WorkerGroupSpec,
    ) -> ProviderResult<WorkerGroupState> {
        if spec.k8s_id == 0 || spec.name.is_empty() {
            return Err(ProviderError::validation(
                "worker group needs a cluster id and a name",
            ));
        }
        let form = Form::new()
            .uint("k8sId", spec.k8s_id)
            .text("name", spec.name.clone())
            .uint("workerNum", u64::from(spec.num))
            .uint("workerCpu", u64::from(spec.cpu))
            .uint("workerRam", u64::from(spec.ram))
            .uint("workerDisk", u64::from(spec.disk));
        let id = self
            .api
            .call_id(ctx, "k8s", "workersGroupAdd", &form)
            .await?;
        tracing::info!(cluster = spec.k8s_id, group = id, "worker group added");

        let group = self.must_find(ctx, spec.k8s_id, id, &spec.name).await?;
        Ok(Self::state_from_group(spec.k8s_id, &group))
    }

    async fn read(
        &self,
        ctx: &ReconcileContext,
        _diags: &mut Diagnostics,
        prior: &WorkerGroupState,
    ) -> ProviderResult<Option<WorkerGroupState>> {
        match self.find(ctx, prior.k8s_id, prior.id, &prior.name).await? {
            None => Ok(None),
            Some(group) => Ok(Some(Self::state_from_group(prior.k8s_id, &group))),
        }
    }

    async fn update(
        &self,
        ctx: &ReconcileContext,
        diags: &mut Diagnostics,
        prior: &WorkerGroupState,
        spec: &WorkerGroupSpec,
    ) -> ProviderResult<WorkerGroupState> {
        if spec.cpu != prior.cpu || spec.ram != prior.ram || spec.disk != prior.disk {
            diags.warn("worker sizing is immutable; only the worker count is reconciled");
        }

        // Compare the declared count against the live list, not the stale
        // persisted count.
        let group = self
            .must_find(ctx, prior.k8s_id, prior.id, &prior.name)
            .await?;
        let live = group.detailed_info.len() as u32;
        if spec.num > live {
            let form = Form::new()
                .uint("k8sId", prior.k8s_id)
                .uint("workersGroupId", group.id)
                .uint("num", u64::from(spec.num - live));
            self.api.call(ctx, "k8s", "workerAdd", &form).await?;
        } else if spec.num < live {
            let excess = (live - spec.num) as usize;
            for node in group.detailed_info.iter().rev().take(excess) {
                ctx.check()?;
                let form = Form::new()
                    .uint("k8sId", prior.k8s_id)
                    .uint("workersGroupId", group.id)
                    .uint("workerId", node.id);
                self.api.call(ctx, "k8s", "workerDelete", &form).await?;
            }
        }

        let group = self
            .must_find(ctx, prior.k8s_id, prior.id, &prior.name)
            .await?;
        Ok(Self::state_from_group(prior.k8s_id, &group))
    }

    async fn delete(
        &self,
        ctx: &ReconcileContext,
        _diags: &mut Diagnostics,
        prior: &WorkerGroupState,
        _spec: &WorkerGroupSpec,
    ) -> ProviderResult<()> {
        if prior.id == 0 {
            return Ok(());
        }
        let form = Form::new()
            .uint("k8sId", prior.k8s_id)
            .uint("workersGroupId", prior.id);
        match self.api.call(ctx, "k8s", "workersGroupDelete", &form).await {
            Ok(_) => Ok(()),
            Err(err) if err.is_not_found() => Ok(()),
            Err(err) => Err(err),
        }
    }
}
