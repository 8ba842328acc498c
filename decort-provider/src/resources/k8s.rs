//! Kubernetes cluster lifecycle
//!
//! Creation is asynchronous: the platform answers with a task correlation id
//! and the handler polls the task endpoint until it yields the cluster id.
//! Worker capacity is reconciled by count: grow by delta, shrink by deleting
//! tail workers in reverse order.

use async_trait::async_trait;
use decort_client::{Form, TaskPoller};
use decort_core::context::ReconcileContext;
use decort_core::diagnostics::Diagnostics;
use decort_core::error::{ProviderError, ProviderResult};
use decort_core::lifecycle::Lifecycle;
use decort_core::status::{Status, StatusAction, TechStatus, classify};
use decort_models::k8s::{K8sListItem, K8sRecord, WorkerGroupRecord};
use serde::{Deserialize, Serialize};

use crate::api::Api;
use crate::resources::settle;

fn default_true() -> bool {
    true
}

/// Master group sizing; immutable after create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterSpec {
    pub num: u32,
    pub cpu: u32,
    pub ram: u32,
    pub disk: u32,
}

impl Default for MasterSpec {
    fn default() -> Self {
        Self {
            num: 1,
            cpu: 2,
            ram: 2048,
            disk: 10,
        }
    }
}

/// Worker group sizing; only `num` is mutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerSpec {
    pub num: u32,
    pub cpu: u32,
    pub ram: u32,
    pub disk: u32,
}

/// Desired cluster state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct K8sSpec {
    pub name: String,
    pub rg_id: u64,
    /// Catalog item to build the cluster from.
    pub ci_id: u64,
    /// Name of the first worker group, fixed at create time.
    pub wg_name: String,
    #[serde(default)]
    pub masters: Option<MasterSpec>,
    pub workers: WorkerSpec,
    #[serde(default = "default_true")]
    pub with_lb: bool,
    #[serde(default)]
    pub ext_net_id: Option<u64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub permanently: bool,
}

/// Observed cluster node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeState {
    pub id: u64,
    pub name: String,
    pub ip_address: String,
    pub status: Status,
}

/// Persisted cluster state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct K8sState {
    pub id: u64,
    pub name: String,
    pub rg_id: u64,
    pub ci_id: u64,
    #[serde(default)]
    pub lb_id: u64,
    #[serde(default)]
    pub vins_id: u64,
    #[serde(default)]
    pub wg_id: u64,
    pub wg_name: String,
    #[serde(default)]
    pub masters: Option<MasterSpec>,
    pub workers: WorkerSpec,
    #[serde(default)]
    pub master_nodes: Vec<NodeState>,
    #[serde(default)]
    pub worker_nodes: Vec<NodeState>,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub tech_status: TechStatus,
}

/// Cluster lifecycle handler.
#[derive(Debug, Clone)]
pub struct K8sResource {
    api: Api,
}

impl K8sResource {
    pub fn new(api: Api) -> Self {
        Self { api }
    }

    async fn get(&self, ctx: &ReconcileContext, id: u64) -> ProviderResult<K8sRecord> {
        self.api
            .fetch(ctx, "k8s", "get", &Form::new().uint("k8sId", id))
            .await
    }

    async fn find(
        &self,
        ctx: &ReconcileContext,
        id: u64,
        name: &str,
        rg_id: u64,
    ) -> ProviderResult<Option<K8sRecord>> {
        if id != 0 {
            return match self.get(ctx, id).await {
                Ok(record) => Ok(Some(record)),
                Err(err) if err.is_not_found() => Ok(None),
                Err(err) => Err(err),
            };
        }
        let listed: Vec<K8sListItem> = self
            .api
            .fetch(ctx, "k8s", "list", &Form::new().uint("rgId", rg_id))
            .await?;
        match listed
            .iter()
            .find(|c| c.name == name && c.rg_id == rg_id && !c.status.is_destroyed())
        {
            None => Ok(None),
            Some(hit) => Ok(Some(self.get(ctx, hit.id).await?)),
        }
    }

    /// Build persisted state from the cluster record, fanning out to the
    /// constituent computes for node addresses. The fan-out is strictly
    /// sequential; one slow node must not hide the others.
    async fn state_from_record(
        &self,
        ctx: &ReconcileContext,
        record: &K8sRecord,
        prior_wg_name: &str,
    ) -> ProviderResult<K8sState> {
        let mut masters_spec = None;
        let mut workers_spec = WorkerSpec {
            num: 0,
            cpu: 0,
            ram: 0,
            disk: 0,
        };
        let mut wg_id = 0;
        let mut wg_name = prior_wg_name.to_string();
        let mut master_nodes = Vec::new();
        let mut worker_nodes = Vec::new();

        if let Some(groups) = &record.groups {
            masters_spec = Some(MasterSpec {
                num: groups.masters.num,
                cpu: groups.masters.cpu,
                ram: groups.masters.ram,
                disk: groups.masters.disk,
            });
            for node in &groups.masters.detailed_info {
                master_nodes.push(self.node_state(ctx, node.id, &node.name, &node.status).await?);
            }
            let first_wg = Self::select_group(&groups.workers, prior_wg_name);
            if let Some(wg) = first_wg {
                wg_id = wg.id;
                wg_name = wg.name.clone();
                workers_spec = WorkerSpec {
                    num: wg.num,
                    cpu: wg.cpu,
                    ram: wg.ram,
                    disk: wg.disk,
                };
                for node in &wg.detailed_info {
                    worker_nodes
                        .push(self.node_state(ctx, node.id, &node.name, &node.status).await?);
                }
            }
        }

        Ok(K8sState {
            id: record.id,
            name: record.name.clone(),
            rg_id: record.rg_id,
            ci_id: record.ci_id,
            lb_id: record.lb_id,
            vins_id: record.vins_id,
            wg_id,
            wg_name,
            masters: masters_spec,
            workers: workers_spec,
            master_nodes,
            worker_nodes,
            status: record.status.clone(),
            tech_status: record.tech_status.clone(),
        })
    }

    fn select_group<'a>(
        workers: &'a [WorkerGroupRecord],
        name: &str,
    ) -> Option<&'a WorkerGroupRecord> {
        workers
            .iter()
            .find(|w| w.name == name)
            .or_else(|| workers.first())
    }

    /// Resolve one node's address through its backing compute.
    async fn node_state(
        &self,
        ctx: &ReconcileContext,
        compute_id: u64,
        name: &str,
        status: &Status,
    ) -> ProviderResult<NodeState> {
        let form = Form::new().uint("computeId", compute_id);
        let ip_address = match self
            .api
            .fetch::<decort_models::compute::ComputeRecord>(ctx, "compute", "get", &form)
            .await
        {
            Ok(compute) => compute
                .interfaces
                .first()
                .map(|i| i.ip_address.clone())
                .unwrap_or_default(),
            // A node mid-redeploy may briefly lack its compute; the address
            // is cosmetic, so leave it empty rather than failing the read.
            Err(err) if err.is_not_found() => String::new(),
            Err(err) => return Err(err),
        };
        Ok(NodeState {
            id: compute_id,
            name: name.to_string(),
            ip_address,
            status: status.clone(),
        })
    }
}

#[async_trait]
impl Lifecycle for K8sResource {
    type Spec = K8sSpec;
    type State = K8sState;

    fn type_name(&self) -> &'static str {
        "decort_k8s"
    }

    async fn create(
        &self,
        ctx: &ReconcileContext,
        _diags: &mut Diagnostics,
        spec: &K8sSpec,
    ) -> ProviderResult<K8sState> {
        if spec.name.is_empty() || spec.wg_name.is_empty() {
            return Err(ProviderError::validation(
                "cluster and worker group names must not be empty",
            ));
        }
        if spec.rg_id == 0 || spec.ci_id == 0 {
            return Err(ProviderError::validation(
                "cluster needs a resource group and a catalog item",
            ));
        }

        let masters = spec.masters.clone().unwrap_or_default();
        let form = Form::new()
            .text("name", spec.name.clone())
            .uint("rgId", spec.rg_id)
            .uint("k8sciId", spec.ci_id)
            .text("workerGroupName", spec.wg_name.clone())
            .uint("masterNum", u64::from(masters.num))
            .uint("masterCpu", u64::from(masters.cpu))
            .uint("masterRam", u64::from(masters.ram))
            .uint("masterDisk", u64::from(masters.disk))
            .uint("workerNum", u64::from(spec.workers.num))
            .uint("workerCpu", u64::from(spec.workers.cpu))
            .uint("workerRam", u64::from(spec.workers.ram))
            .uint("workerDisk", u64::from(spec.workers.disk))
            .boolean("withLB", spec.with_lb)
            .opt_uint("extnetId", spec.ext_net_id)
            .opt_text("desc", spec.description.as_deref());

        // The create endpoint answers with a JSON-encoded task id string.
        let body = self.api.call(ctx, "k8s", "create", &form).await?;
        let task_id = body.trim().trim_matches('"').to_string();
        if task_id.is_empty() {
            return Err(ProviderError::fatal("cluster create returned no task id"));
        }
        tracing::info!(task = %task_id, name = %spec.name, "cluster creation submitted");

        let poller = TaskPoller::new(self.api.client().clone());
        let cluster_id = poller
            .poll(ctx, &self.api.tasks_path(), &task_id)
            .await
            .map_err(ProviderError::from)?;
        if cluster_id == 0 {
            return Err(ProviderError::fatal(format!(
                "task {task_id} completed without producing a cluster id"
            )));
        }
        tracing::info!(cluster = cluster_id, "cluster created");

        let record = self.get(ctx, cluster_id).await?;
        self.state_from_record(ctx, &record, &spec.wg_name).await
    }

    async fn read(
        &self,
        ctx: &ReconcileContext,
        diags: &mut Diagnostics,
        prior: &K8sState,
    ) -> ProviderResult<Option<K8sState>> {
        let (record, action) = settle(ctx, "k8s cluster", || async move {
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
            StatusAction::Proceed => {}
            StatusAction::ProceedWithWarning => {
                diags.warn(format!("cluster {} is {}", record.id, record.status));
            }
            StatusAction::Restore => {
                diags.warn(format!(
                    "cluster {} is soft-deleted; an update will restore it",
                    record.id
                ));
            }
            StatusAction::Recreate => {
                if self.api.client().config().recreate_destroyed {
                    diags.warn(format!(
                        "cluster {} is destroyed; dropping it from state for recreation",
                        record.id
                    ));
                    return Ok(None);
                }
                return Err(ProviderError::fatal(format!(
                    "cluster {} is destroyed and recreate-on-destroyed is off",
                    record.id
                )));
            }
            StatusAction::Fatal => {
                return Err(ProviderError::fatal(format!(
                    "cluster {} needs operator attention",
                    record.id
                )));
            }
            StatusAction::WaitAndRetry => unreachable!("settled observations are never transitional"),
        }

        Ok(Some(
            self.state_from_record(ctx, &record, &prior.wg_name).await?,
        ))
    }

    async fn update(
        &self,
        ctx: &ReconcileContext,
        diags: &mut Diagnostics,
        prior: &K8sState,
        spec: &K8sSpec,
    ) -> ProviderResult<K8sState> {
        let id = prior.id;

        if let (Some(prior_masters), Some(desired_masters)) = (&prior.masters, &spec.masters)
            && prior_masters != desired_masters
        {
            diags.warn("master group sizing is immutable after create; change ignored");
        }

        // 1. Rename.
        if spec.name != prior.name {
            let form = Form::new().uint("k8sId", id).text("name", spec.name.clone());
            self.api.call(ctx, "k8s", "update", &form).await?;
        }

        // 2. Resize the first worker group by count delta.
        if spec.workers.num != prior.workers.num {
            if prior.wg_id == 0 {
                return Err(ProviderError::fatal(
                    "worker group id is unknown; refresh state before resizing",
                ));
            }
            if spec.workers.num > prior.workers.num {
                let delta = spec.workers.num - prior.workers.num;
                let form = Form::new()
                    .uint("k8sId", id)
                    .uint("workersGroupId", prior.wg_id)
                    .uint("num", u64::from(delta));
                self.api.call(ctx, "k8s", "workerAdd", &form).await?;
            } else {
                let excess = (prior.workers.num - spec.workers.num) as usize;
                // Tail workers go first, newest to oldest.
                for node in prior.worker_nodes.iter().rev().take(excess) {
                    ctx.check()?;
                    let form = Form::new()
                        .uint("k8sId", id)
                        .uint("workersGroupId", prior.wg_id)
                        .uint("workerId", node.id);
                    self.api.call(ctx, "k8s", "workerDelete", &form).await?;
                }
            }
        }

        let record = self.get(ctx, id).await?;
        self.state_from_record(ctx, &record, &prior.wg_name).await
    }

    async fn delete(
        &self,
        ctx: &ReconcileContext,
        _diags: &mut Diagnostics,
        prior: &K8sState,
        spec: &K8sSpec,
    ) -> ProviderResult<()> {
        if prior.id == 0 {
            return Ok(());
        }
        let form = Form::new()
            .uint("k8sId", prior.id)
            .boolean("permanently", spec.permanently);
        match self.api.call(ctx, "k8s", "delete", &form).await {
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
    ) -> ProviderResult<K8sState> {
        let id: u64 = id
            .parse()
            .map_err(|_| ProviderError::validation(format!("`{id}` is not a cluster id")))?;
        let record = self.get(ctx, id).await?;
        self.state_from_record(ctx, &record, "").await
    }
}
