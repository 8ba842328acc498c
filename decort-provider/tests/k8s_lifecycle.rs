//! End-to-end cluster lifecycle flows, including the async create.

mod common;

use common::{MockTransport, tenant_api};
use decort_core::ReconcileContext;
use decort_core::diagnostics::Diagnostics;
use decort_core::lifecycle::Lifecycle;
use decort_core::status::{Status, TechStatus};
use decort_provider::resources::k8s::{K8sResource, K8sSpec, K8sState, NodeState, WorkerSpec};

fn base_spec() -> K8sSpec {
    K8sSpec {
        name: "k8s-prod".to_string(),
        rg_id: 3,
        ci_id: 9,
        wg_name: "wg-a".to_string(),
        masters: None,
        workers: WorkerSpec {
            num: 2,
            cpu: 4,
            ram: 4096,
            disk: 20,
        },
        with_lb: true,
        ext_net_id: None,
        description: None,
        permanently: false,
    }
}

fn cluster_body(id: u64, worker_ids: &[u64]) -> String {
    let workers: Vec<String> = worker_ids
        .iter()
        .enumerate()
        .map(|(i, wid)| {
            format!(
                r#"{{"id": {wid}, "name": "wg-a-{i}", "status": "ENABLED", "techStatus": "STARTED", "ipAddress": ""}}"#
            )
        })
        .collect();
    format!(
        r#"{{
            "id": {id}, "name": "k8s-prod", "rgId": 3, "ciId": 9, "lbId": 12,
            "vinsId": 31, "desc": "", "status": "ENABLED", "techStatus": "STARTED",
            "k8sGroups": {{
                "masters": {{"id": 1, "name": "master", "num": 1, "cpu": 2, "ram": 2048, "disk": 10, "detailedInfo": []}},
                "workers": [{{"id": 2, "name": "wg-a", "num": {num}, "cpu": 4, "ram": 4096, "disk": 20, "detailedInfo": [{workers}]}}]
            }}
        }}"#,
        num = worker_ids.len(),
        workers = workers.join(",")
    )
}

fn node_compute_body(id: u64) -> String {
    format!(
        r#"{{
            "id": {id}, "name": "wg-a-node", "rgId": 3, "cpus": 4, "ram": 4096,
            "status": "ENABLED", "techStatus": "STARTED",
            "interfaces": [{{"netType": "VINS", "netId": 31, "ipAddress": "192.168.5.11", "mac": "52:54:00:00:00:02"}}]
        }}"#
    )
}

/// Scenario: create submits the task, the poller rides out two incomplete
/// probes, and the task result becomes the persisted cluster id.
#[tokio::test(start_paused = true)]
async fn create_polls_the_task_to_completion() {
    let transport = MockTransport::new();
    transport.respond("cloudapi/k8s/create", "\"t-7\"");
    transport.respond(
        "cloudapi/tasks/get",
        r#"{"auditId": "t-7", "completed": false, "stage": "masters"}"#,
    );
    transport.respond(
        "cloudapi/tasks/get",
        r#"{"auditId": "t-7", "completed": false, "stage": "workers"}"#,
    );
    transport.respond(
        "cloudapi/tasks/get",
        r#"{"auditId": "t-7", "completed": true, "error": "", "result": "314", "stage": "done"}"#,
    );
    transport.respond("cloudapi/k8s/get", &cluster_body(314, &[202, 203]));
    transport.respond("cloudapi/compute/get", &node_compute_body(202));

    let resource = K8sResource::new(tenant_api(transport.clone()));
    let ctx = ReconcileContext::background();
    let mut diags = Diagnostics::new();

    let state = resource.create(&ctx, &mut diags, &base_spec()).await.unwrap();
    assert_eq!(state.id, 314);
    assert_eq!(state.lb_id, 12);
    assert_eq!(state.wg_id, 2);
    assert_eq!(state.worker_nodes.len(), 2);
    assert_eq!(transport.calls_to("cloudapi/tasks/get").len(), 3);

    let poll = &transport.calls_to("cloudapi/tasks/get")[0].form;
    assert_eq!(poll.get("auditId"), Some("t-7"));
}

/// A task that completes with an error surfaces it instead of an id.
#[tokio::test(start_paused = true)]
async fn create_surfaces_task_failure() {
    let transport = MockTransport::new();
    transport.respond("cloudapi/k8s/create", "\"t-9\"");
    transport.respond(
        "cloudapi/tasks/get",
        r#"{"auditId": "t-9", "completed": true, "error": "quota exceeded", "stage": "masters"}"#,
    );

    let resource = K8sResource::new(tenant_api(transport.clone()));
    let ctx = ReconcileContext::background();
    let mut diags = Diagnostics::new();

    let err = resource
        .create(&ctx, &mut diags, &base_spec())
        .await
        .unwrap_err();
    assert_eq!(err.kind, decort_core::ErrorKind::AsyncTask);
    assert!(err.to_string().contains("quota exceeded"));
}

/// Growing the worker count adds the delta in one call.
#[tokio::test]
async fn update_grows_workers_by_delta() {
    let transport = MockTransport::new();
    transport.respond("cloudapi/k8s/get", &cluster_body(314, &[202, 203, 204]));
    transport.respond("cloudapi/compute/get", &node_compute_body(202));

    let resource = K8sResource::new(tenant_api(transport.clone()));
    let ctx = ReconcileContext::background();
    let mut diags = Diagnostics::new();

    let prior = prior_state(&[202, 203]);
    let mut spec = base_spec();
    spec.workers.num = 3;

    resource.update(&ctx, &mut diags, &prior, &spec).await.unwrap();

    let adds = transport.calls_to("cloudapi/k8s/workerAdd");
    assert_eq!(adds.len(), 1);
    assert_eq!(adds[0].form.get("num"), Some("1"));
    assert_eq!(adds[0].form.get("workersGroupId"), Some("2"));
    assert!(transport.calls_to("cloudapi/k8s/workerDelete").is_empty());
}

/// Shrinking deletes tail workers by id, newest first.
#[tokio::test]
async fn update_shrinks_workers_from_the_tail() {
    let transport = MockTransport::new();
    transport.respond("cloudapi/k8s/get", &cluster_body(314, &[202]));
    transport.respond("cloudapi/compute/get", &node_compute_body(202));

    let resource = K8sResource::new(tenant_api(transport.clone()));
    let ctx = ReconcileContext::background();
    let mut diags = Diagnostics::new();

    let prior = prior_state(&[202, 203, 204]);
    let mut spec = base_spec();
    spec.workers.num = 1;

    resource.update(&ctx, &mut diags, &prior, &spec).await.unwrap();

    let deletes = transport.calls_to("cloudapi/k8s/workerDelete");
    assert_eq!(deletes.len(), 2);
    assert_eq!(deletes[0].form.get("workerId"), Some("204"));
    assert_eq!(deletes[1].form.get("workerId"), Some("203"));
}

fn prior_state(worker_ids: &[u64]) -> K8sState {
    K8sState {
        id: 314,
        name: "k8s-prod".to_string(),
        rg_id: 3,
        ci_id: 9,
        lb_id: 12,
        vins_id: 31,
        wg_id: 2,
        wg_name: "wg-a".to_string(),
        masters: None,
        workers: WorkerSpec {
            num: worker_ids.len() as u32,
            cpu: 4,
            ram: 4096,
            disk: 20,
        },
        master_nodes: vec![],
        worker_nodes: worker_ids
            .iter()
            .enumerate()
            .map(|(i, id)| NodeState {
                id: *id,
                name: format!("wg-a-{i}"),
                ip_address: String::new(),
                status: Status::Enabled,
            })
            .collect(),
        status: Status::Enabled,
        tech_status: TechStatus::Started,
    }
}
