//! End-to-end compute lifecycle flows over the scripted transport.

mod common;

use common::{MockTransport, tenant_api};
use decort_core::ReconcileContext;
use decort_core::diagnostics::Diagnostics;
use decort_core::lifecycle::Lifecycle;
use decort_core::status::{Status, TechStatus};
use decort_models::compute::NetType;
use decort_provider::resources::compute::{
    ComputeResource, ComputeSpec, ComputeState, DataDiskSpec, NicSpec,
};

fn base_spec() -> ComputeSpec {
    ComputeSpec {
        name: "web".to_string(),
        rg_id: 3,
        driver: "KVM_X86".to_string(),
        cpu: 2,
        ram: 2048,
        image_id: 17,
        boot_disk_size: 10,
        description: None,
        cloud_init: None,
        sep_id: None,
        pool: None,
        extra_disks: vec![],
        interfaces: vec![],
        disks: vec![],
        started: true,
        enabled: true,
        detach_disks: false,
        permanently: false,
    }
}

fn started_state(spec: &ComputeSpec, id: u64) -> ComputeState {
    ComputeState {
        id,
        name: spec.name.clone(),
        rg_id: spec.rg_id,
        driver: spec.driver.clone(),
        cpu: spec.cpu,
        ram: spec.ram,
        image_id: spec.image_id,
        boot_disk_size: spec.boot_disk_size,
        boot_disk_id: 5,
        description: None,
        cloud_init: None,
        extra_disks: vec![],
        interfaces: vec![],
        disks: vec![],
        os_users: vec![],
        started: true,
        enabled: true,
        status: Status::Enabled,
        tech_status: TechStatus::Started,
    }
}

fn record_body(id: u64, name: &str, status: &str) -> String {
    format!(
        r#"{{
            "id": {id}, "name": "{name}", "rgId": 3, "driver": "KVM_X86",
            "cpus": 2, "ram": 2048, "imageId": 17, "desc": "",
            "status": "{status}", "techStatus": "STARTED",
            "disks": [
                {{"id": 5, "name": "bootdisk", "type": "B", "sizeMax": 10, "sepId": 1, "pool": "vmstor"}},
                {{"id": 42, "name": "extra", "type": "D", "sizeMax": 20, "sepId": 1, "pool": "vmstor"}}
            ],
            "interfaces": [
                {{"netType": "EXTNET", "netId": 7, "ipAddress": "185.1.1.10", "mac": "52:54:00:aa:bb:cc"}},
                {{"netType": "VINS", "netId": 31, "ipAddress": "192.168.5.5", "mac": "52:54:00:aa:bb:cd"}}
            ],
            "osUsers": []
        }}"#
    )
}

/// Scenario: create with one extra disk and two nics. The first nic rides
/// the create call, the second is attached separately, and the start comes
/// after all attachments.
#[tokio::test]
async fn create_attaches_pieces_in_order() {
    let transport = MockTransport::new();
    transport.respond("cloudapi/compute/create", "101");
    transport.respond("cloudapi/compute/get", &record_body(101, "web", "ENABLED"));

    let resource = ComputeResource::new(tenant_api(transport.clone()));
    let ctx = ReconcileContext::background();
    let mut diags = Diagnostics::new();

    let mut spec = base_spec();
    spec.extra_disks = vec![42];
    spec.interfaces = vec![
        NicSpec {
            net_type: NetType::ExtNet,
            net_id: 7,
            ip_address: None,
        },
        NicSpec {
            net_type: NetType::Vins,
            net_id: 31,
            ip_address: None,
        },
    ];

    let state = resource.create(&ctx, &mut diags, &spec).await.unwrap();
    assert_eq!(state.id, 101);

    let paths = transport.paths();
    assert_eq!(
        paths,
        [
            "cloudapi/compute/create",
            "cloudapi/compute/diskAttach",
            "cloudapi/compute/netAttach",
            "cloudapi/compute/start",
            "cloudapi/compute/enable",
            "cloudapi/compute/get",
        ]
    );

    let create = &transport.calls_to("cloudapi/compute/create")[0].form;
    assert_eq!(create.get("netType"), Some("EXTNET"));
    assert_eq!(create.get("netId"), Some("7"));
    assert_eq!(create.get("start"), Some("false"));
    assert_eq!(create.get("cpu"), Some("2"));
    assert_eq!(create.get("ram"), Some("2048"));

    let attach = &transport.calls_to("cloudapi/compute/diskAttach")[0].form;
    assert_eq!(attach.get("diskId"), Some("42"));

    let net_attach = &transport.calls_to("cloudapi/compute/netAttach")[0].form;
    assert_eq!(net_attach.get("netType"), Some("VINS"));
    assert_eq!(net_attach.get("netId"), Some("31"));
}

/// A failing attachment step unwinds the registered compensation: the
/// half-built compute is destroyed with its disks detached.
#[tokio::test]
async fn create_failure_runs_the_cleanup() {
    let transport = MockTransport::new();
    transport.respond("cloudapi/compute/create", "101");
    transport.respond_status("cloudapi/compute/netAttach", 409, "network is down");

    let resource = ComputeResource::new(tenant_api(transport.clone()));
    let ctx = ReconcileContext::background();
    let mut diags = Diagnostics::new();

    let mut spec = base_spec();
    spec.interfaces = vec![
        NicSpec {
            net_type: NetType::ExtNet,
            net_id: 7,
            ip_address: None,
        },
        NicSpec {
            net_type: NetType::Vins,
            net_id: 31,
            ip_address: None,
        },
    ];

    let err = resource.create(&ctx, &mut diags, &spec).await.unwrap_err();
    assert!(err.to_string().contains("network is down"));

    let delete = transport.calls_to("cloudapi/compute/delete");
    assert_eq!(delete.len(), 1);
    assert_eq!(delete[0].form.get("permanently"), Some("true"));
    assert_eq!(delete[0].form.get("detachDisks"), Some("true"));
}

/// Scenario: growing the boot disk and renaming must not trigger a cpu/ram
/// resize, and the disk grow targets the boot disk id.
#[tokio::test]
async fn update_grows_boot_disk_and_renames() {
    let transport = MockTransport::new();
    transport.respond("cloudapi/compute/get", &record_body(101, "web", "ENABLED"));

    let resource = ComputeResource::new(tenant_api(transport.clone()));
    let ctx = ReconcileContext::background();
    let mut diags = Diagnostics::new();

    let mut spec = base_spec();
    spec.name = "web-01".to_string();
    spec.boot_disk_size = 20;
    spec.extra_disks = vec![42];
    spec.interfaces = vec![
        NicSpec {
            net_type: NetType::ExtNet,
            net_id: 7,
            ip_address: None,
        },
        NicSpec {
            net_type: NetType::Vins,
            net_id: 31,
            ip_address: None,
        },
    ];

    let mut prior = started_state(&base_spec(), 101);
    prior.extra_disks = vec![42];
    prior.interfaces = vec![
        decort_provider::resources::compute::NicState {
            net_type: NetType::ExtNet,
            net_id: 7,
            ip_address: "185.1.1.10".to_string(),
            mac: "52:54:00:aa:bb:cc".to_string(),
        },
        decort_provider::resources::compute::NicState {
            net_type: NetType::Vins,
            net_id: 31,
            ip_address: "192.168.5.5".to_string(),
            mac: "52:54:00:aa:bb:cd".to_string(),
        },
    ];

    resource.update(&ctx, &mut diags, &prior, &spec).await.unwrap();

    let paths = transport.paths();
    assert!(!paths.contains(&"cloudapi/compute/resize".to_string()));

    let grow = transport.calls_to("cloudapi/compute/diskResize");
    assert_eq!(grow.len(), 1);
    assert_eq!(grow[0].form.get("diskId"), Some("5"));
    assert_eq!(grow[0].form.get("size"), Some("20"));

    let rename = transport.calls_to("cloudapi/compute/update");
    assert_eq!(rename.len(), 1);
    assert_eq!(rename[0].form.get("name"), Some("web-01"));
}

/// Scenario: shrinking the boot disk is refused with a warning and no call.
#[tokio::test]
async fn update_refuses_to_shrink_boot_disk() {
    let transport = MockTransport::new();
    transport.respond("cloudapi/compute/get", &record_body(101, "web", "ENABLED"));

    let resource = ComputeResource::new(tenant_api(transport.clone()));
    let ctx = ReconcileContext::background();
    let mut diags = Diagnostics::new();

    let mut spec = base_spec();
    spec.boot_disk_size = 5;
    spec.extra_disks = vec![42];
    spec.interfaces = vec![
        NicSpec {
            net_type: NetType::ExtNet,
            net_id: 7,
            ip_address: None,
        },
        NicSpec {
            net_type: NetType::Vins,
            net_id: 31,
            ip_address: None,
        },
    ];
    let mut prior = started_state(&base_spec(), 101);
    prior.extra_disks = vec![42];
    prior.interfaces = spec
        .interfaces
        .iter()
        .map(|n| decort_provider::resources::compute::NicState {
            net_type: n.net_type,
            net_id: n.net_id,
            ip_address: String::new(),
            mac: String::new(),
        })
        .collect();

    resource.update(&ctx, &mut diags, &prior, &spec).await.unwrap();

    assert!(transport.calls_to("cloudapi/compute/diskResize").is_empty());
    assert!(diags.iter().any(|d| d
        .summary
        .contains("shrinking boot disk is not allowed")));
}

/// Removing a row from the data-disk table stops the compute first and
/// starts it again before the replacement disks are added.
#[tokio::test]
async fn data_disk_removal_is_bracketed_by_stop_and_start() {
    let transport = MockTransport::new();
    transport.respond("cloudapi/compute/get", &record_body(101, "web", "ENABLED"));

    let resource = ComputeResource::new(tenant_api(transport.clone()));
    let ctx = ReconcileContext::background();
    let mut diags = Diagnostics::new();

    let mut prior = started_state(&base_spec(), 101);
    prior.extra_disks = vec![42];
    prior.disks = vec![decort_provider::resources::compute::DataDiskState {
        disk_id: 77,
        name: "scratch".to_string(),
        size: 30,
        sep_id: 1,
        pool: "vmstor".to_string(),
    }];
    prior.interfaces = vec![
        decort_provider::resources::compute::NicState {
            net_type: NetType::ExtNet,
            net_id: 7,
            ip_address: String::new(),
            mac: String::new(),
        },
        decort_provider::resources::compute::NicState {
            net_type: NetType::Vins,
            net_id: 31,
            ip_address: String::new(),
            mac: String::new(),
        },
    ];

    let mut spec = base_spec();
    spec.extra_disks = vec![42];
    spec.interfaces = vec![
        NicSpec {
            net_type: NetType::ExtNet,
            net_id: 7,
            ip_address: None,
        },
        NicSpec {
            net_type: NetType::Vins,
            net_id: 31,
            ip_address: None,
        },
    ];
    spec.disks = vec![DataDiskSpec {
        name: "data-1".to_string(),
        size: 40,
        sep_id: None,
        pool: None,
        permanently: false,
    }];

    resource.update(&ctx, &mut diags, &prior, &spec).await.unwrap();

    let stop = transport.position_of("cloudapi/compute/stop").unwrap();
    let del = transport.position_of("cloudapi/compute/diskDel").unwrap();
    let start = transport.position_of("cloudapi/compute/start").unwrap();
    let add = transport.position_of("cloudapi/compute/diskAdd").unwrap();
    assert!(stop < del && del < start && start < add);

    let del_form = &transport.calls_to("cloudapi/compute/diskDel")[0].form;
    assert_eq!(del_form.get("diskId"), Some("77"));
}

/// Idempotent read: with unchanged remote state two consecutive reads
/// produce identical persisted state.
#[tokio::test]
async fn read_is_idempotent() {
    let transport = MockTransport::new();
    transport.respond("cloudapi/compute/get", &record_body(101, "web", "ENABLED"));

    let resource = ComputeResource::new(tenant_api(transport.clone()));
    let ctx = ReconcileContext::background();
    let mut diags = Diagnostics::new();
    let prior = started_state(&base_spec(), 101);

    let first = resource.read(&ctx, &mut diags, &prior).await.unwrap().unwrap();
    let second = resource.read(&ctx, &mut diags, &first).await.unwrap().unwrap();
    assert_eq!(
        serde_json::to_value(&first).unwrap(),
        serde_json::to_value(&second).unwrap()
    );
}

/// A destroyed compute disappears from state so the next reconciliation
/// runs Create again.
#[tokio::test]
async fn read_drops_destroyed_compute() {
    let transport = MockTransport::new();
    transport.respond("cloudapi/compute/get", &record_body(101, "web", "DESTROYED"));

    let resource = ComputeResource::new(tenant_api(transport.clone()));
    let ctx = ReconcileContext::background();
    let mut diags = Diagnostics::new();
    let prior = started_state(&base_spec(), 101);

    let state = resource.read(&ctx, &mut diags, &prior).await.unwrap();
    assert!(state.is_none());
    assert!(diags.has_warnings());
}

/// Deleting an already-absent compute completes without error.
#[tokio::test]
async fn delete_is_idempotent() {
    let transport = MockTransport::new();
    transport.respond_status("cloudapi/compute/delete", 404, "no such compute");

    let resource = ComputeResource::new(tenant_api(transport.clone()));
    let ctx = ReconcileContext::background();
    let mut diags = Diagnostics::new();
    let prior = started_state(&base_spec(), 101);

    resource
        .delete(&ctx, &mut diags, &prior, &base_spec())
        .await
        .unwrap();
}

/// Permuting set-valued tables without changing identities must not cause
/// any mutating call.
#[tokio::test]
async fn permuted_sets_cause_no_spurious_updates() {
    let transport = MockTransport::new();
    transport.respond("cloudapi/compute/get", &record_body(101, "web", "ENABLED"));

    let resource = ComputeResource::new(tenant_api(transport.clone()));
    let ctx = ReconcileContext::background();
    let mut diags = Diagnostics::new();

    let mut prior = started_state(&base_spec(), 101);
    prior.extra_disks = vec![42, 43];
    prior.interfaces = vec![
        decort_provider::resources::compute::NicState {
            net_type: NetType::ExtNet,
            net_id: 7,
            ip_address: String::new(),
            mac: String::new(),
        },
        decort_provider::resources::compute::NicState {
            net_type: NetType::Vins,
            net_id: 31,
            ip_address: String::new(),
            mac: String::new(),
        },
    ];

    let mut spec = base_spec();
    spec.extra_disks = vec![43, 42];
    spec.interfaces = vec![
        NicSpec {
            net_type: NetType::Vins,
            net_id: 31,
            ip_address: None,
        },
        NicSpec {
            net_type: NetType::ExtNet,
            net_id: 7,
            ip_address: None,
        },
    ];

    resource.update(&ctx, &mut diags, &prior, &spec).await.unwrap();

    for path in transport.paths() {
        assert!(
            path.ends_with("/get"),
            "unexpected mutating call: {path}"
        );
    }
}
