//! End-to-end ViNS lifecycle flows over the scripted transport.

mod common;

use common::{MockTransport, tenant_api};
use decort_core::ReconcileContext;
use decort_core::diagnostics::Diagnostics;
use decort_core::lifecycle::Lifecycle;
use decort_core::status::Status;
use decort_provider::resources::vins::{
    NatRuleSpec, NatRuleState, VinsResource, VinsSpec, VinsState,
};

fn record_body(id: u64, status: &str) -> String {
    format!(
        r#"{{
            "id": {id}, "name": "backend", "rgId": 3, "accountId": 0,
            "network": "10.0.0.0/24", "extNetId": -1, "extNetIp": "",
            "status": "{status}",
            "reservations": [],
            "natRules": [{{"ruleId": 12, "localIp": "10.0.0.5", "localPort": 80, "publicPortStart": 8081, "publicPortEnd": 8081, "protocol": "tcp"}}]
        }}"#
    )
}

fn base_spec() -> VinsSpec {
    VinsSpec {
        name: "backend".to_string(),
        rg_id: Some(3),
        account_id: None,
        cidr: Some("10.0.0.0/24".to_string()),
        ext_net_id: None,
        ext_net_ip: None,
        pre_reservations: 32,
        enabled: true,
        reservations: vec![],
        nat_rules: vec![],
        vnfdev_restart: false,
        vnfdev_redeploy: false,
        force: false,
        permanently: false,
    }
}

fn prior_state() -> VinsState {
    VinsState {
        id: 31,
        name: "backend".to_string(),
        rg_id: 3,
        account_id: 0,
        cidr: "10.0.0.0/24".to_string(),
        ext_net_id: -1,
        ext_net_ip: String::new(),
        enabled: true,
        reservations: vec![],
        nat_rules: vec![NatRuleState {
            rule_id: 11,
            int_ip: "10.0.0.5".to_string(),
            int_port: 80,
            ext_port_start: 8080,
            ext_port_end: 8080,
            protocol: "tcp".to_string(),
        }],
        vnfdev_restart: false,
        vnfdev_redeploy: false,
        status: Status::Enabled,
    }
}

/// Scenario: changing a NAT rule's public port replaces the rule, deleting
/// the old one by its stored rule id before adding the new tuple.
#[tokio::test]
async fn nat_rule_change_is_delete_then_add() {
    let transport = MockTransport::new();
    transport.respond("cloudapi/vins/get", &record_body(31, "ENABLED"));

    let resource = VinsResource::new(tenant_api(transport.clone()));
    let ctx = ReconcileContext::background();
    let mut diags = Diagnostics::new();

    let mut spec = base_spec();
    spec.nat_rules = vec![NatRuleSpec {
        int_ip: "10.0.0.5".to_string(),
        int_port: 80,
        ext_port_start: 8081,
        ext_port_end: None,
        protocol: None,
    }];

    let state = resource
        .update(&ctx, &mut diags, &prior_state(), &spec)
        .await
        .unwrap();

    let del = transport.position_of("cloudapi/vins/natRuleDel").unwrap();
    let add = transport.position_of("cloudapi/vins/natRuleAdd").unwrap();
    assert!(del < add);

    let del_form = &transport.calls_to("cloudapi/vins/natRuleDel")[0].form;
    assert_eq!(del_form.get("ruleId"), Some("11"));

    let add_form = &transport.calls_to("cloudapi/vins/natRuleAdd")[0].form;
    assert_eq!(add_form.get("intIp"), Some("10.0.0.5"));
    assert_eq!(add_form.get("intPort"), Some("80"));
    assert_eq!(add_form.get("extPortStart"), Some("8081"));

    // The re-read picked up the platform-assigned id of the new rule.
    assert_eq!(state.nat_rules[0].rule_id, 12);
    assert_eq!(state.nat_rules[0].ext_port_start, 8081);
}

/// Identical rule sets in a different order cause no NAT calls at all.
#[tokio::test]
async fn unchanged_nat_rules_are_left_alone() {
    let transport = MockTransport::new();
    transport.respond("cloudapi/vins/get", &record_body(31, "ENABLED"));

    let resource = VinsResource::new(tenant_api(transport.clone()));
    let ctx = ReconcileContext::background();
    let mut diags = Diagnostics::new();

    let mut spec = base_spec();
    spec.nat_rules = vec![NatRuleSpec {
        int_ip: "10.0.0.5".to_string(),
        int_port: 80,
        ext_port_start: 8080,
        ext_port_end: None,
        protocol: None,
    }];

    resource
        .update(&ctx, &mut diags, &prior_state(), &spec)
        .await
        .unwrap();

    assert!(transport.calls_to("cloudapi/vins/natRuleDel").is_empty());
    assert!(transport.calls_to("cloudapi/vins/natRuleAdd").is_empty());
}

/// The vnfdev restart toggle is edge-triggered and never persists, so the
/// host can fire it again on the next false-to-true edge.
#[tokio::test]
async fn vnfdev_restart_fires_on_the_edge_and_resets() {
    let transport = MockTransport::new();
    transport.respond("cloudapi/vins/get", &record_body(31, "ENABLED"));

    let resource = VinsResource::new(tenant_api(transport.clone()));
    let ctx = ReconcileContext::background();
    let mut diags = Diagnostics::new();

    let mut spec = base_spec();
    spec.nat_rules = vec![NatRuleSpec {
        int_ip: "10.0.0.5".to_string(),
        int_port: 80,
        ext_port_start: 8080,
        ext_port_end: None,
        protocol: None,
    }];
    spec.vnfdev_restart = true;

    let mut prior = prior_state();
    prior.nat_rules[0].ext_port_start = 8080;

    let state = resource.update(&ctx, &mut diags, &prior, &spec).await.unwrap();
    assert_eq!(transport.calls_to("cloudapi/vins/vnfdevRestart").len(), 1);
    assert!(!state.vnfdev_restart);
}

/// Creating inside a resource group goes through the rg-scoped endpoint and
/// applies the declared tables afterwards.
#[tokio::test]
async fn create_in_rg_provisions_tables() {
    let transport = MockTransport::new();
    transport.respond("cloudapi/vins/createInRG", "31");
    transport.respond("cloudapi/vins/get", &record_body(31, "ENABLED"));

    let resource = VinsResource::new(tenant_api(transport.clone()));
    let ctx = ReconcileContext::background();
    let mut diags = Diagnostics::new();

    let mut spec = base_spec();
    spec.nat_rules = vec![NatRuleSpec {
        int_ip: "10.0.0.5".to_string(),
        int_port: 80,
        ext_port_start: 8081,
        ext_port_end: None,
        protocol: None,
    }];

    let state = resource.create(&ctx, &mut diags, &spec).await.unwrap();
    assert_eq!(state.id, 31);
    assert_eq!(state.cidr, "10.0.0.0/24");

    let create = &transport.calls_to("cloudapi/vins/createInRG")[0].form;
    assert_eq!(create.get("rgId"), Some("3"));
    assert_eq!(create.get("ipcidr"), Some("10.0.0.0/24"));
    assert_eq!(transport.calls_to("cloudapi/vins/natRuleAdd").len(), 1);
}

/// A ViNS declared with both parents is rejected before any API call.
#[tokio::test]
async fn two_parents_fail_validation() {
    let transport = MockTransport::new();
    let resource = VinsResource::new(tenant_api(transport.clone()));
    let ctx = ReconcileContext::background();
    let mut diags = Diagnostics::new();

    let mut spec = base_spec();
    spec.account_id = Some(9);

    let err = resource.create(&ctx, &mut diags, &spec).await.unwrap_err();
    assert_eq!(err.kind, decort_core::ErrorKind::Validation);
    assert!(transport.calls().is_empty());
}
