//! Virtual network segment lifecycle
//!
//! A ViNS is parented by exactly one of a resource group or an account, and
//! carries three reconciled tables: an optional external-network binding, a
//! DHCP reservation set and a NAT rule set. NAT rules are identified by
//! their declared tuple but deleted by the platform-assigned rule id.

use async_trait::async_trait;
use decort_client::Form;
use decort_core::context::ReconcileContext;
use decort_core::diagnostics::Diagnostics;
use decort_core::diff::diff_by_key;
use decort_core::error::{ProviderError, ProviderResult};
use decort_core::lifecycle::Lifecycle;
use decort_core::status::{Status, StatusAction, classify};
use decort_models::vins::{VinsListItem, VinsRecord};
use serde::{Deserialize, Serialize};

use crate::api::Api;
use crate::resources::settle;

fn default_true() -> bool {
    true
}

fn default_pre_reservations() -> u32 {
    32
}

/// Declared DHCP reservation. Identity is the ip address, or the mac when
/// the ip is left for the platform to pick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationSpec {
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub mac: Option<String>,
    #[serde(default)]
    pub compute_id: Option<u64>,
}

impl ReservationSpec {
    fn identity(&self) -> String {
        match &self.ip {
            Some(ip) if !ip.is_empty() => ip.clone(),
            _ => self.mac.clone().unwrap_or_default(),
        }
    }
}

/// Declared NAT rule. The identity triple never mutates in place; any
/// change is a delete of the old rule plus an add of the new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NatRuleSpec {
    pub int_ip: String,
    pub int_port: u16,
    pub ext_port_start: u16,
    #[serde(default)]
    pub ext_port_end: Option<u16>,
    #[serde(default)]
    pub protocol: Option<String>,
}

impl NatRuleSpec {
    fn identity(&self) -> (String, u16, u16) {
        (self.int_ip.clone(), self.int_port, self.ext_port_start)
    }
}

/// Desired ViNS state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VinsSpec {
    pub name: String,
    #[serde(default)]
    pub rg_id: Option<u64>,
    #[serde(default)]
    pub account_id: Option<u64>,
    #[serde(default)]
    pub cidr: Option<String>,
    #[serde(default)]
    pub ext_net_id: Option<u64>,
    #[serde(default)]
    pub ext_net_ip: Option<String>,
    #[serde(default = "default_pre_reservations")]
    pub pre_reservations: u32,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub reservations: Vec<ReservationSpec>,
    #[serde(default)]
    pub nat_rules: Vec<NatRuleSpec>,
    /// Edge-triggered on false to true; reset after application.
    #[serde(default)]
    pub vnfdev_restart: bool,
    /// Edge-triggered on false to true; reset after application.
    #[serde(default)]
    pub vnfdev_redeploy: bool,
    /// Delete-time flags.
    #[serde(default)]
    pub force: bool,
    #[serde(default)]
    pub permanently: bool,
}

/// Observed NAT rule with the platform-assigned id used for deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NatRuleState {
    pub rule_id: u64,
    pub int_ip: String,
    pub int_port: u16,
    pub ext_port_start: u16,
    pub ext_port_end: u16,
    pub protocol: String,
}

/// Observed DHCP reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationState {
    pub ip: String,
    pub mac: String,
    pub compute_id: u64,
}

/// Persisted ViNS state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VinsState {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub rg_id: u64,
    #[serde(default)]
    pub account_id: u64,
    #[serde(default)]
    pub cidr: String,
    #[serde(default)]
    pub ext_net_id: i64,
    #[serde(default)]
    pub ext_net_ip: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub reservations: Vec<ReservationState>,
    #[serde(default)]
    pub nat_rules: Vec<NatRuleState>,
    #[serde(default)]
    pub vnfdev_restart: bool,
    #[serde(default)]
    pub vnfdev_redeploy: bool,
    #[serde(default)]
    pub status: Status,
}

/// ViNS lifecycle handler.
#[derive(Debug, Clone)]
pub struct VinsResource {
    api: Api,
}

impl VinsResource {
    pub fn new(api: Api) -> Self {
        Self { api }
    }

    fn validate(spec: &VinsSpec) -> ProviderResult<()> {
        if spec.name.is_empty() {
            return Err(ProviderError::validation("vins name must not be empty"));
        }
        match (spec.rg_id, spec.account_id) {
            (Some(rg), None) if rg != 0 => Ok(()),
            (None, Some(acc)) if acc != 0 => Ok(()),
            _ => Err(ProviderError::validation(
                "vins must be parented by exactly one of rg_id or account_id",
            )),
        }
    }

    async fn get(&self, ctx: &ReconcileContext, id: u64) -> ProviderResult<VinsRecord> {
        self.api
            .fetch(ctx, "vins", "get", &Form::new().uint("vinsId", id))
            .await
    }

    async fn find(
        &self,
        ctx: &ReconcileContext,
        id: u64,
        name: &str,
        rg_id: u64,
        account_id: u64,
    ) -> ProviderResult<Option<VinsRecord>> {
        if id != 0 {
            return match self.get(ctx, id).await {
                Ok(record) => Ok(Some(record)),
                Err(err) if err.is_not_found() => Ok(None),
                Err(err) => Err(err),
            };
        }
        let form = if rg_id != 0 {
            Form::new().uint("rgId", rg_id)
        } else {
            Form::new().uint("accountId", account_id)
        };
        let listed: Vec<VinsListItem> = self.api.fetch(ctx, "vins", "search", &form).await?;
        match listed.iter().find(|v| {
            v.name == name
                && !v.status.is_destroyed()
                && (rg_id == 0 || v.rg_id == rg_id)
                && (account_id == 0 || v.account_id == account_id)
        }) {
            None => Ok(None),
            Some(hit) => Ok(Some(self.get(ctx, hit.id).await?)),
        }
    }

    async fn observe(
        &self,
        ctx: &ReconcileContext,
        id: u64,
        name: &str,
        rg_id: u64,
        account_id: u64,
    ) -> ProviderResult<(Option<VinsRecord>, StatusAction)> {
        settle(ctx, "vins", || async move {
            match self.find(ctx, id, name, rg_id, account_id).await? {
                None => Ok((None, StatusAction::Proceed)),
                Some(record) => {
                    let action = classify(&record.status);
                    Ok((Some(record), action))
                }
            }
        })
        .await
    }

    fn state_from_record(record: &VinsRecord) -> VinsState {
        VinsState {
            id: record.id,
            name: record.name.clone(),
            rg_id: record.rg_id,
            account_id: record.account_id,
            cidr: record.network.clone(),
            ext_net_id: record.ext_net_id,
            ext_net_ip: record.ext_net_ip.clone(),
            enabled: !matches!(record.status, Status::Disabled),
            reservations: record
                .reservations
                .iter()
                .map(|r| ReservationState {
                    ip: r.ip.clone(),
                    mac: r.mac.clone(),
                    compute_id: r.compute_id,
                })
                .collect(),
            nat_rules: record
                .nat_rules
                .iter()
                .map(|r| NatRuleState {
                    rule_id: r.rule_id,
                    int_ip: r.local_ip.clone(),
                    int_port: r.local_port,
                    ext_port_start: r.public_port_start,
                    ext_port_end: r.public_port_end,
                    protocol: r.protocol.clone(),
                })
                .collect(),
            // Edge-triggered toggles are write-only: they never survive a
            // refresh, so the next false-to-true edge can fire again.
            vnfdev_restart: false,
            vnfdev_redeploy: false,
            status: record.status.clone(),
        }
    }

    async fn reserve(
        &self,
        ctx: &ReconcileContext,
        id: u64,
        res: &ReservationSpec,
    ) -> ProviderResult<()> {
        let form = Form::new()
            .uint("vinsId", id)
            .text("type", "DHCP")
            .opt_text("ipAddr", res.ip.as_deref())
            .opt_text("mac", res.mac.as_deref())
            .opt_uint("computeId", res.compute_id);
        self.api.call(ctx, "vins", "ipReserve", &form).await?;
        Ok(())
    }

    async fn add_nat_rule(
        &self,
        ctx: &ReconcileContext,
        id: u64,
        rule: &NatRuleSpec,
    ) -> ProviderResult<()> {
        let form = Form::new()
            .uint("vinsId", id)
            .text("intIp", rule.int_ip.clone())
            .uint("intPort", u64::from(rule.int_port))
            .uint("extPortStart", u64::from(rule.ext_port_start))
            .opt_uint("extPortEnd", rule.ext_port_end.map(u64::from))
            .opt_text("proto", rule.protocol.as_deref());
        self.api.call(ctx, "vins", "natRuleAdd", &form).await?;
        Ok(())
    }

    async fn refreshed_state(
        &self,
        ctx: &ReconcileContext,
        id: u64,
    ) -> ProviderResult<VinsState> {
        let record = self.get(ctx, id).await?;
        Ok(Self::state_from_record(&record))
    }
}

#[async_trait]
impl Lifecycle for VinsResource {
    type Spec = VinsSpec;
    type State = VinsState;

    fn type_name(&self) -> &'static str {
        "decort_vins"
    }

    async fn create(
        &self,
        ctx: &ReconcileContext,
        diags: &mut Diagnostics,
        spec: &VinsSpec,
    ) -> ProviderResult<VinsState> {
        Self::validate(spec)?;

        let (verb, parent_form) = match (spec.rg_id, spec.account_id) {
            (Some(rg), _) if rg != 0 => ("createInRG", Form::new().uint("rgId", rg)),
            _ => (
                "createInAccount",
                Form::new().uint("accountId", spec.account_id.unwrap_or_default()),
            ),
        };
        let mut form = parent_form
            .text("name", spec.name.clone())
            .opt_text("ipcidr", spec.cidr.as_deref())
            .uint("preReservationsNum", u64::from(spec.pre_reservations));
        if let Some(ext_net) = spec.ext_net_id {
            form = form
                .uint("extNetId", ext_net)
                .opt_text("extIp", spec.ext_net_ip.as_deref());
        }

        let id = self.api.call_id(ctx, "vins", verb, &form).await?;
        tracing::info!(vins = id, name = %spec.name, "vins created");

        if !spec.enabled {
            self.api
                .call(ctx, "vins", "disable", &Form::new().uint("vinsId", id))
                .await?;
        }

        let mut failed = 0usize;
        let mut last_err: Option<ProviderError> = None;
        for res in &spec.reservations {
            ctx.check()?;
            if let Err(err) = self.reserve(ctx, id, res).await {
                failed += 1;
                last_err = Some(err);
            }
        }
        for rule in &spec.nat_rules {
            ctx.check()?;
            if let Err(err) = self.add_nat_rule(ctx, id, rule).await {
                failed += 1;
                last_err = Some(err);
            }
        }
        if let Some(err) = last_err {
            diags.partial_update("vins table provisioning", failed, &err);
        }

        self.refreshed_state(ctx, id).await
    }

    async fn read(
        &self,
        ctx: &ReconcileContext,
        diags: &mut Diagnostics,
        prior: &VinsState,
    ) -> ProviderResult<Option<VinsState>> {
        let (record, action) = self
            .observe(ctx, prior.id, &prior.name, prior.rg_id, prior.account_id)
            .await?;
        let Some(record) = record else {
            return Ok(None);
        };

        match action {
            StatusAction::Proceed => {}
            StatusAction::ProceedWithWarning => {
                diags.warn(format!("vins {} is {}", record.id, record.status));
            }
            StatusAction::Restore => {
                diags.warn(format!(
                    "vins {} is soft-deleted; an update will restore it",
                    record.id
                ));
            }
            StatusAction::Recreate => {
                if self.api.client().config().recreate_destroyed {
                    diags.warn(format!(
                        "vins {} is destroyed; dropping it from state for recreation",
                        record.id
                    ));
                    return Ok(None);
                }
                return Err(ProviderError::fatal(format!(
                    "vins {} is destroyed and recreate-on-destroyed is off",
                    record.id
                )));
            }
            StatusAction::Fatal => {
                return Err(ProviderError::fatal(format!(
                    "vins {} is in status {} and needs operator attention",
                    record.id, record.status
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
        prior: &VinsState,
        spec: &VinsSpec,
    ) -> ProviderResult<VinsState> {
        Self::validate(spec)?;
        let id = prior.id;
        let (record, action) = self
            .observe(ctx, id, &prior.name, prior.rg_id, prior.account_id)
            .await?;
        if record.is_none() {
            return Err(ProviderError::fatal(format!(
                "vins {id} disappeared from the platform; refresh state before updating"
            )));
        }

        match action {
            StatusAction::Proceed | StatusAction::ProceedWithWarning => {}
            StatusAction::Restore => {
                self.api
                    .call(ctx, "vins", "restore", &Form::new().uint("vinsId", id))
                    .await?;
                self.api
                    .call(ctx, "vins", "enable", &Form::new().uint("vinsId", id))
                    .await?;
            }
            StatusAction::Recreate => {
                return Err(ProviderError::fatal(format!(
                    "vins {id} is destroyed; it must be recreated, not updated"
                )));
            }
            StatusAction::Fatal => {
                return Err(ProviderError::fatal(format!(
                    "vins {id} needs operator attention"
                )));
            }
            StatusAction::WaitAndRetry => unreachable!("settled observations are never transitional"),
        }

        // 1. Enable/disable transition.
        if spec.enabled != prior.enabled {
            let verb = if spec.enabled { "enable" } else { "disable" };
            self.api
                .call(ctx, "vins", verb, &Form::new().uint("vinsId", id))
                .await?;
        }

        // 2. External-network rebinding: disconnect the old binding before
        // connecting the new one.
        let desired_ext = spec.ext_net_id.map(|v| v as i64).unwrap_or(-1);
        if desired_ext != prior.ext_net_id {
            if prior.ext_net_id > 0 {
                self.api
                    .call(
                        ctx,
                        "vins",
                        "extNetDisconnect",
                        &Form::new().uint("vinsId", id),
                    )
                    .await?;
            }
            if desired_ext > 0 {
                let form = Form::new()
                    .uint("vinsId", id)
                    .int("extNetId", desired_ext)
                    .opt_text("extIp", spec.ext_net_ip.as_deref());
                self.api.call(ctx, "vins", "extNetConnect", &form).await?;
            }
        }

        // 3. DHCP reservations: release removed, then reserve added.
        let prior_res_ids: Vec<String> = prior
            .reservations
            .iter()
            .map(|r| if r.ip.is_empty() { r.mac.clone() } else { r.ip.clone() })
            .collect();
        let desired_res_ids: Vec<String> =
            spec.reservations.iter().map(|r| r.identity()).collect();
        let res_diff = diff_by_key(&prior_res_ids, &desired_res_ids, |k| k.clone());
        let mut failed = 0usize;
        let mut last_err: Option<ProviderError> = None;
        for key in &res_diff.removed {
            ctx.check()?;
            if let Some(res) = prior
                .reservations
                .iter()
                .find(|r| &r.ip == *key || &r.mac == *key)
            {
                let form = Form::new()
                    .uint("vinsId", id)
                    .opt_text("ipAddr", Some(res.ip.as_str()))
                    .opt_text("mac", Some(res.mac.as_str()));
                if let Err(err) = self.api.call(ctx, "vins", "ipRelease", &form).await {
                    failed += 1;
                    last_err = Some(err);
                }
            }
        }
        for key in &res_diff.added {
            ctx.check()?;
            if let Some(res) = spec.reservations.iter().find(|r| &r.identity() == *key) {
                if let Err(err) = self.reserve(ctx, id, res).await {
                    failed += 1;
                    last_err = Some(err);
                }
            }
        }
        if let Some(err) = last_err {
            diags.partial_update("dhcp reservation reconciliation", failed, &err);
        }

        // 4. NAT rules: delete removed by their stored rule id, then add.
        let prior_rule_ids: Vec<(String, u16, u16)> = prior
            .nat_rules
            .iter()
            .map(|r| (r.int_ip.clone(), r.int_port, r.ext_port_start))
            .collect();
        let desired_rule_ids: Vec<(String, u16, u16)> =
            spec.nat_rules.iter().map(|r| r.identity()).collect();
        let nat_diff = diff_by_key(&prior_rule_ids, &desired_rule_ids, |k| k.clone());
        let mut failed = 0usize;
        let mut last_err: Option<ProviderError> = None;
        for key in &nat_diff.removed {
            ctx.check()?;
            if let Some(rule) = prior
                .nat_rules
                .iter()
                .find(|r| (r.int_ip.clone(), r.int_port, r.ext_port_start) == **key)
            {
                let form = Form::new().uint("vinsId", id).uint("ruleId", rule.rule_id);
                if let Err(err) = self.api.call(ctx, "vins", "natRuleDel", &form).await {
                    failed += 1;
                    last_err = Some(err);
                }
            }
        }
        for key in &nat_diff.added {
            ctx.check()?;
            if let Some(rule) = spec.nat_rules.iter().find(|r| &r.identity() == *key) {
                if let Err(err) = self.add_nat_rule(ctx, id, rule).await {
                    failed += 1;
                    last_err = Some(err);
                }
            }
        }
        if let Some(err) = last_err {
            diags.partial_update("nat rule reconciliation", failed, &err);
        }

        // 5. Edge-triggered VNF appliance maintenance.
        if spec.vnfdev_restart && !prior.vnfdev_restart {
            self.api
                .call(ctx, "vins", "vnfdevRestart", &Form::new().uint("vinsId", id))
                .await?;
        }
        if spec.vnfdev_redeploy && !prior.vnfdev_redeploy {
            self.api
                .call(ctx, "vins", "vnfdevRedeploy", &Form::new().uint("vinsId", id))
                .await?;
        }

        self.refreshed_state(ctx, id).await
    }

    async fn delete(
        &self,
        ctx: &ReconcileContext,
        _diags: &mut Diagnostics,
        prior: &VinsState,
        spec: &VinsSpec,
    ) -> ProviderResult<()> {
        if prior.id == 0 {
            return Ok(());
        }
        let form = Form::new()
            .uint("vinsId", prior.id)
            .boolean("force", spec.force)
            .boolean("permanently", spec.permanently);
        match self.api.call(ctx, "vins", "delete", &form).await {
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
    ) -> ProviderResult<VinsState> {
        let id: u64 = id
            .parse()
            .map_err(|_| ProviderError::validation(format!("`{id}` is not a vins id")))?;
        let record = self.get(ctx, id).await?;
        Ok(Self::state_from_record(&record))
    }
}
