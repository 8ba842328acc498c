//! Admin-mode catalog router
//!
//! A process-wide boolean, read once from `DECORT_ADMIN_MODE`, selects
//! between two disjoint catalogs: the tenant view over `cloudapi` and the
//! operator view over `cloudbroker`. The choice never changes within the
//! process lifetime; after construction it travels inside the provider
//! value, not in a global.

use std::sync::Arc;

use decort_client::DecortClient;
use decort_core::catalog::Catalog;
use decort_core::context::ReconcileContext;
use decort_core::lifecycle::{Hosted, HostedData};

use crate::api::{Api, ApiNamespace};
use crate::data::account::AccountDataSource;
use crate::data::compute::ComputeDataSource;
use crate::data::image::ImageDataSource;
use crate::data::lb::LbDataSource;
use crate::data::rg::RgDataSource;
use crate::data::vins::VinsDataSource;
use crate::resources::bservice::BasicServiceResource;
use crate::resources::compute::ComputeResource;
use crate::resources::disk::DiskResource;
use crate::resources::image::{ImageResource, VirtualImageResource};
use crate::resources::k8s::K8sResource;
use crate::resources::k8s_wg::WorkerGroupResource;
use crate::resources::rg::RgResource;
use crate::resources::vins::VinsResource;

/// Environment switch for the operator catalog.
pub const ADMIN_MODE_ENV: &str = "DECORT_ADMIN_MODE";

/// Parse the admin-mode flag from the environment; absent means tenant.
pub fn admin_mode_from_env() -> bool {
    match std::env::var(ADMIN_MODE_ENV) {
        Ok(raw) => matches!(
            raw.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Err(_) => false,
    }
}

/// The provider: one client, one namespace, one catalog.
#[derive(Debug, Clone)]
pub struct DecortProvider {
    api: Api,
    admin_mode: bool,
    default_grid_id: Option<u64>,
}

impl DecortProvider {
    pub fn new(client: DecortClient, admin_mode: bool) -> Self {
        let namespace = if admin_mode {
            ApiNamespace::Broker
        } else {
            ApiNamespace::Tenant
        };
        Self {
            api: Api::new(client, namespace),
            admin_mode,
            default_grid_id: None,
        }
    }

    /// Provider with the admin-mode flag taken from the environment.
    pub fn from_env(client: DecortClient) -> Self {
        Self::new(client, admin_mode_from_env())
    }

    pub fn with_default_grid(mut self, grid_id: u64) -> Self {
        self.default_grid_id = Some(grid_id);
        self
    }

    pub fn admin_mode(&self) -> bool {
        self.admin_mode
    }

    pub fn api(&self) -> &Api {
        &self.api
    }

    /// Context for one reconciliation, carrying the process-wide flags.
    pub fn context(&self) -> ReconcileContext {
        let ctx = ReconcileContext::background().with_admin_mode(self.admin_mode);
        match self.default_grid_id {
            Some(gid) => ctx.with_default_grid(gid),
            None => ctx,
        }
    }

    /// Build the catalog for the selected view.
    ///
    /// The tenant catalog carries the full self-service surface. The
    /// operator catalog exposes the infrastructure-level resources
    /// (groups, images, computes, networks, disks) but not the tenant
    /// composites (clusters, basic services), which the platform only
    /// serves through the tenant API.
    pub fn catalog(&self) -> Catalog {
        let api = &self.api;
        let base = Catalog::new()
            .with_resource(Arc::new(Hosted(ComputeResource::new(api.clone()))))
            .with_resource(Arc::new(Hosted(DiskResource::new(api.clone()))))
            .with_resource(Arc::new(Hosted(VinsResource::new(api.clone()))))
            .with_resource(Arc::new(Hosted(RgResource::new(api.clone()))))
            .with_resource(Arc::new(Hosted(ImageResource::new(api.clone()))))
            .with_resource(Arc::new(Hosted(VirtualImageResource::new(api.clone()))))
            .with_data_source(Arc::new(HostedData(AccountDataSource::new(api.clone()))))
            .with_data_source(Arc::new(HostedData(ComputeDataSource::new(api.clone()))))
            .with_data_source(Arc::new(HostedData(ImageDataSource::new(api.clone()))))
            .with_data_source(Arc::new(HostedData(LbDataSource::new(api.clone()))))
            .with_data_source(Arc::new(HostedData(RgDataSource::new(api.clone()))))
            .with_data_source(Arc::new(HostedData(VinsDataSource::new(api.clone()))));

        if self.admin_mode {
            base
        } else {
            base.with_resource(Arc::new(Hosted(K8sResource::new(api.clone()))))
                .with_resource(Arc::new(Hosted(WorkerGroupResource::new(api.clone()))))
                .with_resource(Arc::new(Hosted(BasicServiceResource::new(api.clone()))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use decort_client::{Config, DecortClient};

    fn test_client() -> DecortClient {
        DecortClient::with_defaults(Config::new(
            "https://cloud.test",
            "https://sso.test",
            "app",
            "secret",
        ))
    }

    #[test]
    fn tenant_catalog_carries_the_composites() {
        let provider = DecortProvider::new(test_client(), false);
        let catalog = provider.catalog();
        assert!(catalog.resource("decort_k8s").is_some());
        assert!(catalog.resource("decort_bservice").is_some());
        assert!(catalog.resource("decort_compute").is_some());
        assert!(catalog.data_source("decort_account").is_some());
        assert_eq!(provider.api().namespace(), ApiNamespace::Tenant);
    }

    #[test]
    fn operator_catalog_is_disjoint_from_the_tenant_one() {
        let provider = DecortProvider::new(test_client(), true);
        let catalog = provider.catalog();
        assert!(catalog.resource("decort_k8s").is_none());
        assert!(catalog.resource("decort_bservice").is_none());
        assert!(catalog.resource("decort_compute").is_some());
        assert_eq!(provider.api().namespace(), ApiNamespace::Broker);
    }

    #[test]
    fn context_carries_the_process_flags() {
        let provider = DecortProvider::new(test_client(), true).with_default_grid(212);
        let ctx = provider.context();
        assert!(ctx.admin_mode());
        assert_eq!(ctx.default_grid_id(), Some(212));
    }
}
