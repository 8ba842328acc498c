//! Namespaced API access
//!
//! Thin wrapper over the client that prefixes paths with the catalog
//! namespace and parses the two response shapes handlers care about: a bare
//! scalar id and a JSON record.

use decort_client::{DecortClient, Form};
use decort_core::ReconcileContext;
use decort_core::error::{ProviderError, ProviderResult};
use serde::de::DeserializeOwned;

/// API surface the catalog was built for.
///
/// Tenant reconciliation goes through `cloudapi`, the operator view through
/// `cloudbroker`. Selected once at process initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiNamespace {
    Tenant,
    Broker,
}

impl ApiNamespace {
    pub fn prefix(&self) -> &'static str {
        match self {
            ApiNamespace::Tenant => "cloudapi",
            ApiNamespace::Broker => "cloudbroker",
        }
    }

    pub fn path(&self, object: &str, verb: &str) -> String {
        format!("{}/{object}/{verb}", self.prefix())
    }
}

/// Client plus namespace, shared by every handler of one catalog.
#[derive(Debug, Clone)]
pub struct Api {
    client: DecortClient,
    namespace: ApiNamespace,
}

impl Api {
    pub fn new(client: DecortClient, namespace: ApiNamespace) -> Self {
        Self { client, namespace }
    }

    pub fn client(&self) -> &DecortClient {
        &self.client
    }

    pub fn namespace(&self) -> ApiNamespace {
        self.namespace
    }

    /// Path of the task-status endpoint in this namespace.
    pub fn tasks_path(&self) -> String {
        self.namespace.path("tasks", "get")
    }

    /// POST and return the raw body.
    pub async fn call(
        &self,
        ctx: &ReconcileContext,
        object: &str,
        verb: &str,
        form: &Form,
    ) -> ProviderResult<String> {
        let path = self.namespace.path(object, verb);
        let body = self.client.call(ctx, &path, form).await?;
        Ok(body)
    }

    /// POST and parse the body as a JSON record.
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        ctx: &ReconcileContext,
        object: &str,
        verb: &str,
        form: &Form,
    ) -> ProviderResult<T> {
        let body = self.call(ctx, object, verb, form).await?;
        serde_json::from_str(&body).map_err(|e| {
            ProviderError::fatal(format!("unexpected {object}/{verb} response shape")).with_cause(e)
        })
    }

    /// POST and parse the body as a bare scalar id.
    pub async fn call_id(
        &self,
        ctx: &ReconcileContext,
        object: &str,
        verb: &str,
        form: &Form,
    ) -> ProviderResult<u64> {
        let body = self.call(ctx, object, verb, form).await?;
        parse_id(&body)
    }
}

/// Parse a scalar-id response. The platform returns the id either bare or
/// JSON-string quoted.
pub fn parse_id(body: &str) -> ProviderResult<u64> {
    let trimmed = body.trim().trim_matches('"');
    trimmed
        .parse::<u64>()
        .map_err(|_| ProviderError::fatal(format!("expected a numeric id, got {body:?}")))
}
