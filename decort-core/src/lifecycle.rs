//! Lifecycle traits
//!
//! The host orchestrator drives resources through typed lifecycle hooks.
//! [`Lifecycle`] and [`DataSource`] are what handlers implement; the
//! dyn-compatible [`ManagedResource`] / [`ManagedDataSource`] wrappers put a
//! flat state-map face on them for the host's key/value protocol.

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::context::ReconcileContext;
use crate::diagnostics::Diagnostics;
use crate::error::ProviderResult;
use crate::statemap::StateMap;

/// Boxed future, for storing async work as a value.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Typed lifecycle hooks for one managed resource kind.
///
/// `Spec` is the desired state declared by the user; `State` is the persisted
/// record including server-computed fields. Warnings go into `diags`; the
/// first hard error aborts through `Result`.
#[async_trait]
pub trait Lifecycle: Send + Sync {
    type Spec: Serialize + DeserializeOwned + Send + Sync;
    type State: Serialize + DeserializeOwned + Send + Sync;

    /// Host-visible resource type name, e.g. `"decort_compute"`.
    fn type_name(&self) -> &'static str;

    async fn create(
        &self,
        ctx: &ReconcileContext,
        diags: &mut Diagnostics,
        spec: &Self::Spec,
    ) -> ProviderResult<Self::State>;

    /// Refresh the persisted record from the platform.
    ///
    /// `Ok(None)` means the entity is gone (or destroyed beyond recovery)
    /// and the host should drop it from state. Read never mutates remote
    /// state; recovery transitions belong to `update`.
    async fn read(
        &self,
        ctx: &ReconcileContext,
        diags: &mut Diagnostics,
        prior: &Self::State,
    ) -> ProviderResult<Option<Self::State>>;

    async fn update(
        &self,
        ctx: &ReconcileContext,
        diags: &mut Diagnostics,
        prior: &Self::State,
        spec: &Self::Spec,
    ) -> ProviderResult<Self::State>;

    async fn delete(
        &self,
        ctx: &ReconcileContext,
        diags: &mut Diagnostics,
        prior: &Self::State,
        spec: &Self::Spec,
    ) -> ProviderResult<()>;

    /// Adopt an existing platform entity by id.
    async fn import(
        &self,
        ctx: &ReconcileContext,
        diags: &mut Diagnostics,
        id: &str,
    ) -> ProviderResult<Self::State> {
        let _ = (ctx, diags, id);
        Err(crate::error::ProviderError::validation(format!(
            "{} does not support import",
            self.type_name()
        )))
    }
}

/// Read-only lookup exposed to the host as a data source.
#[async_trait]
pub trait DataSource: Send + Sync {
    type Query: Serialize + DeserializeOwned + Send + Sync;
    type Output: Serialize + DeserializeOwned + Send + Sync;

    fn type_name(&self) -> &'static str;

    async fn read(
        &self,
        ctx: &ReconcileContext,
        diags: &mut Diagnostics,
        query: &Self::Query,
    ) -> ProviderResult<Self::Output>;
}

/// State plus the diagnostics accumulated while producing it.
#[derive(Debug, Clone, Default)]
pub struct Reconciled {
    pub state: StateMap,
    pub diagnostics: Diagnostics,
}

/// Dyn-compatible resource surface over flat state maps.
#[async_trait]
pub trait ManagedResource: Send + Sync {
    fn type_name(&self) -> &'static str;

    async fn create(&self, ctx: &ReconcileContext, desired: &StateMap)
    -> ProviderResult<Reconciled>;

    async fn read(
        &self,
        ctx: &ReconcileContext,
        prior: &StateMap,
    ) -> ProviderResult<Option<Reconciled>>;

    async fn update(
        &self,
        ctx: &ReconcileContext,
        prior: &StateMap,
        desired: &StateMap,
    ) -> ProviderResult<Reconciled>;

    async fn delete(
        &self,
        ctx: &ReconcileContext,
        prior: &StateMap,
        desired: &StateMap,
    ) -> ProviderResult<Diagnostics>;

    async fn import(&self, ctx: &ReconcileContext, id: &str) -> ProviderResult<Reconciled>;
}

/// Dyn-compatible data-source surface over flat state maps.
#[async_trait]
pub trait ManagedDataSource: Send + Sync {
    fn type_name(&self) -> &'static str;

    async fn read(&self, ctx: &ReconcileContext, query: &StateMap) -> ProviderResult<Reconciled>;
}

/// The boundary adapter: gives a typed [`Lifecycle`] implementation its
/// flat-map face. This is the only place state maps and typed records meet.
pub struct Hosted<L>(pub L);

#[async_trait]
impl<L: Lifecycle> ManagedResource for Hosted<L> {
    fn type_name(&self) -> &'static str {
        self.0.type_name()
    }

    async fn create(
        &self,
        ctx: &ReconcileContext,
        desired: &StateMap,
    ) -> ProviderResult<Reconciled> {
        let spec: L::Spec = desired.to_typed()?;
        let mut diagnostics = Diagnostics::new();
        let state = self.0.create(ctx, &mut diagnostics, &spec).await?;
        Ok(Reconciled {
            state: StateMap::from_typed(&state)?,
            diagnostics,
        })
    }

    async fn read(
        &self,
        ctx: &ReconcileContext,
        prior: &StateMap,
    ) -> ProviderResult<Option<Reconciled>> {
        let prior: L::State = prior.to_typed()?;
        let mut diagnostics = Diagnostics::new();
        match self.0.read(ctx, &mut diagnostics, &prior).await? {
            None => Ok(None),
            Some(state) => Ok(Some(Reconciled {
                state: StateMap::from_typed(&state)?,
                diagnostics,
            })),
        }
    }

    async fn update(
        &self,
        ctx: &ReconcileContext,
        prior: &StateMap,
        desired: &StateMap,
    ) -> ProviderResult<Reconciled> {
        let prior: L::State = prior.to_typed()?;
        let spec: L::Spec = desired.to_typed()?;
        let mut diagnostics = Diagnostics::new();
        let state = self.0.update(ctx, &mut diagnostics, &prior, &spec).await?;
        Ok(Reconciled {
            state: StateMap::from_typed(&state)?,
            diagnostics,
        })
    }

    async fn delete(
        &self,
        ctx: &ReconcileContext,
        prior: &StateMap,
        desired: &StateMap,
    ) -> ProviderResult<Diagnostics> {
        let prior: L::State = prior.to_typed()?;
        let spec: L::Spec = desired.to_typed()?;
        let mut diagnostics = Diagnostics::new();
        self.0.delete(ctx, &mut diagnostics, &prior, &spec).await?;
        Ok(diagnostics)
    }

    async fn import(&self, ctx: &ReconcileContext, id: &str) -> ProviderResult<Reconciled> {
        let mut diagnostics = Diagnostics::new();
        let state = self.0.import(ctx, &mut diagnostics, id).await?;
        Ok(Reconciled {
            state: StateMap::from_typed(&state)?,
            diagnostics,
        })
    }
}

/// Flat-map face for a typed [`DataSource`].
pub struct HostedData<D>(pub D);

#[async_trait]
impl<D: DataSource> ManagedDataSource for HostedData<D> {
    fn type_name(&self) -> &'static str {
        self.0.type_name()
    }

    async fn read(&self, ctx: &ReconcileContext, query: &StateMap) -> ProviderResult<Reconciled> {
        let query: D::Query = query.to_typed()?;
        let mut diagnostics = Diagnostics::new();
        let output = self.0.read(ctx, &mut diagnostics, &query).await?;
        Ok(Reconciled {
            state: StateMap::from_typed(&output)?,
            diagnostics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct EchoSpec {
        name: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct EchoState {
        id: u64,
        name: String,
    }

    struct EchoResource;

    #[async_trait]
    impl Lifecycle for EchoResource {
        type Spec = EchoSpec;
        type State = EchoState;

        fn type_name(&self) -> &'static str {
            "echo"
        }

        async fn create(
            &self,
            _ctx: &ReconcileContext,
            diags: &mut Diagnostics,
            spec: &EchoSpec,
        ) -> ProviderResult<EchoState> {
            diags.warn("created in test mode");
            Ok(EchoState {
                id: 101,
                name: spec.name.clone(),
            })
        }

        async fn read(
            &self,
            _ctx: &ReconcileContext,
            _diags: &mut Diagnostics,
            prior: &EchoState,
        ) -> ProviderResult<Option<EchoState>> {
            Ok(Some(prior.clone()))
        }

        async fn update(
            &self,
            _ctx: &ReconcileContext,
            _diags: &mut Diagnostics,
            prior: &EchoState,
            spec: &EchoSpec,
        ) -> ProviderResult<EchoState> {
            Ok(EchoState {
                id: prior.id,
                name: spec.name.clone(),
            })
        }

        async fn delete(
            &self,
            _ctx: &ReconcileContext,
            _diags: &mut Diagnostics,
            _prior: &EchoState,
            _spec: &EchoSpec,
        ) -> ProviderResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn hosted_resource_round_trips_state_maps() {
        let resource = Hosted(EchoResource);
        let ctx = ReconcileContext::background();
        let desired = StateMap::from_typed(&EchoSpec {
            name: "web".to_string(),
        })
        .unwrap();

        let created = resource.create(&ctx, &desired).await.unwrap();
        assert!(created.diagnostics.has_warnings());
        let state: EchoState = created.state.to_typed().unwrap();
        assert_eq!(state.id, 101);

        let read = resource.read(&ctx, &created.state).await.unwrap().unwrap();
        // Idempotent read: unchanged remote state yields identical maps.
        assert_eq!(read.state, created.state);
    }

    #[tokio::test]
    async fn import_is_rejected_by_default() {
        let resource = Hosted(EchoResource);
        let ctx = ReconcileContext::background();
        let err = resource.import(&ctx, "101").await.unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Validation);
    }
}
