//! Resource lifecycle handlers
//!
//! One module per managed resource kind. All of them share the skeleton:
//! validate, probe presence, classify the observed status, apply ordered API
//! calls (diff-driven for set-valued tables), re-read, report diagnostics.

pub mod bservice;
pub mod compute;
pub mod disk;
pub mod image;
pub mod k8s;
pub mod k8s_wg;
pub mod rg;
pub mod vins;

use std::time::Duration;

use decort_core::ReconcileContext;
use decort_core::error::{ProviderError, ProviderResult};
use decort_core::status::StatusAction;

/// How many probes a handler gives an entity stuck in a transitional status.
pub(crate) const TRANSITION_RETRIES: u32 = 5;

/// Pause between transitional-status probes.
pub(crate) const TRANSITION_INTERVAL: Duration = Duration::from_secs(10);

/// Probe until the classifier stops answering `WaitAndRetry`.
///
/// The probe returns the observation plus its classification; transitional
/// statuses are retried with a bounded backoff and then turned into a fatal
/// error, as transitional entities cannot be safely mutated.
pub(crate) async fn settle<T, F, Fut>(
    ctx: &ReconcileContext,
    entity: &str,
    mut probe: F,
) -> ProviderResult<(T, StatusAction)>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProviderResult<(T, StatusAction)>>,
{
    for attempt in 0..TRANSITION_RETRIES {
        let (value, action) = probe().await?;
        if action != StatusAction::WaitAndRetry {
            return Ok((value, action));
        }
        tracing::debug!(entity, attempt, "entity is in a transitional status, waiting");
        ctx.sleep(TRANSITION_INTERVAL).await?;
    }
    Err(ProviderError::fatal(format!(
        "{entity} did not leave its transitional status after {TRANSITION_RETRIES} probes"
    )))
}
