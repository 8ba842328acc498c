//! Reconciliation context
//!
//! Everything that used to live in process-wide mutable state (cancellation,
//! deadlines, the admin-mode flag, the default grid) is carried explicitly by
//! a [`ReconcileContext`] passed to every handler and every API call.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{ProviderError, ProviderResult};

/// Per-handler-kind timeouts, enforced through the context deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub read: Duration,
    pub create: Duration,
    pub update: Duration,
    pub delete: Duration,
    /// Cluster creation is asynchronous on the platform side and may run for
    /// tens of minutes before the task completes.
    pub cluster_create: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            read: Duration::from_secs(30),
            create: Duration::from_secs(600),
            update: Duration::from_secs(600),
            delete: Duration::from_secs(300),
            cluster_create: Duration::from_secs(1800),
        }
    }
}

/// Cancellation, deadline and process-wide flags for one reconciliation.
///
/// The host guarantees at most one reconciliation in flight per entity, so
/// the context is owned by a single handler invocation and never shared
/// across entities.
#[derive(Debug, Clone)]
pub struct ReconcileContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
    admin_mode: bool,
    default_grid_id: Option<u64>,
}

impl ReconcileContext {
    /// A context with no deadline and a fresh cancellation token.
    pub fn background() -> Self {
        Self {
            cancel: CancellationToken::new(),
            deadline: None,
            admin_mode: false,
            default_grid_id: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_admin_mode(mut self, admin_mode: bool) -> Self {
        self.admin_mode = admin_mode;
        self
    }

    pub fn with_default_grid(mut self, grid_id: u64) -> Self {
        self.default_grid_id = Some(grid_id);
        self
    }

    pub fn admin_mode(&self) -> bool {
        self.admin_mode
    }

    pub fn default_grid_id(&self) -> Option<u64> {
        self.default_grid_id
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Time left until the deadline, if one is set.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Fails when the reconciliation was cancelled or ran out of time.
    ///
    /// Handlers call this between steps so that a cancelled context stops
    /// issuing new API calls.
    pub fn check(&self) -> ProviderResult<()> {
        if self.cancel.is_cancelled() {
            return Err(ProviderError::cancelled());
        }
        if matches!(self.remaining(), Some(left) if left.is_zero()) {
            return Err(ProviderError::deadline_exceeded());
        }
        Ok(())
    }

    /// Sleep that wakes early on cancellation or an expiring deadline.
    pub async fn sleep(&self, period: Duration) -> ProviderResult<()> {
        let period = match self.remaining() {
            Some(left) if left < period => {
                // Sleeping through the deadline would only delay the failure.
                tokio::select! {
                    _ = self.cancel.cancelled() => return Err(ProviderError::cancelled()),
                    _ = tokio::time::sleep(left) => return Err(ProviderError::deadline_exceeded()),
                }
            }
            _ => period,
        };
        tokio::select! {
            _ = self.cancel.cancelled() => Err(ProviderError::cancelled()),
            _ = tokio::time::sleep(period) => Ok(()),
        }
    }
}
