//! Compensation stack for multi-step create flows
//!
//! A create handler that has already allocated a platform id must not leave
//! a half-built entity behind when a later step fails. Steps register undo
//! actions as they succeed; a successful flow disarms the stack, a failed or
//! cancelled one unwinds it in LIFO order.

use crate::error::ProviderError;
use crate::lifecycle::BoxFuture;

type UndoFn = Box<dyn FnOnce() -> BoxFuture<'static, Result<(), ProviderError>> + Send>;

/// LIFO stack of registered undo actions.
#[derive(Default)]
pub struct CompensationStack {
    actions: Vec<(String, UndoFn)>,
}

impl CompensationStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an undo action for a step that just succeeded.
    pub fn push<F, Fut>(&mut self, label: impl Into<String>, undo: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), ProviderError>> + Send + 'static,
    {
        self.actions
            .push((label.into(), Box::new(move || Box::pin(undo()))));
    }

    /// Drop every registered action; called once the whole flow succeeded.
    pub fn disarm(&mut self) {
        self.actions.clear();
    }

    pub fn is_armed(&self) -> bool {
        !self.actions.is_empty()
    }

    /// Run the registered actions in reverse registration order.
    ///
    /// Failures do not stop the unwind; every action gets its chance and the
    /// failures are returned for the caller to surface as warnings.
    pub async fn unwind(&mut self) -> Vec<(String, ProviderError)> {
        let mut failures = Vec::new();
        while let Some((label, undo)) = self.actions.pop() {
            if let Err(err) = undo().await {
                tracing::warn!(step = %label, error = %err, "compensation action failed");
                failures.push((label, err));
            }
        }
        failures
    }
}

impl std::fmt::Debug for CompensationStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompensationStack")
            .field("depth", &self.actions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[tokio::test]
    async fn unwind_runs_in_lifo_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut stack = CompensationStack::new();
        for step in ["create", "attach", "start"] {
            let order = Arc::clone(&order);
            stack.push(step, move || async move {
                order.lock().unwrap().push(step);
                Ok(())
            });
        }

        let failures = stack.unwind().await;
        assert!(failures.is_empty());
        assert_eq!(*order.lock().unwrap(), vec!["start", "attach", "create"]);
    }

    #[tokio::test]
    async fn disarm_skips_all_actions() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut stack = CompensationStack::new();
        let counter = Arc::clone(&runs);
        stack.push("create", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        stack.disarm();
        assert!(!stack.is_armed());
        assert!(stack.unwind().await.is_empty());
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_action_does_not_stop_the_unwind() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut stack = CompensationStack::new();
        let counter = Arc::clone(&runs);
        stack.push("first", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        stack.push("second", || async { Err(ProviderError::fatal("undo failed")) });

        let failures = stack.unwind().await;
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "second");
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }
}
