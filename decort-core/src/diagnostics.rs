//! Diagnostics accumulation
//!
//! Handlers collect warnings as they go; the first hard error aborts the
//! flow through `Result`. Both surfaces end up here so the host receives one
//! uniform list per reconciliation.

use crate::error::ProviderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// One host-visible message attached to a reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    pub detail: Option<String>,
}

impl Diagnostic {
    pub fn warning(summary: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            summary: summary.into(),
            detail: None,
        }
    }

    pub fn error(summary: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: summary.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Ordered collection of diagnostics for one handler invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, summary: impl Into<String>) {
        self.items.push(Diagnostic::warning(summary));
    }

    pub fn warn_with_detail(&mut self, summary: impl Into<String>, detail: impl Into<String>) {
        self.items
            .push(Diagnostic::warning(summary).with_detail(detail));
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    /// Record a hard error in host-visible form.
    ///
    /// Used by the boundary adapter when a handler aborts, so the failed
    /// reconciliation still reports what it managed to do before the abort.
    pub fn record_error(&mut self, err: &ProviderError) {
        self.items.push(Diagnostic::error(err.to_string()));
    }

    /// A partial-update warning for a subresource step where some elements
    /// failed but the handler continued (spec for set-diffed tables).
    pub fn partial_update(&mut self, step: &str, failed: usize, last: &ProviderError) {
        self.warn_with_detail(
            format!("{step}: {failed} operation(s) failed, continuing"),
            last.to_string(),
        );
    }

    pub fn has_warnings(&self) -> bool {
        self.items.iter().any(|d| d.severity == Severity::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_accumulate_in_order() {
        let mut diags = Diagnostics::new();
        diags.warn("first");
        diags.warn_with_detail("second", "why");
        assert_eq!(diags.len(), 2);
        assert!(diags.has_warnings());
        assert!(!diags.has_errors());
        let summaries: Vec<_> = diags.iter().map(|d| d.summary.as_str()).collect();
        assert_eq!(summaries, ["first", "second"]);
    }

    #[test]
    fn partial_update_carries_count_and_last_error() {
        let mut diags = Diagnostics::new();
        let err = ProviderError::conflict("disk 42 is attached elsewhere");
        diags.partial_update("extra disk attach", 2, &err);
        let d = diags.iter().next().unwrap();
        assert!(d.summary.contains("2 operation(s) failed"));
        assert!(d.detail.as_deref().unwrap().contains("disk 42"));
    }
}
