//! Lifecycle status classifier
//!
//! Every entity on the platform reports an upper-case lifecycle status and,
//! for powered entities, a tech status. Read and Update handlers run the
//! observed status through [`classify`] before doing any other work, instead
//! of each handler keeping its own switch over raw strings.

use serde::{Deserialize, Serialize};

/// Lifecycle status reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Status {
    /// Declared in the model but never provisioned.
    Modeled,
    Created,
    Enabled,
    Disabled,
    Allocated,
    Unallocated,
    /// Soft-deleted; recoverable via restore.
    Deleted,
    /// Gone for good; the only way forward is a new create.
    Destroyed,
    Deleting,
    Destroying,
    Redeploying,
    /// A status this provider version does not know about.
    Other(String),
}

impl Status {
    pub fn as_str(&self) -> &str {
        match self {
            Status::Modeled => "MODELED",
            Status::Created => "CREATED",
            Status::Enabled => "ENABLED",
            Status::Disabled => "DISABLED",
            Status::Allocated => "ALLOCATED",
            Status::Unallocated => "UNALLOCATED",
            Status::Deleted => "DELETED",
            Status::Destroyed => "DESTROYED",
            Status::Deleting => "DELETING",
            Status::Destroying => "DESTROYING",
            Status::Redeploying => "REDEPLOYING",
            Status::Other(s) => s,
        }
    }

    pub fn is_destroyed(&self) -> bool {
        matches!(self, Status::Destroyed)
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, Status::Deleted)
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::Other(String::new())
    }
}

impl From<String> for Status {
    fn from(s: String) -> Self {
        match s.as_str() {
            "MODELED" => Status::Modeled,
            "CREATED" => Status::Created,
            "ENABLED" => Status::Enabled,
            "DISABLED" => Status::Disabled,
            "ALLOCATED" => Status::Allocated,
            "UNALLOCATED" => Status::Unallocated,
            "DELETED" => Status::Deleted,
            "DESTROYED" => Status::Destroyed,
            "DELETING" => Status::Deleting,
            "DESTROYING" => Status::Destroying,
            "REDEPLOYING" => Status::Redeploying,
            _ => Status::Other(s),
        }
    }
}

impl From<Status> for String {
    fn from(s: Status) -> Self {
        s.as_str().to_string()
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Power/provisioning state of a compute-like entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TechStatus {
    Started,
    Stopped,
    Scheduled,
    Other(String),
}

impl TechStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TechStatus::Started => "STARTED",
            TechStatus::Stopped => "STOPPED",
            TechStatus::Scheduled => "SCHEDULED",
            TechStatus::Other(s) => s,
        }
    }

    pub fn is_started(&self) -> bool {
        matches!(self, TechStatus::Started)
    }
}

impl Default for TechStatus {
    fn default() -> Self {
        TechStatus::Other(String::new())
    }
}

impl From<String> for TechStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "STARTED" => TechStatus::Started,
            "STOPPED" => TechStatus::Stopped,
            "SCHEDULED" => TechStatus::Scheduled,
            _ => TechStatus::Other(s),
        }
    }
}

impl From<TechStatus> for String {
    fn from(s: TechStatus) -> Self {
        s.as_str().to_string()
    }
}

/// What a handler must do about an observed status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusAction {
    /// Healthy; carry on with the requested work.
    Proceed,
    /// Usable but degraded; carry on and attach a warning.
    ProceedWithWarning,
    /// Soft-deleted: restore, enable, then carry on.
    Restore,
    /// Permanently gone: clear the id and run Create again.
    Recreate,
    /// Transitional: re-probe after a bounded wait, then give up.
    WaitAndRetry,
    /// Requires an operator; abort.
    Fatal,
}

/// Map an observed lifecycle status to the action the engine must take.
pub fn classify(status: &Status) -> StatusAction {
    match status {
        Status::Created | Status::Enabled | Status::Allocated => StatusAction::Proceed,
        Status::Deleted => StatusAction::Restore,
        Status::Destroyed => StatusAction::Recreate,
        Status::Disabled => StatusAction::ProceedWithWarning,
        Status::Modeled => StatusAction::Fatal,
        Status::Deleting | Status::Destroying | Status::Redeploying => StatusAction::WaitAndRetry,
        // Unknown or unreported statuses do not block reconciliation; the
        // platform keeps adding states and an update failing loudly beats a
        // provider refusing to look at the entity at all.
        Status::Unallocated | Status::Other(_) => StatusAction::ProceedWithWarning,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_strings_round_trip() {
        for s in ["CREATED", "DELETED", "DESTROYED", "REDEPLOYING"] {
            let status = Status::from(s.to_string());
            assert_eq!(status.as_str(), s);
        }
        let odd = Status::from("MIGRATING".to_string());
        assert_eq!(odd, Status::Other("MIGRATING".to_string()));
        assert_eq!(odd.as_str(), "MIGRATING");
    }

    #[test]
    fn classification_table() {
        assert_eq!(classify(&Status::Created), StatusAction::Proceed);
        assert_eq!(classify(&Status::Enabled), StatusAction::Proceed);
        assert_eq!(classify(&Status::Allocated), StatusAction::Proceed);
        assert_eq!(classify(&Status::Deleted), StatusAction::Restore);
        assert_eq!(classify(&Status::Destroyed), StatusAction::Recreate);
        assert_eq!(classify(&Status::Disabled), StatusAction::ProceedWithWarning);
        assert_eq!(classify(&Status::Modeled), StatusAction::Fatal);
        assert_eq!(classify(&Status::Deleting), StatusAction::WaitAndRetry);
        assert_eq!(classify(&Status::Destroying), StatusAction::WaitAndRetry);
        assert_eq!(classify(&Status::Redeploying), StatusAction::WaitAndRetry);
    }

    #[test]
    fn tech_status_parses() {
        assert!(TechStatus::from("STARTED".to_string()).is_started());
        assert!(!TechStatus::from("STOPPED".to_string()).is_started());
    }

    #[test]
    fn serde_uses_wire_strings() {
        let s: Status = serde_json::from_str("\"DESTROYED\"").unwrap();
        assert!(s.is_destroyed());
        assert_eq!(serde_json::to_string(&s).unwrap(), "\"DESTROYED\"");
    }
}
