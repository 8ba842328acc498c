//! Asynchronous task polling
//!
//! Long-running platform operations (cluster creation in particular) return
//! a correlation id instead of a result. The poller re-reads the task until
//! it reaches a terminal state and extracts the produced resource id from
//! the heterogeneous `result` field.

use std::time::Duration;

use decort_core::context::ReconcileContext;
use serde::{Deserialize, Serialize};

use crate::client::DecortClient;
use crate::error::ClientError;
use crate::form::Form;

/// Interval between task probes.
const POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Task record returned by `tasks/get`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatus {
    #[serde(rename = "auditId", default)]
    pub audit_id: String,
    pub completed: bool,
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub log: Vec<String>,
    #[serde(default)]
    pub result: TaskResult,
    #[serde(default)]
    pub stage: String,
    #[serde(default)]
    pub status: String,
    #[serde(rename = "updateTime", default)]
    pub update_time: u64,
}

/// The task `result` field, which the platform serializes in several shapes:
/// an empty string, a string-encoded integer, a bare integer, or an array
/// whose first element is the integer. Anything else is rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskResult(pub u64);

impl Serialize for TaskResult {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.0)
    }
}

impl<'de> Deserialize<'de> for TaskResult {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        let value = serde_json::Value::deserialize(deserializer)?;
        match &value {
            serde_json::Value::String(s) if s.is_empty() => Ok(TaskResult(0)),
            serde_json::Value::String(s) => s
                .parse::<u64>()
                .map(TaskResult)
                .map_err(|_| D::Error::custom(format!("task result {s:?} is not an integer"))),
            serde_json::Value::Number(n) => n
                .as_u64()
                .map(TaskResult)
                .ok_or_else(|| D::Error::custom("task result is not an unsigned integer")),
            serde_json::Value::Array(items) => match items.first() {
                Some(serde_json::Value::Number(n)) => n
                    .as_u64()
                    .map(TaskResult)
                    .ok_or_else(|| D::Error::custom("task result element is not an unsigned integer")),
                Some(_) => Err(D::Error::custom("task result array does not start with a number")),
                None => Err(D::Error::custom("task result array is empty")),
            },
            _ => Err(D::Error::custom("unsupported task result shape")),
        }
    }
}

/// Polls one task to its terminal state.
#[derive(Debug, Clone)]
pub struct TaskPoller {
    client: DecortClient,
    interval: Duration,
}

impl TaskPoller {
    pub fn new(client: DecortClient) -> Self {
        Self {
            client,
            interval: POLL_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Poll `task_id` through `path` (e.g. `cloudapi/tasks/get`) until it
    /// completes, returning the produced resource id.
    pub async fn poll(
        &self,
        ctx: &ReconcileContext,
        path: &str,
        task_id: &str,
    ) -> Result<u64, ClientError> {
        loop {
            if ctx.is_cancelled() {
                return Err(ClientError::Cancelled);
            }
            let form = Form::new().text("auditId", task_id);
            let body = self.client.call(ctx, path, &form).await?;
            let status: TaskStatus = serde_json::from_str(&body)?;

            if status.completed {
                if status.error.is_empty() {
                    tracing::debug!(task_id, result = status.result.0, "task completed");
                    return Ok(status.result.0);
                }
                return Err(ClientError::Task {
                    task_id: task_id.to_string(),
                    message: status.error,
                });
            }

            tracing::debug!(task_id, stage = %status.stage, "task still running");
            ctx.sleep(self.interval).await.map_err(|_| {
                if ctx.is_cancelled() {
                    ClientError::Cancelled
                } else {
                    ClientError::DeadlineExceeded
                }
            })?;
        }
    }
}
