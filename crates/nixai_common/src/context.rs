//! Deadline-carrying call context for collaborator calls.
//!
//! Every blocking call into a collaborator goes through [`CallContext::run`],
//! which bounds it by the earlier of the run deadline and the per-call
//! timeout. Expiry drops the future, which cancels the call.

use crate::error::CollaboratorError;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::warn;

#[derive(Debug, Clone, Copy)]
pub struct CallContext {
    deadline: Instant,
    per_call: Duration,
}

impl CallContext {
    pub fn new(total: Duration, per_call: Duration) -> Self {
        Self {
            deadline: Instant::now() + total,
            per_call,
        }
    }

    pub fn with_deadline(deadline: Instant, per_call: Duration) -> Self {
        Self { deadline, per_call }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Time left before the run deadline
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Run one collaborator call under the context's deadline.
    pub async fn run<T, F>(&self, operation: &str, call: F) -> Result<T, CollaboratorError>
    where
        F: Future<Output = Result<T, CollaboratorError>>,
    {
        let started = Instant::now();
        let limit = std::cmp::min(self.deadline, started + self.per_call);
        match tokio::time::timeout_at(limit, call).await {
            Ok(result) => result,
            Err(_) => {
                let after_ms = started.elapsed().as_millis() as u64;
                warn!(operation, after_ms, "collaborator call timed out");
                Err(CollaboratorError::Timeout {
                    operation: operation.to_string(),
                    after_ms,
                })
            }
        }
    }
}

impl Default for CallContext {
    fn default() -> Self {
        Self::new(Duration::from_secs(60), Duration::from_secs(15))
    }
}
