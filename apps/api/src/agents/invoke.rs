//! Adapter boundary: every model call made by a workflow step goes through
//! `StepRunner::call`, which adds a per-call timeout and a bounded retry on
//! transient failures.

use std::time::Duration;

use serde_json::Value;
use tracing::warn;

use crate::agents::roles::Role;
use crate::errors::WorkflowError;
use crate::llm_client::{LlmError, LlmInvoker, PromptInputs};

const BACKOFF_BASE_MS: u64 = 500;
const MAX_BACKOFF_MS: u64 = 30_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CallPolicy {
    pub timeout: Duration,
    /// Extra attempts after the first one.
    pub retries: u32,
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            retries: 2,
        }
    }
}

#[derive(Clone, Copy)]
pub struct StepRunner<'a> {
    invoker: &'a dyn LlmInvoker,
    policy: CallPolicy,
}

impl<'a> StepRunner<'a> {
    pub fn new(invoker: &'a dyn LlmInvoker, policy: CallPolicy) -> Self {
        Self { invoker, policy }
    }

    pub async fn call(&self, role: &Role, inputs: &PromptInputs) -> Result<Value, WorkflowError> {
        let mut last_error = None;

        for attempt in 0..=self.policy.retries {
            if attempt > 0 {
                let delay = backoff_delay(attempt);
                warn!(
                    role = %role.name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "retrying LLM call"
                );
                tokio::time::sleep(delay).await;
            }

            let error = match tokio::time::timeout(
                self.policy.timeout,
                self.invoker.invoke(role, inputs),
            )
            .await
            {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) if e.is_transient() => e,
                Ok(Err(e)) => {
                    return Err(WorkflowError::Adapter {
                        role: role.name.clone(),
                        source: e,
                    })
                }
                Err(_) => LlmError::Timeout {
                    seconds: self.policy.timeout.as_secs(),
                },
            };
            warn!(role = %role.name, attempt, "LLM call failed: {error}");
            last_error = Some(error);
        }

        Err(WorkflowError::Adapter {
            role: role.name.clone(),
            source: last_error.unwrap_or(LlmError::EmptyContent),
        })
    }
}

/// Delay before retry `attempt` (1-based): doubles from `BACKOFF_BASE_MS`,
/// capped at `MAX_BACKOFF_MS`.
fn backoff_delay(attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    Duration::from_millis((BACKOFF_BASE_MS << exponent).min(MAX_BACKOFF_MS))
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedInvoker;
    use super::*;
    use crate::agents::roles::{AgentRoles, ANALYZER};
    use serde_json::json;

    fn policy(retries: u32) -> CallPolicy {
        CallPolicy {
            timeout: Duration::from_secs(5),
            retries,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_retried_then_succeeds() {
        let invoker = ScriptedInvoker::new()
            .hang(ANALYZER)
            .reply(ANALYZER, json!({"ok": true}));
        let runner = StepRunner::new(&invoker, policy(1));
        let roles = AgentRoles::default();

        let value = runner
            .call(&roles.analyzer, &PromptInputs::new())
            .await
            .unwrap();
        assert_eq!(value, json!({"ok": true}));
        assert_eq!(invoker.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_budget_exhaustion_is_adapter_error() {
        let invoker = ScriptedInvoker::new()
            .fail(ANALYZER, LlmError::RateLimited { retries: 3 })
            .hang(ANALYZER);
        let runner = StepRunner::new(&invoker, policy(1));
        let roles = AgentRoles::default();

        let err = runner
            .call(&roles.analyzer, &PromptInputs::new())
            .await
            .unwrap_err();
        match err {
            WorkflowError::Adapter { role, source } => {
                assert_eq!(role, ANALYZER);
                assert!(matches!(source, LlmError::Timeout { seconds: 5 }));
            }
            other => panic!("expected adapter error, got {other:?}"),
        }
    }

    #[test]
    fn test_backoff_doubles_then_caps() {
        assert_eq!(backoff_delay(1), Duration::from_millis(500));
        assert_eq!(backoff_delay(2), Duration::from_millis(1000));
        assert_eq!(backoff_delay(3), Duration::from_millis(2000));
        assert_eq!(backoff_delay(64), Duration::from_millis(MAX_BACKOFF_MS));
        assert_eq!(backoff_delay(u32::MAX), Duration::from_millis(MAX_BACKOFF_MS));
    }

    #[tokio::test]
    async fn test_non_transient_failure_is_not_retried() {
        let invoker = ScriptedInvoker::new().fail(
            ANALYZER,
            LlmError::Api {
                status: 401,
                message: "invalid x-api-key".to_string(),
            },
        );
        let runner = StepRunner::new(&invoker, policy(3));
        let roles = AgentRoles::default();

        let err = runner
            .call(&roles.analyzer, &PromptInputs::new())
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Adapter { .. }));
        assert_eq!(invoker.calls().len(), 1);
    }
}
