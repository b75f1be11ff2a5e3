//! Batch runs: many candidates reviewed concurrently.
//!
//! Each run owns its own `RunState`; nothing mutable is shared between tasks.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::agents::workflow::{RunOutcome, Workflow};
use crate::errors::WorkflowError;
use crate::llm_client::LlmInvoker;
use crate::models::candidate::Candidate;

/// Reviews every candidate with at most `concurrency` runs in flight.
/// Results come back in input order.
pub async fn run_batch(
    workflow: Arc<Workflow>,
    invoker: Arc<dyn LlmInvoker>,
    candidates: Vec<Candidate>,
    concurrency: usize,
) -> Result<Vec<Result<RunOutcome, WorkflowError>>, WorkflowError> {
    if candidates.is_empty() {
        return Err(WorkflowError::Config(
            "no candidates supplied: expected objects with 'cv' and 'offer'".to_string(),
        ));
    }

    let total = candidates.len();
    let permits = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();

    for (index, candidate) in candidates.into_iter().enumerate() {
        let workflow = Arc::clone(&workflow);
        let invoker = Arc::clone(&invoker);
        let permits = Arc::clone(&permits);
        tasks.spawn(async move {
            let result = match permits.acquire_owned().await {
                Ok(_permit) => workflow.run(invoker.as_ref(), candidate).await,
                Err(e) => Err(WorkflowError::Aborted(e.to_string())),
            };
            (index, result)
        });
    }

    let mut results: Vec<Option<Result<RunOutcome, WorkflowError>>> =
        (0..total).map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, result)) => results[index] = Some(result),
            Err(e) => warn!("batch task failed to complete: {e}"),
        }
    }

    let results: Vec<_> = results
        .into_iter()
        .map(|slot| {
            slot.unwrap_or_else(|| Err(WorkflowError::Aborted("run task panicked".to_string())))
        })
        .collect();

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    info!(total, succeeded, failed = total - succeeded, "batch finished");
    Ok(results)
}
