//! Pipeline mode: one analyzer pass, no review loop.

use tracing::info;

use crate::agents::analyzer::analysis_from_response;
use crate::agents::invoke::StepRunner;
use crate::agents::roles::Role;
use crate::errors::WorkflowError;
use crate::llm_client::PromptInputs;
use crate::models::analysis::Analysis;
use crate::models::candidate::Candidate;

/// Runs the analyzer once. Malformed output yields an ERROR analysis, the same
/// recovery the review workflow applies; adapter failures propagate.
pub async fn run_pipeline(
    runner: StepRunner<'_>,
    analyzer: &Role,
    candidate: &Candidate,
) -> Result<Analysis, WorkflowError> {
    info!(candidate_id = %candidate.id(), "pipeline analysis");
    let inputs = PromptInputs::new()
        .with("cv", candidate.cv())
        .with("offer", candidate.offer());

    let raw = runner.call(analyzer, &inputs).await?;
    Ok(analysis_from_response(&raw, candidate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::invoke::testing::ScriptedInvoker;
    use crate::agents::invoke::CallPolicy;
    use crate::agents::roles::{AgentRoles, ANALYZER};
    use crate::models::analysis::AnalysisStatus;
    use serde_json::json;

    #[tokio::test]
    async fn test_pipeline_makes_a_single_call() {
        let invoker = ScriptedInvoker::new().reply(
            ANALYZER,
            json!({"score": 40, "experiences": [], "description": "Junior profile"}),
        );
        let candidate = Candidate::new("Intern", "Staff engineer").unwrap();

        let analysis = run_pipeline(
            StepRunner::new(&invoker, CallPolicy::default()),
            &AgentRoles::default().analyzer,
            &candidate,
        )
        .await
        .unwrap();

        assert_eq!(analysis.status, AnalysisStatus::Ok);
        assert_eq!(analysis.score, 40);
        assert_eq!(invoker.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_pipeline_recovers_malformed_output() {
        let invoker = ScriptedInvoker::new().reply(ANALYZER, json!({"score": 40}));
        let candidate = Candidate::new("Intern", "Staff engineer").unwrap();

        let analysis = run_pipeline(
            StepRunner::new(&invoker, CallPolicy::default()),
            &AgentRoles::default().analyzer,
            &candidate,
        )
        .await
        .unwrap();

        assert_eq!(analysis.status, AnalysisStatus::Error);
        assert_eq!(analysis.score, 0);
    }
}
