//! Analyzer step: produces a new analysis, re-conditioning on the last
//! rejected one when a reviewer flagged it.

use tracing::{info, warn};

use crate::agents::invoke::StepRunner;
use crate::agents::roles::Role;
use crate::errors::WorkflowError;
use crate::llm_client::PromptInputs;
use crate::models::analysis::{parse_analysis, Analysis, AnalysisParse};
use crate::models::candidate::Candidate;
use crate::models::run::{AnalyzerMode, RunDelta, RunState};

pub async fn analyze(
    runner: StepRunner<'_>,
    state: &RunState,
    analyzer: &Role,
    re_analyzer: &Role,
) -> Result<RunDelta, WorkflowError> {
    let candidate = state.candidate();
    let base_inputs = PromptInputs::new()
        .with("cv", candidate.cv())
        .with("offer", candidate.offer());

    let (role, inputs) = match state.analyzer_mode() {
        AnalyzerMode::Initial => {
            info!(candidate_id = %candidate.id(), "initial analysis");
            (analyzer, base_inputs)
        }
        AnalyzerMode::Retry { reason, previous } => {
            warn!(
                candidate_id = %candidate.id(),
                reason = ?reason,
                previous_analysis = %previous.id,
                "re-analysis"
            );
            (
                re_analyzer,
                base_inputs.with("previous_analysis", previous.to_prompt_json()),
            )
        }
    };

    let raw = runner.call(role, &inputs).await?;
    let analysis = analysis_from_response(&raw, candidate);

    info!(
        candidate_id = %candidate.id(),
        analysis_id = %analysis.id,
        score = analysis.score,
        status = analysis.status.as_str(),
        experiences = analysis.experiences.len(),
        "analysis produced"
    );

    Ok(RunDelta::AnalysisAppended(analysis))
}

/// Turns raw analyzer output into an analysis record. Malformed output becomes
/// an ERROR sentinel instead of an error.
pub fn analysis_from_response(raw: &serde_json::Value, candidate: &Candidate) -> Analysis {
    match parse_analysis(raw) {
        AnalysisParse::Valid(fields) => Analysis::accepted(fields, candidate.id()),
        AnalysisParse::Invalid(reason) => {
            warn!(
                candidate_id = %candidate.id(),
                "malformed analyzer response: {reason}"
            );
            Analysis::sentinel(candidate.id(), &reason)
        }
    }
}
