//! Reviewer steps: decide whether the latest analysis is faithful to the
//! résumé (CV reviewer) and to the job offer (offer reviewer).
//!
//! A malformed verdict is fatal: defaulting a trust signal could let a bad
//! analysis through unnoticed.

use serde_json::Value;
use tracing::info;

use crate::agents::invoke::StepRunner;
use crate::agents::roles::Role;
use crate::errors::WorkflowError;
use crate::llm_client::PromptInputs;
use crate::models::run::{RunDelta, RunState};

/// Verdict field returned by the CV reviewer.
pub const CV_VERDICT_FIELD: &str = "score";
/// Verdict field returned by the offer reviewer.
pub const OFFER_VERDICT_FIELD: &str = "hallucination";

pub async fn review_cv(
    runner: StepRunner<'_>,
    state: &RunState,
    reviewer: &Role,
) -> Result<RunDelta, WorkflowError> {
    let latest = state.latest().ok_or(WorkflowError::MissingAnalysis)?;
    let inputs = PromptInputs::new()
        .with("cv", state.candidate().cv())
        .with("experiences", latest.experiences_json());

    let raw = runner.call(reviewer, &inputs).await?;
    let flagged = parse_verdict(&raw, CV_VERDICT_FIELD, &reviewer.name)?;

    info!(
        analysis_id = %latest.id,
        cv_hallucination = flagged,
        "CV review: {}",
        if flagged { "hallucination" } else { "supported" }
    );
    Ok(RunDelta::CvVerdict(flagged))
}

pub async fn review_offer(
    runner: StepRunner<'_>,
    state: &RunState,
    reviewer: &Role,
) -> Result<RunDelta, WorkflowError> {
    let latest = state.latest().ok_or(WorkflowError::MissingAnalysis)?;
    let candidate = state.candidate();
    let inputs = PromptInputs::new()
        .with("cv", candidate.cv())
        .with("offer", candidate.offer())
        .with("analysis", latest.to_prompt_json());

    let raw = runner.call(reviewer, &inputs).await?;
    let flagged = parse_verdict(&raw, OFFER_VERDICT_FIELD, &reviewer.name)?;

    info!(
        analysis_id = %latest.id,
        offer_hallucination = flagged,
        "offer review: {}",
        if flagged { "incorrect" } else { "correct" }
    );
    Ok(RunDelta::OfferVerdict(flagged))
}

/// Normalizes a reviewer's numeric signal to a boolean: `1`/`1.0` flags a
/// hallucination, `0`/`0.0` clears it. Anything else is a malformed verdict.
pub fn parse_verdict(raw: &Value, field: &str, role: &str) -> Result<bool, WorkflowError> {
    let malformed = |reason: String| WorkflowError::MalformedVerdict {
        role: role.to_string(),
        reason,
    };

    let value = raw
        .get(field)
        .ok_or_else(|| malformed(format!("missing field '{field}' in {raw}")))?;
    let number = value
        .as_f64()
        .ok_or_else(|| malformed(format!("field '{field}' is not numeric: {value}")))?;

    if number == 1.0 {
        Ok(true)
    } else if number == 0.0 {
        Ok(false)
    } else {
        Err(malformed(format!("field '{field}' must be 0 or 1, got {number}")))
    }
}
