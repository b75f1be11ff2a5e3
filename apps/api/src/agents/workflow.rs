//! Workflow controller: the analyze / review / retry state machine.
//!
//! ```text
//! Analyze ─► ReviewCv ─► ReviewOffer ─┬─► Finalize ─► End
//!    ▲                                │
//!    └──────── flagged (budget left) ─┘
//! ```
//!
//! `next_step` is pure; `Workflow::run` drives it, calling one step at a time
//! and applying the returned delta. A flagged review with no budget left ends
//! the run with `IterationBudgetExhausted`, never with a report.

use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::agents::analyzer::analyze;
use crate::agents::invoke::{CallPolicy, StepRunner};
use crate::agents::report::{build_report, FinalReport};
use crate::agents::reviewer::{review_cv, review_offer};
use crate::agents::roles::AgentRoles;
use crate::errors::WorkflowError;
use crate::llm_client::LlmInvoker;
use crate::models::analysis::Analysis;
use crate::models::candidate::Candidate;
use crate::models::run::{RunDelta, RunState};

pub const DEFAULT_MAX_CYCLES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Analyze,
    ReviewCv,
    ReviewOffer,
    Finalize,
    End,
}

/// Run-scoped settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    /// Maximum number of ANALYZE cycles.
    pub max_cycles: u32,
    /// Caller-supplied label that groups runs in logs and storage.
    pub thread_id: String,
    /// Log the full run state after every step at `info` instead of `debug`.
    pub verbose: bool,
    pub call_policy: CallPolicy,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_cycles: DEFAULT_MAX_CYCLES,
            thread_id: "default".to_string(),
            verbose: false,
            call_policy: CallPolicy::default(),
        }
    }
}

/// Successful end of a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub run_id: Uuid,
    pub thread_id: String,
    pub candidate: Candidate,
    pub accepted: Analysis,
    /// Every analysis produced, oldest first; `accepted` is the last one.
    pub history: Vec<Analysis>,
    pub cycles: u32,
    pub report: FinalReport,
}

/// Decides the step after `current` from the state it left behind.
pub fn next_step(current: Step, state: &RunState, max_cycles: u32) -> Result<Step, WorkflowError> {
    let next = match current {
        Step::Analyze => Step::ReviewCv,
        Step::ReviewCv => Step::ReviewOffer,
        Step::ReviewOffer => match state.retry_reason() {
            None => Step::Finalize,
            Some(_) if state.cycles() >= max_cycles => {
                return Err(WorkflowError::IterationBudgetExhausted {
                    run_id: state.run_id(),
                    max_cycles,
                    history: state.analyses().to_vec(),
                })
            }
            Some(_) => Step::Analyze,
        },
        Step::Finalize | Step::End => Step::End,
    };
    Ok(next)
}

pub struct Workflow {
    roles: AgentRoles,
    options: RunOptions,
}

impl Workflow {
    pub fn new(roles: AgentRoles, options: RunOptions) -> Result<Self, WorkflowError> {
        if options.max_cycles == 0 {
            return Err(WorkflowError::Config(
                "max_cycles must be at least 1".to_string(),
            ));
        }
        Ok(Self { roles, options })
    }

    pub async fn run(
        &self,
        invoker: &dyn LlmInvoker,
        candidate: Candidate,
    ) -> Result<RunOutcome, WorkflowError> {
        let runner = StepRunner::new(invoker, self.options.call_policy);
        let roles = &self.roles;
        let mut state = RunState::new(candidate);
        let run_id = state.run_id();
        let mut step = Step::Analyze;

        info!(
            %run_id,
            thread_id = %self.options.thread_id,
            candidate_id = %state.candidate().id(),
            max_cycles = self.options.max_cycles,
            "review run started"
        );

        loop {
            let delta = match step {
                Step::Analyze => {
                    analyze(runner, &state, &roles.analyzer, &roles.re_analyzer).await?
                }
                Step::ReviewCv => review_cv(runner, &state, &roles.cv_reviewer).await?,
                Step::ReviewOffer => review_offer(runner, &state, &roles.offer_reviewer).await?,
                Step::Finalize => {
                    let accepted = state.latest().cloned().ok_or(WorkflowError::MissingAnalysis)?;
                    RunDelta::Finalized(accepted)
                }
                Step::End => break,
            };
            state.apply(delta);
            self.trace_state(run_id, step, &state);

            step = next_step(step, &state, self.options.max_cycles).inspect_err(|e| {
                warn!(%run_id, cycles = state.cycles(), "review run failed: {e}");
            })?;
        }

        let report = build_report(&state)?;
        let cycles = state.cycles();
        let (candidate, history, final_analysis) = state.into_parts();
        let accepted = final_analysis.ok_or(WorkflowError::MissingAnalysis)?;

        info!(
            %run_id,
            cycles,
            score = accepted.score,
            "review run finished"
        );

        Ok(RunOutcome {
            run_id,
            thread_id: self.options.thread_id.clone(),
            candidate,
            accepted,
            history,
            cycles,
            report,
        })
    }

    fn trace_state(&self, run_id: Uuid, step: Step, state: &RunState) {
        let snapshot = || serde_json::to_string(state).unwrap_or_default();
        if self.options.verbose {
            info!(%run_id, step = ?step, state = %snapshot(), "step applied");
        } else {
            debug!(%run_id, step = ?step, state = %snapshot(), "step applied");
        }
    }
}
