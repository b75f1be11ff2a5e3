//! Axum route handlers for the Analysis API.

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::agents::invoke::StepRunner;
use crate::agents::pipeline::run_pipeline;
use crate::agents::report::FinalReport;
use crate::agents::workflow::{RunOptions, RunOutcome, Workflow};
use crate::errors::{AppError, WorkflowError};
use crate::models::analysis::Analysis;
use crate::models::candidate::Candidate;
use crate::state::AppState;
use crate::store::{self, RunMode, SaveRunParams, StoredRun};

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub cv: String,
    pub offer: String,
    pub max_cycles: Option<u32>,
    pub verbose: Option<bool>,
    pub thread_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PipelineRequest {
    pub cv: String,
    pub offer: String,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub run_id: Uuid,
    pub thread_id: String,
    pub candidate_id: Uuid,
    pub cycles: u32,
    pub analysis: Analysis,
    pub history: Vec<Analysis>,
    pub report: FinalReport,
}

impl From<RunOutcome> for AnalyzeResponse {
    fn from(outcome: RunOutcome) -> Self {
        Self {
            run_id: outcome.run_id,
            thread_id: outcome.thread_id,
            candidate_id: outcome.candidate.id(),
            cycles: outcome.cycles,
            analysis: outcome.accepted,
            history: outcome.history,
            report: outcome.report,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PipelineResponse {
    pub run_id: Uuid,
    pub candidate_id: Uuid,
    pub analysis: Analysis,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/analyses
///
/// Runs the review workflow (analyze → review CV → review offer → retry) and
/// returns the accepted analysis with the full attempt history.
pub async fn handle_analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let candidate = Candidate::new(request.cv, request.offer)?;

    let mut options = state.run_defaults.clone();
    if let Some(max_cycles) = request.max_cycles {
        options.max_cycles = max_cycles.min(state.run_defaults.max_cycles);
    }
    if let Some(verbose) = request.verbose {
        options.verbose = verbose;
    }
    if let Some(thread_id) = request.thread_id {
        options.thread_id = thread_id;
    }

    let response = run_and_store(&state, options, candidate).await?;
    Ok(Json(response))
}

/// POST /api/v1/analyses/pipeline
///
/// Single analyzer pass without review.
pub async fn handle_pipeline(
    State(state): State<AppState>,
    Json(request): Json<PipelineRequest>,
) -> Result<Json<PipelineResponse>, AppError> {
    let candidate = Candidate::new(request.cv, request.offer)?;
    let runner = StepRunner::new(state.llm.as_ref(), state.run_defaults.call_policy);
    let analysis = run_pipeline(runner, &state.roles.analyzer, &candidate).await?;

    let run_id = Uuid::new_v4();
    if let Some(db) = &state.db {
        store::save_run(
            db,
            SaveRunParams {
                run_id,
                thread_id: &state.run_defaults.thread_id,
                mode: RunMode::Pipeline,
                candidate: &candidate,
                history: std::slice::from_ref(&analysis),
                accepted: Some(&analysis),
            },
        )
        .await?;
    }

    Ok(Json(PipelineResponse {
        run_id,
        candidate_id: candidate.id(),
        analysis,
    }))
}

/// POST /api/v1/analyses/upload
///
/// Multipart form: `cv` (PDF file) and `offer` (text). Runs the review
/// workflow on the text extracted from the PDF.
pub async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let mut cv_text = None;
    let mut offer = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        match field.name() {
            Some("cv") => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Could not read cv file: {e}")))?;
                cv_text = Some(extract_pdf_text(bytes).await?);
            }
            Some("offer") => {
                offer = Some(field.text().await.map_err(|e| {
                    AppError::Validation(format!("Could not read offer field: {e}"))
                })?);
            }
            other => warn!("Ignoring unexpected multipart field {other:?}"),
        }
    }

    let cv_text = cv_text.ok_or_else(|| AppError::Validation("missing 'cv' file".to_string()))?;
    let offer = offer.ok_or_else(|| AppError::Validation("missing 'offer' field".to_string()))?;
    let candidate = Candidate::new(cv_text, offer)?;

    let response = run_and_store(&state, state.run_defaults.clone(), candidate).await?;
    Ok(Json(response))
}

/// GET /api/v1/analyses/:id
pub async fn handle_get_run(
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
) -> Result<Json<StoredRun>, AppError> {
    let db = state
        .db
        .as_ref()
        .ok_or_else(|| AppError::NotFound("Run persistence is disabled".to_string()))?;

    let stored = store::get_run(db, run_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Run {run_id} not found")))?;

    Ok(Json(stored))
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

async fn run_and_store(
    state: &AppState,
    options: RunOptions,
    candidate: Candidate,
) -> Result<AnalyzeResponse, AppError> {
    let thread_id = options.thread_id.clone();
    let workflow = Workflow::new((*state.roles).clone(), options)?;
    let kept = candidate.clone();

    match workflow.run(state.llm.as_ref(), candidate).await {
        Ok(outcome) => {
            if let Some(db) = &state.db {
                store::save_run(
                    db,
                    SaveRunParams {
                        run_id: outcome.run_id,
                        thread_id: &outcome.thread_id,
                        mode: RunMode::Graph,
                        candidate: &outcome.candidate,
                        history: &outcome.history,
                        accepted: Some(&outcome.accepted),
                    },
                )
                .await?;
            }
            Ok(outcome.into())
        }
        Err(WorkflowError::IterationBudgetExhausted {
            run_id,
            max_cycles,
            history,
        }) => {
            // Stored under the run's own id; the 422 body carries it.
            if let Some(db) = &state.db {
                store::save_run(
                    db,
                    SaveRunParams {
                        run_id,
                        thread_id: &thread_id,
                        mode: RunMode::Graph,
                        candidate: &kept,
                        history: &history,
                        accepted: None,
                    },
                )
                .await?;
                info!("Exhausted run stored as {run_id}");
            }
            Err(WorkflowError::IterationBudgetExhausted {
                run_id,
                max_cycles,
                history,
            }
            .into())
        }
        Err(e) => Err(e.into()),
    }
}

/// Runs on the blocking pool. A panic inside the extractor is reported as a
/// validation error.
async fn extract_pdf_text(bytes: Bytes) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || {
        pdf_extract::extract_text_from_mem(&bytes).map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| AppError::Validation(format!("Could not extract text from cv PDF: {e}")))?
    .map_err(|e| AppError::Validation(format!("Could not extract text from cv PDF: {e}")))
}
