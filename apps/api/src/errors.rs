use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::llm_client::LlmError;
use crate::models::analysis::Analysis;

/// Terminal failures of a review run.
///
/// A malformed *analysis* never shows up here: the analyzer heals it into an
/// ERROR sentinel. Everything below ends the run.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{role} returned a malformed verdict: {reason}")]
    MalformedVerdict { role: String, reason: String },

    #[error("No trustworthy analysis after {max_cycles} analysis cycle(s)")]
    IterationBudgetExhausted {
        run_id: Uuid,
        max_cycles: u32,
        history: Vec<Analysis>,
    },

    #[error("LLM adapter failed for {role}: {source}")]
    Adapter {
        role: String,
        #[source]
        source: LlmError,
    },

    #[error("No analysis available to report")]
    MissingAnalysis,

    #[error("Run aborted: {0}")]
    Aborted(String),
}

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Workflow(e) => workflow_status(e),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let mut error = json!({
            "code": code,
            "message": message
        });
        if let AppError::Workflow(WorkflowError::IterationBudgetExhausted { run_id, .. }) = &self {
            error["run_id"] = json!(run_id);
        }
        let body = Json(json!({ "error": error }));

        (status, body).into_response()
    }
}

fn workflow_status(e: &WorkflowError) -> (StatusCode, &'static str, String) {
    match e {
        WorkflowError::Config(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        WorkflowError::IterationBudgetExhausted { .. } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "ITERATION_BUDGET_EXHAUSTED",
            e.to_string(),
        ),
        WorkflowError::MalformedVerdict { .. } | WorkflowError::Adapter { .. } => {
            tracing::error!("LLM error: {e}");
            (
                StatusCode::BAD_GATEWAY,
                "LLM_ERROR",
                "An AI processing error occurred".to_string(),
            )
        }
        WorkflowError::MissingAnalysis | WorkflowError::Aborted(_) => {
            tracing::error!("Workflow error: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal server error occurred".to_string(),
            )
        }
    }
}
