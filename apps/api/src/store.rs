//! Run persistence. Runs and their analyses are append-only: a row is never
//! updated once written.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::analysis::Analysis;
use crate::models::candidate::Candidate;
use crate::models::record::{AnalysisRow, AnalysisRunRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Graph,
    Pipeline,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Graph => "graph",
            RunMode::Pipeline => "pipeline",
        }
    }
}

/// Parameters for recording one finished run.
pub struct SaveRunParams<'a> {
    pub run_id: Uuid,
    pub thread_id: &'a str,
    pub mode: RunMode,
    pub candidate: &'a Candidate,
    pub history: &'a [Analysis],
    /// `None` when the run ended without a trustworthy analysis.
    pub accepted: Option<&'a Analysis>,
}

#[derive(Debug, Serialize)]
pub struct StoredRun {
    pub run: AnalysisRunRow,
    pub analyses: Vec<AnalysisRow>,
}

/// Connects to PostgreSQL and applies pending migrations from `migrations/`.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .context("Failed to connect to PostgreSQL")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to apply database migrations")?;

    info!("PostgreSQL pool ready (max_connections={max_connections})");
    Ok(pool)
}

/// Writes a run row and every analysis of its history in one transaction.
pub async fn save_run(pool: &PgPool, params: SaveRunParams<'_>) -> Result<()> {
    let SaveRunParams {
        run_id,
        thread_id,
        mode,
        candidate,
        history,
        accepted,
    } = params;
    let outcome = if accepted.is_some() {
        "completed"
    } else {
        "exhausted"
    };

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO analysis_runs
            (id, thread_id, mode, candidate_id, cv, offer, outcome, cycles, accepted_analysis_id, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(run_id)
    .bind(thread_id)
    .bind(mode.as_str())
    .bind(candidate.id())
    .bind(candidate.cv())
    .bind(candidate.offer())
    .bind(outcome)
    .bind(history.len() as i32)
    .bind(accepted.map(|a| a.id))
    .bind(Utc::now())
    .execute(&mut *tx)
    .await?;

    for (attempt, analysis) in history.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO analyses
                (id, run_id, candidate_id, attempt, score, experiences, description, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(analysis.id)
        .bind(run_id)
        .bind(analysis.candidate_id)
        .bind(attempt as i32)
        .bind(analysis.score as i32)
        .bind(serde_json::Value::from(analysis.experiences.clone()))
        .bind(&analysis.description)
        .bind(analysis.status.as_str())
        .bind(analysis.created_at.with_timezone(&Utc))
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    info!(
        "Stored {} run {run_id} ({outcome}) with {} analyses",
        mode.as_str(),
        history.len()
    );
    Ok(())
}

/// Loads a run with its analyses in attempt order.
pub async fn get_run(pool: &PgPool, run_id: Uuid) -> Result<Option<StoredRun>> {
    let run = sqlx::query_as::<_, AnalysisRunRow>("SELECT * FROM analysis_runs WHERE id = $1")
        .bind(run_id)
        .fetch_optional(pool)
        .await?;

    let Some(run) = run else {
        return Ok(None);
    };

    let analyses = sqlx::query_as::<_, AnalysisRow>(
        "SELECT * FROM analyses WHERE run_id = $1 ORDER BY attempt",
    )
    .bind(run_id)
    .fetch_all(pool)
    .await?;

    Ok(Some(StoredRun { run, analyses }))
}
