use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AnalysisRunRow {
    pub id: Uuid,
    pub thread_id: String,
    pub mode: String,
    pub candidate_id: Uuid,
    pub cv: String,
    pub offer: String,
    /// "completed" | "exhausted"
    pub outcome: String,
    pub cycles: i32,
    pub accepted_analysis_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AnalysisRow {
    pub id: Uuid,
    pub run_id: Uuid,
    pub candidate_id: Uuid,
    pub attempt: i32,
    pub score: i32,
    pub experiences: Value,
    pub description: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}
