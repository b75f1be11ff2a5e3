//! Analysis records and the parse-and-validate step for raw analyzer output.

use chrono::{DateTime, FixedOffset, Local};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use uuid::Uuid;

/// Upper bound of the analyzer's scoring convention.
pub const MAX_SCORE: u32 = 100;

/// Key of the sentinel record stored in `experiences` of an ERROR analysis.
pub const ERROR_MARKER_KEY: &str = "error";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AnalysisStatus {
    Ok,
    Error,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::Ok => "OK",
            AnalysisStatus::Error => "ERROR",
        }
    }
}

/// One analysis attempt.
///
/// `status == Error` implies `score == 0`, empty description and a single
/// `{"error": ...}` entry in `experiences`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub score: u32,
    pub experiences: Vec<Value>,
    pub description: String,
    pub created_at: DateTime<FixedOffset>,
    pub status: AnalysisStatus,
}

impl Analysis {
    /// Stamps validated model output as an OK analysis.
    pub fn accepted(fields: AnalysisFields, candidate_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            candidate_id,
            score: fields.score,
            experiences: fields.experiences,
            description: fields.description,
            created_at: local_now(),
            status: AnalysisStatus::Ok,
        }
    }

    /// Placeholder recorded when the model's output could not be validated.
    pub fn sentinel(candidate_id: Uuid, reason: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            candidate_id,
            score: 0,
            experiences: vec![json!({ ERROR_MARKER_KEY: reason })],
            description: String::new(),
            created_at: local_now(),
            status: AnalysisStatus::Error,
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == AnalysisStatus::Error
    }

    /// JSON form handed to reviewer and re-analyzer prompts.
    pub fn to_prompt_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| self.description.clone())
    }

    pub fn experiences_json(&self) -> String {
        serde_json::to_string_pretty(&self.experiences).unwrap_or_else(|_| "[]".to_string())
    }
}

/// The validated fields of an analyzer response.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisFields {
    pub score: u32,
    pub experiences: Vec<Value>,
    pub description: String,
}

/// Outcome of validating a raw analyzer response.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisParse {
    Valid(AnalysisFields),
    Invalid(String),
}

#[derive(Debug, Deserialize)]
struct RawAnalysis {
    score: serde_json::Number,
    experiences: Vec<Map<String, Value>>,
    description: String,
}

/// Validates raw analyzer output against the analysis shape:
/// `score` a whole number in `0..=MAX_SCORE`, `experiences` an array of
/// objects, `description` a string. Extra fields are ignored.
pub fn parse_analysis(raw: &Value) -> AnalysisParse {
    let parsed = match RawAnalysis::deserialize(raw) {
        Ok(parsed) => parsed,
        Err(e) => return AnalysisParse::Invalid(format!("unexpected analysis shape: {e}")),
    };

    let score = match whole_score(&parsed.score) {
        Some(score) if score <= MAX_SCORE => score,
        _ => {
            return AnalysisParse::Invalid(format!(
                "score {} is not a whole number in 0..={MAX_SCORE}",
                parsed.score
            ))
        }
    };

    AnalysisParse::Valid(AnalysisFields {
        score,
        experiences: parsed.experiences.into_iter().map(Value::Object).collect(),
        description: parsed.description,
    })
}

fn whole_score(n: &serde_json::Number) -> Option<u32> {
    if let Some(v) = n.as_u64() {
        return u32::try_from(v).ok();
    }
    let v = n.as_f64()?;
    if v >= 0.0 && v.fract() == 0.0 && v <= u32::MAX as f64 {
        Some(v as u32)
    } else {
        None
    }
}

/// Current time in the deployment's local calendar.
pub fn local_now() -> DateTime<FixedOffset> {
    Local::now().fixed_offset()
}
