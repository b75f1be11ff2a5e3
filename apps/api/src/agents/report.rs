//! Final report: presentation of the accepted analysis.

use std::fmt;
use std::fmt::Write as _;

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use uuid::Uuid;

use crate::errors::WorkflowError;
use crate::models::run::RunState;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalReport {
    pub candidate_id: Uuid,
    pub analysis_id: Uuid,
    pub analysis_date: DateTime<FixedOffset>,
    pub score: u32,
    pub text: String,
}

impl fmt::Display for FinalReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Formats the latest analysis of the run together with the candidate.
/// A run with no analysis has nothing to report.
pub fn build_report(state: &RunState) -> Result<FinalReport, WorkflowError> {
    let analysis = state.latest().ok_or(WorkflowError::MissingAnalysis)?;
    let candidate = state.candidate();

    let mut text = String::new();
    // Writing to a String cannot fail.
    let _ = writeln!(text, "Final report");
    let _ = writeln!(text, "Analysis date: {}", analysis.created_at.to_rfc3339());
    let _ = writeln!(text, "\nCANDIDATE\n{}", candidate.cv());
    let _ = writeln!(text, "\nOFFER\n{}", candidate.offer());
    let _ = writeln!(text, "\nANALYSIS");
    let _ = writeln!(text, "- Score: {}", analysis.score);
    let _ = writeln!(text, "- Experiences:");
    for experience in &analysis.experiences {
        let _ = writeln!(text, "  - {}", format_experience(experience));
    }
    let _ = write!(text, "- Description: {}", analysis.description);

    Ok(FinalReport {
        candidate_id: candidate.id(),
        analysis_id: analysis.id,
        analysis_date: analysis.created_at,
        score: analysis.score,
        text,
    })
}

fn format_experience(experience: &serde_json::Value) -> String {
    match experience.as_object() {
        Some(fields) => fields
            .iter()
            .map(|(key, value)| match value.as_str() {
                Some(s) => format!("{key}: {s}"),
                None => format!("{key}: {value}"),
            })
            .collect::<Vec<_>>()
            .join(", "),
        None => experience.to_string(),
    }
}
