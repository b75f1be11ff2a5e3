use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::WorkflowError;

/// The résumé + job offer pair under analysis for one run.
///
/// Fields are private: a candidate never changes after construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    id: Uuid,
    cv: String,
    offer: String,
}

impl Candidate {
    /// Builds a candidate with a fresh id. Blank résumé or offer text is a
    /// configuration error: there is nothing to analyze.
    pub fn new(cv: impl Into<String>, offer: impl Into<String>) -> Result<Self, WorkflowError> {
        let cv = cv.into();
        let offer = offer.into();
        if cv.trim().is_empty() {
            return Err(WorkflowError::Config("cv cannot be empty".to_string()));
        }
        if offer.trim().is_empty() {
            return Err(WorkflowError::Config("offer cannot be empty".to_string()));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            cv,
            offer,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn cv(&self) -> &str {
        &self.cv
    }

    pub fn offer(&self) -> &str {
        &self.offer
    }
}

/// Wire shape of a candidate in data files and request bodies.
#[derive(Debug, Clone, Deserialize)]
pub struct CandidateInput {
    pub cv: String,
    pub offer: String,
}

impl TryFrom<CandidateInput> for Candidate {
    type Error = WorkflowError;

    fn try_from(input: CandidateInput) -> Result<Self, Self::Error> {
        Candidate::new(input.cv, input.offer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_candidate_gets_unique_id() {
        let a = Candidate::new("cv", "offer").unwrap();
        let b = Candidate::new("cv", "offer").unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.cv(), "cv");
        assert_eq!(a.offer(), "offer");
    }

    #[test]
    fn test_blank_cv_is_config_error() {
        let err = Candidate::new("   ", "Senior Rust engineer").unwrap_err();
        assert!(matches!(err, WorkflowError::Config(msg) if msg.contains("cv")));
    }

    #[test]
    fn test_blank_offer_is_config_error() {
        let err = Candidate::new("Rust, 5 years", "").unwrap_err();
        assert!(matches!(err, WorkflowError::Config(msg) if msg.contains("offer")));
    }

    #[test]
    fn test_candidate_input_requires_both_fields() {
        let missing_offer = serde_json::json!({ "cv": "Rust" });
        assert!(serde_json::from_value::<CandidateInput>(missing_offer).is_err());

        let ok = serde_json::json!({ "cv": "Rust", "offer": "Backend" });
        let input: CandidateInput = serde_json::from_value(ok).unwrap();
        assert!(Candidate::try_from(input).is_ok());
    }
}
