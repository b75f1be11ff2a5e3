//! Run state threaded through the review workflow.
//!
//! Steps never mutate `RunState`; they return a `RunDelta` which only the
//! workflow controller applies.

use serde::Serialize;
use uuid::Uuid;

use crate::models::analysis::Analysis;
use crate::models::candidate::Candidate;

/// Why the analyzer is asked to redo its work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryReason {
    /// The offer reviewer flagged the analysis.
    OfferHallucination,
    /// The CV reviewer flagged the extracted experiences.
    CvHallucination,
    /// The latest analysis is an ERROR sentinel that both reviewers let through.
    MalformedAnalysis,
}

/// Which analyzer role the next ANALYZE step uses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnalyzerMode<'a> {
    Initial,
    Retry {
        reason: RetryReason,
        previous: &'a Analysis,
    },
}

/// A partial update produced by one workflow step.
#[derive(Debug, Clone, PartialEq)]
pub enum RunDelta {
    AnalysisAppended(Analysis),
    CvVerdict(bool),
    OfferVerdict(bool),
    Finalized(Analysis),
}

#[derive(Debug, Clone, Serialize)]
pub struct RunState {
    run_id: Uuid,
    candidate: Candidate,
    analyses: Vec<Analysis>,
    cv_hallucination: Option<bool>,
    offer_hallucination: Option<bool>,
    final_analysis: Option<Analysis>,
    cycles: u32,
}

impl RunState {
    pub fn new(candidate: Candidate) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            candidate,
            analyses: Vec::new(),
            cv_hallucination: None,
            offer_hallucination: None,
            final_analysis: None,
            cycles: 0,
        }
    }

    /// Identifies the run in logs, storage and error bodies.
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn candidate(&self) -> &Candidate {
        &self.candidate
    }

    /// Every analysis produced so far, oldest first.
    pub fn analyses(&self) -> &[Analysis] {
        &self.analyses
    }

    /// The analysis reviewers evaluate and the re-analyzer conditions on.
    pub fn latest(&self) -> Option<&Analysis> {
        self.analyses.last()
    }

    pub fn cv_hallucination(&self) -> Option<bool> {
        self.cv_hallucination
    }

    pub fn offer_hallucination(&self) -> Option<bool> {
        self.offer_hallucination
    }

    /// Number of ANALYZE steps applied.
    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    /// Retry trigger for the current verdicts. The offer signal wins over the
    /// CV signal when both are set.
    pub fn retry_reason(&self) -> Option<RetryReason> {
        if self.offer_hallucination == Some(true) {
            Some(RetryReason::OfferHallucination)
        } else if self.cv_hallucination == Some(true) {
            Some(RetryReason::CvHallucination)
        } else if self.latest().is_some_and(Analysis::is_error) {
            Some(RetryReason::MalformedAnalysis)
        } else {
            None
        }
    }

    pub fn analyzer_mode(&self) -> AnalyzerMode<'_> {
        match (self.retry_reason(), self.latest()) {
            (Some(reason), Some(previous)) => AnalyzerMode::Retry { reason, previous },
            _ => AnalyzerMode::Initial,
        }
    }

    pub(crate) fn apply(&mut self, delta: RunDelta) {
        match delta {
            RunDelta::AnalysisAppended(analysis) => {
                self.analyses.push(analysis);
                self.cycles += 1;
            }
            RunDelta::CvVerdict(flagged) => self.cv_hallucination = Some(flagged),
            RunDelta::OfferVerdict(flagged) => self.offer_hallucination = Some(flagged),
            RunDelta::Finalized(analysis) => self.final_analysis = Some(analysis),
        }
    }

    pub(crate) fn into_parts(self) -> (Candidate, Vec<Analysis>, Option<Analysis>) {
        (self.candidate, self.analyses, self.final_analysis)
    }
}
