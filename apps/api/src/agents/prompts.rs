// Prompt templates for the four agent roles.
// Placeholders are filled by `PromptInputs::render`; JSON examples in the
// templates use keys that are never supplied as inputs, so they pass through.

/// System prompt shared by the analyzer and re-analyzer.
pub const ANALYZER_SYSTEM: &str = "You are an expert technical recruiter. \
    You compare a candidate's resume against a job offer and assess the fit.";

/// System prompt shared by both reviewers.
pub const REVIEWER_SYSTEM: &str = "You are a strict fact checker for recruiting analyses. \
    You decide whether an analysis is supported by its source documents.";

/// Replace: {cv}, {offer}
pub const ANALYZER_PROMPT_TEMPLATE: &str = r#"Analyze how well the candidate fits the job offer.

Return a JSON object with this EXACT schema:
{
  "score": 75,
  "experiences": [
    {"company": "Acme", "role": "Backend engineer", "duration": "3 years", "relevance": "Built the payments API in Rust"}
  ],
  "description": "Two or three sentences explaining the score."
}

Rules:
- "score" is a whole number from 0 to 100.
- "experiences" lists ONLY experiences written in the resume that are relevant to the offer.
- Never invent companies, roles, dates or skills that are not in the resume.

RESUME:
{cv}

JOB OFFER:
{offer}"#;

/// Replace: {cv}, {offer}, {previous_analysis}
pub const RE_ANALYZER_PROMPT_TEMPLATE: &str = r#"A previous analysis of this candidate was REJECTED by a reviewer because it
contained claims not supported by the resume or the job offer.

PREVIOUS (REJECTED) ANALYSIS:
{previous_analysis}

Produce a corrected analysis. Remove every experience that does not appear in the resume
and re-score strictly against the job offer.

Return a JSON object with this EXACT schema:
{
  "score": 75,
  "experiences": [
    {"company": "Acme", "role": "Backend engineer", "duration": "3 years", "relevance": "Built the payments API in Rust"}
  ],
  "description": "Two or three sentences explaining the score."
}

"score" is a whole number from 0 to 100.

RESUME:
{cv}

JOB OFFER:
{offer}"#;

/// Replace: {cv}, {experiences}
pub const CV_REVIEW_PROMPT_TEMPLATE: &str = r#"Check whether EVERY experience below is stated in the resume.

EXPERIENCES EXTRACTED BY THE ANALYST:
{experiences}

RESUME:
{cv}

Return a JSON object:
{"score": 0}

Use 1 if ANY experience is missing from or contradicted by the resume (hallucination).
Use 0 if all experiences are supported by the resume."#;

/// Replace: {cv}, {offer}, {analysis}
pub const OFFER_REVIEW_PROMPT_TEMPLATE: &str = r#"Check whether the analysis below actually evaluates the candidate against THIS job offer.

ANALYSIS:
{analysis}

RESUME:
{cv}

JOB OFFER:
{offer}

Return a JSON object:
{"hallucination": 0}

Use 1 if the score or description is not grounded in the job offer's requirements
(hallucination). Use 0 if the analysis is responsive to the offer."#;
