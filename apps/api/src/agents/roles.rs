//! Agent roles: a named model configuration bound to one workflow step.

use serde::{Deserialize, Serialize};

use crate::agents::prompts::{
    ANALYZER_PROMPT_TEMPLATE, ANALYZER_SYSTEM, CV_REVIEW_PROMPT_TEMPLATE,
    OFFER_REVIEW_PROMPT_TEMPLATE, REVIEWER_SYSTEM, RE_ANALYZER_PROMPT_TEMPLATE,
};
use crate::llm_client::prompts::JSON_ONLY_SYSTEM;
use crate::llm_client::DEFAULT_MODEL;

pub const ANALYZER: &str = "analyzer";
pub const RE_ANALYZER: &str = "re_analyzer";
pub const CV_REVIEWER: &str = "cv_reviewer";
pub const OFFER_REVIEWER: &str = "offer_reviewer";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Role {
    pub name: String,
    pub model: String,
    pub system: String,
    pub prompt_template: String,
    pub temperature: f32,
}

impl Role {
    /// `persona` is followed by the shared JSON-only instructions.
    fn new(name: &str, persona: &str, prompt_template: &str, temperature: f32) -> Self {
        Self {
            name: name.to_string(),
            model: DEFAULT_MODEL.to_string(),
            system: format!("{persona} {JSON_ONLY_SYSTEM}"),
            prompt_template: prompt_template.to_string(),
            temperature,
        }
    }

    fn apply(&mut self, role_override: &RoleOverride) {
        if let Some(model) = &role_override.model {
            self.model = model.clone();
        }
        if let Some(temperature) = role_override.temperature {
            self.temperature = temperature;
        }
    }
}

/// The four roles a review run needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentRoles {
    pub analyzer: Role,
    pub re_analyzer: Role,
    pub cv_reviewer: Role,
    pub offer_reviewer: Role,
}

impl Default for AgentRoles {
    fn default() -> Self {
        Self {
            analyzer: Role::new(ANALYZER, ANALYZER_SYSTEM, ANALYZER_PROMPT_TEMPLATE, 0.0),
            // A little temperature so the retry does not reproduce the rejected answer.
            re_analyzer: Role::new(RE_ANALYZER, ANALYZER_SYSTEM, RE_ANALYZER_PROMPT_TEMPLATE, 0.3),
            cv_reviewer: Role::new(CV_REVIEWER, REVIEWER_SYSTEM, CV_REVIEW_PROMPT_TEMPLATE, 0.0),
            offer_reviewer: Role::new(
                OFFER_REVIEWER,
                REVIEWER_SYSTEM,
                OFFER_REVIEW_PROMPT_TEMPLATE,
                0.0,
            ),
        }
    }
}

/// Per-role model selector and temperature overrides from a run config file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RoleOverride {
    pub model: Option<String>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RoleOverrides {
    pub analyzer: RoleOverride,
    pub re_analyzer: RoleOverride,
    pub cv_reviewer: RoleOverride,
    pub offer_reviewer: RoleOverride,
}

impl AgentRoles {
    pub fn with_overrides(mut self, overrides: &RoleOverrides) -> Self {
        self.analyzer.apply(&overrides.analyzer);
        self.re_analyzer.apply(&overrides.re_analyzer);
        self.cv_reviewer.apply(&overrides.cv_reviewer);
        self.offer_reviewer.apply(&overrides.offer_reviewer);
        self
    }
}
