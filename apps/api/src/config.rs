use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::agents::invoke::CallPolicy;
use crate::agents::roles::{AgentRoles, RoleOverrides};
use crate::agents::workflow::{RunOptions, DEFAULT_MAX_CYCLES};
use crate::models::candidate::{Candidate, CandidateInput};

/// Application configuration loaded from environment variables.
/// Fails at startup if the model credential is missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    /// Runs are only persisted when set.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    /// `token` takes precedence over `ANTHROPIC_API_KEY`.
    pub fn from_env(token: Option<String>) -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let anthropic_api_key = match token {
            Some(token) if !token.trim().is_empty() => token,
            _ => require_env("ANTHROPIC_API_KEY")?,
        };

        Ok(Config {
            anthropic_api_key,
            database_url: std::env::var("DATABASE_URL").ok(),
            db_max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse::<u32>()
                .context("DB_MAX_CONNECTIONS must be a positive integer")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Run-scoped settings read from a JSON config file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub max_cycles: u32,
    pub thread_id: String,
    pub verbose: bool,
    pub call_timeout_secs: u64,
    pub adapter_retries: u32,
    pub roles: RoleOverrides,
}

impl Default for RunConfig {
    fn default() -> Self {
        let options = RunOptions::default();
        Self {
            max_cycles: DEFAULT_MAX_CYCLES,
            thread_id: options.thread_id,
            verbose: options.verbose,
            call_timeout_secs: options.call_policy.timeout.as_secs(),
            adapter_retries: options.call_policy.retries,
            roles: RoleOverrides::default(),
        }
    }
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Run config file not found at {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Run config at {} is not valid JSON", path.display()))
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            max_cycles: self.max_cycles,
            thread_id: self.thread_id.clone(),
            verbose: self.verbose,
            call_policy: CallPolicy {
                timeout: Duration::from_secs(self.call_timeout_secs),
                retries: self.adapter_retries,
            },
        }
    }

    pub fn agent_roles(&self) -> AgentRoles {
        AgentRoles::default().with_overrides(&self.roles)
    }
}

/// Reads candidates from a data file: either one JSON object
/// `{"cv": ..., "offer": ...}` or JSON Lines of such objects.
pub fn load_candidates(path: &Path) -> Result<Vec<Candidate>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Data file not found at {}", path.display()))?;
    parse_candidates(&text).with_context(|| format!("Invalid data file {}", path.display()))
}

fn parse_candidates(text: &str) -> Result<Vec<Candidate>> {
    let inputs: Vec<CandidateInput> = match serde_json::from_str::<CandidateInput>(text) {
        Ok(single) => vec![single],
        Err(_) => text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(n, line)| {
                serde_json::from_str(line).with_context(|| {
                    format!("line {}: expected an object with 'cv' and 'offer'", n + 1)
                })
            })
            .collect::<Result<_>>()?,
    };

    if inputs.is_empty() {
        bail!("no candidates provided: expected objects with 'cv' and 'offer'");
    }

    inputs
        .into_iter()
        .map(|input| Candidate::try_from(input).map_err(anyhow::Error::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_run_config_defaults_fill_missing_fields() {
        let config: RunConfig = serde_json::from_str(r#"{"max_cycles": 5}"#).unwrap();
        assert_eq!(config.max_cycles, 5);
        assert_eq!(config.adapter_retries, RunConfig::default().adapter_retries);
        let options = config.run_options();
        assert_eq!(options.max_cycles, 5);
        assert_eq!(options.call_policy.timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_run_config_role_overrides() {
        let config: RunConfig = serde_json::from_str(
            r#"{"verbose": true, "thread_id": "4", "roles": {"analyzer": {"temperature": 0.5}}}"#,
        )
        .unwrap();
        assert!(config.verbose);
        assert_eq!(config.run_options().thread_id, "4");
        assert!((config.agent_roles().analyzer.temperature - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_parse_single_object() {
        let candidates = parse_candidates(r#"{"cv": "Rust dev", "offer": "Rust role"}"#).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].cv(), "Rust dev");
    }

    #[test]
    fn test_parse_json_lines() {
        let text = "{\"cv\": \"a\", \"offer\": \"x\"}\n\n{\"cv\": \"b\", \"offer\": \"y\"}\n";
        let candidates = parse_candidates(text).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[1].offer(), "y");
    }

    #[test]
    fn test_parse_rejects_missing_fields_and_empty_files() {
        assert!(parse_candidates(r#"{"cv": "only a cv"}"#).is_err());
        assert!(parse_candidates("").is_err());
        assert!(parse_candidates(r#"{"cv": " ", "offer": "x"}"#).is_err());
    }

    #[test]
    fn test_load_files_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let data_path = dir.path().join("data.json");
        let mut file = std::fs::File::create(&data_path).unwrap();
        write!(file, r#"{{"cv": "Go developer", "offer": "Rust developer"}}"#).unwrap();

        let config_path = dir.path().join("generation.json");
        std::fs::write(&config_path, r#"{"max_cycles": 2, "thread_id": "4"}"#).unwrap();

        assert_eq!(load_candidates(&data_path).unwrap().len(), 1);
        assert_eq!(RunConfig::load(&config_path).unwrap().max_cycles, 2);
        assert!(RunConfig::load(&dir.path().join("missing.json")).is_err());
    }
}
