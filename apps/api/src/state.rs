use std::sync::Arc;

use sqlx::PgPool;

use crate::agents::roles::AgentRoles;
use crate::agents::workflow::RunOptions;
use crate::llm_client::LlmInvoker;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// `None` disables run persistence.
    pub db: Option<PgPool>,
    /// Model backend. `LlmClient` in production.
    pub llm: Arc<dyn LlmInvoker>,
    pub roles: Arc<AgentRoles>,
    /// Defaults for runs started over HTTP; requests may lower `max_cycles`
    /// or turn on `verbose`.
    pub run_defaults: RunOptions,
}
