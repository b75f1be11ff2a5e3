pub mod analyzer;
pub mod batch;
pub mod handlers;
pub mod invoke;
pub mod pipeline;
pub mod prompts;
pub mod report;
pub mod reviewer;
pub mod roles;
pub mod workflow;
