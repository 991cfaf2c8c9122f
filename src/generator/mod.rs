pub mod context;
pub mod orchestrator;
pub mod outlet;
pub mod prompts;
pub mod stages;
pub mod state;
pub mod workflow;
