pub mod cli;
pub mod config;
pub mod error;
pub mod generator;
pub mod i18n;
pub mod llm;
pub mod store;
pub mod text;
pub mod tools;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use error::ResearchError;
pub use generator::state::ResearchState;
pub use generator::workflow::launch;
