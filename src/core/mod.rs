//! Ambient stack: CLI args, configuration, error types and logging setup.

pub mod args;
pub mod config;
pub mod error;
pub mod logging;

pub use args::CommandlineArgs;
pub use config::{AgentConfig, EngineConfig, ExportConfig, LoggingConfig};
pub use error::{AgentError, Result};
pub use logging::init_logging;
