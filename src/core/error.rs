//! Error handling for the health engine.

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, AgentError>;

/// Top-level error type for the health engine.
#[derive(thiserror::Error, Debug)]
pub enum AgentError {
    #[error("catalog error: {0}")]
    Catalog(String),

    #[error("rule compilation error in '{rule}': {reason}")]
    RuleCompile { rule: String, reason: String },

    #[error("rule evaluation error: {0}")]
    RuleEval(String),

    #[error("collector error: {0}")]
    Collector(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<csv::Error> for AgentError {
    fn from(err: csv::Error) -> Self {
        AgentError::Catalog(err.to_string())
    }
}

impl From<toml::de::Error> for AgentError {
    fn from(err: toml::de::Error) -> Self {
        AgentError::Config(err.to_string())
    }
}
