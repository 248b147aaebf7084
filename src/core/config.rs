//! Agent configuration loaded from an optional TOML file.

use crate::core::error::{AgentError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Top-level agent configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Directory containing metrics.csv and rules.csv
    #[serde(default = "EngineConfig::default_resources_dir")]
    pub resources_dir: String,
    /// Input period P, in seconds
    #[serde(default = "EngineConfig::default_period_secs")]
    pub period_secs: u64,
    /// Ring buffer capacity for newly-allocated metric RBs
    #[serde(default = "EngineConfig::default_rb_capacity")]
    pub rb_capacity: usize,
    /// Score propagation aggregator
    #[serde(default = "EngineConfig::default_aggregator")]
    pub aggregator: String,
}

impl EngineConfig {
    fn default_resources_dir() -> String {
        "resources".to_string()
    }
    fn default_period_secs() -> u64 {
        3
    }
    fn default_rb_capacity() -> usize {
        60
    }
    fn default_aggregator() -> String {
        "quadratic-mean".to_string()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            resources_dir: Self::default_resources_dir(),
            period_secs: Self::default_period_secs(),
            rb_capacity: Self::default_rb_capacity(),
            aggregator: Self::default_aggregator(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
    pub file: Option<String>,
    #[serde(default)]
    pub json: bool,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            file: None,
            json: false,
        }
    }
}

/// Configuration for the downstream export surface (gNMI server, shared
/// memory mirror). The core engine never reads these fields itself; they
/// are threaded through so an external exporter sharing this config file
/// has somewhere to look.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "ExportConfig::default_gnmi_bind")]
    pub gnmi_bind_address: String,
}

impl ExportConfig {
    fn default_gnmi_bind() -> String {
        "0.0.0.0:50051".to_string()
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            gnmi_bind_address: Self::default_gnmi_bind(),
        }
    }
}

impl AgentConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("loading agent configuration from {:?}", path);

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("config file {:?} not found, using defaults", path);
                return Ok(Self::default());
            }
            Err(e) => return Err(AgentError::Io(e)),
        };

        toml::from_str(&content).map_err(AgentError::from)
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            logging: LoggingConfig::default(),
            export: ExportConfig::default(),
        }
    }
}
