//! Command-line arguments for the health engine daemon.

#[derive(clap::Parser, Debug)]
#[command(about = "Node-local service-assurance health engine")]
pub struct CommandlineArgs {
    /// Path to the agent's TOML configuration file
    #[arg(short, long, default_value = "subservice-agent.toml")]
    pub config: String,

    /// Directory containing metrics.csv and rules.csv (overrides config)
    #[arg(long)]
    pub resources_dir: Option<String>,

    /// Input period in seconds (overrides config)
    #[arg(long)]
    pub period: Option<u64>,

    /// Score propagation aggregator: quadratic-mean, mean, geometric-mean,
    /// harmonic-mean, malus (overrides config)
    #[arg(long)]
    pub aggregator: Option<String>,

    /// Run a single engine tick against the current store and exit
    #[arg(long, default_value_t = false)]
    pub once: bool,
}
