use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "steadfast", about = "Resilient REPL for a streaming agent service")]
pub struct Cli {
    #[arg(long, default_value = "steadfast.toml")]
    pub config: PathBuf,

    /// Replay a TOML script instead of contacting the agent gateway.
    #[arg(long)]
    pub script: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    #[arg(long, value_name = "SECS")]
    pub inactivity_timeout: Option<u64>,

    #[arg(long, value_name = "SECS")]
    pub drain_timeout: Option<u64>,

    #[arg(long, value_name = "N")]
    pub retry_budget: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn apply_overrides(&self, config: &mut steadfast_core::Config) {
        if let Some(secs) = self.inactivity_timeout {
            config.resilience.inactivity_timeout_secs = secs;
        }
        if let Some(secs) = self.drain_timeout {
            config.resilience.drain_timeout_secs = secs;
        }
        if let Some(budget) = self.retry_budget {
            config.resilience.retry_budget = budget;
        }
    }
}
