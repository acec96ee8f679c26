use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub resilience: ResilienceConfig,
    pub service: ServiceConfig,
    pub agent: AgentConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResilienceConfig {
    /// Seconds of silence after which an attempt is considered stalled.
    pub inactivity_timeout_secs: u64,
    /// Window for absorbing straggler events after an interrupt.
    pub drain_timeout_secs: u64,
    /// Attempts per retryable phase, first try included.
    pub retry_budget: usize,
    pub phase_budgets: PhaseBudgets,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            inactivity_timeout_secs: 300,
            drain_timeout_secs: 15,
            retry_budget: 3,
            phase_budgets: PhaseBudgets::default(),
        }
    }
}

/// Per-phase overrides of `ResilienceConfig::retry_budget`.
///
/// The last-resort phase is always attempted exactly once and has no entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PhaseBudgets {
    pub original: Option<usize>,
    pub continue_1: Option<usize>,
    pub continue_2: Option<usize>,
    pub continue_3: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub base_url: String,
    pub api_key_env: Option<String>,
    pub connect_timeout_ms: u64,
    pub extra_headers: Vec<(String, String)>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8787".to_owned(),
            api_key_env: Some("STEADFAST_API_KEY".to_owned()),
            connect_timeout_ms: 10_000,
            extra_headers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub model: String,
    pub prompts_dir: String,
    pub system_prompt_file: Option<String>,
    pub setting_sources: Vec<String>,
    pub allowed_tools: Vec<String>,
    /// Token-level stream events double as heartbeats for stall detection.
    pub include_partial_messages: bool,
    pub subagents: Vec<SubagentConfig>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: "sonnet".to_owned(),
            prompts_dir: "prompts".to_owned(),
            system_prompt_file: Some("main_agent.md".to_owned()),
            setting_sources: vec!["user".to_owned(), "project".to_owned()],
            allowed_tools: ["Skill", "Task", "Write", "Bash", "WebSearch", "WebFetch"]
                .into_iter()
                .map(str::to_owned)
                .collect(),
            include_partial_messages: true,
            subagents: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubagentConfig {
    pub name: String,
    pub description: String,
    pub prompt_file: String,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
        }
    }
}
