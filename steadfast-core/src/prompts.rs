use std::path::Path;

use serde::Serialize;

use crate::config::schema::AgentConfig;
use crate::error::{Error, Result};

/// Reads `dir/filename` and trims surrounding whitespace.
pub fn load_prompt(dir: &Path, filename: &str) -> Result<String> {
    let path = dir.join(filename);
    let content = std::fs::read_to_string(&path).map_err(|err| {
        Error::Config(format!("failed to read prompt '{}': {err}", path.display()))
    })?;
    Ok(content.trim().to_owned())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubagentDefinition {
    pub name: String,
    pub description: String,
    pub prompt: String,
    pub tools: Vec<String>,
    pub model: Option<String>,
}

/// Everything the service needs to open a session, with prompts resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentProfile {
    pub model: String,
    pub system_prompt: Option<String>,
    pub setting_sources: Vec<String>,
    pub allowed_tools: Vec<String>,
    pub include_partial_messages: bool,
    pub subagents: Vec<SubagentDefinition>,
}

impl AgentProfile {
    pub fn from_config(config: &AgentConfig) -> Result<Self> {
        let dir = Path::new(&config.prompts_dir);
        let system_prompt = config
            .system_prompt_file
            .as_deref()
            .map(|file| load_prompt(dir, file))
            .transpose()?;

        let subagents = config
            .subagents
            .iter()
            .map(|subagent| {
                Ok(SubagentDefinition {
                    name: subagent.name.clone(),
                    description: subagent.description.clone(),
                    prompt: load_prompt(dir, &subagent.prompt_file)?,
                    tools: subagent.tools.clone(),
                    model: subagent.model.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            model: config.model.clone(),
            system_prompt,
            setting_sources: config.setting_sources.clone(),
            allowed_tools: config.allowed_tools.clone(),
            include_partial_messages: config.include_partial_messages,
            subagents,
        })
    }
}
