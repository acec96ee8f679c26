use std::collections::HashSet;

use crate::config::schema::Config;
use crate::error::{Error, Result};

pub fn validate_config(config: &Config) -> Result<()> {
    let resilience = &config.resilience;
    if resilience.inactivity_timeout_secs == 0 {
        return Err(Error::Validation(
            "resilience.inactivity_timeout_secs must be greater than zero".to_owned(),
        ));
    }

    if resilience.drain_timeout_secs == 0 {
        return Err(Error::Validation(
            "resilience.drain_timeout_secs must be greater than zero".to_owned(),
        ));
    }

    if resilience.drain_timeout_secs >= resilience.inactivity_timeout_secs {
        return Err(Error::Validation(format!(
            "resilience.drain_timeout_secs ({}) must be shorter than inactivity_timeout_secs ({})",
            resilience.drain_timeout_secs, resilience.inactivity_timeout_secs
        )));
    }

    if resilience.retry_budget == 0 {
        return Err(Error::Validation(
            "resilience.retry_budget must be at least 1".to_owned(),
        ));
    }

    let overrides = &resilience.phase_budgets;
    for (name, budget) in [
        ("original", overrides.original),
        ("continue_1", overrides.continue_1),
        ("continue_2", overrides.continue_2),
        ("continue_3", overrides.continue_3),
    ] {
        if budget == Some(0) {
            return Err(Error::Validation(format!(
                "resilience.phase_budgets.{name} must be at least 1"
            )));
        }
    }

    if config.service.base_url.trim().is_empty() {
        return Err(Error::Validation(
            "service.base_url cannot be empty".to_owned(),
        ));
    }

    let mut subagent_names = HashSet::new();
    for subagent in &config.agent.subagents {
        let name = subagent.name.trim();
        if name.is_empty() {
            return Err(Error::Validation(
                "subagent name cannot be empty".to_owned(),
            ));
        }

        if !subagent_names.insert(name.to_owned()) {
            return Err(Error::Validation(format!(
                "duplicate subagent name '{name}'"
            )));
        }

        if subagent.prompt_file.trim().is_empty() {
            return Err(Error::Validation(format!(
                "subagent '{name}' must name a prompt_file"
            )));
        }
    }

    if !config.agent.include_partial_messages {
        tracing::warn!(
            "agent.include_partial_messages is disabled; long silent generations will look like stalls"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::validate_config;
    use crate::config::schema::{Config, SubagentConfig};

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.agent.subagents.push(SubagentConfig {
            name: "web_researcher".to_owned(),
            description: "Finds articles, videos, and community content.".to_owned(),
            prompt_file: "web_researcher.md".to_owned(),
            tools: vec!["WebSearch".to_owned(), "WebFetch".to_owned()],
            model: Some("haiku".to_owned()),
        });
        config
    }

    #[test]
    fn accepts_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn rejects_drain_window_not_shorter_than_inactivity() {
        let mut config = valid_config();
        config.resilience.drain_timeout_secs = config.resilience.inactivity_timeout_secs;

        let error = validate_config(&config).expect_err("validation should fail");
        assert!(error.to_string().contains("must be shorter than"));
    }

    #[test]
    fn rejects_zero_phase_budget_override() {
        let mut config = valid_config();
        config.resilience.phase_budgets.continue_2 = Some(0);

        let error = validate_config(&config).expect_err("validation should fail");
        assert!(error.to_string().contains("phase_budgets.continue_2"));
    }

    #[test]
    fn rejects_duplicate_subagent() {
        let mut config = valid_config();
        let duplicate = config.agent.subagents[0].clone();
        config.agent.subagents.push(duplicate);

        let error = validate_config(&config).expect_err("validation should fail");
        assert!(error.to_string().contains("duplicate subagent name"));
    }
}
