pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod prompts;
pub mod resilience;
pub mod service;
pub mod session;

pub use config::Config;
pub use error::{Error, Result};
pub use events::Event;
pub use resilience::{ResolveOutcome, ResolveReport, RetryEscalationController};
pub use session::Session;

use tokio::sync::mpsc;

pub struct Steadfast {
    config: Config,
    controller: RetryEscalationController,
}

impl Steadfast {
    pub fn new(config: Config) -> Result<Self> {
        config::validate_config(&config)?;
        let controller = RetryEscalationController::from_config(&config.resilience);
        Ok(Self { config, controller })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn controller(&self) -> &RetryEscalationController {
        &self.controller
    }

    /// Resolves the agent profile and opens a session on the configured gateway.
    pub async fn open_http_session(&self) -> Result<Session> {
        let profile = prompts::AgentProfile::from_config(&self.config.agent)?;
        let service = service::HttpAgentService::connect(&self.config.service, &profile).await?;
        Ok(Session::new(service))
    }

    pub async fn resolve(
        &self,
        session: &mut Session,
        user_request: &str,
        events: &mpsc::Sender<Event>,
    ) -> ResolveReport {
        self.controller.resolve(session, user_request, events).await
    }
}
