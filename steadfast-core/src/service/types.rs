use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;

/// Displayable assistant output.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentEvent {
    /// Model or sub-agent that produced the text, when the service says.
    pub source: Option<String>,
    pub text: String,
}

/// Terminal event of a successful response. The fields are informational.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionEvent {
    pub duration_ms: Option<u64>,
    pub num_turns: Option<u32>,
    pub total_cost_usd: Option<f64>,
    pub is_error: bool,
    pub stop_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServiceEvent {
    Content(ContentEvent),
    Completion(CompletionEvent),
    /// Progress without content; only keeps the inactivity timer alive.
    Heartbeat,
}

impl ServiceEvent {
    pub fn content(text: impl Into<String>) -> Self {
        Self::Content(ContentEvent {
            source: None,
            text: text.into(),
        })
    }

    pub fn completion() -> Self {
        Self::Completion(CompletionEvent::default())
    }
}

/// Events of one query, in emission order. Closing without a completion is
/// an ordinary end of stream.
pub type EventStream = BoxStream<'static, Result<ServiceEvent>>;

#[async_trait]
pub trait AgentService: Send {
    fn name(&self) -> &str;

    /// Starts a new query. The returned stream supersedes any earlier one.
    async fn query(&mut self, text: &str) -> Result<EventStream>;

    /// Asks the service to cancel the in-flight query. Best effort.
    async fn interrupt(&mut self) -> Result<()>;

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
