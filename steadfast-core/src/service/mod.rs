pub mod http;
pub mod retry;
pub mod scripted;
pub mod sse;
pub mod types;

pub use http::HttpAgentService;
pub use scripted::{ScriptJournal, ScriptStep, ScriptedService};
pub use types::{AgentService, CompletionEvent, ContentEvent, EventStream, ServiceEvent};
