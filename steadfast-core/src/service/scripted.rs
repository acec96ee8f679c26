//! Deterministic in-process service that replays scripted responses.
//!
//! Each query consumes the next scripted response; once the script runs out
//! the last response repeats, so a single stalling response models a service
//! that always stalls.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::service::types::{AgentService, EventStream, ServiceEvent};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum ScriptStep {
    Content { text: String },
    Heartbeat,
    Complete,
    Pause { millis: u64 },
    /// Raises a transport error and ends the stream.
    Fail { message: String },
    /// Goes silent until the service receives an interrupt.
    HangUntilInterrupted,
    /// Goes silent and ignores interrupts.
    HangForever,
}

impl ScriptStep {
    pub fn content(text: impl Into<String>) -> Self {
        Self::Content { text: text.into() }
    }

    pub fn pause(duration: Duration) -> Self {
        Self::Pause {
            millis: duration.as_millis() as u64,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self::Fail {
            message: message.into(),
        }
    }
}

#[derive(Debug, Default)]
struct JournalEntries {
    queries: Vec<String>,
    interrupts: usize,
}

/// Shared view of what the scripted service was asked to do.
#[derive(Debug, Clone, Default)]
pub struct ScriptJournal {
    inner: Arc<Mutex<JournalEntries>>,
}

impl ScriptJournal {
    fn lock(&self) -> MutexGuard<'_, JournalEntries> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn queries(&self) -> Vec<String> {
        self.lock().queries.clone()
    }

    pub fn interrupts(&self) -> usize {
        self.lock().interrupts
    }
}

#[derive(Debug, Deserialize)]
struct ScriptFile {
    #[serde(default)]
    interrupt_fails: bool,
    responses: Vec<ScriptedResponse>,
}

#[derive(Debug, Deserialize)]
struct ScriptedResponse {
    steps: Vec<ScriptStep>,
}

#[derive(Debug)]
pub struct ScriptedService {
    responses: VecDeque<Vec<ScriptStep>>,
    last: Vec<ScriptStep>,
    interrupt_fails: bool,
    in_flight: CancellationToken,
    journal: ScriptJournal,
}

impl ScriptedService {
    pub fn new(responses: Vec<Vec<ScriptStep>>) -> Self {
        Self {
            responses: responses.into(),
            last: vec![ScriptStep::Complete],
            interrupt_fails: false,
            in_flight: CancellationToken::new(),
            journal: ScriptJournal::default(),
        }
    }

    /// Every query answers with the same `steps`.
    pub fn repeating(steps: Vec<ScriptStep>) -> Self {
        Self::new(vec![steps])
    }

    /// Loads a TOML script of `[[responses]]` tables, each holding `steps`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|err| {
            Error::Config(format!("failed to read script '{}': {err}", path.display()))
        })?;
        let script: ScriptFile = toml::from_str(&content).map_err(|err| {
            Error::Config(format!("failed to parse script '{}': {err}", path.display()))
        })?;
        if script.responses.is_empty() {
            return Err(Error::Validation(format!(
                "script '{}' has no responses",
                path.display()
            )));
        }

        Ok(Self::new(script.responses.into_iter().map(|r| r.steps).collect())
            .with_failing_interrupts(script.interrupt_fails))
    }

    pub fn with_failing_interrupts(mut self, fails: bool) -> Self {
        self.interrupt_fails = fails;
        self
    }

    pub fn journal(&self) -> ScriptJournal {
        self.journal.clone()
    }

    fn next_response(&mut self) -> Vec<ScriptStep> {
        if let Some(steps) = self.responses.pop_front() {
            self.last = steps.clone();
            return steps;
        }
        self.last.clone()
    }
}

#[async_trait]
impl AgentService for ScriptedService {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn query(&mut self, text: &str) -> Result<EventStream> {
        self.journal.lock().queries.push(text.to_owned());
        self.in_flight = CancellationToken::new();

        let steps: VecDeque<ScriptStep> = self.next_response().into();
        let interrupted = self.in_flight.clone();

        Ok(futures::stream::unfold(
            (steps, interrupted),
            |(mut steps, interrupted)| async move {
                while let Some(step) = steps.pop_front() {
                    let event = match step {
                        ScriptStep::Content { text } => Ok(ServiceEvent::content(text)),
                        ScriptStep::Heartbeat => Ok(ServiceEvent::Heartbeat),
                        ScriptStep::Complete => Ok(ServiceEvent::completion()),
                        ScriptStep::Pause { millis } => {
                            tokio::time::sleep(Duration::from_millis(millis)).await;
                            continue;
                        }
                        ScriptStep::Fail { message } => {
                            steps.clear();
                            Err(Error::Transport(message))
                        }
                        ScriptStep::HangUntilInterrupted => {
                            interrupted.cancelled().await;
                            continue;
                        }
                        ScriptStep::HangForever => {
                            futures::future::pending::<()>().await;
                            continue;
                        }
                    };
                    return Some((event, (steps, interrupted)));
                }
                None
            },
        )
        .boxed())
    }

    async fn interrupt(&mut self) -> Result<()> {
        self.journal.lock().interrupts += 1;
        if self.interrupt_fails {
            return Err(Error::Service("interrupt rejected by script".to_owned()));
        }
        self.in_flight.cancel();
        Ok(())
    }
}
