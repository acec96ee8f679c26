use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};

use crate::events::{emit, Event};
use crate::service::types::ServiceEvent;
use crate::session::Session;

/// Cancels a stalled query and soaks up whatever it still emits.
///
/// Nothing here is fatal. Interrupt failures, transport errors and an
/// expired window all end the drain the same way: the session's stream is
/// released and the next query starts clean.
#[derive(Debug, Clone, Copy)]
pub struct InterruptDrainer {
    window: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainEnd {
    Completed,
    StreamClosed,
    StreamError,
    WindowElapsed,
}

impl InterruptDrainer {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub async fn drain(&self, session: &mut Session, events: &mpsc::Sender<Event>) -> DrainEnd {
        match timeout(self.window, session.interrupt()).await {
            Ok(Ok(())) => tracing::debug!("interrupt delivered"),
            Ok(Err(err)) => tracing::debug!(error = %err, "interrupt failed; draining anyway"),
            Err(_) => tracing::debug!("interrupt delivery timed out; draining anyway"),
        }

        let mut discarded = 0usize;
        let consume = async {
            loop {
                match session.next_event().await {
                    Some(Ok(ServiceEvent::Content(content))) => emit(
                        events,
                        Event::Content {
                            source: content.source,
                            text: content.text,
                        },
                    ),
                    Some(Ok(ServiceEvent::Heartbeat)) => discarded += 1,
                    Some(Ok(ServiceEvent::Completion(_))) => return DrainEnd::Completed,
                    Some(Err(err)) => {
                        tracing::debug!(error = %err, "stream error while draining");
                        return DrainEnd::StreamError;
                    }
                    None => return DrainEnd::StreamClosed,
                }
            }
        };

        let end = timeout(self.window, consume)
            .await
            .unwrap_or(DrainEnd::WindowElapsed);
        session.release_stream();

        tracing::debug!(
            ?end,
            discarded,
            window_secs = self.window.as_secs(),
            "stalled request drained"
        );
        end
    }
}
