use chrono::{DateTime, Utc};
use futures::StreamExt;
use uuid::Uuid;

use crate::error::Result;
use crate::service::types::{AgentService, EventStream, ServiceEvent};

/// The one handle to the agent service for the life of the process.
///
/// Deliberately not `Clone`: a request borrows it mutably, so only one query
/// can be in flight and a new query always replaces the previous stream.
pub struct Session {
    id: Uuid,
    opened_at: DateTime<Utc>,
    service: Box<dyn AgentService>,
    active: Option<EventStream>,
    queries_sent: usize,
    interrupts_sent: usize,
}

impl Session {
    pub fn new(service: impl AgentService + 'static) -> Self {
        let session = Self {
            id: Uuid::new_v4(),
            opened_at: Utc::now(),
            service: Box::new(service),
            active: None,
            queries_sent: 0,
            interrupts_sent: 0,
        };
        tracing::debug!(session = %session.id, service = session.service.name(), "session created");
        session
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn service_name(&self) -> &str {
        self.service.name()
    }

    pub fn queries_sent(&self) -> usize {
        self.queries_sent
    }

    pub fn interrupts_sent(&self) -> usize {
        self.interrupts_sent
    }

    /// Starts a query. Whatever remained of the previous stream is dropped
    /// first, so its events can never reach this query's consumer.
    pub async fn send(&mut self, text: &str) -> Result<()> {
        self.active = None;
        self.queries_sent += 1;
        let stream = self.service.query(text).await?;
        self.active = Some(stream);
        Ok(())
    }

    /// Next event of the active query; `None` once it has ended or if no
    /// query is active. Cancel-safe: dropping the future loses no event.
    pub async fn next_event(&mut self) -> Option<Result<ServiceEvent>> {
        let stream = self.active.as_mut()?;
        let next = stream.next().await;
        if next.is_none() {
            self.active = None;
        }
        next
    }

    pub async fn interrupt(&mut self) -> Result<()> {
        self.interrupts_sent += 1;
        self.service.interrupt().await
    }

    pub fn release_stream(&mut self) {
        self.active = None;
    }

    pub fn has_active_stream(&self) -> bool {
        self.active.is_some()
    }

    pub async fn close(mut self) -> Result<()> {
        self.active = None;
        tracing::debug!(
            session = %self.id,
            queries = self.queries_sent,
            interrupts = self.interrupts_sent,
            open_secs = (Utc::now() - self.opened_at).num_seconds(),
            "closing session"
        );
        self.service.close().await
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("service", &self.service.name())
            .field("active", &self.active.is_some())
            .field("queries_sent", &self.queries_sent)
            .field("interrupts_sent", &self.interrupts_sent)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::Session;
    use crate::service::{ScriptStep, ScriptedService, ServiceEvent};

    #[tokio::test(start_paused = true)]
    async fn new_query_discards_unread_events() {
        let service = ScriptedService::new(vec![
            vec![
                ScriptStep::content("kept"),
                ScriptStep::content("stale"),
                ScriptStep::Complete,
            ],
            vec![ScriptStep::content("fresh"), ScriptStep::Complete],
        ]);
        let mut session = Session::new(service);

        session.send("one").await.expect("send");
        let first = session.next_event().await.expect("event").expect("ok");
        assert_eq!(first, ServiceEvent::content("kept"));

        session.send("two").await.expect("send");
        let next = session.next_event().await.expect("event").expect("ok");
        assert_eq!(next, ServiceEvent::content("fresh"));
        assert_eq!(session.queries_sent(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_stream_is_released() {
        let mut session = Session::new(ScriptedService::repeating(vec![ScriptStep::Complete]));
        assert!(session.next_event().await.is_none());

        session.send("q").await.expect("send");
        assert!(session.next_event().await.is_some());
        assert!(session.next_event().await.is_none());
        assert!(!session.has_active_stream());
    }

    #[tokio::test(start_paused = true)]
    async fn close_drops_an_unfinished_stream() {
        let mut session = Session::new(ScriptedService::repeating(vec![
            ScriptStep::content("partial"),
            ScriptStep::HangForever,
        ]));
        session.send("q").await.expect("send");
        assert!(session.next_event().await.is_some());
        assert!(session.has_active_stream());

        session.close().await.expect("close");
    }
}
