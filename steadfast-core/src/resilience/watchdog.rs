use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};

use crate::events::{emit, Event};
use crate::resilience::types::AttemptOutcome;
use crate::service::types::ServiceEvent;
use crate::session::Session;

/// Supervises one query and classifies how it ended.
///
/// The timer bounds the gap between consecutive events, not the length of
/// the response: a generation may run for an hour as long as it keeps
/// emitting content or heartbeats.
#[derive(Debug, Clone, Copy)]
pub struct InactivityWatchdog {
    inactivity: Duration,
}

impl InactivityWatchdog {
    pub fn new(inactivity: Duration) -> Self {
        Self { inactivity }
    }

    pub fn inactivity(&self) -> Duration {
        self.inactivity
    }

    pub async fn run_with_timeout(
        &self,
        session: &mut Session,
        message: &str,
        events: &mpsc::Sender<Event>,
    ) -> AttemptOutcome {
        if let Err(err) = session.send(message).await {
            return AttemptOutcome::Failed(err);
        }

        let mut content_events = 0usize;
        let mut heartbeats = 0usize;
        loop {
            // A fresh timer per wait. It is polled first, so an event landing on
            // the deadline itself still counts as silence.
            let timer = sleep(self.inactivity);
            tokio::pin!(timer);
            let next = tokio::select! {
                biased;
                _ = &mut timer => {
                    tracing::warn!(
                        timeout_secs = self.inactivity.as_secs(),
                        content_events,
                        heartbeats,
                        "no activity within inactivity window; response stalled"
                    );
                    emit(
                        events,
                        Event::Warning(format!(
                            "No activity for {}s; response appears stalled.",
                            self.inactivity.as_secs()
                        )),
                    );
                    return AttemptOutcome::Stalled;
                }
                next = session.next_event() => next,
            };

            match next {
                Some(Ok(ServiceEvent::Content(content))) => {
                    content_events += 1;
                    emit(
                        events,
                        Event::Content {
                            source: content.source,
                            text: content.text,
                        },
                    );
                }
                Some(Ok(ServiceEvent::Heartbeat)) => {
                    heartbeats += 1;
                }
                Some(Ok(ServiceEvent::Completion(completion))) => {
                    tracing::debug!(
                        content_events,
                        heartbeats,
                        duration_ms = completion.duration_ms,
                        num_turns = completion.num_turns,
                        total_cost_usd = completion.total_cost_usd,
                        is_error = completion.is_error,
                        "response completed"
                    );
                    return AttemptOutcome::Success;
                }
                Some(Err(err)) => return AttemptOutcome::Failed(err),
                None => {
                    tracing::debug!(content_events, heartbeats, "stream closed without completion");
                    return AttemptOutcome::Success;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::InactivityWatchdog;
    use crate::events::Event;
    use crate::resilience::types::{AttemptOutcome, AttemptStatus};
    use crate::service::{ScriptStep, ScriptedService};
    use crate::session::Session;
    use std::time::Duration;
    use tokio::sync::mpsc;

    const FIVE_MINUTES: Duration = Duration::from_secs(300);

    #[tokio::test(start_paused = true)]
    async fn steady_heartbeats_outlast_the_timeout() {
        let mut steps = Vec::new();
        for _ in 0..20 {
            steps.push(ScriptStep::pause(Duration::from_secs(10)));
            steps.push(ScriptStep::Heartbeat);
        }
        steps.push(ScriptStep::Complete);

        let mut session = Session::new(ScriptedService::repeating(steps));
        let (tx, _rx) = mpsc::channel(16);
        let watchdog = InactivityWatchdog::new(Duration::from_secs(30));

        let started = tokio::time::Instant::now();
        let outcome = watchdog.run_with_timeout(&mut session, "go", &tx).await;
        assert_eq!(outcome.status(), AttemptStatus::Success);
        assert!(started.elapsed() >= Duration::from_secs(200));
    }

    #[tokio::test(start_paused = true)]
    async fn long_gaps_below_the_window_still_succeed() {
        let steps = vec![
            ScriptStep::content("starting"),
            ScriptStep::pause(Duration::from_secs(299)),
            ScriptStep::content("one large file"),
            ScriptStep::pause(Duration::from_secs(299)),
            ScriptStep::Complete,
        ];
        let mut session = Session::new(ScriptedService::repeating(steps));
        let (tx, mut rx) = mpsc::channel(16);

        let outcome = InactivityWatchdog::new(FIVE_MINUTES)
            .run_with_timeout(&mut session, "go", &tx)
            .await;

        assert_eq!(outcome.status(), AttemptStatus::Success);
        let mut shown = Vec::new();
        while let Ok(Event::Content { text, .. }) = rx.try_recv() {
            shown.push(text);
        }
        assert_eq!(shown, vec!["starting", "one large file"]);
    }

    #[tokio::test(start_paused = true)]
    async fn silence_reaching_the_window_is_a_stall() {
        let steps = vec![
            ScriptStep::content("partial"),
            ScriptStep::pause(FIVE_MINUTES + Duration::from_secs(1)),
            ScriptStep::Complete,
        ];
        let mut session = Session::new(ScriptedService::repeating(steps));
        let (tx, mut rx) = mpsc::channel(16);

        let outcome = InactivityWatchdog::new(FIVE_MINUTES)
            .run_with_timeout(&mut session, "go", &tx)
            .await;

        assert_eq!(outcome.status(), AttemptStatus::Stalled);
        assert!(session.has_active_stream());
        assert!(matches!(rx.try_recv(), Ok(Event::Content { .. })));
        assert!(matches!(rx.try_recv(), Ok(Event::Warning(message)) if message.contains("300s")));
    }

    #[tokio::test(start_paused = true)]
    async fn event_arriving_exactly_at_the_deadline_is_a_stall() {
        let steps = vec![ScriptStep::pause(FIVE_MINUTES), ScriptStep::Complete];
        let mut session = Session::new(ScriptedService::repeating(steps));
        let (tx, _rx) = mpsc::channel(16);

        let outcome = InactivityWatchdog::new(FIVE_MINUTES)
            .run_with_timeout(&mut session, "go", &tx)
            .await;

        assert_eq!(outcome.status(), AttemptStatus::Stalled);
    }

    #[tokio::test(start_paused = true)]
    async fn stream_error_fails_the_attempt() {
        let mut session = Session::new(ScriptedService::repeating(vec![
            ScriptStep::Heartbeat,
            ScriptStep::fail("connection reset by peer"),
        ]));
        let (tx, _rx) = mpsc::channel(16);

        let outcome = InactivityWatchdog::new(FIVE_MINUTES)
            .run_with_timeout(&mut session, "go", &tx)
            .await;

        match outcome {
            AttemptOutcome::Failed(err) => {
                assert!(err.to_string().contains("connection reset by peer"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn closed_stream_without_completion_counts_as_success() {
        let mut session = Session::new(ScriptedService::repeating(vec![ScriptStep::content(
            "only output",
        )]));
        let (tx, _rx) = mpsc::channel(16);

        let outcome = InactivityWatchdog::new(FIVE_MINUTES)
            .run_with_timeout(&mut session, "go", &tx)
            .await;
        assert_eq!(outcome.status(), AttemptStatus::Success);
    }
}
