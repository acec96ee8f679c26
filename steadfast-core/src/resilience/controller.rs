use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};

use crate::config::schema::ResilienceConfig;
use crate::events::{emit, Event};
use crate::resilience::drainer::InterruptDrainer;
use crate::resilience::phases::{escalation_plan, EscalationPhase, RetryBudgets};
use crate::resilience::types::{
    AttemptOutcome, AttemptRecord, ResolveOutcome, ResolveReport,
};
use crate::resilience::watchdog::InactivityWatchdog;
use crate::session::Session;

/// Drives one user request to completion through the escalation table.
///
/// Only stalls consume budget. A transport failure ends the request at once,
/// whichever phase it happens in.
#[derive(Debug, Clone)]
pub struct RetryEscalationController {
    watchdog: InactivityWatchdog,
    drainer: InterruptDrainer,
    budgets: RetryBudgets,
}

impl RetryEscalationController {
    pub fn new(inactivity: Duration, drain_window: Duration, budgets: RetryBudgets) -> Self {
        Self {
            watchdog: InactivityWatchdog::new(inactivity),
            drainer: InterruptDrainer::new(drain_window),
            budgets,
        }
    }

    pub fn from_config(config: &ResilienceConfig) -> Self {
        Self::new(
            Duration::from_secs(config.inactivity_timeout_secs),
            Duration::from_secs(config.drain_timeout_secs),
            RetryBudgets::from_config(config),
        )
    }

    pub fn budgets(&self) -> &RetryBudgets {
        &self.budgets
    }

    pub async fn resolve(
        &self,
        session: &mut Session,
        user_request: &str,
        events: &mpsc::Sender<Event>,
    ) -> ResolveReport {
        let started = Instant::now();
        let plan = escalation_plan(user_request, &self.budgets);
        let continue_phases = plan
            .iter()
            .filter(|step| step.phase.continue_index().is_some())
            .count();
        let mut attempts = Vec::with_capacity(self.budgets.max_attempts());

        let finish = |attempts: Vec<AttemptRecord>, outcome: ResolveOutcome| ResolveReport {
            attempts,
            outcome,
            elapsed: started.elapsed(),
        };

        for step in &plan {
            announce_phase(step.phase, continue_phases, events);
            tracing::info!(phase = %step.phase, budget = step.budget, "entering phase");

            for attempt in 1..=step.budget {
                if attempt > 1 {
                    let retries = step.budget - 1;
                    let notice = if step.phase == EscalationPhase::Original {
                        format!("Retry attempt {}/{retries}...", attempt - 1)
                    } else {
                        format!("Retry {}/{retries}...", attempt - 1)
                    };
                    emit(events, Event::Progress(notice));
                }

                tracing::info!(phase = %step.phase, attempt, budget = step.budget, "sending attempt");
                let outcome = self
                    .watchdog
                    .run_with_timeout(session, &step.message, events)
                    .await;
                attempts.push(AttemptRecord {
                    phase: step.phase,
                    attempt,
                    status: outcome.status(),
                });

                match outcome {
                    AttemptOutcome::Success => {
                        tracing::info!(
                            phase = %step.phase,
                            attempt,
                            total_attempts = attempts.len(),
                            "request completed"
                        );
                        return finish(attempts, ResolveOutcome::Completed);
                    }
                    AttemptOutcome::Failed(err) => {
                        tracing::error!(
                            phase = %step.phase,
                            attempt,
                            error = %err,
                            "response failed; not retrying this request"
                        );
                        emit(events, Event::Error(format!("Error during response: {err}")));
                        return finish(attempts, ResolveOutcome::TransportFailure(err.to_string()));
                    }
                    AttemptOutcome::Stalled => {
                        self.drainer.drain(session, events).await;
                    }
                }
            }

            tracing::info!(phase = %step.phase, "phase budget exhausted");
        }

        tracing::warn!(total_attempts = attempts.len(), "all escalation phases exhausted");
        emit(
            events,
            Event::Warning(
                "Could not get a complete response, but partial output may have been displayed above."
                    .to_owned(),
            ),
        );
        finish(attempts, ResolveOutcome::Exhausted)
    }
}

fn announce_phase(phase: EscalationPhase, continue_phases: usize, events: &mpsc::Sender<Event>) {
    let notice = match phase {
        EscalationPhase::Original => return,
        EscalationPhase::LastResort => {
            "Final attempt: creating deliverables from built-in knowledge...".to_owned()
        }
        other => match other.continue_index() {
            Some(index) => format!(
                "Asking agent to continue with available information (attempt {index}/{continue_phases})..."
            ),
            None => return,
        },
    };
    emit(events, Event::Progress(notice));
}
