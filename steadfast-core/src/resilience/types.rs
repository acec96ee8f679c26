use std::time::Duration;

use crate::error::Error;
use crate::resilience::phases::EscalationPhase;

/// Result of one watchdog-supervised query.
#[derive(Debug)]
pub enum AttemptOutcome {
    Success,
    /// No event arrived within the inactivity window. Requires a drain.
    Stalled,
    Failed(Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptStatus {
    Success,
    Stalled,
    Failed,
}

impl AttemptOutcome {
    pub fn status(&self) -> AttemptStatus {
        match self {
            Self::Success => AttemptStatus::Success,
            Self::Stalled => AttemptStatus::Stalled,
            Self::Failed(_) => AttemptStatus::Failed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptRecord {
    pub phase: EscalationPhase,
    /// 1-based position within the phase.
    pub attempt: usize,
    pub status: AttemptStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveOutcome {
    Completed,
    /// The stream raised; no further attempts were made for this request.
    TransportFailure(String),
    /// Every phase ran out of budget. Partial output may have been shown.
    Exhausted,
}

#[derive(Debug, Clone)]
pub struct ResolveReport {
    pub attempts: Vec<AttemptRecord>,
    pub outcome: ResolveOutcome,
    pub elapsed: Duration,
}

impl ResolveReport {
    pub fn attempt_count(&self) -> usize {
        self.attempts.len()
    }

    pub fn stall_count(&self) -> usize {
        self.attempts
            .iter()
            .filter(|record| record.status == AttemptStatus::Stalled)
            .count()
    }

    /// Distinct phases in the order they were entered.
    pub fn phases_visited(&self) -> Vec<EscalationPhase> {
        let mut phases: Vec<EscalationPhase> = Vec::new();
        for record in &self.attempts {
            if phases.last() != Some(&record.phase) {
                phases.push(record.phase);
            }
        }
        phases
    }
}
