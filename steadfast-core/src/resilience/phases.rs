use crate::config::schema::ResilienceConfig;

const CONTINUE_GATHERED: &str = "The previous request stalled — some tool calls may have hung. \
Do NOT retry any web fetches. Instead, proceed to complete ALL remaining \
deliverables RIGHT NOW using the information you have already gathered \
combined with your own knowledge. You MUST create every file and every \
code example defined in the output format — never leave files missing or \
directories empty. Use your own knowledge to fill any gaps from failed \
research. Mark those sections as 'based on general knowledge'.";

const CONTINUE_NO_WEB: &str = "You are still stalling. Do NOT use WebFetch or WebSearch. Focus on \
writing all remaining output files using your own knowledge. Every file \
and code example from the output format must be created with real content.";

const CONTINUE_WRITE_ONLY: &str = "Stop all research. Use only the Write tool to create any remaining \
deliverable files. Fill them with useful content from your own knowledge. \
Do not leave anything empty or missing.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EscalationPhase {
    Original,
    Continue1,
    Continue2,
    Continue3,
    LastResort,
}

impl EscalationPhase {
    pub const ORDER: [Self; 5] = [
        Self::Original,
        Self::Continue1,
        Self::Continue2,
        Self::Continue3,
        Self::LastResort,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Continue1 => "continue-1",
            Self::Continue2 => "continue-2",
            Self::Continue3 => "continue-3",
            Self::LastResort => "last-resort",
        }
    }

    /// Position among the continue phases, counting from 1.
    pub fn continue_index(self) -> Option<usize> {
        match self {
            Self::Continue1 => Some(1),
            Self::Continue2 => Some(2),
            Self::Continue3 => Some(3),
            _ => None,
        }
    }
}

impl std::fmt::Display for EscalationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Attempts allowed per phase. The last resort always gets exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudgets {
    pub original: usize,
    pub continue_1: usize,
    pub continue_2: usize,
    pub continue_3: usize,
}

impl RetryBudgets {
    pub fn uniform(budget: usize) -> Self {
        Self {
            original: budget,
            continue_1: budget,
            continue_2: budget,
            continue_3: budget,
        }
    }

    pub fn from_config(config: &ResilienceConfig) -> Self {
        let base = config.retry_budget;
        let overrides = &config.phase_budgets;
        Self {
            original: overrides.original.unwrap_or(base),
            continue_1: overrides.continue_1.unwrap_or(base),
            continue_2: overrides.continue_2.unwrap_or(base),
            continue_3: overrides.continue_3.unwrap_or(base),
        }
    }

    pub fn for_phase(&self, phase: EscalationPhase) -> usize {
        let budget = match phase {
            EscalationPhase::Original => self.original,
            EscalationPhase::Continue1 => self.continue_1,
            EscalationPhase::Continue2 => self.continue_2,
            EscalationPhase::Continue3 => self.continue_3,
            EscalationPhase::LastResort => 1,
        };
        budget.max(1)
    }

    /// Upper bound on queries a single request can send.
    pub fn max_attempts(&self) -> usize {
        EscalationPhase::ORDER
            .iter()
            .map(|phase| self.for_phase(*phase))
            .sum()
    }
}

impl Default for RetryBudgets {
    fn default() -> Self {
        Self::uniform(3)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseStep {
    pub phase: EscalationPhase,
    pub message: String,
    pub budget: usize,
}

pub fn phase_message(phase: EscalationPhase, user_request: &str) -> String {
    match phase {
        EscalationPhase::Original => user_request.to_owned(),
        EscalationPhase::Continue1 => CONTINUE_GATHERED.to_owned(),
        EscalationPhase::Continue2 => CONTINUE_NO_WEB.to_owned(),
        EscalationPhase::Continue3 => CONTINUE_WRITE_ONLY.to_owned(),
        EscalationPhase::LastResort => format!(
            "All web research has failed. Using ONLY the Write tool and your own \
built-in knowledge, please create ALL the output files required for \
this request. Write complete, useful content — not placeholders. \
Mark sections as 'based on general knowledge' where research would \
have provided better data. Here is the original request:\n\n{user_request}"
        ),
    }
}

/// The fixed escalation table for one request, in the order it is walked.
pub fn escalation_plan(user_request: &str, budgets: &RetryBudgets) -> Vec<PhaseStep> {
    EscalationPhase::ORDER
        .iter()
        .map(|phase| PhaseStep {
            phase: *phase,
            message: phase_message(*phase, user_request),
            budget: budgets.for_phase(*phase),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{escalation_plan, EscalationPhase, RetryBudgets};
    use crate::config::schema::{PhaseBudgets, ResilienceConfig};

    #[test]
    fn plan_walks_every_phase_in_order() {
        let plan = escalation_plan("write a guide to tokio", &RetryBudgets::default());
        let phases: Vec<_> = plan.iter().map(|step| step.phase).collect();
        assert_eq!(phases, EscalationPhase::ORDER.to_vec());

        let budgets: Vec<_> = plan.iter().map(|step| step.budget).collect();
        assert_eq!(budgets, vec![3, 3, 3, 3, 1]);
    }

    #[test]
    fn request_text_only_reappears_in_last_resort() {
        let request = "Research async Rust patterns and write examples";
        let plan = escalation_plan(request, &RetryBudgets::default());

        assert_eq!(plan[0].message, request);
        for step in &plan[1..4] {
            assert!(!step.message.contains(request));
        }
        assert!(plan[4].message.ends_with(&format!("\n\n{request}")));
        assert!(plan[4].message.contains("based on general knowledge"));
    }

    #[test]
    fn per_phase_overrides_take_precedence() {
        let config = ResilienceConfig {
            retry_budget: 2,
            phase_budgets: PhaseBudgets {
                continue_3: Some(1),
                original: Some(4),
                ..PhaseBudgets::default()
            },
            ..ResilienceConfig::default()
        };

        let budgets = RetryBudgets::from_config(&config);
        assert_eq!(budgets.for_phase(EscalationPhase::Original), 4);
        assert_eq!(budgets.for_phase(EscalationPhase::Continue1), 2);
        assert_eq!(budgets.for_phase(EscalationPhase::Continue3), 1);
        assert_eq!(budgets.for_phase(EscalationPhase::LastResort), 1);
        assert_eq!(budgets.max_attempts(), 4 + 2 + 2 + 1 + 1);
        assert_eq!(RetryBudgets::default().max_attempts(), 13);
    }
}
