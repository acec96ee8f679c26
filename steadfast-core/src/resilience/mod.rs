pub mod controller;
pub mod drainer;
pub mod phases;
pub mod types;
pub mod watchdog;

pub use controller::RetryEscalationController;
pub use drainer::{DrainEnd, InterruptDrainer};
pub use phases::{EscalationPhase, PhaseStep, RetryBudgets};
pub use types::{AttemptOutcome, AttemptRecord, AttemptStatus, ResolveOutcome, ResolveReport};
pub use watchdog::InactivityWatchdog;
