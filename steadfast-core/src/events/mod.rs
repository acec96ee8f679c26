pub mod types;

pub use types::Event;

use tokio::sync::mpsc;

/// Non-blocking publish; a full or closed channel drops the notice.
pub(crate) fn emit(events: &mpsc::Sender<Event>, event: Event) {
    if let Err(err) = events.try_send(event) {
        tracing::trace!(error = %err, "presentation channel rejected event");
    }
}
