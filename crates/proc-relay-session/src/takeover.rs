//! Explicit takeover of the sending role between sessions.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

/// Command delivered to a session from outside its connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    /// Another session has taken over the sending role; stop publishing.
    StopPublishing,
}

/// Tracks which session currently owns the sending role.
///
/// A session claims the slot when it starts its publisher; the previous
/// claimant, if any, is told to stop publishing through its control channel.
/// At most one session per process transmits snapshots at a time.
#[derive(Clone, Default)]
pub struct SenderSlot {
    current: Arc<Mutex<Option<mpsc::UnboundedSender<SessionCommand>>>>,
}

impl SenderSlot {
    /// Create an unclaimed slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the sending role for the session reachable via `control`.
    pub fn claim(&self, control: mpsc::UnboundedSender<SessionCommand>) {
        let previous = self.current.lock().unwrap().replace(control.clone());
        if let Some(previous) = previous {
            if !previous.same_channel(&control) {
                let _ = previous.send(SessionCommand::StopPublishing);
            }
        }
    }
}
