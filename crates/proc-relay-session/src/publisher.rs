//! Periodic snapshot publisher.

use std::sync::Arc;
use std::time::Duration;

use proc_relay_core::{Message, ProcessSource};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Interval between snapshots once a session is in the sending role.
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(5);

/// Cancellable periodic task that streams process snapshots through a
/// session's outbound channel.
///
/// The first snapshot is sent immediately on start. The task exits on its
/// own once the outbound channel closes; [`Publisher::stop`] cancels future
/// ticks and is idempotent.
pub struct Publisher {
    handle: Option<JoinHandle<()>>,
}

impl Publisher {
    /// Start publishing snapshots from `source` every `period`.
    #[must_use]
    pub fn start<P>(
        source: Arc<P>,
        outbound: mpsc::UnboundedSender<Message>,
        period: Duration,
    ) -> Self
    where
        P: ProcessSource + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let tasks = source.snapshot();
                let count = tasks.len();
                if outbound.send(Message::Tasks { tasks }).is_err() {
                    tracing::debug!("outbound channel closed, publisher exiting");
                    break;
                }
                tracing::debug!(count, "sent tasks");
            }
        });
        Self {
            handle: Some(handle),
        }
    }

    /// Cancel future ticks. Safe to call more than once.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for Publisher {
    fn drop(&mut self) {
        self.stop();
    }
}
