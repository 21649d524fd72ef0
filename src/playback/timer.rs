use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;

/// Handle to a scheduled tick, held by the player state
///
/// Cancelling or dropping the handle wakes the waiting side immediately.
#[derive(Debug)]
pub struct PendingTick {
    cancel: oneshot::Sender<()>,
}

impl PendingTick {
    pub fn cancel(self) {
        let _ = self.cancel.send(());
    }
}

/// Waiting side of a scheduled tick, held by the control loop
#[derive(Debug)]
pub struct TickWait {
    cancelled: oneshot::Receiver<()>,
    due: Instant,
}

impl TickWait {
    /// Resolves `true` once the delay has elapsed, `false` if the tick was cancelled first
    pub async fn fired(self) -> bool {
        tokio::select! {
            _ = tokio::time::sleep_until(self.due) => true,
            _ = self.cancelled => false,
        }
    }
}

/// Schedule one tick `delay` from now
pub fn schedule(delay: Duration) -> (PendingTick, TickWait) {
    let (tx, rx) = oneshot::channel();
    let due = Instant::now() + delay;
    (
        PendingTick { cancel: tx },
        TickWait { cancelled: rx, due },
    )
}
