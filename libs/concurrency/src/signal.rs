//! One-shot broadcast signal. Backs context cancellation.
use crate::ctx;
use tokio::sync::watch;

/// Signal which can be raised once and observed by any number of tasks.
#[derive(Debug)]
pub struct Once(watch::Sender<bool>);

impl Default for Once {
    fn default() -> Self {
        Self::new()
    }
}

impl Once {
    /// Lowered signal.
    pub fn new() -> Self {
        Self(watch::Sender::new(false))
    }

    /// Raises the signal. Subsequent calls are noops.
    pub fn send(&self) {
        self.0.send_if_modified(|raised| !std::mem::replace(raised, true));
    }

    /// Cancel-safe.
    pub(crate) async fn cancel_safe_recv(&self) {
        let mut recv = self.0.subscribe();
        // `self` owns the sender, so the channel cannot close under us.
        let _ = recv.wait_for(|raised| *raised).await;
    }

    /// Awaits the signal.
    pub async fn recv(&self, ctx: &ctx::Ctx) -> ctx::OrCanceled<()> {
        ctx.wait(self.cancel_safe_recv()).await
    }

    /// Whether the signal has been raised.
    pub fn try_recv(&self) -> bool {
        *self.0.borrow()
    }
}
