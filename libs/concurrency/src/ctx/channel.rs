//! Context-aware unbounded mpsc channel on top of `tokio::sync::mpsc`.
//!
//! Disconnection is not observable: `send` to a dropped receiver is a noop
//! and `recv` on a channel without senders blocks until cancellation.
//! Tasks are expected to terminate on context cancellation, not on
//! channel closure.
use crate::ctx;
use std::fmt;
use tokio::sync::mpsc;

/// Sending half.
pub struct UnboundedSender<T>(mpsc::UnboundedSender<T>);

/// Receiving half.
pub struct UnboundedReceiver<T>(mpsc::UnboundedReceiver<T>);

// Clone without requiring `T: Clone`.
impl<T> Clone for UnboundedSender<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> fmt::Debug for UnboundedSender<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnboundedSender").finish_non_exhaustive()
    }
}

impl<T> fmt::Debug for UnboundedReceiver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnboundedReceiver").finish_non_exhaustive()
    }
}

/// Constructs a new unbounded channel.
pub fn unbounded<T>() -> (UnboundedSender<T>, UnboundedReceiver<T>) {
    let (send, recv) = mpsc::unbounded_channel();
    (UnboundedSender(send), UnboundedReceiver(recv))
}

impl<T> UnboundedSender<T> {
    /// Enqueues a message. Never blocks.
    pub fn send(&self, v: T) {
        let _ = self.0.send(v);
    }
}

impl<T> UnboundedReceiver<T> {
    /// Awaits the next message.
    pub async fn recv(&mut self, ctx: &ctx::Ctx) -> ctx::OrCanceled<T> {
        ctx.wait(async {
            match self.0.recv().await {
                Some(v) => v,
                None => std::future::pending().await,
            }
        })
        .await
    }

    /// Pops a message iff one is ready.
    pub fn try_recv(&mut self) -> Option<T> {
        self.0.try_recv().ok()
    }
}
