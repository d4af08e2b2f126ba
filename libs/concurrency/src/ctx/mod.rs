//! Cancellation context passed explicitly down the call stack.
//!
//! Every blocking call of a task is expected to be raced against the
//! cancellation of its `Ctx`: instead of "await the next message" a task
//! awaits "the next message OR cancellation". A function must not outlive
//! the context it was given, and it cannot extend it.
//!
//! Besides the cancellation signal, the context carries the clock and the
//! source of randomness, so that tests can substitute deterministic ones.
use crate::{signal, time};
use std::{fmt, future::Future, sync::Arc};

pub mod channel;
mod clock;
mod rng;
mod testonly;

pub use clock::*;
pub use testonly::*;

/// Handle to a node of the context tree.
///
/// A child context is canceled when its parent gets canceled, when its
/// deadline passes, or when it is canceled explicitly. The invariant
/// `parent.deadline <= child.deadline` never holds the other way around:
/// the child deadline is clamped to the parent's.
pub struct Ctx(Arc<Inner>);

struct Inner {
    clock: Clock,
    rng_provider: rng::Provider,
    canceled: Arc<signal::Once>,
    deadline: time::Deadline,
    /// Keeps the ancestors alive as long as this context is alive.
    _parent: Option<Arc<Inner>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        // Releases the propagation task spawned in `Ctx::child`.
        self.canceled.send();
    }
}

/// Returned by a blocking operation interrupted by cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("canceled")]
pub struct Canceled;

/// Result of an operation which may only fail due to cancellation.
pub type OrCanceled<T> = std::result::Result<T, Canceled>;

/// Constructs the root context of a binary.
/// Call it once, at the start of `main()`.
pub fn root() -> Ctx {
    Ctx(Arc::new(Inner {
        clock: RealClock.into(),
        rng_provider: rng::Provider::real(),
        canceled: Arc::new(signal::Once::new()),
        deadline: time::Deadline::Infinite,
        _parent: None,
    }))
}

impl fmt::Debug for Ctx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ctx")
            .field("deadline", &self.0.deadline)
            .field("active", &self.is_active())
            .finish()
    }
}

impl Ctx {
    /// `Ctx` is deliberately not `Clone` outside of this crate: tasks
    /// get their contexts from the scope they run in.
    pub(crate) fn clone(&self) -> Self {
        Self(self.0.clone())
    }

    pub(crate) fn child(&self, deadline: time::Deadline) -> Self {
        let clock = self.0.clock.clone();
        let deadline = self.0.deadline.min(deadline);
        let parent_canceled = self.0.canceled.clone();
        let child_canceled = Arc::new(signal::Once::new());
        let child = Self(Arc::new(Inner {
            clock: clock.clone(),
            rng_provider: self.0.rng_provider.split(),
            canceled: child_canceled.clone(),
            deadline,
            _parent: Some(self.0.clone()),
        }));
        // The propagation task holds only the two signals, never the contexts,
        // so that dropping the child (which sends its signal) always ends it.
        tokio::spawn(async move {
            tokio::select! {
                () = clock.sleep_until(deadline) => child_canceled.send(),
                () = parent_canceled.cancel_safe_recv() => child_canceled.send(),
                () = child_canceled.cancel_safe_recv() => {}
            }
        });
        child
    }

    /// Cancels this context and, transitively, all its descendants.
    pub(crate) fn cancel(&self) {
        self.0.canceled.send();
    }

    /// Awaits cancellation of this context.
    pub fn canceled(&self) -> impl '_ + Future<Output = ()> {
        self.0.canceled.cancel_safe_recv()
    }

    /// Whether the context has not been canceled yet.
    pub fn is_active(&self) -> bool {
        !self.0.canceled.try_recv()
    }

    /// Time at which this context gets canceled at the latest.
    pub fn deadline(&self) -> time::Deadline {
        self.0.deadline
    }

    /// Races a cancel-safe future against the cancellation of the context.
    pub fn wait<'a, F: 'a + Future>(
        &'a self,
        fut: F,
    ) -> impl 'a + Future<Output = OrCanceled<F::Output>> {
        async move {
            tokio::select! {
                output = fut => Ok(output),
                () = self.0.canceled.cancel_safe_recv() => Err(Canceled),
            }
        }
    }

    /// Child context which gets canceled after `d`.
    pub fn with_timeout(&self, d: time::Duration) -> Self {
        self.child((self.now() + d).into())
    }

    /// Monotonic time.
    pub fn now(&self) -> time::Instant {
        self.0.clock.now()
    }

    /// Wall clock time.
    pub fn now_utc(&self) -> time::Utc {
        self.0.clock.now_utc()
    }

    /// Sleeps for `d`, unless canceled earlier.
    pub fn sleep(&self, d: time::Duration) -> impl '_ + Future<Output = OrCanceled<()>> {
        self.wait(self.0.clock.sleep(d))
    }

    /// Sleeps until `t`, unless canceled earlier.
    pub fn sleep_until(&self, t: time::Instant) -> impl '_ + Future<Output = OrCanceled<()>> {
        self.wait(self.0.clock.sleep_until(t.into()))
    }

    /// Fresh RNG. In production it is seeded from OS entropy, in tests
    /// it is derived deterministically from the position in the context tree.
    /// Don't keep it around; call `rng()` again when more entropy is needed.
    pub fn rng(&self) -> rand::rngs::StdRng {
        self.0.rng_provider.rng()
    }
}

/// `anyhow::Error` extended with an explicit cancellation variant.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Context got canceled before the call completed.
    #[error(transparent)]
    Canceled(#[from] Canceled),
    /// Any other failure.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Result with [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl crate::error::Wrap for Error {
    fn with_wrap<C: fmt::Display + Send + Sync + 'static, F: FnOnce() -> C>(self, f: F) -> Self {
        match self {
            Error::Internal(err) => Error::Internal(err.context(f())),
            err => err,
        }
    }
}
