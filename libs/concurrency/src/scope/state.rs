//! Lifecycle of a scope, detached from the `'env` lifetime of `Scope`.
//!
//! The scope is canceled (its context is canceled) once its `CancelGuard` is
//! dropped, i.e. once all main tasks are done, or as soon as any task fails.
//! The scope is terminated once its `TerminateGuard` is dropped, i.e. once all
//! tasks are done. `CancelGuard` keeps `TerminateGuard` alive, so a terminated
//! scope is always canceled as well.
use crate::{ctx, signal};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Failure of a scope task.
pub(super) enum OrPanic<E> {
    Err(E),
    Panic,
}

pub(super) struct State<E> {
    /// Context shared by all tasks of the scope.
    ctx: ctx::Ctx,
    /// First failure of a task.
    err: Mutex<Option<OrPanic<E>>>,
    /// Raised once the last task is done.
    terminated: signal::Once,
}

impl<E> State<E> {
    fn err(&self) -> MutexGuard<'_, Option<OrPanic<E>>> {
        self.err.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Constructs the state of a scope running under `ctx`.
    pub(super) fn make(ctx: ctx::Ctx) -> CancelGuard<E> {
        CancelGuard(Arc::new(TerminateGuard(Arc::new(State {
            ctx,
            err: Mutex::new(None),
            terminated: signal::Once::new(),
        }))))
    }

    /// Awaits termination of the scope.
    pub(super) async fn terminated(&self) {
        self.terminated.cancel_safe_recv().await;
    }

    /// Takes the failure out of a terminated scope.
    pub(super) fn take_err(&self) -> Option<OrPanic<E>> {
        debug_assert!(self.terminated.try_recv());
        self.err().take()
    }
}

/// Terminates the scope when dropped. Held by every task.
pub(super) struct TerminateGuard<E>(Arc<State<E>>);

impl<E> Drop for TerminateGuard<E> {
    fn drop(&mut self) {
        self.0.terminated.send();
    }
}

impl<E> TerminateGuard<E> {
    pub(super) fn state(&self) -> &Arc<State<E>> {
        &self.0
    }

    /// Records a failure and cancels the scope.
    /// A panic overrides an error; an error never overrides an earlier failure.
    pub(super) fn set_err(&self, err: OrPanic<E>) {
        let mut m = self.0.err();
        if let (Some(OrPanic::Panic), _) | (Some(OrPanic::Err(_)), OrPanic::Err(_)) = (&*m, &err) {
            return;
        }
        self.0.ctx.cancel();
        *m = Some(err);
    }
}

/// Cancels the scope when dropped. Held by every main task.
pub(super) struct CancelGuard<E>(Arc<TerminateGuard<E>>);

impl<E> Drop for CancelGuard<E> {
    fn drop(&mut self) {
        self.0.state().ctx.cancel();
    }
}

impl<E> CancelGuard<E> {
    pub(super) fn terminate_guard(&self) -> &Arc<TerminateGuard<E>> {
        &self.0
    }
}
