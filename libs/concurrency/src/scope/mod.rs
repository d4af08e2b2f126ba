//! Structured concurrency with cancellation, in the spirit of golang's errgroup
//! and `std::thread::scope`.
//!
//! A scope is a concurrent computation bounded by the lifetime `'env` of the
//! `run!` call which created it. Tasks run on the tokio thread pool and may
//! borrow anything that outlives the call. `run!` completes only once every
//! task of the scope has completed.
//!
//! The first task to fail cancels the scope's context and its error becomes
//! the result of `run!`; later errors are dropped. A panic of any task is
//! resumed by `run!`, again only after all tasks have completed. If every task
//! succeeds, `run!` returns the result of the root task.
//!
//! Main tasks (`spawn`) do the work of the scope, background tasks (`spawn_bg`)
//! serve them. See `task` for the difference.
//!
//! Don't pass `&Scope` around: a function which needs concurrency should run
//! its own scope.
use crate::{ctx, time};
use std::{
    future::Future,
    marker::PhantomData,
    pin::Pin,
    sync::{Arc, Weak},
};
use tracing::Instrument as _;

mod macros;
mod must_complete;
mod state;
mod task;
#[cfg(test)]
mod tests;

pub use macros::*;
use state::{CancelGuard, OrPanic, State, TerminateGuard};
use task::{Task, Terminated};

/// Handle to the result of a scope task.
pub struct JoinHandle<'env, T>(
    tokio::task::JoinHandle<Result<T, Terminated>>,
    PhantomData<fn(&'env ()) -> &'env ()>,
);

type BoxFuture<'env, T> = Pin<Box<dyn 'env + Send + Future<Output = T>>>;

/// Spawns `f` on the tokio thread pool.
///
/// # Safety
/// The caller must make sure that `f` completes within `'env`.
unsafe fn spawn<'env, T: 'static + Send>(
    f: BoxFuture<'env, Result<T, Terminated>>,
) -> JoinHandle<'env, T> {
    let f = std::mem::transmute::<BoxFuture<'env, _>, BoxFuture<'static, _>>(f);
    JoinHandle(tokio::task::spawn(f.in_current_span()), PhantomData)
}

impl<T> JoinHandle<'_, T> {
    /// Awaits the value returned by the task.
    ///
    /// If the task failed, the scope is being canceled; the call then waits for
    /// `ctx` (a descendant of the scope's context) to be canceled as well and
    /// returns `Canceled`, so that the failure is observed only once, as the
    /// result of `run!`.
    pub async fn join(self, ctx: &ctx::Ctx) -> ctx::OrCanceled<T> {
        if let Ok(Ok(v)) = ctx.wait(self.0).await? {
            return Ok(v);
        }
        ctx.canceled().await;
        Err(ctx::Canceled)
    }

    /// Awaits the task regardless of cancellation.
    async fn join_raw(self) -> ctx::OrCanceled<T> {
        match self.0.await {
            Ok(Ok(v)) => Ok(v),
            _ => Err(ctx::Canceled),
        }
    }
}

/// Concurrent computation bounded by the lifetime `'env`.
/// Constructed only by the `run!` macro.
///
/// The guards are weak: `run` holds the strong references until the root task
/// is spawned, and from then on the tasks do. So `cancel_guard` can be
/// upgraded while any main task runs, and `terminate_guard` while any task runs.
pub struct Scope<'env, E> {
    ctx: ctx::Ctx,
    cancel_guard: Weak<CancelGuard<E>>,
    terminate_guard: Weak<TerminateGuard<E>>,
    /// Makes the scope invariant in `'env`.
    _env: PhantomData<fn(&'env ()) -> &'env ()>,
}

impl<'env, E: 'static + Send> Scope<'env, E> {
    /// Main task, or a background one if all main tasks are done already
    /// (possible when called from a background task).
    fn main_task(&self) -> Task<E> {
        match self.cancel_guard.upgrade() {
            Some(guard) => Task::Main(guard),
            None => self.bg_task(),
        }
    }

    fn bg_task(&self) -> Task<E> {
        // `&Scope` is reachable only from within the scope's tasks, which keep
        // the terminate guard alive.
        Task::Background(
            self.terminate_guard
                .upgrade()
                .expect("spawned from outside of the scope"),
        )
    }

    /// Spawns a main task.
    pub fn spawn<T: 'static + Send>(
        &self,
        f: impl 'env + Send + Future<Output = Result<T, E>>,
    ) -> JoinHandle<'env, T> {
        // SAFETY: `run` does not complete before every task is done.
        unsafe { spawn(Box::pin(self.main_task().run(f))) }
    }

    /// Spawns a background task.
    pub fn spawn_bg<T: 'static + Send>(
        &self,
        f: impl 'env + Send + Future<Output = Result<T, E>>,
    ) -> JoinHandle<'env, T> {
        // SAFETY: `run` does not complete before every task is done.
        unsafe { spawn(Box::pin(self.bg_task().run(f))) }
    }

    /// Cancels the scope's context without failing the scope.
    pub fn cancel(&self) {
        self.ctx.cancel();
    }

    /// Used by `run!` only.
    #[doc(hidden)]
    pub fn new(parent: &ctx::Ctx) -> Self {
        Self {
            ctx: parent.child(time::Deadline::Infinite),
            cancel_guard: Weak::new(),
            terminate_guard: Weak::new(),
            _env: PhantomData,
        }
    }

    /// Used by `run!` only. `self` is the temporary constructed by the macro,
    /// which binds `'env` to the duration of the `run!(..).await` expression.
    ///
    /// Tasks reference data which lives as long as this future, which is why
    /// the future aborts the process if dropped before every task is done.
    /// Forgetting it before the first poll is harmless, since nothing has been
    /// spawned yet; after the first poll it is pinned, hence dropped in place.
    #[doc(hidden)]
    pub async fn run<T, F, Fut>(&'env mut self, root_task: F) -> Result<T, E>
    where
        T: 'static + Send,
        F: 'env + FnOnce(&'env ctx::Ctx, &'env Self) -> Fut,
        Fut: 'env + Send + Future<Output = Result<T, E>>,
    {
        let must_complete = must_complete::Guard;
        let guard = Arc::new(State::make(self.ctx.clone()));
        self.cancel_guard = Arc::downgrade(&guard);
        self.terminate_guard = Arc::downgrade(guard.terminate_guard());
        let state = guard.terminate_guard().state().clone();
        // The root task runs on the pool like any other, so that a panic in it
        // does not skip waiting for the rest of the scope.
        let this: &'env Self = self;
        let root = this.spawn(root_task(&this.ctx, this));
        drop(guard);
        let root = root.join_raw().await;
        state.terminated().await;
        // No await below this line.
        must_complete.defuse();

        match (state.take_err(), root) {
            (None, Ok(v)) => Ok(v),
            (None, Err(_)) => unreachable!("root task completed without a result"),
            (Some(OrPanic::Err(err)), _) => Err(err),
            (Some(OrPanic::Panic), _) => {
                panic!("one of the tasks panicked, look for a stack trace above")
            }
        }
    }
}

/// Runs a blocking closure on the blocking thread pool and awaits its result.
/// A panic in `f` is resumed in the caller.
/// Aborts the process if dropped before `f` returns.
pub async fn wait_blocking<'a, T: 'static + Send>(f: impl 'a + Send + FnOnce() -> T) -> T {
    type BoxBlocking<'a, T> = Box<dyn 'a + Send + FnOnce() -> T>;
    let must_complete = must_complete::Guard;
    let f: BoxBlocking<'a, T> = Box::new(f);
    // SAFETY: `f` returns before this future completes, and the future aborts
    // the process if dropped earlier.
    let f = unsafe { std::mem::transmute::<BoxBlocking<'a, T>, BoxBlocking<'static, T>>(f) };
    let span = tracing::Span::current();
    let res = tokio::task::spawn_blocking(move || span.in_scope(f)).await;
    must_complete.defuse();
    match res {
        Ok(v) => v,
        Err(err) => std::panic::resume_unwind(err.into_panic()),
    }
}
