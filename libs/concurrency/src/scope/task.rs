//! A routine spawned within a scope.
//!
//! * Main tasks do the work of the scope. Once all of them have returned, the
//!   scope is canceled, even if they all succeeded.
//! * Background tasks serve the main tasks (request handlers, periodic jobs).
//!   They must return promptly once the scope is canceled; an error returned
//!   by a background task after the main tasks are done still fails the scope.
//!
//! A task that returns an error cancels the scope and hands the error over to
//! the scope state. A task that panics is recorded as a panic, which `run!`
//! resumes once every task is done.
use super::state::{CancelGuard, OrPanic, TerminateGuard};
use std::{future::Future, sync::Arc};

/// Returned by a task instead of its error; the error itself
/// becomes the result of `scope::run!`.
#[derive(Debug, thiserror::Error)]
#[error("task terminated with an error")]
pub(super) struct Terminated;

pub(super) enum Task<E> {
    Main(Arc<CancelGuard<E>>),
    Background(Arc<TerminateGuard<E>>),
}

impl<E> Task<E> {
    fn guard(&self) -> &TerminateGuard<E> {
        match self {
            Self::Main(g) => g.terminate_guard(),
            Self::Background(g) => g,
        }
    }
}

/// Holds the task while its routine runs. Dropping it armed means that the
/// routine never completed: the runtime dropped the task after a panic.
struct Armed<E>(Option<Task<E>>);

impl<E> Drop for Armed<E> {
    fn drop(&mut self) {
        if let Some(task) = self.0.take() {
            task.guard().set_err(OrPanic::Panic);
        }
    }
}

impl<E> Task<E> {
    /// Runs `f` as this task. Executed on the shared thread pool.
    pub(super) async fn run<T>(
        self,
        f: impl Future<Output = Result<T, E>>,
    ) -> Result<T, Terminated> {
        let mut armed = Armed(Some(self));
        let res = f.await;
        let Some(task) = armed.0.take() else {
            unreachable!("task disarmed twice")
        };
        match res {
            Ok(v) => Ok(v),
            Err(err) => {
                task.guard().set_err(OrPanic::Err(err));
                Err(Terminated)
            }
        }
    }
}
