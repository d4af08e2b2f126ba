//! Guard for futures which must not be dropped before completion.
//!
//! Scope futures hand out references with a lifetime the compiler cannot
//! check across `tokio::spawn`. Dropping such a future halfway would leave the
//! spawned tasks with dangling references, so the process is ABORTED instead,
//! regardless of the `panic` strategy it was compiled with.

/// Aborts the process when dropped. Call [`Guard::defuse`] once the guarded
/// future has completed.
pub(super) struct Guard;

impl Guard {
    /// Disarms the guard.
    pub(super) fn defuse(self) {
        std::mem::forget(self);
    }
}

impl Drop for Guard {
    fn drop(&mut self) {
        eprintln!("dropped a non-abortable future before completion");
        eprintln!("backtrace:\n{}", std::backtrace::Backtrace::force_capture());
        std::process::abort();
    }
}
