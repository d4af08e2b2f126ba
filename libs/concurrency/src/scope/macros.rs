//! `run!` constructs a temporary `Scope` and immediately runs it, which ties
//! the `'env` lifetime of the scope to the `run!(..).await` expression.
//! A plain function taking a closure cannot express that binding.

/// Runs an async scope: `scope::run!(ctx, |ctx, s| async { .. }).await`.
#[macro_export]
macro_rules! run {
    ($ctx:expr, $f:expr) => {{
        $crate::scope::Scope::new($ctx).run($f)
    }};
}

pub use run;
