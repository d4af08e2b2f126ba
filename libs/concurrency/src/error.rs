//! `anyhow::Context` for error types that carry an `anyhow::Error` inside.
use std::fmt::Display;

/// Adds context to the `anyhow` part of a structured error, keeping the
/// other variants (e.g. cancellation) intact.
///
/// Prefer `wrap()` over `anyhow::Context::context()` on such types:
/// the latter would erase the variant.
pub trait Wrap: Sized {
    /// Appends context `c`.
    fn wrap<C: Display + Send + Sync + 'static>(self, c: C) -> Self {
        self.with_wrap(|| c)
    }
    /// Appends lazily computed context.
    fn with_wrap<C: Display + Send + Sync + 'static, F: FnOnce() -> C>(self, f: F) -> Self;
}

impl<T, E: Wrap> Wrap for Result<T, E> {
    fn with_wrap<C: Display + Send + Sync + 'static, F: FnOnce() -> C>(self, f: F) -> Self {
        self.map_err(|err| err.with_wrap(f))
    }
}
