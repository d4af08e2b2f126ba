//! Helpers for concurrent tests.
use std::{future::Future, io::IsTerminal as _};

/// Installs the test log subscriber (filtered by `RUST_LOG`) and, when the
/// test runs under nextest in process-per-test mode, turns panics into aborts
/// so that a panic in a spawned task fails the test immediately.
pub fn abort_on_panic() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .with_ansi(std::env::var("NO_COLOR").is_err() && std::io::stdout().is_terminal())
        .with_line_number(true)
        .try_init();

    let nextest = std::env::var("NEXTEST").is_ok_and(|v| v == "1");
    let per_process =
        std::env::var("NEXTEST_EXECUTION_MODE").is_ok_and(|v| v == "process-per-test");
    if !(nextest && per_process) {
        return;
    }
    let hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        hook(info);
        std::process::abort();
    }));
}

/// Fails the test when dropped after the timeout passed.
#[must_use]
pub struct TimeoutGuard(#[allow(dead_code)] std::sync::mpsc::Sender<()>);

/// Panics if the returned guard is not dropped within `timeout` of real time.
/// Runs on a plain thread, so a stalled runtime cannot delay it.
pub fn set_timeout(timeout: time::Duration) -> TimeoutGuard {
    use std::sync::mpsc;
    let (send, recv) = mpsc::channel();
    let timeout: std::time::Duration = timeout.try_into().unwrap_or(std::time::Duration::MAX);
    std::thread::spawn(move || {
        if let Err(mpsc::RecvTimeoutError::Timeout) = recv.recv_timeout(timeout) {
            panic!("TIMEOUT");
        }
    });
    TimeoutGuard(send)
}

/// Runs `test` on a single-threaded and on a multi-threaded runtime.
pub fn with_runtimes<Fut: Future>(test: impl Fn() -> Fut) {
    for (name, mut b) in [
        ("current_thread", tokio::runtime::Builder::new_current_thread()),
        ("multi_thread", tokio::runtime::Builder::new_multi_thread()),
    ] {
        tracing::info!("tokio runtime: {name}");
        let r = b.enable_all().build().expect("failed to build runtime");
        r.block_on(test());
    }
}
