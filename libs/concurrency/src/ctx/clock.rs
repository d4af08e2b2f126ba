//! Clocks owned by the context rather than read from global state.
//!
//! `now()` is monotonic and only meaningful to the local process.
//! `now_utc()` approximates wall time and may jump (NTP, manual changes);
//! use it only for timestamps that leave the process.
use crate::time;
use once_cell::sync::Lazy;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

// `Instant` has no deterministic constructor, so manual clocks start
// at a single process-wide reading of the real clock.
static MANUAL_MONO_START: Lazy<time::Instant> = Lazy::new(time::Instant::now);

const MANUAL_UTC_START: time::Utc = time::Utc(time::Duration::new(1_634_771_205, 718_020_931));

/// The system clock.
#[derive(Debug, Clone)]
pub struct RealClock;

impl RealClock {
    /// Monotonic time.
    pub fn now(&self) -> time::Instant {
        // tokio's clock respects `tokio::time::pause()`.
        tokio::time::Instant::now().into_std().into()
    }

    /// Wall clock time.
    pub fn now_utc(&self) -> time::Utc {
        use std::time::SystemTime as T;
        let since_epoch = |d: std::time::Duration| {
            time::Duration::try_from(d).unwrap_or(time::Duration::MAX)
        };
        time::Utc(match T::now().duration_since(T::UNIX_EPOCH) {
            Ok(d) => since_epoch(d),
            Err(err) => -since_epoch(err.duration()),
        })
    }
}

#[derive(Debug)]
struct ManualState {
    /// Watched by pending sleeps.
    mono: watch::Sender<time::Instant>,
    utc: time::Utc,
    advance_on_sleep: bool,
}

/// Clock which only moves when told to. Test use only.
#[derive(Debug, Clone)]
pub struct ManualClock(Arc<Mutex<ManualState>>);

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    /// Clock stopped at an arbitrary fixed point in time.
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(ManualState {
            mono: watch::Sender::new(*MANUAL_MONO_START),
            utc: MANUAL_UTC_START,
            advance_on_sleep: false,
        })))
    }

    fn state(&self) -> std::sync::MutexGuard<'_, ManualState> {
        // The state is never left inconsistent by a panicking holder.
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Monotonic time.
    pub fn now(&self) -> time::Instant {
        *self.state().mono.borrow()
    }

    /// Wall clock time.
    pub fn now_utc(&self) -> time::Utc {
        self.state().utc
    }

    /// Moves both clocks forward by `d`, waking the sleeps that became due.
    pub fn advance(&self, d: time::Duration) {
        assert!(d >= time::Duration::ZERO, "clock cannot go back");
        let mut this = self.state();
        this.mono.send_modify(|t| *t += d);
        this.utc += d;
    }

    /// Moves both clocks forward to `t`. Noop if `t` is in the past.
    pub fn advance_until(&self, t: time::Instant) {
        let d = t - self.now();
        if d > time::Duration::ZERO {
            self.advance(d);
        }
    }

    /// Makes every subsequent sleep complete immediately by advancing the clock.
    pub fn set_advance_on_sleep(&self) {
        self.state().advance_on_sleep = true;
    }
}

/// Clock of a context.
#[derive(Debug, Clone)]
pub enum Clock {
    /// System clock.
    Real(RealClock),
    /// Manually driven clock.
    Manual(ManualClock),
}

impl From<RealClock> for Clock {
    fn from(c: RealClock) -> Self {
        Self::Real(c)
    }
}

impl From<ManualClock> for Clock {
    fn from(c: ManualClock) -> Self {
        Self::Manual(c)
    }
}

impl Clock {
    /// Monotonic time.
    pub fn now(&self) -> time::Instant {
        match self {
            Self::Real(c) => c.now(),
            Self::Manual(c) => c.now(),
        }
    }

    /// Wall clock time.
    pub fn now_utc(&self) -> time::Utc {
        match self {
            Self::Real(c) => c.now_utc(),
            Self::Manual(c) => c.now_utc(),
        }
    }

    /// Cancel-safe.
    pub(crate) async fn sleep(&self, d: time::Duration) {
        self.sleep_until((self.now() + d).into()).await;
    }

    /// Cancel-safe. Never returns for an infinite deadline.
    pub(crate) async fn sleep_until(&self, t: time::Deadline) {
        let time::Deadline::Finite(t) = t else {
            return std::future::pending().await;
        };
        match self {
            Self::Real(_) => tokio::time::sleep_until(t.into_inner().into()).await,
            Self::Manual(manual) => {
                let mut mono = {
                    let state = manual.state();
                    if state.advance_on_sleep {
                        drop(state);
                        manual.advance_until(t);
                        return;
                    }
                    state.mono.subscribe()
                };
                // The sender lives as long as `manual`, so `wait_for` cannot fail.
                let _ = mono.wait_for(|now| *now >= t).await;
            }
        }
    }
}
