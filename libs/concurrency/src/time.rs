//! Time types with a signed `Duration`, shared by clocks and configs.

/// Signed duration.
pub type Duration = time::Duration;

/// Monotonic time point.
pub type Instant = time::Instant;

/// Nanosecond-precision UTC timestamp, as an offset from the unix epoch.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Utc(pub(crate) Duration);

impl std::fmt::Debug for Utc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        (std::time::SystemTime::UNIX_EPOCH + self.0).fmt(f)
    }
}

/// Start of the unix epoch.
pub const UNIX_EPOCH: Utc = Utc(Duration::ZERO);

impl Utc {
    /// Milliseconds since the unix epoch, truncated.
    pub fn unix_millis(&self) -> i128 {
        self.0.whole_milliseconds()
    }
}

/// Optional deadline; `Finite(_) < Infinite`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Deadline {
    /// Finite deadline.
    Finite(Instant),
    /// No deadline.
    Infinite,
}

impl From<Instant> for Deadline {
    fn from(t: Instant) -> Self {
        Self::Finite(t)
    }
}

impl std::ops::Add<Duration> for Utc {
    type Output = Self;
    fn add(self, d: Duration) -> Self {
        Self(self.0 + d)
    }
}

impl std::ops::AddAssign<Duration> for Utc {
    fn add_assign(&mut self, d: Duration) {
        self.0 += d;
    }
}

impl std::ops::Sub<Utc> for Utc {
    type Output = Duration;
    fn sub(self, b: Self) -> Duration {
        self.0 - b.0
    }
}
