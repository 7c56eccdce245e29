use std::time::Duration;

/// Represents a specific moment in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Instant {
    inner: std::time::Instant,
}

impl Instant {
    /// Creates an Instant from the moment the method is called
    pub fn now() -> Self {
        Self {
            inner: std::time::Instant::now(),
        }
    }

    /// Returns time elapsed since the Instant, as seen from `now`
    pub fn elapsed(&self, now: &Self) -> Duration {
        now.inner.saturating_duration_since(self.inner)
    }

    pub fn until(&self, later: &Self) -> Duration {
        later.elapsed(self)
    }

    pub fn add_millis(&mut self, millis: u32) {
        self.inner += Duration::from_millis(millis.into());
    }

    pub fn add_duration(&mut self, duration: Duration) {
        self.inner += duration;
    }

    pub fn plus(&self, duration: Duration) -> Self {
        Self {
            inner: self.inner + duration,
        }
    }

    /// Returns true if self is strictly later than `other`
    pub fn is_after(&self, other: &Self) -> bool {
        self.inner > other.inner
    }
}
