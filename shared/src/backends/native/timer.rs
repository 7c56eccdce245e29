use std::time::Duration;

use super::Instant;

/// A Timer with a given duration after which it will enter into a "Ringing"
/// state. The Timer can be reset at an given time, or manually set to start
/// "Ringing" again.
pub struct Timer {
    duration: Duration,
    last: Option<Instant>,
}

impl Timer {
    /// Creates a new Timer with a given Duration, starting from `now`
    pub fn new(duration: Duration, now: &Instant) -> Self {
        Self {
            duration,
            last: Some(*now),
        }
    }

    /// Creates a new Timer which is already ringing
    pub fn new_ringing(duration: Duration) -> Self {
        Self {
            duration,
            last: None,
        }
    }

    /// Reset the Timer to stop ringing and wait till the duration elapses again
    pub fn reset(&mut self, now: &Instant) {
        self.last = Some(*now);
    }

    /// Gets whether or not the Timer is "Ringing" (i.e. the given duration has
    /// elapsed since the last "reset")
    pub fn ringing(&self, now: &Instant) -> bool {
        match &self.last {
            Some(last) => last.elapsed(now) >= self.duration,
            None => true,
        }
    }

    /// Manually causes the Timer to enter into a "Ringing" state
    pub fn ring_manual(&mut self) {
        self.last = None;
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn set_duration(&mut self, duration: Duration) {
        self.duration = duration;
    }
}
