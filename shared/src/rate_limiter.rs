use std::{collections::VecDeque, time::Duration};

use crate::backends::Instant;

const WINDOW: Duration = Duration::from_secs(1);

/// Token bucket whose tokens return exactly one second after being spent, so
/// any one second window sees at most `rate` grants.
pub struct RateLimiter {
    rate: u32,
    spent: VecDeque<Instant>,
}

impl RateLimiter {
    pub fn new(rate: u32) -> Self {
        Self {
            rate,
            spent: VecDeque::new(),
        }
    }

    pub fn rate(&self) -> u32 {
        self.rate
    }

    pub fn set_rate(&mut self, rate: u32) {
        self.rate = rate;
    }

    pub fn available(&mut self, now: &Instant) -> u32 {
        self.expire(now);
        self.rate.saturating_sub(self.spent.len() as u32)
    }

    pub fn try_acquire(&mut self, now: &Instant) -> bool {
        if self.available(now) == 0 {
            return false;
        }
        self.spent.push_back(*now);
        true
    }

    fn expire(&mut self, now: &Instant) {
        while let Some(front) = self.spent.front() {
            if front.elapsed(now) < WINDOW {
                break;
            }
            self.spent.pop_front();
        }
    }
}
