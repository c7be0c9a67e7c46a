//! Time sources for cache expiry.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::lock::mutex_lock;

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to. Lets expiry be exercised without sleeping.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = mutex_lock(&self.now, "cache::clock", "advance");
        *guard += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *mutex_lock(&self.now, "cache::clock", "now")
    }
}
