//! Time sources for frame timestamps.
//!
//! The render loop never reads the system time directly, the host hands it a
//! timestamp per frame. Hosts take that timestamp from a [`Clock`] so tests can
//! drive the animation with a manually advanced one.

use std::sync::Arc;
use std::time::Instant;
#[cfg(test)]
use std::{sync::Mutex, time::Duration};

pub trait Clock: Send + Sync + std::fmt::Debug + 'static {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy)]
pub struct RealClock;

impl Clock for RealClock {
    #[inline(always)]
    fn now(&self) -> Instant {
        Instant::now()
    }
}

pub fn default_clock() -> Arc<dyn Clock> {
    Arc::new(RealClock)
}

/// Manually advanced clock.
#[cfg(test)]
#[derive(Debug)]
pub struct TestClock {
    current: Mutex<Instant>,
}

#[cfg(test)]
impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl TestClock {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, duration: Duration) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current += duration;
    }

    pub fn advance_ms(&self, millis: u64) {
        self.advance(Duration::from_millis(millis));
    }
}

#[cfg(test)]
impl Clock for TestClock {
    fn now(&self) -> Instant {
        *self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}
