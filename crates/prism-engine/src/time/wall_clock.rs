use std::time::Instant;

/// Source of absolute time for animation that is not frame-delta driven.
pub trait WallClock {
    /// Seconds since an arbitrary fixed origin. Never decreases.
    fn now_seconds(&self) -> f64;
}

/// Monotonic clock whose origin is its construction instant.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl WallClock for MonotonicClock {
    fn now_seconds(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}
