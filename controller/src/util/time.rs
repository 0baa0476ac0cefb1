use std::time::Instant;

/// Monotonic milliseconds since an arbitrary epoch. Every deadline in the
/// library is computed from this one scale; wall-clock time never drives a
/// protocol decision.
pub type Timestamp = u64;

/// Monotonic clock anchored at construction.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    epoch: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }

    pub fn now_ms(&self) -> Timestamp {
        self.epoch.elapsed().as_millis() as Timestamp
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}
