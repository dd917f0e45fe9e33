use std::time::{Duration, Instant};

/// Target pacing for repaints, one display refresh at 60 Hz.
pub const REFRESH_INTERVAL: Duration = Duration::from_micros(16_667);
/// Pointer-move repaint requests are sampled at most this often.
pub const MOVE_SAMPLE_INTERVAL: Duration = Duration::from_millis(8);
/// Surface resizes settle for this long before the overlay reacts.
pub const RESIZE_DEBOUNCE: Duration = Duration::from_millis(150);

/// Monotonic time source. Injected so pacing logic is testable without
/// sleeping.
pub trait Clock {
    fn now(&self) -> Duration;
}

#[derive(Debug)]
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

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Coalesces repaint requests: any number of `request` calls between grants
/// collapse into a single pending flag, and `take_due` grants at most one
/// repaint per [`REFRESH_INTERVAL`]. A pending request is never dropped,
/// only delayed until the next due poll.
#[derive(Debug, Default)]
pub struct RepaintScheduler {
    pending: bool,
    last_grant: Option<Duration>,
}

impl RepaintScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&mut self) {
        self.pending = true;
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn take_due(&mut self, now: Duration) -> bool {
        if !self.pending {
            return false;
        }
        if let Some(last) = self.last_grant {
            if now.saturating_sub(last) < REFRESH_INTERVAL {
                return false;
            }
        }
        self.pending = false;
        self.last_grant = Some(now);
        true
    }
}

/// Admits pointer-move processing at most once per [`MOVE_SAMPLE_INTERVAL`].
/// A rejected sample raises a deferred flag so the final move of a burst is
/// still processed on the next pump.
#[derive(Debug, Default)]
pub struct MoveThrottle {
    last_admit: Option<Duration>,
    deferred: bool,
}

impl MoveThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn admit(&mut self, now: Duration) -> bool {
        let due = match self.last_admit {
            Some(last) => now.saturating_sub(last) >= MOVE_SAMPLE_INTERVAL,
            None => true,
        };
        if due {
            self.last_admit = Some(now);
            self.deferred = false;
            true
        } else {
            self.deferred = true;
            false
        }
    }

    pub fn take_deferred(&mut self) -> bool {
        std::mem::take(&mut self.deferred)
    }
}

/// Timer-style debounce: each poke pushes the deadline out, `fire` reports
/// readiness once and disarms.
#[derive(Debug)]
pub struct Debounce {
    delay: Duration,
    deadline: Option<Duration>,
}

impl Debounce {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn poke(&mut self, now: Duration) {
        self.deadline = Some(now + self.delay);
    }

    pub fn fire(&mut self, now: Duration) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
