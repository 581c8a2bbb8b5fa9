//! Outbound send pacing
//!
//! SMS providers throttle per-account message throughput. The pacer is a
//! token bucket shared across fan-out workers; each provider call takes
//! one permit and sleeps until one is available.

use parking_lot::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct PacerBucket {
    /// Current token count
    tokens: f64,
    /// Maximum tokens (capacity)
    capacity: f64,
    /// Refill rate (tokens per second)
    refill_rate: f64,
    /// Last refill time
    last_refill: Instant,
}

impl PacerBucket {
    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.capacity);
        self.last_refill = now;
    }

    /// Take one token, or report how long until one refills
    fn try_take(&mut self, now: Instant) -> Option<Duration> {
        self.refill(now);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            None
        } else {
            let deficit = 1.0 - self.tokens;
            Some(Duration::from_secs_f64(deficit / self.refill_rate))
        }
    }
}

/// Paces outbound provider calls to a messages-per-second budget
#[derive(Debug)]
pub struct SendPacer {
    bucket: Mutex<PacerBucket>,
}

impl SendPacer {
    /// Create a pacer refilling at `per_second` with up to `burst` banked permits
    pub fn new(per_second: u32, burst: u32) -> Self {
        let capacity = burst.max(1) as f64;
        Self {
            bucket: Mutex::new(PacerBucket {
                tokens: capacity,
                capacity,
                refill_rate: per_second.max(1) as f64,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Acquire a send permit, sleeping until one is available
    ///
    /// The wait hint assumes no other takers, so the permit is re-checked
    /// after each sleep.
    pub async fn acquire(&self) {
        loop {
            let wait = self.bucket.lock().try_take(Instant::now());
            match wait {
                None => return,
                Some(delay) => tokio::time::sleep(delay).await,
            }
        }
    }
}
