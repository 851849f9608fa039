use rand::Rng;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Per-key sliding window limiter. Keys that have been idle for a full
/// window are swept on a random fraction of calls.
pub struct SlidingWindowLimiter {
    window: Duration,
    max_requests: usize,
    sweep_probability: f64,
    hits: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl SlidingWindowLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            window,
            max_requests,
            sweep_probability: 0.01,
            hits: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_sweep_probability(mut self, probability: f64) -> Self {
        self.sweep_probability = probability.clamp(0.0, 1.0);
        self
    }

    /// Records a hit for `key`; returns `false` when the key is over its budget.
    pub fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }

    pub fn check_at(&self, key: &str, now: Instant) -> bool {
        let mut hits = match self.hits.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if rand::thread_rng().gen_bool(self.sweep_probability) {
            let window = self.window;
            hits.retain(|_, times| {
                times
                    .back()
                    .is_some_and(|last| now.saturating_duration_since(*last) < window)
            });
        }

        let times = hits.entry(key.to_string()).or_default();
        while times
            .front()
            .is_some_and(|first| now.saturating_duration_since(*first) >= self.window)
        {
            times.pop_front();
        }

        if times.len() >= self.max_requests {
            return false;
        }
        times.push_back(now);
        true
    }

    pub fn tracked_keys(&self) -> usize {
        self.hits.lock().map(|h| h.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocks_after_limit_within_window() {
        let limiter = SlidingWindowLimiter::new(3, Duration::from_secs(60));
        let t0 = Instant::now();
        assert!(limiter.check_at("1.1.1.1", t0));
        assert!(limiter.check_at("1.1.1.1", t0));
        assert!(limiter.check_at("1.1.1.1", t0));
        assert!(!limiter.check_at("1.1.1.1", t0 + Duration::from_secs(1)));
        assert!(limiter.check_at("2.2.2.2", t0));
    }

    #[test]
    fn test_window_slides() {
        let limiter = SlidingWindowLimiter::new(2, Duration::from_secs(60));
        let t0 = Instant::now();
        assert!(limiter.check_at("ip", t0));
        assert!(limiter.check_at("ip", t0 + Duration::from_secs(30)));
        assert!(!limiter.check_at("ip", t0 + Duration::from_secs(59)));
        // first hit has left the window
        assert!(limiter.check_at("ip", t0 + Duration::from_secs(61)));
    }

    #[test]
    fn test_idle_keys_are_swept() {
        let limiter =
            SlidingWindowLimiter::new(5, Duration::from_secs(60)).with_sweep_probability(1.0);
        let t0 = Instant::now();
        assert!(limiter.check_at("old", t0));
        assert!(limiter.check_at("new", t0 + Duration::from_secs(120)));
        assert_eq!(limiter.tracked_keys(), 1);
    }
}
