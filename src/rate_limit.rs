use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Sweep idle clients once the map grows past this many keys.
const SWEEP_THRESHOLD: usize = 1024;

/// In-memory sliding-window limiter for outbound mail, keyed by client.
/// A limiter built with `max_sends == 0` allows everything.
pub struct SendLimiter {
    entries: Mutex<HashMap<String, Vec<Instant>>>,
    max_sends: u64,
    window: Duration,
}

impl SendLimiter {
    pub fn new(max_sends: u64, window: Duration) -> Self {
        SendLimiter {
            entries: Mutex::new(HashMap::new()),
            max_sends,
            window,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.max_sends > 0
    }

    /// Record a send and return true if it is allowed (under the limit).
    /// Rejected attempts are not recorded.
    pub fn check_and_record(&self, key: &str) -> bool {
        if !self.is_enabled() {
            return true;
        }

        let mut map = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();

        if map.len() > SWEEP_THRESHOLD {
            sweep(&mut map, now, self.window);
        }

        let attempts = map.entry(key.to_string()).or_default();
        attempts.retain(|t| now.duration_since(*t) < self.window);

        if (attempts.len() as u64) < self.max_sends {
            attempts.push(now);
            true
        } else {
            false
        }
    }
}

fn sweep(map: &mut HashMap<String, Vec<Instant>>, now: Instant, window: Duration) {
    map.retain(|_, attempts| {
        attempts.retain(|t| now.duration_since(*t) < window);
        !attempts.is_empty()
    });
}
