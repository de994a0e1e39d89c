//! Inactivity timer

use std::time::{Duration, Instant};

use tracing::debug;

/// Fires once per inactivity period
#[derive(Debug)]
pub struct IdleTracker {
    timeout: Duration,
    last_activity: Option<Instant>,
    fired: bool,
}

impl IdleTracker {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            last_activity: None,
            fired: false,
        }
    }

    /// Restart the inactivity period
    pub fn record_activity(&mut self, now: Instant) {
        self.last_activity = Some(now);
        self.fired = false;
    }

    pub fn deadline(&self) -> Option<Instant> {
        if self.fired {
            return None;
        }
        self.last_activity.map(|t| t + self.timeout)
    }

    /// True exactly once after the timeout elapses without activity
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.deadline().is_some_and(|d| now >= d) {
            debug!(timeout_secs = self.timeout.as_secs(), "IdleTracker::poll: fired");
            self.fired = true;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_once_per_period() {
        let mut idle = IdleTracker::new(Duration::from_secs(30));
        let t0 = Instant::now();
        assert!(!idle.poll(t0));

        idle.record_activity(t0);
        assert!(!idle.poll(t0 + Duration::from_secs(29)));
        assert!(idle.poll(t0 + Duration::from_secs(30)));
        assert!(!idle.poll(t0 + Duration::from_secs(90)));
        assert!(idle.deadline().is_none());

        idle.record_activity(t0 + Duration::from_secs(100));
        assert!(idle.poll(t0 + Duration::from_secs(130)));
    }
}
