//! Quiescence timer for live draft validation.
//!
//! Callers feed input with an explicit `Instant` and poll with the current
//! instant; the latest value is released once no input arrived for the
//! configured window. Timing affects feedback latency only, never results.

use std::time::{Duration, Instant};

/// Recommended quiet period before validating a draft.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    window: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    /// Records a new value, restarting the quiet period.
    pub fn push(&mut self, value: T, at: Instant) {
        self.pending = Some((value, at));
    }

    /// Releases the pending value once the window has elapsed since the
    /// last push.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        let ready = matches!(
            &self.pending,
            Some((_, at)) if now.saturating_duration_since(*at) >= self.window
        );
        if !ready {
            return None;
        }
        self.pending.take().map(|(value, _)| value)
    }

    /// Drops any pending value.
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl<T> Default for Debouncer<T> {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

#[cfg(test)]
mod tests {
    use super::Debouncer;
    use std::time::{Duration, Instant};

    #[test]
    fn releases_latest_value_after_quiet_period() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(300));

        debouncer.push("b", start);
        debouncer.push("bu", start + Duration::from_millis(200));
        assert_eq!(debouncer.poll(start + Duration::from_millis(400)), None);
        assert_eq!(
            debouncer.poll(start + Duration::from_millis(500)),
            Some("bu")
        );
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn cancel_drops_pending_value() {
        let start = Instant::now();
        let mut debouncer = Debouncer::default();
        debouncer.push(1, start);
        debouncer.cancel();
        assert_eq!(debouncer.poll(start + Duration::from_secs(1)), None);
    }
}
