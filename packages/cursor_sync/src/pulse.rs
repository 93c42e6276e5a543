//! Per-direction "recently active" indicator.

use std::time::Duration;

use tokio::time::Instant;

/// Time-bounded activity flag driven by message events.
///
/// Debounced-off: the flag decays `duration` after the *last* mark, so rapid
/// traffic keeps it continuously true. The connection actor keeps one
/// instance per direction and republishes its view when the earliest expiry
/// fires.
#[derive(Debug)]
pub struct ActivityPulse {
    duration: Duration,
    last_mark: Option<Instant>,
}

impl ActivityPulse {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            last_mark: None,
        }
    }

    /// Record a message event at `now`, extending the active window.
    pub fn mark(&mut self, now: Instant) {
        self.last_mark = Some(now);
    }

    pub fn is_active(&self, now: Instant) -> bool {
        match self.last_mark {
            Some(last) => now.duration_since(last) < self.duration,
            None => false,
        }
    }

    /// When the flag will decay, if it is currently active.
    pub fn expires_at(&self, now: Instant) -> Option<Instant> {
        let last = self.last_mark?;
        let expiry = last + self.duration;
        (expiry > now).then_some(expiry)
    }

    /// Forget any pending activity (used when tearing a connection down).
    pub fn reset(&mut self) {
        self.last_mark = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn inactive_until_marked() {
        let pulse = ActivityPulse::new(Duration::from_millis(250));
        assert!(!pulse.is_active(Instant::now()));
        assert!(pulse.expires_at(Instant::now()).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn decays_after_duration() {
        let mut pulse = ActivityPulse::new(Duration::from_millis(250));
        pulse.mark(Instant::now());
        assert!(pulse.is_active(Instant::now()));
        tokio::time::advance(Duration::from_millis(249)).await;
        assert!(pulse.is_active(Instant::now()));
        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(!pulse.is_active(Instant::now()));
    }

    #[tokio::test(start_paused = true)]
    async fn later_marks_extend_the_window() {
        let mut pulse = ActivityPulse::new(Duration::from_millis(250));
        pulse.mark(Instant::now());
        tokio::time::advance(Duration::from_millis(200)).await;
        pulse.mark(Instant::now());
        // 250ms past the first mark, but only 50ms past the last
        tokio::time::advance(Duration::from_millis(50)).await;
        assert!(pulse.is_active(Instant::now()));
        tokio::time::advance(Duration::from_millis(200)).await;
        assert!(!pulse.is_active(Instant::now()));
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_tracks_last_mark() {
        let mut pulse = ActivityPulse::new(Duration::from_millis(250));
        let start = Instant::now();
        pulse.mark(start);
        assert_eq!(
            pulse.expires_at(start),
            Some(start + Duration::from_millis(250))
        );
        tokio::time::advance(Duration::from_millis(300)).await;
        assert!(pulse.expires_at(Instant::now()).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn reset_clears_activity() {
        let mut pulse = ActivityPulse::new(Duration::from_millis(250));
        pulse.mark(Instant::now());
        pulse.reset();
        assert!(!pulse.is_active(Instant::now()));
    }
}
