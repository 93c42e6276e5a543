//! Drop-based rate limiter for outbound position updates.

use std::time::Duration;

use tokio::time::Instant;

/// Gates a high-frequency sample stream down to at most one send per
/// interval. Samples that arrive inside the window are dropped, not queued:
/// only the latest live position matters, and the next sample past the gate
/// carries it. Queuing would reintroduce lag under fast movement.
#[derive(Debug)]
pub struct OutboundThrottle {
    interval: Duration,
    last_sent: Option<Instant>,
}

impl OutboundThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_sent: None,
        }
    }

    /// Returns true when a send is allowed now, recording `now` as the new
    /// window start. The very first sample always passes.
    pub fn ready(&mut self, now: Instant) -> bool {
        let pass = match self.last_sent {
            Some(last) => now.duration_since(last) > self.interval,
            None => true,
        };
        if pass {
            self.last_sent = Some(now);
        }
        pass
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn first_sample_passes() {
        let mut throttle = OutboundThrottle::new(Duration::from_millis(20));
        assert!(throttle.ready(Instant::now()));
    }

    #[tokio::test(start_paused = true)]
    async fn samples_inside_window_drop() {
        let mut throttle = OutboundThrottle::new(Duration::from_millis(20));
        assert!(throttle.ready(Instant::now()));
        for _ in 0..20 {
            tokio::time::advance(Duration::from_millis(1)).await;
            assert!(!throttle.ready(Instant::now()));
        }
        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(throttle.ready(Instant::now()));
    }

    #[tokio::test(start_paused = true)]
    async fn one_send_per_window_under_continuous_sampling() {
        // samples every 1ms for 210ms against a 20ms interval
        let mut throttle = OutboundThrottle::new(Duration::from_millis(20));
        let mut sent = 0;
        for _ in 0..210 {
            if throttle.ready(Instant::now()) {
                sent += 1;
            }
            tokio::time::advance(Duration::from_millis(1)).await;
        }
        // window restarts on each send, so exactly one send per 21ms stride
        assert_eq!(sent, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_samples_are_not_queued() {
        let mut throttle = OutboundThrottle::new(Duration::from_millis(20));
        assert!(throttle.ready(Instant::now()));
        tokio::time::advance(Duration::from_millis(5)).await;
        assert!(!throttle.ready(Instant::now()));
        // a long quiet period yields exactly one allowance, not a burst
        tokio::time::advance(Duration::from_millis(100)).await;
        assert!(throttle.ready(Instant::now()));
        assert!(!throttle.ready(Instant::now()));
    }
}
