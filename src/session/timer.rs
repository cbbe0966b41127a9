use chrono::{DateTime, Utc};
use std::time::Duration;

/// Elapsed-time bookkeeping for a capture that can be paused
///
/// Elapsed time is `now - started_at - accumulated_pause` and stays frozen at
/// the pause instant until `resume`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElapsedTimer {
    started_at: DateTime<Utc>,
    accumulated_pause: Duration,
    paused_at: Option<DateTime<Utc>>,
}

impl ElapsedTimer {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            accumulated_pause: Duration::ZERO,
            paused_at: None,
        }
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn accumulated_pause(&self) -> Duration {
        self.accumulated_pause
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    pub fn pause(&mut self, now: DateTime<Utc>) {
        if self.paused_at.is_none() {
            self.paused_at = Some(now);
        }
    }

    pub fn resume(&mut self, now: DateTime<Utc>) {
        if let Some(paused_at) = self.paused_at.take() {
            self.accumulated_pause += span(paused_at, now);
        }
    }

    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        let end = self.paused_at.unwrap_or(now);
        span(self.started_at, end).saturating_sub(self.accumulated_pause)
    }
}

/// Non-negative wall time between two instants
fn span(from: DateTime<Utc>, to: DateTime<Utc>) -> Duration {
    (to - from).to_std().unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap_or_default()
    }

    #[test]
    fn test_elapsed_excludes_paused_interval() {
        let mut timer = ElapsedTimer::new(at(0));

        timer.pause(at(2_000));
        assert_eq!(timer.elapsed(at(2_000)), Duration::from_millis(2_000));

        // Frozen while paused
        assert_eq!(timer.elapsed(at(9_000)), Duration::from_millis(2_000));

        timer.resume(at(10_000));
        assert_eq!(timer.accumulated_pause(), Duration::from_millis(8_000));
        assert_eq!(timer.elapsed(at(13_000)), Duration::from_millis(5_000));
    }

    #[test]
    fn test_double_pause_keeps_first_instant() {
        let mut timer = ElapsedTimer::new(at(0));

        timer.pause(at(1_000));
        timer.pause(at(4_000));
        timer.resume(at(5_000));

        assert_eq!(timer.elapsed(at(6_000)), Duration::from_millis(2_000));
    }

    #[test]
    fn test_clock_going_backwards_never_underflows() {
        let timer = ElapsedTimer::new(at(5_000));

        assert_eq!(timer.elapsed(at(1_000)), Duration::ZERO);
    }
}
