use std::time::{Duration, Instant};

/// delay/sound timers count down at this rate
pub const TIMER_HZ: u32 = 60;

/// the display is repainted at this rate
pub const REFRESH_HZ: u32 = 60;

/// a fixed-rate schedule: "has another period gone by yet?". takes the time
/// as an argument so it can be driven by fake clocks
#[derive(Clone, Debug)]
pub struct Cadence {
    period: Duration,
    next: Instant,
}

impl Cadence {
    pub fn new(hz: u32, now: Instant) -> Self {
        let period = Self::period_of(hz);
        Cadence {
            period,
            next: now + period,
        }
    }

    pub fn period_of(hz: u32) -> Duration {
        Duration::from_nanos(1_000_000_000 / u64::from(hz.max(1)))
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.next
    }

    /// how long until the next period ends; zero if already due
    pub fn until_due(&self, now: Instant) -> Duration {
        self.next.saturating_duration_since(now)
    }

    /// number of whole periods that have finished since the last call. each
    /// period is counted exactly once
    pub fn ticks_due(&mut self, now: Instant) -> u32 {
        let mut ticks = 0;
        while now >= self.next {
            self.next += self.period;
            ticks += 1;
        }
        ticks
    }

    /// move on by one period from the last deadline (steady pacing). if that
    /// leaves us more than `slack` behind, start afresh from now instead of
    /// trying to catch up
    pub fn advance(&mut self, now: Instant, slack: Duration) {
        self.next += self.period;
        if now > self.next + slack {
            self.next = now + self.period;
        }
    }

    /// next period ends one full period from now
    pub fn reset(&mut self, now: Instant) {
        self.next = now + self.period;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period() {
        assert_eq!(Cadence::period_of(60), Duration::from_nanos(16_666_666));
        assert_eq!(Cadence::period_of(1000), Duration::from_millis(1));
        // zero hz would divide by zero
        assert_eq!(Cadence::period_of(0), Duration::from_secs(1));
    }

    #[test]
    fn test_not_due_before_period() {
        let t0 = Instant::now();
        let mut c = Cadence::new(60, t0);
        assert!(!c.is_due(t0));
        assert_eq!(c.ticks_due(t0 + Duration::from_millis(16)), 0);
        assert_eq!(c.until_due(t0), c.period());
    }

    #[test]
    fn test_each_period_counted_once() {
        let t0 = Instant::now();
        let mut c = Cadence::new(60, t0);
        assert_eq!(c.ticks_due(t0 + Duration::from_millis(17)), 1);
        assert_eq!(c.ticks_due(t0 + Duration::from_millis(17)), 0);
        assert_eq!(c.ticks_due(t0 + Duration::from_millis(100)), 5);
        assert_eq!(c.ticks_due(t0 + Duration::from_millis(1000)), 54);
    }

    #[test]
    fn test_reset_drops_backlog() {
        let t0 = Instant::now();
        let mut c = Cadence::new(60, t0);
        let later = t0 + Duration::from_secs(5);
        c.reset(later);
        assert_eq!(c.ticks_due(later), 0);
        assert_eq!(c.ticks_due(later + Duration::from_millis(17)), 1);
    }

    #[test]
    fn test_advance_steady_and_resync() {
        let t0 = Instant::now();
        let mut c = Cadence::new(1000, t0);
        let slack = Duration::from_millis(16);
        c.advance(t0, slack);
        assert_eq!(c.until_due(t0), Duration::from_millis(2));
        // way behind: don't burst, restart from now
        let late = t0 + Duration::from_secs(1);
        c.advance(late, slack);
        assert_eq!(c.until_due(late), Duration::from_millis(1));
    }
}
