//! Polled stall detection
//!
//! A stall is one full period without device activity while the clock line
//! rests idle: the device is present but not answering. Byte handlers only
//! bump an activity counter; the timer compares it against the value seen at
//! the previous tick, so a tick never reads half-updated session state.

/// Counts stall periods since the last device activity
#[derive(Debug, Clone, Copy, Default)]
pub struct StallTimer {
    seen_activity: u32,
    period_start_ms: Option<u32>,
    stalls: u8,
}

impl StallTimer {
    pub const fn new() -> Self {
        Self {
            seen_activity: 0,
            period_start_ms: None,
            stalls: 0,
        }
    }

    /// Advance the timer, returning the current stall count
    ///
    /// `activity` is the session's append-only byte counter.
    pub fn tick(&mut self, activity: u32, now_ms: u32, clock_idle: bool, period_ms: u32) -> u8 {
        let Some(start) = self.period_start_ms else {
            self.seen_activity = activity;
            self.period_start_ms = Some(now_ms);
            return self.stalls;
        };

        if activity != self.seen_activity {
            self.seen_activity = activity;
            self.period_start_ms = Some(now_ms);
            self.stalls = 0;
            return 0;
        }

        if now_ms.wrapping_sub(start) >= period_ms {
            self.period_start_ms = Some(now_ms);
            if clock_idle {
                self.stalls = self.stalls.saturating_add(1);
            }
        }
        self.stalls
    }

    /// Start counting afresh, e.g. after the session issued a retry
    pub fn restart(&mut self, now_ms: u32) {
        self.period_start_ms = Some(now_ms);
        self.stalls = 0;
    }

    /// Forget the time base; the next tick starts a new period
    pub fn clear(&mut self) {
        self.period_start_ms = None;
        self.stalls = 0;
    }

    pub fn stalls(&self) -> u8 {
        self.stalls
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_one_stall_per_period() {
        let mut t = StallTimer::new();
        assert_eq!(t.tick(0, 0, true, 200), 0);
        assert_eq!(t.tick(0, 150, true, 200), 0);
        assert_eq!(t.tick(0, 200, true, 200), 1);
        assert_eq!(t.tick(0, 399, true, 200), 1);
        assert_eq!(t.tick(0, 400, true, 200), 2);
    }

    #[test]
    fn test_busy_clock_is_not_a_stall() {
        let mut t = StallTimer::new();
        t.tick(0, 0, false, 200);
        assert_eq!(t.tick(0, 200, false, 200), 0);
        assert_eq!(t.tick(0, 400, true, 200), 1);
    }

    #[test]
    fn test_activity_clears_stalls() {
        let mut t = StallTimer::new();
        t.tick(0, 0, true, 200);
        t.tick(0, 200, true, 200);
        assert_eq!(t.stalls(), 1);
        assert_eq!(t.tick(1, 300, true, 200), 0);
        // New period starts at the activity
        assert_eq!(t.tick(1, 450, true, 200), 0);
        assert_eq!(t.tick(1, 500, true, 200), 1);
    }

    #[test]
    fn test_restart() {
        let mut t = StallTimer::new();
        t.tick(0, 0, true, 200);
        t.tick(0, 200, true, 200);
        t.restart(250);
        assert_eq!(t.tick(0, 400, true, 200), 0);
        assert_eq!(t.tick(0, 450, true, 200), 1);
    }

    #[test]
    fn test_survives_clock_wrap() {
        let mut t = StallTimer::new();
        t.tick(0, u32::MAX - 50, true, 200);
        assert_eq!(t.tick(0, 148, true, 200), 0);
        assert_eq!(t.tick(0, 149, true, 200), 1);
    }
}
