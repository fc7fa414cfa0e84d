//! Simulation clock
//!
//! All timeouts in the engine are elapsed-time comparisons against this clock.
//! Nothing reads the OS time.

use crate::core::types::Tick;

/// Current AI tick and elapsed simulation seconds
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimClock {
    pub tick: Tick,
    pub elapsed: f64,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by one AI interval
    pub fn advance(&mut self, interval_secs: f32) {
        self.tick += 1;
        self.elapsed += interval_secs as f64;
    }

    /// Seconds since `since` (never negative)
    pub fn since(&self, since: f64) -> f32 {
        (self.elapsed - since).max(0.0) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_counts_ticks_and_seconds() {
        let mut clock = SimClock::new();
        clock.advance(0.25);
        clock.advance(0.25);
        assert_eq!(clock.tick, 2);
        assert!((clock.elapsed - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_since_clamps_to_zero() {
        let clock = SimClock { tick: 0, elapsed: 1.0 };
        assert_eq!(clock.since(2.0), 0.0);
        assert_eq!(clock.since(0.5), 0.5);
    }
}
