use std::time::Duration;

/// Fixed-cadence gate deciding when the host should advance the simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickDriver {
    period: Duration,
    next_due_millis: u64,
}

impl TickDriver {
    /// Creates a driver whose first tick is due one period after `start_millis`.
    #[must_use]
    pub fn new(period: Duration, start_millis: u64) -> Self {
        Self {
            period,
            next_due_millis: start_millis.saturating_add(period_millis(period)),
        }
    }

    /// Reports whether a tick is due at `now_millis`.
    ///
    /// A due tick re-arms the driver one period after `now_millis`, so a host
    /// that stalls skips the missed ticks instead of replaying them.
    pub fn poll(&mut self, now_millis: u64) -> bool {
        if now_millis < self.next_due_millis {
            return false;
        }
        self.next_due_millis = now_millis.saturating_add(period_millis(self.period));
        true
    }

    /// Wall-clock instant of the next tick.
    #[must_use]
    pub const fn next_due_millis(&self) -> u64 {
        self.next_due_millis
    }

    /// Cadence between ticks.
    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }
}

fn period_millis(period: Duration) -> u64 {
    u64::try_from(period.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_per_period() {
        let mut driver = TickDriver::new(Duration::from_millis(100), 1_000);

        assert!(!driver.poll(1_050));
        assert!(driver.poll(1_100));
        assert!(!driver.poll(1_150));
        assert!(driver.poll(1_200));
        assert_eq!(driver.next_due_millis(), 1_300);
    }

    #[test]
    fn stalled_host_skips_missed_ticks() {
        let mut driver = TickDriver::new(Duration::from_millis(100), 0);

        assert!(driver.poll(750));
        assert_eq!(driver.next_due_millis(), 850);
        assert!(!driver.poll(800));
    }
}
