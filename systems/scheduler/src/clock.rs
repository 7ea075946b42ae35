use std::time::Duration;

use crate::ConfigError;

/// Multiplier applied to elapsed wall-clock time before it reaches the
/// virtual clock.
///
/// Factors below one slow the simulation down: with [`TimeScale::FAST`] every
/// real second advances the virtual clock by half a second.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct TimeScale(f64);

impl TimeScale {
    /// Virtual time tracks wall-clock time.
    pub const NORMAL: TimeScale = TimeScale(1.0);
    /// Simulation runs at half of real speed.
    pub const FAST: TimeScale = TimeScale(0.5);
    /// Simulation runs at a quarter of real speed.
    pub const FASTER: TimeScale = TimeScale(0.25);
    /// Simulation runs at a tenth of real speed.
    pub const FASTEST: TimeScale = TimeScale(0.10);

    /// Creates a scale from an arbitrary factor.
    ///
    /// The factor must be finite and strictly positive.
    pub fn new(factor: f64) -> Result<Self, ConfigError> {
        if factor.is_finite() && factor > 0.0 {
            Ok(Self(factor))
        } else {
            Err(ConfigError::InvalidTimeScale { factor })
        }
    }

    /// Raw multiplier.
    #[must_use]
    pub const fn get(self) -> f64 {
        self.0
    }

    /// Smaller of the two scales.
    ///
    /// Used when several speed presets are requested at once.
    #[must_use]
    pub fn min(self, other: TimeScale) -> TimeScale {
        if other.0 < self.0 {
            other
        } else {
            self
        }
    }

    /// Converts an elapsed real duration into virtual time.
    ///
    /// The result is rounded to whole microseconds so repeated advances stay
    /// reproducible.
    #[must_use]
    pub fn scale(self, real: Duration) -> Duration {
        let micros = (real.as_micros() as f64 * self.0).round();
        Duration::from_micros(micros as u64)
    }
}

impl Default for TimeScale {
    fn default() -> Self {
        Self::NORMAL
    }
}

/// Virtual clock driven by wall-clock samples.
#[derive(Clone, Debug)]
pub struct VirtualClock {
    time_scale: TimeScale,
    last_real_millis: u64,
    now: Duration,
}

impl VirtualClock {
    /// Creates a clock at virtual time zero anchored to `origin_real_millis`.
    #[must_use]
    pub fn new(time_scale: TimeScale, origin_real_millis: u64) -> Self {
        Self {
            time_scale,
            last_real_millis: origin_real_millis,
            now: Duration::ZERO,
        }
    }

    /// Advances to the provided wall-clock sample and returns the virtual delta.
    ///
    /// Samples that do not move forward leave the clock untouched.
    pub fn advance_to(&mut self, real_millis: u64) -> Duration {
        if real_millis <= self.last_real_millis {
            return Duration::ZERO;
        }
        let real_delta = Duration::from_millis(real_millis - self.last_real_millis);
        self.last_real_millis = real_millis;
        let virtual_delta = self.time_scale.scale(real_delta);
        self.now = self.now.saturating_add(virtual_delta);
        virtual_delta
    }

    /// Current virtual time.
    #[must_use]
    pub const fn now(&self) -> Duration {
        self.now
    }

    /// Scale applied to every advance.
    #[must_use]
    pub const fn time_scale(&self) -> TimeScale {
        self.time_scale
    }
}
