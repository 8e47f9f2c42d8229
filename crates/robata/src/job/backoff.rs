use std::time::Duration;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Bounded exponential backoff with proportional jitter.
///
/// The `n`th delay is `initial * multiplier^n`, capped at `max`, then spread
/// uniformly over `±jitter` of itself and capped at `max` again.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Backoff {
    #[serde(with = "secs")]
    pub initial: Duration,
    #[serde(with = "secs")]
    pub max: Duration,
    pub multiplier: f64,
    /// Fraction of each delay to randomize, in `[0, 1]`.
    pub jitter: f64,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            multiplier: 2.0,
            jitter: 0.1,
        }
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay before retry number `attempt` (zero based), without jitter.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(attempt.min(i32::MAX as u32) as i32);
        let secs = (self.initial.as_secs_f64() * factor).min(self.max.as_secs_f64());
        Duration::from_secs_f64(secs.max(0.0))
    }

    /// Delay before retry number `attempt`, jittered.
    pub fn delay(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        let jitter = self.jitter.clamp(0.0, 1.0);
        if jitter == 0.0 || base.is_zero() {
            return base;
        }
        let spread = rand::thread_rng().gen_range(-jitter..=jitter);
        let secs = base.as_secs_f64() * (1.0 + spread);
        Duration::from_secs_f64(secs.clamp(0.0, self.max.as_secs_f64()))
    }

    /// A stateful iterator over successive delays.
    pub fn delays(&self) -> Delays {
        Delays {
            backoff: *self,
            attempt: 0,
        }
    }

    pub(crate) fn check(&self) -> Result<(), String> {
        if self.initial.is_zero() {
            return Err("backoff initial interval must be positive".to_string());
        }
        if self.max < self.initial {
            return Err("backoff max interval is below the initial interval".to_string());
        }
        if !(self.multiplier >= 1.0) {
            return Err("backoff multiplier must be at least 1".to_string());
        }
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err("backoff jitter must be within [0, 1]".to_string());
        }
        Ok(())
    }
}

/// Successive delays of a [`Backoff`]. Never ends; the delay stays at the cap.
#[derive(Debug, Clone)]
pub struct Delays {
    backoff: Backoff,
    attempt: u32,
}

impl Delays {
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

impl Iterator for Delays {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let delay = self.backoff.delay(self.attempt);
        self.attempt = self.attempt.saturating_add(1);
        Some(delay)
    }
}

pub(crate) mod secs {
    use std::time::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
