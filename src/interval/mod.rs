//! Validated delay between an `arm` call and the resulting fire.
//!
//! `core::time::Duration` is already non-negative, so every `Duration`
//! converts infallibly. The signed and floating-point constructors exist for
//! delays that come from configuration or arithmetic and may be negative.
use core::time::Duration;

use crate::error::TimerError;

//==================================================================================INTERVAL
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// Non-negative delay accepted by [`TimerCore::arm`](crate::timer::TimerCore::arm).
pub struct Interval(Duration);

impl Interval {
    /// Fire as soon as the fire source gets a chance to.
    pub const ZERO: Self = Self(Duration::ZERO);

    /// Build from a signed millisecond count. Negative values are rejected.
    pub fn from_millis_signed(millis: i64) -> Result<Self, TimerError> {
        if millis < 0 {
            return Err(TimerError::invalid("interval", "must not be negative"));
        }
        Ok(Self(Duration::from_millis(millis as u64)))
    }

    /// Build from fractional seconds (typically read from a config file).
    ///
    /// Rejects negative, NaN and values too large to be represented as a
    /// `Duration`.
    pub fn from_secs_f64(secs: f64) -> Result<Self, TimerError> {
        if secs.is_nan() {
            return Err(TimerError::invalid("interval", "must be a number"));
        }
        if secs < 0.0 {
            return Err(TimerError::invalid("interval", "must not be negative"));
        }
        Duration::try_from_secs_f64(secs)
            .map(Self)
            .map_err(|_| TimerError::invalid("interval", "out of range"))
    }

    /// Underlying duration handed to the fire source.
    #[inline]
    pub const fn as_duration(&self) -> Duration {
        self.0
    }
}

impl From<Duration> for Interval {
    fn from(value: Duration) -> Self {
        Self(value)
    }
}

impl From<Interval> for Duration {
    fn from(value: Interval) -> Self {
        value.0
    }
}

impl TryFrom<i64> for Interval {
    type Error = TimerError;

    /// Milliseconds.
    fn try_from(millis: i64) -> Result<Self, Self::Error> {
        Self::from_millis_signed(millis)
    }
}

impl core::fmt::Display for Interval {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:?}", self.0)
    }
}
