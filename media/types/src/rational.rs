/*!
    Time base arithmetic.
*/

use std::fmt;
use std::time::Duration;

const NANOS_PER_SEC: i128 = 1_000_000_000;

/**
    A rational number, used for time bases and frame rates.

    A stream's time base is the length of one tick in seconds: a timestamp of
    `ticks` lasts `ticks * num / den` seconds. Conversions are done in exact
    integer arithmetic so large timestamps on long-running streams keep
    nanosecond precision.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rational {
    pub num: i32,
    pub den: i32,
}

impl Rational {
    pub const fn new(num: i32, den: i32) -> Self {
        Self { num, den }
    }

    /**
        Returns true if both terms are strictly positive.

        Only such a rational can be used to convert between ticks and time.
    */
    pub const fn is_valid(self) -> bool {
        self.num > 0 && self.den > 0
    }

    /**
        Returns the value as a float, or 0.0 if the denominator is zero.
    */
    pub fn to_f64(self) -> f64 {
        if self.den == 0 {
            return 0.0;
        }
        self.num as f64 / self.den as f64
    }

    /**
        Returns the reciprocal.
    */
    pub const fn invert(self) -> Self {
        Self {
            num: self.den,
            den: self.num,
        }
    }

    /**
        Converts a tick count in this time base to a duration.

        Returns `None` for negative tick counts, an invalid time base, or a
        result that doesn't fit a [`Duration`].
    */
    pub fn ticks_to_duration(self, ticks: i64) -> Option<Duration> {
        if ticks < 0 || !self.is_valid() {
            return None;
        }

        let nanos = (ticks as i128) * (self.num as i128) * NANOS_PER_SEC / (self.den as i128);
        let secs = u64::try_from(nanos / NANOS_PER_SEC).ok()?;
        let subsec = (nanos % NANOS_PER_SEC) as u32;

        Some(Duration::new(secs, subsec))
    }

    /**
        Converts a duration to a tick count in this time base, using the
        inverse of the time base factor. Rounds toward zero.

        Returns `None` for an invalid time base or a tick count outside `i64`.
    */
    pub fn duration_to_ticks(self, duration: Duration) -> Option<i64> {
        if !self.is_valid() {
            return None;
        }

        let nanos = duration.as_nanos() as i128;
        let ticks = nanos * (self.den as i128) / ((self.num as i128) * NANOS_PER_SEC);

        i64::try_from(ticks).ok()
    }
}

impl Default for Rational {
    fn default() -> Self {
        Self { num: 0, den: 1 }
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}
