use core::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use core::time::Duration;

/// Signed tenths of a microsecond.
///
/// This is the fixed-point unit of the tick multiplier: a tempo in
/// microseconds per quarter note is scaled by ten before being divided
/// by the file division, so one tick lasts `multiplier / 10` microseconds.
/// The drift accumulator is kept in the same unit so that measured wall
/// time can be compared against intended sleeps without rounding.
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Clone, Copy, Default, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeciMicros(i64);

impl DeciMicros {
    /// Zero.
    pub const ZERO: Self = Self(0);
    /// One tenth of a microsecond.
    pub const ONE: Self = Self(1);

    /// Creates a new value from raw tenths of a microsecond
    pub const fn new(value: i64) -> Self {
        Self(value)
    }
    /// Returns the raw value
    pub const fn get(&self) -> i64 {
        self.0
    }
    /// us -> tenths of a us
    pub const fn from_micros(us: i64) -> Self {
        Self(us * 10)
    }
    /// Truncating conversion to whole microseconds
    pub const fn as_micros(&self) -> i64 {
        self.0 / 10
    }
    /// Converts a wall-clock span, saturating at `i64::MAX`.
    pub fn from_duration(duration: Duration) -> Self {
        let tenths = duration.as_nanos() / 100;
        Self(i64::try_from(tenths).unwrap_or(i64::MAX))
    }
    /// Returns a [`Duration`], or [`Duration::ZERO`] for negative values.
    pub fn to_duration(&self) -> Duration {
        if self.0 <= 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos(self.0 as u64 * 100)
    }
    /// True if strictly greater than zero.
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }
}

impl Add for DeciMicros {
    type Output = DeciMicros;
    fn add(self, rhs: Self) -> Self::Output {
        DeciMicros(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for DeciMicros {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for DeciMicros {
    type Output = DeciMicros;
    fn sub(self, rhs: Self) -> Self::Output {
        DeciMicros(self.0.saturating_sub(rhs.0))
    }
}

impl SubAssign for DeciMicros {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Mul<u32> for DeciMicros {
    type Output = DeciMicros;
    fn mul(self, rhs: u32) -> Self::Output {
        DeciMicros(self.0.saturating_mul(rhs as i64))
    }
}

impl From<Duration> for DeciMicros {
    fn from(value: Duration) -> Self {
        Self::from_duration(value)
    }
}

#[test]
fn duration_conversions() {
    use pretty_assertions::assert_eq;

    let d = DeciMicros::from_duration(Duration::from_micros(1_500));
    assert_eq!(d, DeciMicros::new(15_000));
    assert_eq!(d.to_duration(), Duration::from_micros(1_500));
    assert_eq!(DeciMicros::new(-4).to_duration(), Duration::ZERO);
    assert_eq!(DeciMicros::new(7).to_duration(), Duration::from_nanos(700));
}

#[test]
fn arithmetic_saturates() {
    use pretty_assertions::assert_eq;

    assert_eq!(DeciMicros::new(i64::MAX) + DeciMicros::ONE, DeciMicros::new(i64::MAX));
    assert_eq!(DeciMicros::new(50_000) * 3, DeciMicros::new(150_000));
    assert_eq!(DeciMicros::new(10) - DeciMicros::new(25), DeciMicros::new(-15));
}
