const PLUS_INFINITY_VAL: i64 = i64::MAX;
const MINUS_INFINITY_VAL: i64 = i64::MIN;

/// An instant on either the sender or the receiver clock, in microseconds.
///
/// `Timestamp::zero()` is the unset value carried by acknowledgements that
/// were declared lost or reported without an arrival time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp {
    value: i64,
}

/// A signed span between two [`Timestamp`]s, in microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeDelta {
    value: i64,
}

macro_rules! microsecond_unit {
    ($type_name:ty) => {
        impl $type_name {
            pub const fn from_seconds(value: i64) -> Self {
                Self::from_micros(1_000_000 * value)
            }

            pub const fn from_millis(value: i64) -> Self {
                Self::from_micros(1_000 * value)
            }

            pub const fn from_micros(value: i64) -> Self {
                Self { value }
            }

            pub const fn zero() -> Self {
                Self { value: 0 }
            }

            pub const fn plus_infinity() -> Self {
                Self::from_micros(PLUS_INFINITY_VAL)
            }

            pub const fn minus_infinity() -> Self {
                Self::from_micros(MINUS_INFINITY_VAL)
            }

            pub const fn seconds(&self) -> i64 {
                self.us() / 1_000_000
            }

            pub const fn ms(&self) -> i64 {
                self.us() / 1_000
            }

            pub const fn us(&self) -> i64 {
                self.value
            }

            pub const fn ns(&self) -> i64 {
                1_000 * self.us()
            }

            pub fn seconds_f64(&self) -> f64 {
                self.us() as f64 / 1e6
            }

            pub fn ms_f64(&self) -> f64 {
                self.us() as f64 / 1e3
            }

            pub const fn is_zero(&self) -> bool {
                self.value == 0
            }

            pub const fn is_plus_infinity(&self) -> bool {
                self.us() == PLUS_INFINITY_VAL
            }

            pub const fn is_minus_infinity(&self) -> bool {
                self.us() == MINUS_INFINITY_VAL
            }

            pub const fn is_infinite(&self) -> bool {
                self.is_plus_infinity() || self.is_minus_infinity()
            }

            pub const fn is_finite(&self) -> bool {
                !self.is_infinite()
            }
        }
    };
}

microsecond_unit!(Timestamp);
microsecond_unit!(TimeDelta);

impl std::ops::Add<TimeDelta> for Timestamp {
    type Output = Self;

    fn add(self, rhs: TimeDelta) -> Self::Output {
        if self.is_plus_infinity() || rhs.is_plus_infinity() {
            Self::plus_infinity()
        } else if self.is_minus_infinity() || rhs.is_minus_infinity() {
            Self::minus_infinity()
        } else {
            Self::from_micros(self.us() + rhs.us())
        }
    }
}

impl std::ops::Sub<TimeDelta> for Timestamp {
    type Output = Self;

    fn sub(self, rhs: TimeDelta) -> Self::Output {
        if self.is_plus_infinity() || rhs.is_minus_infinity() {
            Self::plus_infinity()
        } else if self.is_minus_infinity() || rhs.is_plus_infinity() {
            Self::minus_infinity()
        } else {
            Self::from_micros(self.us() - rhs.us())
        }
    }
}

impl std::ops::AddAssign<TimeDelta> for Timestamp {
    fn add_assign(&mut self, rhs: TimeDelta) {
        *self = *self + rhs
    }
}

impl std::ops::Sub<Timestamp> for Timestamp {
    type Output = TimeDelta;

    fn sub(self, rhs: Timestamp) -> Self::Output {
        TimeDelta::from_micros(self.us() - rhs.us())
    }
}

impl std::ops::Add for TimeDelta {
    type Output = Self;

    fn add(self, rhs: TimeDelta) -> Self::Output {
        Self::from_micros(self.us() + rhs.us())
    }
}

impl std::ops::AddAssign for TimeDelta {
    fn add_assign(&mut self, rhs: TimeDelta) {
        *self = *self + rhs
    }
}

impl std::ops::Sub for TimeDelta {
    type Output = Self;

    fn sub(self, rhs: TimeDelta) -> Self::Output {
        Self::from_micros(self.us() - rhs.us())
    }
}

impl std::ops::Mul<f64> for TimeDelta {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self::Output {
        Self::from_micros((self.us() as f64 * rhs) as i64)
    }
}

impl std::ops::Div<f64> for TimeDelta {
    type Output = Self;

    fn div(self, rhs: f64) -> Self::Output {
        Self::from_micros((self.us() as f64 / rhs) as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_difference_is_a_delta() {
        let a = Timestamp::from_millis(100);
        let b = Timestamp::from_millis(250);
        assert_eq!(b - a, TimeDelta::from_millis(150));
        assert_eq!(a - b, TimeDelta::from_millis(-150));
    }

    #[test]
    fn infinities_absorb_arithmetic() {
        let never = Timestamp::minus_infinity();
        assert!((never + TimeDelta::from_seconds(10)).is_minus_infinity());
        assert!((Timestamp::plus_infinity() - TimeDelta::from_seconds(1)).is_plus_infinity());
    }

    #[test]
    fn zero_is_distinct_from_infinity() {
        assert!(Timestamp::zero().is_zero());
        assert!(Timestamp::zero().is_finite());
        assert!(!Timestamp::minus_infinity().is_zero());
    }

    #[test]
    fn delta_conversions() {
        let delta = TimeDelta::from_millis(1_500);
        assert_eq!(delta.seconds(), 1);
        assert_eq!(delta.ms(), 1_500);
        assert_eq!(delta.us(), 1_500_000);
        assert_eq!(delta.ns(), 1_500_000_000);
        assert!((delta.seconds_f64() - 1.5).abs() < f64::EPSILON);
    }
}
