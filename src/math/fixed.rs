//! 16.16 fixed-point scalar.
//!
//! Products and quotients go through an `i64` intermediate and saturate
//! instead of wrapping, so projections of far geometry degrade to the
//! screen edge rather than flipping sign.

use std::fmt;
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use super::angle::Angle;
use super::decimal::Decimal;

pub const FRACBITS: i32 = 16;
pub const FRACUNIT: i32 = 1 << FRACBITS;

#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Hash)]
pub struct Fixed16(pub i32);

impl Fixed16 {
    #[inline]
    pub const fn from_bits(bits: i32) -> Self {
        Self(bits)
    }

    #[inline]
    pub const fn to_bits(self) -> i32 {
        self.0
    }

    /// Fractional part in `0 .. 1`.
    #[inline]
    pub const fn fract(self) -> Self {
        Self(self.0 & (FRACUNIT - 1))
    }
}

#[inline]
fn saturate(v: i64) -> i32 {
    v.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

impl fmt::Debug for Fixed16 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fixed16({})", self.to_f32())
    }
}

impl fmt::Display for Fixed16 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_f32())
    }
}

impl Add for Fixed16 {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Fixed16 {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl Mul for Fixed16 {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Self(saturate((self.0 as i64 * rhs.0 as i64) >> FRACBITS))
    }
}

impl Div for Fixed16 {
    type Output = Self;
    #[inline]
    fn div(self, rhs: Self) -> Self {
        if rhs.0 == 0 {
            return if self.0 >= 0 {
                Self(i32::MAX)
            } else {
                Self(i32::MIN)
            };
        }
        Self(saturate(((self.0 as i64) << FRACBITS) / rhs.0 as i64))
    }
}

impl Neg for Fixed16 {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Self(self.0.saturating_neg())
    }
}

impl AddAssign for Fixed16 {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for Fixed16 {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl MulAssign for Fixed16 {
    #[inline]
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

impl DivAssign for Fixed16 {
    #[inline]
    fn div_assign(&mut self, rhs: Self) {
        *self = *self / rhs;
    }
}

impl Decimal for Fixed16 {
    const ZERO: Self = Self(0);
    const ONE: Self = Self(FRACUNIT);
    const HALF: Self = Self(FRACUNIT / 2);
    const MAX: Self = Self(i32::MAX);
    const IS_FIXED: bool = true;

    #[inline]
    fn from_f32(v: f32) -> Self {
        Self((v * FRACUNIT as f32) as i32)
    }
    #[inline]
    fn to_f32(self) -> f32 {
        self.0 as f32 / FRACUNIT as f32
    }
    #[inline]
    fn from_int(v: i32) -> Self {
        Self(saturate((v as i64) << FRACBITS))
    }
    #[inline]
    fn floor_to_int(self) -> i32 {
        self.0 >> FRACBITS
    }
    #[inline]
    fn ceil_to_int(self) -> i32 {
        ((self.0 as i64 + (FRACUNIT as i64 - 1)) >> FRACBITS) as i32
    }
    #[inline]
    fn round_to_int(self) -> i32 {
        ((self.0 as i64 + (FRACUNIT as i64 / 2)) >> FRACBITS) as i32
    }
    #[inline]
    fn abs(self) -> Self {
        Self(self.0.saturating_abs())
    }
    fn sqrt(self) -> Self {
        if self.0 <= 0 {
            return Self::ZERO;
        }
        Self((((self.0 as u64) << FRACBITS).isqrt()) as i32)
    }
    #[inline]
    fn sin_cos(angle: Angle) -> (Self, Self) {
        (Self(angle.sin_fixed()), Self(angle.cos_fixed()))
    }
    #[inline]
    fn cross_sign(ax: Self, az: Self, bx: Self, bz: Self) -> i32 {
        let c = ax.0 as i64 * bz.0 as i64 - az.0 as i64 * bx.0 as i64;
        c.signum() as i32
    }
}

/*======================================================================*/
/*                               Tests                                  */
/*======================================================================*/
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_arithmetic() {
        let a = Fixed16::from_int(3);
        let b = Fixed16::from_f32(0.5);
        assert_eq!((a * b).to_bits(), 3 * FRACUNIT / 2);
        assert_eq!((a / b), Fixed16::from_int(6));
        assert_eq!((a - b).to_f32(), 2.5);
        assert_eq!((-a).floor_to_int(), -3);
    }

    #[test]
    fn divide_by_zero_saturates() {
        let one = Fixed16::ONE;
        assert_eq!(one / Fixed16::ZERO, Fixed16::MAX);
        assert_eq!((-one) / Fixed16::ZERO, Fixed16(i32::MIN));
    }

    #[test]
    fn overflow_saturates_not_wraps() {
        let big = Fixed16::from_int(30000);
        assert_eq!(big * big, Fixed16::MAX);
        assert_eq!(big + big, Fixed16::MAX);
        assert_eq!((-big) * big, Fixed16(i32::MIN));
    }

    #[test]
    fn sqrt_of_squares() {
        assert_eq!(Fixed16::from_int(9).sqrt(), Fixed16::from_int(3));
        assert_eq!(Fixed16::from_f32(0.25).sqrt(), Fixed16::from_f32(0.5));
        assert_eq!(Fixed16::from_int(-4).sqrt(), Fixed16::ZERO);
    }

    #[test]
    fn bit_exact_repeatability() {
        let a = Fixed16::from_f32(1.337);
        let b = Fixed16::from_f32(-7.25);
        let first = (a * b / (a + Fixed16::ONE)).to_bits();
        for _ in 0..4 {
            assert_eq!((a * b / (a + Fixed16::ONE)).to_bits(), first);
        }
    }
}
