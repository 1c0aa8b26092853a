use std::fmt::Debug;
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use super::angle::Angle;

/// Scalar the renderer is generic over.
///
/// Implemented by [`Fixed16`](super::Fixed16) and `f32`. All comparison
/// helpers are trait methods so generic code never needs `Ord`.
pub trait Decimal:
    Copy
    + Default
    + Debug
    + PartialEq
    + PartialOrd
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
    + MulAssign
    + DivAssign
    + Send
    + Sync
    + 'static
{
    const ZERO: Self;
    const ONE: Self;
    const HALF: Self;
    /// Largest representable value; also the "infinitely far" depth.
    const MAX: Self;
    /// `true` for the bit-exact fixed-point pipeline.
    const IS_FIXED: bool;

    fn from_f32(v: f32) -> Self;
    fn to_f32(self) -> f32;
    fn from_int(v: i32) -> Self;

    fn floor_to_int(self) -> i32;
    fn ceil_to_int(self) -> i32;
    fn round_to_int(self) -> i32;

    fn abs(self) -> Self;
    fn sqrt(self) -> Self;

    /// `(sin, cos)` read from the shared table.
    fn sin_cos(angle: Angle) -> (Self, Self);

    /// Sign of `ax * bz - az * bx`, computed without intermediate overflow.
    fn cross_sign(ax: Self, az: Self, bx: Self, bz: Self) -> i32;

    #[inline]
    fn recip(self) -> Self {
        Self::ONE / self
    }

    #[inline]
    fn min(self, other: Self) -> Self {
        if other < self { other } else { self }
    }

    #[inline]
    fn max(self, other: Self) -> Self {
        if other > self { other } else { self }
    }

    #[inline]
    fn clamp(self, lo: Self, hi: Self) -> Self {
        if self < lo {
            lo
        } else if self > hi {
            hi
        } else {
            self
        }
    }

    #[inline]
    fn mul_int(self, v: i32) -> Self {
        self * Self::from_int(v)
    }

    #[inline]
    fn is_negative(self) -> bool {
        self < Self::ZERO
    }
}

/// `a + (b - a) * t`
#[inline]
pub fn lerp<D: Decimal>(a: D, b: D, t: D) -> D {
    a + (b - a) * t
}

impl Decimal for f32 {
    const ZERO: Self = 0.0;
    const ONE: Self = 1.0;
    const HALF: Self = 0.5;
    const MAX: Self = f32::MAX;
    const IS_FIXED: bool = false;

    #[inline]
    fn from_f32(v: f32) -> Self {
        v
    }
    #[inline]
    fn to_f32(self) -> f32 {
        self
    }
    #[inline]
    fn from_int(v: i32) -> Self {
        v as f32
    }
    #[inline]
    fn floor_to_int(self) -> i32 {
        f32::floor(self) as i32
    }
    #[inline]
    fn ceil_to_int(self) -> i32 {
        f32::ceil(self) as i32
    }
    #[inline]
    fn round_to_int(self) -> i32 {
        f32::floor(self + 0.5) as i32
    }
    #[inline]
    fn abs(self) -> Self {
        f32::abs(self)
    }
    #[inline]
    fn sqrt(self) -> Self {
        if self <= 0.0 { 0.0 } else { f32::sqrt(self) }
    }
    #[inline]
    fn sin_cos(angle: Angle) -> (Self, Self) {
        (angle.sin_f32(), angle.cos_f32())
    }
    #[inline]
    fn cross_sign(ax: Self, az: Self, bx: Self, bz: Self) -> i32 {
        let c = ax as f64 * bz as f64 - az as f64 * bx as f64;
        if c > 0.0 {
            1
        } else if c < 0.0 {
            -1
        } else {
            0
        }
    }
    #[inline]
    fn min(self, other: Self) -> Self {
        f32::min(self, other)
    }
    #[inline]
    fn max(self, other: Self) -> Self {
        f32::max(self, other)
    }
}

/*======================================================================*/
/*                               Tests                                  */
/*======================================================================*/
#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Fixed16;

    fn mid<D: Decimal>(a: D, b: D) -> D {
        lerp(a, b, D::HALF)
    }

    #[test]
    fn generic_helpers_agree_between_modes() {
        let f = mid(2.0_f32, 6.0);
        let x = mid(Fixed16::from_int(2), Fixed16::from_int(6));
        assert_eq!(f, 4.0);
        assert_eq!(x, Fixed16::from_int(4));
        assert_eq!(Decimal::clamp(7.5_f32, 0.0, 5.0), 5.0);
        assert_eq!(
            Fixed16::from_int(-3).clamp(Fixed16::ZERO, Fixed16::ONE),
            Fixed16::ZERO
        );
    }

    #[test]
    fn rounding_conventions() {
        assert_eq!((-0.5_f32).floor_to_int(), -1);
        assert_eq!((2.25_f32).ceil_to_int(), 3);
        assert_eq!((2.5_f32).round_to_int(), 3);
        assert_eq!(Fixed16::from_f32(-0.5).floor_to_int(), -1);
        assert_eq!(Fixed16::from_f32(2.25).ceil_to_int(), 3);
        assert_eq!(Fixed16::from_f32(2.5).round_to_int(), 3);
    }

    #[test]
    fn cross_sign_matches_between_modes() {
        let s = f32::cross_sign(1.0, 2.0, 3.0, 1.0);
        let x = Fixed16::cross_sign(
            Fixed16::from_int(1),
            Fixed16::from_int(2),
            Fixed16::from_int(3),
            Fixed16::from_int(1),
        );
        assert_eq!(s, -1);
        assert_eq!(s, x);
        assert_eq!(f32::cross_sign(2.0, 4.0, 1.0, 2.0), 0);
    }
}
