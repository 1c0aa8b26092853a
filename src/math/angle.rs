//! 14-bit binary angles and the shared sine tables.

use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use once_cell::sync::Lazy;

/// Units per full turn.
pub const ANGLE_MAX: i32 = 16384;
pub const ANGLE_MASK: i32 = ANGLE_MAX - 1;
pub const ANGLE_90: i32 = ANGLE_MAX / 4;
pub const ANGLE_180: i32 = ANGLE_MAX / 2;

/// Sine of every angle unit, in `f32`.
static SIN_F32: Lazy<Box<[f32]>> = Lazy::new(|| {
    (0..ANGLE_MAX)
        .map(|i| (i as f64 * std::f64::consts::TAU / ANGLE_MAX as f64).sin() as f32)
        .collect()
});

/// Same table in 16.16 fixed point.
static SIN_FIXED: Lazy<Box<[i32]>> = Lazy::new(|| {
    (0..ANGLE_MAX)
        .map(|i| {
            let s = (i as f64 * std::f64::consts::TAU / ANGLE_MAX as f64).sin();
            (s * 65536.0).round() as i32
        })
        .collect()
});

/// Binary angle; always kept in `0 .. ANGLE_MAX`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Angle(i32);

impl Angle {
    pub const ZERO: Angle = Angle(0);

    #[inline]
    pub const fn new(units: i32) -> Self {
        Self(units & ANGLE_MASK)
    }

    #[inline]
    pub const fn units(self) -> i32 {
        self.0
    }

    pub fn from_radians(rad: f32) -> Self {
        let units = (rad as f64 * ANGLE_MAX as f64 / std::f64::consts::TAU).round() as i64;
        Self::new(units as i32)
    }

    pub fn from_degrees(deg: f32) -> Self {
        Self::from_radians(deg.to_radians())
    }

    pub fn to_radians(self) -> f32 {
        (self.0 as f64 * std::f64::consts::TAU / ANGLE_MAX as f64) as f32
    }

    /// Signed view of the angle in `-ANGLE_180 .. ANGLE_180`.
    pub fn signed(self) -> i32 {
        if self.0 >= ANGLE_180 {
            self.0 - ANGLE_MAX
        } else {
            self.0
        }
    }

    #[inline]
    pub fn sin_f32(self) -> f32 {
        SIN_F32[self.0 as usize]
    }

    #[inline]
    pub fn cos_f32(self) -> f32 {
        SIN_F32[((self.0 + ANGLE_90) & ANGLE_MASK) as usize]
    }

    /// Raw 16.16 sine.
    #[inline]
    pub fn sin_fixed(self) -> i32 {
        SIN_FIXED[self.0 as usize]
    }

    #[inline]
    pub fn cos_fixed(self) -> i32 {
        SIN_FIXED[((self.0 + ANGLE_90) & ANGLE_MASK) as usize]
    }
}

impl Add for Angle {
    type Output = Angle;
    fn add(self, rhs: Angle) -> Angle {
        Angle::new(self.0 + rhs.0)
    }
}

impl Sub for Angle {
    type Output = Angle;
    fn sub(self, rhs: Angle) -> Angle {
        Angle::new(self.0 - rhs.0)
    }
}

impl Neg for Angle {
    type Output = Angle;
    fn neg(self) -> Angle {
        Angle::new(-self.0)
    }
}

impl AddAssign for Angle {
    fn add_assign(&mut self, rhs: Angle) {
        *self = *self + rhs;
    }
}

impl SubAssign for Angle {
    fn sub_assign(&mut self, rhs: Angle) {
        *self = *self - rhs;
    }
}

/*======================================================================*/
/*                               Tests                                  */
/*======================================================================*/
