//! Small vectors generic over [`Decimal`].
//!
//! The world is authored with `glam` types; these mirror them in whichever
//! scalar the renderer runs with. 2D vectors live on the floor plane and are
//! named `x`/`z` accordingly.

use std::ops::{Add, Mul, Neg, Sub};

use glam::{Vec2, Vec3};

use super::angle::Angle;
use super::decimal::Decimal;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec2D<D> {
    pub x: D,
    pub z: D,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec3D<D> {
    pub x: D,
    pub y: D,
    pub z: D,
}

/// Row-major 3×3 matrix.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Mat3D<D> {
    pub rows: [Vec3D<D>; 3],
}

/// 2D cross product `a.x * b.z - a.z * b.x`.
#[inline]
pub fn cross2<D: Decimal>(a: Vec2D<D>, b: Vec2D<D>) -> D {
    a.x * b.z - a.z * b.x
}

impl<D: Decimal> Vec2D<D> {
    #[inline]
    pub const fn new(x: D, z: D) -> Self {
        Self { x, z }
    }

    /// Floor-plane point from a glam `Vec2` (`y` component is world `z`).
    #[inline]
    pub fn from_glam(v: Vec2) -> Self {
        Self::new(D::from_f32(v.x), D::from_f32(v.y))
    }

    #[inline]
    pub fn dot(self, o: Self) -> D {
        self.x * o.x + self.z * o.z
    }

    #[inline]
    pub fn length(self) -> D {
        self.dot(self).sqrt()
    }

    #[inline]
    pub fn lerp(self, o: Self, t: D) -> Self {
        self + (o - self) * t
    }
}

impl<D: Decimal> Add for Vec2D<D> {
    type Output = Self;
    fn add(self, o: Self) -> Self {
        Self::new(self.x + o.x, self.z + o.z)
    }
}

impl<D: Decimal> Sub for Vec2D<D> {
    type Output = Self;
    fn sub(self, o: Self) -> Self {
        Self::new(self.x - o.x, self.z - o.z)
    }
}

impl<D: Decimal> Mul<D> for Vec2D<D> {
    type Output = Self;
    fn mul(self, s: D) -> Self {
        Self::new(self.x * s, self.z * s)
    }
}

impl<D: Decimal> Vec3D<D> {
    #[inline]
    pub const fn new(x: D, y: D, z: D) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn from_glam(v: Vec3) -> Self {
        Self::new(D::from_f32(v.x), D::from_f32(v.y), D::from_f32(v.z))
    }

    #[inline]
    pub fn dot(self, o: Self) -> D {
        self.x * o.x + self.y * o.y + self.z * o.z
    }

    pub fn cross(self, o: Self) -> Self {
        Self::new(
            self.y * o.z - self.z * o.y,
            self.z * o.x - self.x * o.z,
            self.x * o.y - self.y * o.x,
        )
    }

    #[inline]
    pub fn lerp(self, o: Self, t: D) -> Self {
        self + (o - self) * t
    }

    #[inline]
    pub fn xz(self) -> Vec2D<D> {
        Vec2D::new(self.x, self.z)
    }
}

impl<D: Decimal> Add for Vec3D<D> {
    type Output = Self;
    fn add(self, o: Self) -> Self {
        Self::new(self.x + o.x, self.y + o.y, self.z + o.z)
    }
}

impl<D: Decimal> Sub for Vec3D<D> {
    type Output = Self;
    fn sub(self, o: Self) -> Self {
        Self::new(self.x - o.x, self.y - o.y, self.z - o.z)
    }
}

impl<D: Decimal> Mul<D> for Vec3D<D> {
    type Output = Self;
    fn mul(self, s: D) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }
}

impl<D: Decimal> Neg for Vec3D<D> {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl<D: Decimal> Mat3D<D> {
    pub fn identity() -> Self {
        Self {
            rows: [
                Vec3D::new(D::ONE, D::ZERO, D::ZERO),
                Vec3D::new(D::ZERO, D::ONE, D::ZERO),
                Vec3D::new(D::ZERO, D::ZERO, D::ONE),
            ],
        }
    }

    /// World → view rotation for a camera heading `yaw` (pitch is applied
    /// later as a horizon shear).
    pub fn view_yaw(yaw: Angle) -> Self {
        let (s, c) = D::sin_cos(yaw);
        Self {
            rows: [
                Vec3D::new(c, D::ZERO, -s),
                Vec3D::new(D::ZERO, D::ONE, D::ZERO),
                Vec3D::new(s, D::ZERO, c),
            ],
        }
    }

    /// Object → world rotation: roll about z, then pitch about x, then yaw.
    /// The yaw part is the inverse of [`Mat3D::view_yaw`].
    pub fn from_yaw_pitch_roll(yaw: Angle, pitch: Angle, roll: Angle) -> Self {
        let yaw_m = Self::view_yaw(yaw).transpose();
        let (sp, cp) = D::sin_cos(pitch);
        let pitch_m = Self {
            rows: [
                Vec3D::new(D::ONE, D::ZERO, D::ZERO),
                Vec3D::new(D::ZERO, cp, -sp),
                Vec3D::new(D::ZERO, sp, cp),
            ],
        };
        let (sr, cr) = D::sin_cos(roll);
        let roll_m = Self {
            rows: [
                Vec3D::new(cr, -sr, D::ZERO),
                Vec3D::new(sr, cr, D::ZERO),
                Vec3D::new(D::ZERO, D::ZERO, D::ONE),
            ],
        };
        yaw_m.mul_mat(&pitch_m.mul_mat(&roll_m))
    }

    #[inline]
    pub fn mul_vec(&self, v: Vec3D<D>) -> Vec3D<D> {
        Vec3D::new(self.rows[0].dot(v), self.rows[1].dot(v), self.rows[2].dot(v))
    }

    pub fn mul_mat(&self, o: &Self) -> Self {
        let t = o.transpose();
        let row = |r: Vec3D<D>| Vec3D::new(r.dot(t.rows[0]), r.dot(t.rows[1]), r.dot(t.rows[2]));
        Self {
            rows: [row(self.rows[0]), row(self.rows[1]), row(self.rows[2])],
        }
    }

    pub fn transpose(&self) -> Self {
        let [a, b, c] = self.rows;
        Self {
            rows: [
                Vec3D::new(a.x, b.x, c.x),
                Vec3D::new(a.y, b.y, c.y),
                Vec3D::new(a.z, b.z, c.z),
            ],
        }
    }
}

/*======================================================================*/
/*                               Tests                                  */
/*======================================================================*/
#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{ANGLE_90, Fixed16};

    fn close(a: Vec3D<f32>, b: Vec3D<f32>) -> bool {
        (a.x - b.x).abs() < 1e-4 && (a.y - b.y).abs() < 1e-4 && (a.z - b.z).abs() < 1e-4
    }

    #[test]
    fn view_yaw_undoes_object_yaw() {
        let yaw = Angle::new(1234);
        let obj = Mat3D::<f32>::from_yaw_pitch_roll(yaw, Angle::ZERO, Angle::ZERO);
        let back = Mat3D::<f32>::view_yaw(yaw).mul_mat(&obj);
        let v = Vec3D::new(1.0, 2.0, 3.0);
        assert!(close(back.mul_vec(v), v));
    }

    #[test]
    fn quarter_turn_maps_axes() {
        // A camera turned by a quarter turn sees world +x straight ahead.
        let m = Mat3D::<f32>::view_yaw(Angle::new(ANGLE_90));
        let v = m.mul_vec(Vec3D::new(1.0, 0.0, 0.0));
        assert!(close(v, Vec3D::new(0.0, 0.0, 1.0)), "{v:?}");
    }

    #[test]
    fn fixed_cross_and_dot() {
        let a = Vec3D::new(Fixed16::ONE, Fixed16::ZERO, Fixed16::ZERO);
        let b = Vec3D::new(Fixed16::ZERO, Fixed16::ONE, Fixed16::ZERO);
        assert_eq!(a.cross(b), Vec3D::new(Fixed16::ZERO, Fixed16::ZERO, Fixed16::ONE));
        assert_eq!(a.dot(b), Fixed16::ZERO);
        let p = Vec2D::new(Fixed16::from_int(3), Fixed16::from_int(4));
        assert_eq!(p.length(), Fixed16::from_int(5));
    }
}
