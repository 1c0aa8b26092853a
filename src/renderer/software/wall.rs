//! Wall processing: view-space walls → clipped, projected screen segments.
//!
//! A wall is visible when both endpoints are not behind the near plane,
//! not both outside the same frustum line, and it faces the camera. Clipping
//! runs left plane, right plane, near plane; each clip moves the texture-U
//! accumulator with the cut.
//!
//! Depth per column comes from intersecting the column's view ray with the
//! wall line. The solve is conditioned on the wall's dominant axis:
//!
//! ```text
//! DzDx (|dx| ≥ |dz|):  z = (z0 - s·x0) / (1 - s·r)     s = dz/dx
//! DxDz (|dx| < |dz|):  z = (x0 - s·z0) / (r - s)       s = dx/dz
//! ```
//!
//! with `r = x/z` the column's ray slope.

use crate::math::{Decimal, Vec2D};
use crate::world::{SectorId, WallId};

use super::renderer::ViewParams;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WallOrient {
    DzDx,
    DxDz,
}

/// One visible, clipped and projected wall.
#[derive(Clone, Copy, Debug)]
pub struct WallSegment<D> {
    pub sector: SectorId,
    pub wall: WallId,

    /// Unrounded screen x of the clipped endpoints.
    pub sx0: D,
    pub sx1: D,
    /// Inclusive pixel range; narrowed by merging and window clipping.
    pub x0: i32,
    pub x1: i32,

    /// Clipped view-space endpoints.
    pub v0: Vec2D<D>,
    pub v1: Vec2D<D>,

    pub orient: WallOrient,
    /// `dz/dx` or `dx/dz`, per `orient`.
    pub slope: D,
    /// Depth solve: `z = num / (den_a + den_b * r)`.
    pub num: D,
    pub den_a: D,
    pub den_b: D,

    /// Texel U at `v0` and texels per unit of x (`DzDx`) or z (`DxDz`).
    pub u0: D,
    pub u_scale: D,
}

impl<D: Decimal> WallSegment<D> {
    /// View depth where the ray with slope `ray` hits the wall.
    #[inline]
    pub fn depth_at_ray(&self, ray: D) -> D {
        let den = self.den_a + self.den_b * ray;
        let (lo, hi) = if self.v0.z < self.v1.z {
            (self.v0.z, self.v1.z)
        } else {
            (self.v1.z, self.v0.z)
        };
        if den.abs() <= D::from_f32(1.0e-4) {
            return hi;
        }
        (self.num / den).clamp(lo, hi)
    }

    /// Continuous screen-x version of [`Self::depth_at_ray`].
    pub fn depth_at_screen_x(&self, view: &ViewParams<D>, sx: D) -> D {
        self.depth_at_ray(view.ray(sx))
    }

    /// Texel U (from the wall's start) at a column of depth `z`.
    #[inline]
    pub fn texel_u(&self, z: D, ray: D) -> D {
        match self.orient {
            WallOrient::DzDx => self.u0 + (ray * z - self.v0.x) * self.u_scale,
            WallOrient::DxDz => self.u0 + (z - self.v0.z) * self.u_scale,
        }
    }

    #[inline]
    pub fn overlaps(&self, o: &Self) -> bool {
        self.x0 <= o.x1 && o.x0 <= self.x1
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.x0 > self.x1
    }
}

/// Clip `a`–`b` (with texel U at each end) to the half-plane where `dist`
/// is non-negative. Returns `false` when nothing is left.
fn clip_plane<D: Decimal>(
    a: &mut Vec2D<D>,
    b: &mut Vec2D<D>,
    ua: &mut D,
    ub: &mut D,
    dist: impl Fn(Vec2D<D>) -> D,
) -> bool {
    let da = dist(*a);
    let db = dist(*b);
    if da.is_negative() && db.is_negative() {
        return false;
    }
    if da.is_negative() {
        let t = da / (da - db);
        *a = a.lerp(*b, t);
        *ua += (*ub - *ua) * t;
    } else if db.is_negative() {
        let t = db / (db - da);
        *b = b.lerp(*a, t);
        *ub += (*ua - *ub) * t;
    }
    true
}

/// Turn one wall into a segment, or `None` when it cannot be seen.
///
/// `a`/`b` are the wall endpoints already in view space; `texel_len` is the
/// full wall length in texels.
pub fn process_wall<D: Decimal>(
    view: &ViewParams<D>,
    sector: SectorId,
    wall: WallId,
    a: Vec2D<D>,
    b: Vec2D<D>,
    texel_len: D,
) -> Option<WallSegment<D>> {
    let near = view.near;
    let k = view.frustum_k;

    if a.z < near && b.z < near {
        return None;
    }
    if a.x + k * a.z < D::ZERO && b.x + k * b.z < D::ZERO {
        return None;
    }
    if k * a.z - a.x < D::ZERO && k * b.z - b.x < D::ZERO {
        return None;
    }
    // Facing iff the camera lies on the interior side: b × a > 0.
    if D::cross_sign(b.x, b.z, a.x, a.z) <= 0 {
        return None;
    }

    let (mut a, mut b) = (a, b);
    let (mut ua, mut ub) = (D::ZERO, texel_len);
    if !clip_plane(&mut a, &mut b, &mut ua, &mut ub, |p| p.x + k * p.z) {
        return None;
    }
    if !clip_plane(&mut a, &mut b, &mut ua, &mut ub, |p| k * p.z - p.x) {
        return None;
    }
    if !clip_plane(&mut a, &mut b, &mut ua, &mut ub, |p| p.z - near) {
        return None;
    }

    let sx0 = view.project_x(a);
    let sx1 = view.project_x(b);
    let x0 = sx0.round_to_int().max(0);
    let x1 = (sx1.round_to_int() - 1).min(view.width - 1);
    if x0 > x1 {
        return None;
    }

    let dx = b.x - a.x;
    let dz = b.z - a.z;
    let (orient, slope, num, den_a, den_b, u_scale) = if dx.abs() >= dz.abs() {
        let s = dz / dx;
        (WallOrient::DzDx, s, a.z - s * a.x, D::ONE, -s, (ub - ua) / dx)
    } else {
        let s = dx / dz;
        (WallOrient::DxDz, s, a.x - s * a.z, -s, D::ONE, (ub - ua) / dz)
    };

    Some(WallSegment {
        sector,
        wall,
        sx0,
        sx1,
        x0,
        x1,
        v0: a,
        v1: b,
        orient,
        slope,
        num,
        den_a,
        den_b,
        u0: ua,
        u_scale,
    })
}

/*======================================================================*/
/*                               Tests                                  */
/*======================================================================*/
#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Fixed16;

    fn view<D: Decimal>() -> ViewParams<D> {
        // 320 wide, 90° FOV → focal 160, frustum lines x = ±z.
        ViewParams::for_test(320, 200, 160.0)
    }

    fn v<D: Decimal>(x: f32, z: f32) -> Vec2D<D> {
        Vec2D::new(D::from_f32(x), D::from_f32(z))
    }

    fn seg<D: Decimal>(a: (f32, f32), b: (f32, f32)) -> Option<WallSegment<D>> {
        let a = v::<D>(a.0, a.1);
        let b = v::<D>(b.0, b.1);
        let len = (b - a).length() * D::from_int(8);
        process_wall(&view(), 0, 0, a, b, len)
    }

    #[test]
    fn rejects_behind_outside_and_backfacing() {
        assert!(seg::<f32>((-4.0, -5.0), (4.0, -5.0)).is_none(), "behind");
        assert!(seg::<f32>((-30.0, 5.0), (-20.0, 10.0)).is_none(), "left of frustum");
        assert!(seg::<f32>((20.0, 5.0), (30.0, 10.0)).is_none(), "right of frustum");
        assert!(seg::<f32>((4.0, 8.0), (-4.0, 8.0)).is_none(), "back face");
        assert!(seg::<Fixed16>((4.0, 8.0), (-4.0, 8.0)).is_none(), "back face fixed");
    }

    #[test]
    fn facing_wall_projects_to_expected_columns() {
        let s = seg::<f32>((-4.0, 8.0), (4.0, 8.0)).unwrap();
        assert_eq!((s.x0, s.x1), (80, 239));
        assert_eq!(s.orient, WallOrient::DzDx);
        let f = seg::<Fixed16>((-4.0, 8.0), (4.0, 8.0)).unwrap();
        assert_eq!((f.x0, f.x1), (80, 239));
    }

    #[test]
    fn right_plane_clip_keeps_u_continuous() {
        // Passes the camera on the right, from z = 10 back to z = -2.
        let s = seg::<f32>((2.0, 10.0), (2.0, -2.0)).unwrap();
        assert!((s.v1.z - 2.0).abs() < 1e-4, "cut where the wall meets x = z");
        assert_eq!(s.orient, WallOrient::DxDz);
        let u_end = s.u0 + (s.v1.z - s.v0.z) * s.u_scale;
        assert!((u_end - 64.0).abs() < 1e-3, "u at cut = {u_end}");
        assert_eq!((s.x0, s.x1), (192, 319));
    }

    #[test]
    fn near_clip_moves_u_accumulator() {
        let s = seg::<f32>((-4.5, 5.5), (0.5, 0.5)).unwrap();
        assert!(s.v1.x.abs() < 1e-4 && (s.v1.z - 1.0).abs() < 1e-4);
        let full = 50.0f32.sqrt() * 8.0;
        assert!((s.texel_u(1.0, 0.0) - full * 0.9).abs() < 1e-3);
    }

    fn endpoint_depths<D: Decimal>(a: (f32, f32), b: (f32, f32), tol: f32) {
        let vp = view::<D>();
        let s = seg::<D>(a, b).unwrap();
        let z0 = s.depth_at_screen_x(&vp, s.sx0).to_f32();
        let z1 = s.depth_at_screen_x(&vp, s.sx1).to_f32();
        assert!((z0 - s.v0.z.to_f32()).abs() < tol, "z0 {z0} vs {:?}", s.v0.z);
        assert!((z1 - s.v1.z.to_f32()).abs() < tol, "z1 {z1} vs {:?}", s.v1.z);
    }

    #[test]
    fn depth_solve_reproduces_endpoints_float() {
        endpoint_depths::<f32>((-6.0, 9.0), (5.0, 12.0), 1e-3); // DzDx
        endpoint_depths::<f32>((-3.0, 4.0), (-1.0, 20.0), 1e-3); // DxDz
    }

    #[test]
    fn depth_solve_reproduces_endpoints_fixed() {
        endpoint_depths::<Fixed16>((-6.0, 9.0), (5.0, 12.0), 0.05);
        endpoint_depths::<Fixed16>((-3.0, 4.0), (-1.0, 20.0), 0.05);
    }

    #[test]
    fn texel_u_matches_along_wall() {
        let vp = view::<f32>();
        let s = seg::<f32>((-4.0, 8.0), (4.0, 8.0)).unwrap();
        let col = 160;
        let ray = vp.ray(col as f32);
        let z = s.depth_at_ray(ray);
        // Centre column hits x = 0, half-way along an 8-unit wall.
        assert!((s.texel_u(z, ray) - 32.0).abs() < 1e-3);
    }
}
