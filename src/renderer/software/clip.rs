//! Polygon clipping against the view frustum, in view space.

use std::mem;

use crate::math::{Decimal, Vec3D};

use super::limits::MAX_POLYGON_VERTICES;
use super::renderer::ViewParams;

/// A polygon vertex with the attributes carried through clipping.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ClipVertex<D> {
    pub pos: Vec3D<D>,
    /// Light level, for Gouraud faces.
    pub light: D,
    pub u: D,
    pub v: D,
}

impl<D: Decimal> ClipVertex<D> {
    fn lerp(&self, o: &Self, t: D) -> Self {
        Self {
            pos: self.pos.lerp(o.pos, t),
            light: self.light + (o.light - self.light) * t,
            u: self.u + (o.u - self.u) * t,
            v: self.v + (o.v - self.v) * t,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Plane {
    Near,
    Left,
    Right,
    Top,
    Bottom,
}

const PLANES: [Plane; 5] = [Plane::Near, Plane::Left, Plane::Right, Plane::Top, Plane::Bottom];

/// The five clip planes of a view.
#[derive(Clone, Copy, Debug)]
pub struct Frustum<D> {
    near: D,
    side_k: D,
    top_k: D,
    bot_k: D,
}

impl<D: Decimal> Frustum<D> {
    pub fn new(view: &ViewParams<D>) -> Self {
        Self {
            near: view.near,
            side_k: view.frustum_k,
            top_k: view.horizon / view.focal_y,
            bot_k: (D::from_int(view.height) - view.horizon) / view.focal_y,
        }
    }

    /// Signed distance, non-negative inside.
    #[inline]
    fn dist(&self, plane: Plane, p: Vec3D<D>) -> D {
        match plane {
            Plane::Near => p.z - self.near,
            Plane::Left => p.x + self.side_k * p.z,
            Plane::Right => self.side_k * p.z - p.x,
            Plane::Top => self.top_k * p.z - p.y,
            Plane::Bottom => p.y + self.bot_k * p.z,
        }
    }
}

/// Two vertex buffers the clipper alternates between.
#[derive(Debug)]
pub struct PolygonClipper<D> {
    a: Vec<ClipVertex<D>>,
    b: Vec<ClipVertex<D>>,
}

impl<D> Default for PolygonClipper<D> {
    fn default() -> Self {
        Self {
            a: Vec::with_capacity(MAX_POLYGON_VERTICES),
            b: Vec::with_capacity(MAX_POLYGON_VERTICES),
        }
    }
}

impl<D: Decimal> PolygonClipper<D> {
    /// Clip a convex polygon. Returns the clipped vertices, empty when
    /// nothing is left.
    pub fn clip<'a>(&'a mut self, frustum: &Frustum<D>, input: &[ClipVertex<D>]) -> &'a [ClipVertex<D>] {
        self.a.clear();
        self.a.extend_from_slice(input);
        let (mut src, mut dst) = (&mut self.a, &mut self.b);

        for plane in PLANES {
            dst.clear();
            let n = src.len();
            for i in 0..n {
                let p = src[i];
                let q = src[(i + 1) % n];
                let dp = frustum.dist(plane, p.pos);
                let dq = frustum.dist(plane, q.pos);
                let p_in = !dp.is_negative();
                if p_in {
                    dst.push(p);
                }
                if p_in != !dq.is_negative() {
                    dst.push(p.lerp(&q, dp / (dp - dq)));
                }
            }
            if dst.len() > MAX_POLYGON_VERTICES {
                log::error!("clipped polygon has {} vertices, keeping {MAX_POLYGON_VERTICES}", dst.len());
                dst.truncate(MAX_POLYGON_VERTICES);
            }
            mem::swap(&mut src, &mut dst);
            if src.len() < 3 {
                return &[];
            }
        }
        src
    }
}

/*======================================================================*/
/*                               Tests                                  */
/*======================================================================*/
#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Fixed16;

    fn v<D: Decimal>(x: f32, y: f32, z: f32) -> ClipVertex<D> {
        ClipVertex {
            pos: Vec3D::new(D::from_f32(x), D::from_f32(y), D::from_f32(z)),
            ..Default::default()
        }
    }

    fn frustum<D: Decimal>() -> Frustum<D> {
        Frustum::new(&ViewParams::for_test(320, 200, 160.0))
    }

    #[test]
    fn inside_polygon_is_unchanged() {
        let quad = [v::<f32>(-1.0, -1.0, 10.0), v(1.0, -1.0, 10.0), v(1.0, 1.0, 10.0), v(-1.0, 1.0, 10.0)];
        let mut c = PolygonClipper::default();
        assert_eq!(c.clip(&frustum(), &quad), &quad);
    }

    #[test]
    fn near_plane_cuts_and_interpolates() {
        // Triangle from z = 0 to z = 4; near plane at 1.
        let mut a = v::<Fixed16>(0.0, 0.0, 0.0);
        a.u = Fixed16::from_f32(0.0);
        let mut b = v::<Fixed16>(0.0, 0.0, 4.0);
        b.u = Fixed16::from_f32(8.0);
        let c = v::<Fixed16>(1.0, 0.0, 4.0);
        let mut clipper = PolygonClipper::default();
        let out = clipper.clip(&frustum(), &[a, b, c]);
        assert!(out.len() >= 3);
        for p in out {
            assert!(p.pos.z >= Fixed16::ONE);
        }
        let cut = out.iter().find(|p| p.pos.x == Fixed16::ZERO && p.pos.z == Fixed16::ONE);
        assert_eq!(cut.map(|p| p.u), Some(Fixed16::from_f32(2.0)));
    }

    #[test]
    fn fully_outside_is_empty() {
        let tri = [v::<f32>(-1.0, 0.0, -5.0), v(1.0, 0.0, -5.0), v(0.0, 1.0, -5.0)];
        let mut c = PolygonClipper::default();
        assert!(c.clip(&frustum(), &tri).is_empty());

        // Entirely left of the view.
        let tri = [v::<f32>(-50.0, 0.0, 5.0), v(-40.0, 0.0, 5.0), v(-45.0, 1.0, 6.0)];
        assert!(c.clip(&frustum(), &tri).is_empty());
    }

    #[test]
    fn wide_polygon_is_bounded_by_the_side_planes() {
        let quad = [v::<f32>(-100.0, -1.0, 10.0), v(100.0, -1.0, 10.0), v(100.0, 1.0, 10.0), v(-100.0, 1.0, 10.0)];
        let mut c = PolygonClipper::default();
        let out = c.clip(&frustum(), &quad);
        // 320 wide at focal 160: |x| <= z.
        for p in out {
            assert!(p.pos.x.abs() <= 10.0 + 1e-3, "{p:?}");
        }
        assert_eq!(out.len(), 4);
    }
}
