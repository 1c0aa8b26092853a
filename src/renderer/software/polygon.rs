//! Convex polygon fill, column by column.
//!
//! Attributes divided by z are linear in screen space, so vertices carry
//! `1/z`, `u/z` and `v/z` and textured faces divide back per pixel.

use crate::math::Decimal;
use crate::world::{Colormap, Texture};

use super::clip::ClipVertex;
use super::limits::MAX_LIGHT;
use super::objects::ObjectClip;
use super::renderer::ViewParams;

/// 4×4 ordered dither, in sixteenths of a light level.
const BAYER: [[i32; 4]; 4] = [[0, 8, 2, 10], [12, 4, 14, 6], [3, 11, 1, 9], [15, 7, 13, 5]];

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScreenVertex<D> {
    pub x: D,
    pub y: D,
    pub inv_z: D,
    pub light: D,
    pub u_oz: D,
    pub v_oz: D,
}

impl<D: Decimal> ScreenVertex<D> {
    fn lerp(&self, o: &Self, t: D) -> Self {
        let mix = |a: D, b: D| a + (b - a) * t;
        Self {
            x: mix(self.x, o.x),
            y: mix(self.y, o.y),
            inv_z: mix(self.inv_z, o.inv_z),
            light: mix(self.light, o.light),
            u_oz: mix(self.u_oz, o.u_oz),
            v_oz: mix(self.v_oz, o.v_oz),
        }
    }
}

/// Project a clipped view-space vertex (z at or beyond the near plane).
pub fn project<D: Decimal>(view: &ViewParams<D>, v: &ClipVertex<D>) -> ScreenVertex<D> {
    let inv_z = v.pos.z.recip();
    ScreenVertex {
        x: view.half_w + v.pos.x * inv_z * view.focal,
        y: view.horizon - v.pos.y * inv_z * view.focal_y,
        inv_z,
        light: v.light,
        u_oz: v.u * inv_z,
        v_oz: v.v * inv_z,
    }
}

/// How a polygon's pixels are coloured.
pub enum PolyFill<'a> {
    Flat {
        color: u8,
        shade: Option<&'a [u8; 256]>,
    },
    /// Vertex light levels interpolated and dithered; `None` is fullbright.
    Gouraud {
        color: u8,
        colormap: Option<&'a Colormap>,
    },
    Textured {
        tex: &'a Texture,
        shade: Option<&'a [u8; 256]>,
    },
}

#[inline]
fn lit(texel: u8, shade: Option<&[u8; 256]>) -> u8 {
    match shade {
        Some(cmap) => cmap[texel as usize],
        None => texel,
    }
}

/// One side of a convex polygon, from the leftmost vertex to the
/// rightmost. Edges are half-open in x, so each interior column meets
/// exactly one edge of each chain.
struct EdgeChain {
    cur: usize,
    end: usize,
    forward: bool,
}

impl EdgeChain {
    #[inline]
    fn next(&self, n: usize) -> usize {
        if self.forward {
            (self.cur + 1) % n
        } else {
            (self.cur + n - 1) % n
        }
    }

    /// Crossing with column `fx`. Columns must come in increasing order.
    fn crossing<D: Decimal>(&mut self, verts: &[ScreenVertex<D>], fx: D) -> Option<ScreenVertex<D>> {
        let n = verts.len();
        while self.cur != self.end && verts[self.next(n)].x <= fx {
            self.cur = self.next(n);
        }
        if self.cur == self.end {
            return None;
        }
        let (l, r) = (&verts[self.cur], &verts[self.next(n)]);
        Some(l.lerp(r, (fx - l.x) / (r.x - l.x)))
    }
}

/// Fill a convex polygon inside `clip`. Returns whether any pixel was
/// written.
pub fn fill_polygon<D: Decimal>(
    out: &mut [u8],
    width: usize,
    verts: &[ScreenVertex<D>],
    clip: &ObjectClip<D>,
    fill: &PolyFill,
) -> bool {
    if verts.len() < 3 {
        return false;
    }
    let (mut left, mut right) = (0, 0);
    for (i, v) in verts.iter().enumerate().skip(1) {
        if v.x < verts[left].x {
            left = i;
        }
        if v.x > verts[right].x {
            right = i;
        }
    }
    let mut chains = [true, false].map(|forward| EdgeChain {
        cur: left,
        end: right,
        forward,
    });
    let x0 = verts[left].x.ceil_to_int().max(clip.x0);
    let x1 = (verts[right].x.ceil_to_int() - 1).min(clip.x1);
    let sixteenth = D::ONE / D::from_int(16);

    let mut drawn = false;
    for x in x0..=x1 {
        let Some((wt, wb)) = clip.rows(x) else {
            continue;
        };
        let fx = D::from_int(x);
        let [a, b] = &mut chains;
        let (Some(a), Some(b)) = (a.crossing(verts, fx), b.crossing(verts, fx)) else {
            continue;
        };
        let (top, bot) = if a.y <= b.y { (a, b) } else { (b, a) };
        let ya = top.y.ceil_to_int().max(wt);
        let yb = (bot.y.ceil_to_int() - 1).min(wb);
        if ya > yb {
            continue;
        }
        let span = bot.y - top.y;
        let row_t = if span > D::ZERO { span.recip() } else { D::ZERO };

        for y in ya..=yb {
            let t = (D::from_int(y) - top.y) * row_t;
            let px = match fill {
                PolyFill::Flat { color, shade } => lit(*color, *shade),
                PolyFill::Gouraud { color, colormap } => match colormap {
                    None => *color,
                    Some(cm) => {
                        let light = top.light + (bot.light - top.light) * t;
                        let dither = sixteenth.mul_int(BAYER[(y & 3) as usize][(x & 3) as usize]);
                        let level = (light + dither).floor_to_int().clamp(0, MAX_LIGHT);
                        cm[level as usize][*color as usize]
                    }
                },
                PolyFill::Textured { tex, shade } => {
                    let iz = top.inv_z + (bot.inv_z - top.inv_z) * t;
                    if iz <= D::ZERO {
                        continue;
                    }
                    let u = (top.u_oz + (bot.u_oz - top.u_oz) * t) / iz;
                    let v = (top.v_oz + (bot.v_oz - top.v_oz) * t) / iz;
                    lit(tex.texel(u.floor_to_int(), v.floor_to_int()), *shade)
                }
            };
            if let Some(p) = out.get_mut(y as usize * width + x as usize) {
                *p = px;
            }
        }
        drawn = true;
    }
    drawn
}

/*======================================================================*/
/*                               Tests                                  */
/*======================================================================*/
#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Fixed16;
    use crate::world::LIGHT_LEVELS;

    const W: usize = 32;
    const H: usize = 32;

    struct Open<D> {
        top: Vec<i32>,
        bot: Vec<i32>,
        depth: Vec<D>,
    }

    impl<D: Decimal> Open<D> {
        fn new() -> Self {
            Self {
                top: vec![0; W],
                bot: vec![H as i32 - 1; W],
                depth: vec![D::MAX; W],
            }
        }

        fn clip(&self) -> ObjectClip<'_, D> {
            ObjectClip::new(0, W as i32 - 1, &self.top, &self.bot, &self.depth, D::ONE)
        }
    }

    fn sv<D: Decimal>(x: f32, y: f32) -> ScreenVertex<D> {
        ScreenVertex {
            x: D::from_f32(x),
            y: D::from_f32(y),
            inv_z: D::ONE,
            ..Default::default()
        }
    }

    fn square<D: Decimal>() -> Vec<ScreenVertex<D>> {
        vec![sv(10.0, 10.0), sv(20.0, 10.0), sv(20.0, 20.0), sv(10.0, 20.0)]
    }

    fn check_flat_square<D: Decimal>() {
        let open = Open::<D>::new();
        let mut out = vec![0u8; W * H];
        let fill = PolyFill::Flat { color: 5, shade: None };
        assert!(fill_polygon(&mut out, W, &square::<D>(), &open.clip(), &fill));
        for y in 0..H {
            for x in 0..W {
                let inside = (10..20).contains(&x) && (10..20).contains(&y);
                assert_eq!(out[y * W + x] == 5, inside, "({x},{y})");
            }
        }
    }

    #[test]
    fn flat_square_covers_ceil_rule_pixels() {
        check_flat_square::<f32>();
        check_flat_square::<Fixed16>();
    }

    #[test]
    fn window_and_depth_limit_the_fill() {
        let mut open = Open::<f32>::new();
        open.bot[12] = 14;
        open.depth[15] = 0.5;
        let mut out = vec![0u8; W * H];
        let fill = PolyFill::Flat { color: 5, shade: None };
        fill_polygon(&mut out, W, &square::<f32>(), &open.clip(), &fill);
        assert_eq!(out[14 * W + 12], 5);
        assert_eq!(out[15 * W + 12], 0);
        assert!((10..20).all(|y| out[y * W + 15] == 0));
    }

    #[test]
    fn gouraud_dithers_between_levels() {
        let mut cm = Colormap([[0; 256]; LIGHT_LEVELS]);
        for (l, row) in cm.0.iter_mut().enumerate() {
            *row = [l as u8; 256];
        }
        let mut verts = square::<f32>();
        verts[0].light = 10.0;
        verts[1].light = 10.0;
        verts[2].light = 11.0;
        verts[3].light = 11.0;
        let mut out = vec![0u8; W * H];
        let open = Open::new();
        let fill = PolyFill::Gouraud { color: 1, colormap: Some(&cm) };
        fill_polygon(&mut out, W, &verts, &open.clip(), &fill);
        let seen: Vec<u8> = (10..20).flat_map(|y| (10..20).map(move |x| (x, y))).map(|(x, y)| out[y * W + x]).collect();
        assert!(seen.iter().all(|&p| p == 10 || p == 11));
        assert!(seen.contains(&10) && seen.contains(&11));

        let fill = PolyFill::Gouraud { color: 9, colormap: None };
        fill_polygon(&mut out, W, &verts, &open.clip(), &fill);
        assert_eq!(out[15 * W + 15], 9, "fullbright");
    }

    #[test]
    fn texture_is_perspective_correct() {
        // Texel value = u * 8 + v + 1.
        let tex = Texture::from_fn("T", 8, 8, |u, v| (u * 8 + v + 1) as u8);
        // Left edge at z = 1, right edge at z = 2; u runs 0..8 across.
        let mut verts = vec![sv::<f32>(0.0, 0.0), sv(8.0, 0.0), sv(8.0, 8.0), sv(0.0, 8.0)];
        verts[1].inv_z = 0.5;
        verts[2].inv_z = 0.5;
        verts[1].u_oz = 4.0;
        verts[2].u_oz = 4.0;
        verts[2].v_oz = 4.0;
        verts[3].v_oz = 8.0;
        let mut out = vec![0u8; W * H];
        let open = Open::new();
        fill_polygon(&mut out, W, &verts, &open.clip(), &PolyFill::Textured { tex: &tex, shade: None });
        // Screen midpoint: 1/z = 0.75, u/z = 2 → u = 2.67, not the affine 4.
        let u_of = |p: u8| (p - 1) / 8;
        assert_eq!(u_of(out[4 * W + 4]), 2);
        assert_eq!(out[W], 2, "u 0, v 1 at the near edge");
    }

    fn filled(verts: &[ScreenVertex<f32>], clip: &ObjectClip<f32>) -> Vec<u8> {
        let mut out = vec![0u8; W * H];
        fill_polygon(&mut out, W, verts, clip, &PolyFill::Flat { color: 5, shade: None });
        out
    }

    #[test]
    fn edge_chains_ignore_winding_and_start_vertex() {
        let open = Open::<f32>::new();
        // Hexagon with a vertical left and right edge.
        let hex = vec![
            sv(4.0, 12.0),
            sv(12.0, 3.5),
            sv(24.0, 3.5),
            sv(28.0, 12.0),
            sv(28.0, 20.0),
            sv(14.0, 29.0),
            sv(4.0, 20.0),
        ];
        let reference = filled(&hex, &open.clip());
        assert_eq!(reference[16 * W + 16], 5);
        assert_eq!(reference[16 * W + 4], 5, "left edge column is inside");
        assert_eq!(reference[16 * W + 28], 0, "right edge column is outside");
        assert_eq!(reference[4 * W + 5], 0);

        for start in 0..hex.len() {
            let mut cw = hex.clone();
            cw.rotate_left(start);
            assert_eq!(filled(&cw, &open.clip()), reference, "start {start}");
            let ccw: Vec<_> = cw.iter().rev().copied().collect();
            assert_eq!(filled(&ccw, &open.clip()), reference, "reversed, start {start}");
        }

        // Columns skipped by the window still advance the chains.
        let mut narrow = Open::<f32>::new();
        narrow.top[..20].fill(1);
        narrow.bot[..20].fill(0);
        let right = filled(&hex, &narrow.clip());
        for y in 0..H {
            for x in 0..W {
                let want = if x < 20 { 0 } else { reference[y * W + x] };
                assert_eq!(right[y * W + x], want, "({x},{y})");
            }
        }
    }
}
