//! Floors and ceilings.
//!
//! Walls leave one [`EdgePair`] per drawn segment: the sector's own ceiling
//! and floor lines across the segment's columns. Per plane, those lines and
//! the current window give each column a run of rows; the runs are then
//! turned into horizontal spans, each lying at a single depth.

use crate::math::{ANGLE_MAX, Decimal, Vec2D};
use crate::world::{Colormap, SectorFlags, Texture, TextureId};

use super::columns::Lighting;
use super::limits::TEXELS_PER_UNIT;
use super::renderer::{FrameCtx, Software, ViewParams};
use super::rsector::SectorSurface;

/// A projected height line across a wall: `y(x) = y0 + (x - sx0) * step`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScreenLine<D> {
    pub sx0: D,
    pub y0: D,
    pub step: D,
}

impl<D: Decimal> ScreenLine<D> {
    #[inline]
    pub fn at(&self, x: i32) -> D {
        self.y0 + (D::from_int(x) - self.sx0) * self.step
    }
}

/// Top and bottom lines over an inclusive column range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgePair<D> {
    pub x0: i32,
    pub x1: i32,
    pub top: D,
    pub top_step: D,
    pub bot: D,
    pub bot_step: D,
}

impl<D: Decimal> EdgePair<D> {
    pub fn new(x0: i32, x1: i32, top: &ScreenLine<D>, bot: &ScreenLine<D>) -> Self {
        Self {
            x0,
            x1,
            top: top.at(x0),
            top_step: top.step,
            bot: bot.at(x0),
            bot_step: bot.step,
        }
    }

    #[inline]
    pub fn top_at(&self, x: i32) -> D {
        self.top + self.top_step.mul_int(x - self.x0)
    }

    #[inline]
    pub fn bot_at(&self, x: i32) -> D {
        self.bot + self.bot_step.mul_int(x - self.x0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Plane {
    Ceiling,
    Floor,
}

/// Turn per-column row runs `tops[x]..=bots[x]` over `x_lo..=x_hi` into
/// horizontal spans `emit(y, x_start, x_end)`. Empty columns have
/// `top > bot`.
pub fn extract_spans(
    tops: &[i32],
    bots: &[i32],
    x_lo: i32,
    x_hi: i32,
    height: i32,
    span_start: &mut [i32],
    mut emit: impl FnMut(i32, i32, i32),
) {
    let empty = (height, -1);
    let (mut t1, mut b1) = empty;
    for x in x_lo..=x_hi + 1 {
        let (t2, b2) = if x <= x_hi {
            let (t, b) = (tops[x as usize], bots[x as usize]);
            if t > b { empty } else { (t, b) }
        } else {
            empty
        };

        let (mut pt, mut pb) = (t1, b1);
        let (mut ct, mut cb) = (t2, b2);
        while pt < ct && pt <= pb {
            emit(pt, span_start[pt as usize], x - 1);
            pt += 1;
        }
        while pb > cb && pb >= pt {
            emit(pb, span_start[pb as usize], x - 1);
            pb -= 1;
        }
        while ct < pt && ct <= cb {
            span_start[ct as usize] = x;
            ct += 1;
        }
        while cb > pb && cb >= ct {
            span_start[cb as usize] = x;
            cb -= 1;
        }
        (t1, b1) = (t2, b2);
    }
}

/// Texture mapping for one flat plane.
struct FlatMapper<'a, D> {
    view: &'a ViewParams<D>,
    col_ray: &'a [D],
    lighting: &'a Lighting,
    colormap: &'a Colormap,
    tex: &'a Texture,
    /// Plane height relative to the eye.
    h_rel: D,
    offset: Vec2D<D>,
    ambient: i32,
    width: usize,
}

impl<D: Decimal> FlatMapper<'_, D> {
    fn span(&self, out: &mut [u8], y: i32, xa: i32, xb: i32) {
        let view = self.view;
        let dy = view.horizon - D::from_int(y);
        if dy == D::ZERO {
            return;
        }
        let z = self.h_rel / dy * view.focal_y;
        if z <= D::ZERO {
            return;
        }

        let texels = D::from_int(TEXELS_PER_UNIT);
        let (s, c) = (view.sin_yaw, view.cos_yaw);
        let vx = self.col_ray[xa as usize] * z;
        let wx = view.eye.x + c * vx + s * z;
        let wz = view.eye.z - s * vx + c * z;
        let mut u = wx * texels + self.offset.x;
        let mut v = wz * texels + self.offset.z;
        let per_col = z / view.focal * texels;
        let du = c * per_col;
        let dv = -(s * per_col);

        let shade = self
            .lighting
            .shade(view, self.ambient, 0, z)
            .map(|l| &self.colormap[l]);
        let len = self.tex.pixels.len();
        let row = y as usize * self.width;
        for x in xa..=xb {
            let ui = u.floor_to_int() & 63;
            let vi = v.floor_to_int() & 63;
            let t = self.tex.pixels[((ui << 6) | vi) as usize % len];
            out[row + x as usize] = match shade {
                Some(cmap) => cmap[t as usize],
                None => t,
            };
            u += du;
            v += dv;
        }
    }
}

impl<D: Decimal> Software<D> {
    /// Ceiling and floor of one sector visit.
    pub(super) fn draw_flats(
        &mut self,
        ctx: &FrameCtx,
        out: &mut [u8],
        surface: &SectorSurface<D>,
        level: usize,
        edges: &[EdgePair<D>],
    ) {
        for plane in [Plane::Ceiling, Plane::Floor] {
            if !self.flat_bounds(plane, level, edges) {
                continue;
            }
            let (own_sky, tex, height, offset) = match plane {
                Plane::Ceiling => (
                    surface.flags.contains(SectorFlags::EXTERIOR),
                    surface.ceil_tex,
                    surface.ceil_h,
                    surface.ceil_off,
                ),
                Plane::Floor => (
                    surface.flags.contains(SectorFlags::PIT),
                    surface.floor_tex,
                    surface.floor_h,
                    surface.floor_off,
                ),
            };
            // In a sky sector an untextured plane opens onto the sky too.
            let sky_sector = surface.flags.intersects(SectorFlags::EXTERIOR | SectorFlags::PIT);
            if own_sky || (sky_sector && tex.is_none()) {
                self.draw_sky(ctx, out, tex);
                continue;
            }
            let Some(id) = tex else {
                continue;
            };
            let tex = match ctx.bank.texture(id) {
                Ok(t) if !t.pixels.is_empty() => t,
                Ok(_) => continue,
                Err(e) => {
                    log::debug!("flat skipped: {e}");
                    continue;
                }
            };

            let mapper = FlatMapper {
                view: &self.view,
                col_ray: &self.col_ray,
                lighting: &self.lighting,
                colormap: ctx.bank.colormap(),
                tex,
                h_rel: height - self.view.eye.y,
                offset,
                ambient: surface.ambient,
                width: self.width,
            };
            let mut spans = 0;
            extract_spans(
                &self.column_top,
                &self.column_bot,
                self.window_x0,
                self.window_x1,
                self.height as i32,
                &mut self.span_start,
                |y, xa, xb| {
                    mapper.span(out, y, xa, xb);
                    spans += 1;
                },
            );
            self.stats.flat_spans += spans;
        }
    }

    /// Fill the per-column row runs of `plane`. Returns whether any column
    /// has rows.
    fn flat_bounds(&mut self, plane: Plane, level: usize, edges: &[EdgePair<D>]) -> bool {
        let Some(range) = self.level_range(level) else {
            return false;
        };
        let (x_lo, x_hi) = (self.window_x0, self.window_x1);
        if x_lo > x_hi {
            return false;
        }
        for x in x_lo..=x_hi {
            self.column_top[x as usize] = self.height as i32;
            self.column_bot[x as usize] = -1;
        }

        let win_top = &self.window_top[range.clone()];
        let win_bot = &self.window_bot[range];
        let mut any = false;
        for e in edges {
            for x in e.x0.max(x_lo)..=e.x1.min(x_hi) {
                let (wt, wb) = (win_top[x as usize], win_bot[x as usize]);
                let (top, bot) = match plane {
                    Plane::Ceiling => (wt, wb.min(e.top_at(x).ceil_to_int() - 1)),
                    Plane::Floor => (wt.max(e.bot_at(x).ceil_to_int()), wb),
                };
                if top <= bot {
                    self.column_top[x as usize] = top;
                    self.column_bot[x as usize] = bot;
                    any = true;
                }
            }
        }
        any
    }

    /// Sky columns over the current flat bounds: scrolled by yaw and pitch,
    /// fullbright, no depth.
    fn draw_sky(&mut self, ctx: &FrameCtx, out: &mut [u8], fallback: Option<TextureId>) {
        let sky = ctx.level.sky;
        let Some(id) = sky.texture.or(fallback) else {
            return;
        };
        let tex = match ctx.bank.texture(id) {
            Ok(t) if t.w > 0 && t.h > 0 => t,
            Ok(_) => return,
            Err(e) => {
                log::debug!("sky skipped: {e}");
                return;
            }
        };

        let h = tex.h as i32;
        let v_base = h / 2 + D::from_f32(sky.parallax.y).floor_to_int() - self.view.horizon.floor_to_int();
        // Texels per angle unit; scaled before the multiply so Fixed16 stays in range.
        let u_scale = D::from_f32(sky.parallax.x).mul_int(tex.w as i32) / D::from_int(ANGLE_MAX);
        for x in self.window_x0..=self.window_x1 {
            let (top, bot) = (self.column_top[x as usize], self.column_bot[x as usize]);
            if top > bot {
                continue;
            }
            let angle = self.view.yaw + self.col_angle[x as usize];
            let u = u_scale.mul_int(angle.units()).floor_to_int();
            let column = tex.column(u);
            for y in top..=bot {
                let v = (y + v_base).clamp(0, h - 1);
                out[y as usize * self.width + x as usize] = column[v as usize];
            }
            self.stats.sky_columns += 1;
        }
    }
}

/*======================================================================*/
/*                               Tests                                  */
/*======================================================================*/
#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Fixed16;

    /// Every emitted span lies inside the runs and every cell is covered once.
    fn check_spans(tops: &[i32], bots: &[i32], height: i32) -> usize {
        let w = tops.len() as i32;
        let mut covered = vec![0u8; (w * height) as usize];
        let mut start = vec![0; height as usize];
        let mut count = 0;
        extract_spans(tops, bots, 0, w - 1, height, &mut start, |y, xa, xb| {
            assert!(xa <= xb, "span {y}: {xa}..{xb}");
            for x in xa..=xb {
                assert!(tops[x as usize] <= y && y <= bots[x as usize], "cell ({x},{y})");
                covered[(y * w + x) as usize] += 1;
            }
            count += 1;
        });
        for x in 0..w {
            for y in 0..height {
                let inside = tops[x as usize] <= y && y <= bots[x as usize];
                assert_eq!(covered[(y * w + x) as usize], inside as u8, "cell ({x},{y})");
            }
        }
        count
    }

    #[test]
    fn rectangle_is_one_span_per_row() {
        let tops = [2; 5];
        let bots = [4; 5];
        assert_eq!(check_spans(&tops, &bots, 8), 3);
    }

    #[test]
    fn ragged_runs_are_covered_exactly_once() {
        let tops = [0, 1, 3, 6, 2, 8, 0, 4];
        let bots = [3, 5, 4, 7, 2, -1, 7, 5];
        check_spans(&tops, &bots, 8);
    }

    #[test]
    fn disjoint_neighbours_close_and_open() {
        let tops = [0, 5, 0];
        let bots = [2, 7, 2];
        // Rows 0..=2 split around the middle column.
        assert_eq!(check_spans(&tops, &bots, 8), 9);
    }

    #[test]
    fn edge_pair_steps_match_line() {
        let line = ScreenLine {
            sx0: Fixed16::from_f32(10.5),
            y0: Fixed16::from_f32(20.0),
            step: Fixed16::from_f32(0.25),
        };
        let e = EdgePair::new(12, 40, &line, &line);
        for x in [12, 20, 40] {
            assert_eq!(e.top_at(x), line.at(x));
        }
        assert!((e.bot_at(40).to_f32() - (20.0 + 29.5 * 0.25)).abs() < 1e-3);
    }
}
