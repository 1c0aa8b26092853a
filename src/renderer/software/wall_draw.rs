//! Wall columns: solid walls, portal steps, signs and see-through mids.

use crate::math::Decimal;
use crate::world::{TextureBank, WallFlags};

use super::columns::{ColumnJob, draw_column, draw_column_clamped, draw_column_masked};
use super::flat::{EdgePair, ScreenLine};
use super::limits::{MAX_ADJOIN_SEGMENTS, TEXELS_PER_UNIT};
use super::renderer::{FrameCtx, LevelScratch, Software, ViewParams};
use super::rsector::{RWallTexture, WallDrawFlags, WallDrawMode};
use super::sector::AdjoinSpan;
use super::wall::WallSegment;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Fill {
    Opaque,
    Masked,
    /// Masked, no vertical or horizontal wrap.
    Sign,
}

/// What one screen column of a wall shares between its sections.
#[derive(Clone, Copy)]
struct Column<'a, D> {
    x: i32,
    /// Window rows.
    wt: i32,
    wb: i32,
    /// Texel U from the wall start.
    u: D,
    shade: Option<&'a [u8; 256]>,
}

/// Line of height `h` (world) across the segment.
fn height_line<D: Decimal>(view: &ViewParams<D>, seg: &WallSegment<D>, h: D) -> ScreenLine<D> {
    let h_rel = h - view.eye.y;
    let y0 = view.project_y(h_rel, seg.v0.z);
    let y1 = view.project_y(h_rel, seg.v1.z);
    let span = seg.sx1 - seg.sx0;
    let step = if span > D::HALF {
        (y1 - y0) / span
    } else {
        D::ZERO
    };
    ScreenLine {
        sx0: seg.sx0,
        y0,
        step,
    }
}

/// Rows `ceil(top) .. ceil(bot)-1` of one section, texture anchored at `top`.
#[allow(clippy::too_many_arguments)]
fn section<D: Decimal>(
    bank: &TextureBank,
    out: &mut [u8],
    width: usize,
    col: &Column<D>,
    top: D,
    bot: D,
    texel_h: D,
    slot: Option<&RWallTexture<D>>,
    fill: Fill,
) {
    let Some(slot) = slot else {
        return;
    };
    let span = bot - top;
    if span <= D::ZERO {
        return;
    }
    let y0 = top.ceil_to_int().max(col.wt);
    let y1 = (bot.ceil_to_int() - 1).min(col.wb);
    if y0 > y1 {
        return;
    }
    let tex = match bank.texture(slot.tex) {
        Ok(t) if t.w > 0 => t,
        Ok(_) => return,
        Err(e) => {
            log::debug!("wall section skipped: {e}");
            return;
        }
    };

    let v_step = texel_h / span;
    let from_top = (D::from_int(y0) - top) * v_step;
    let mut job = ColumnJob {
        x: col.x,
        y0,
        y1,
        texels: &[],
        v: from_top + slot.v_off,
        v_step,
        shade: col.shade,
    };
    match fill {
        Fill::Opaque => {
            job.texels = tex.column((col.u + slot.u_off).floor_to_int());
            draw_column(out, width, &job);
        }
        Fill::Masked => {
            job.texels = tex.column((col.u + slot.u_off).floor_to_int());
            draw_column_masked(out, width, &job);
        }
        Fill::Sign => {
            let u = (col.u - slot.u_off).floor_to_int();
            if u < 0 || u >= tex.w as i32 {
                return;
            }
            job.texels = tex.column(u);
            job.v = from_top - slot.v_off;
            draw_column_clamped(out, width, &job);
        }
    }
}

impl<D: Decimal> Software<D> {
    /// Draw one merged segment, write its depth, record its flat edges and,
    /// for portals with an opening, queue the adjoin.
    pub(super) fn draw_wall(
        &mut self,
        ctx: &FrameCtx,
        out: &mut [u8],
        seg: &WallSegment<D>,
        level: usize,
        scratch: &mut LevelScratch<D>,
    ) {
        let Some(range) = self.level_range(level) else {
            return;
        };
        let Some(sector) = self.sectors.get(seg.sector as usize) else {
            return;
        };
        let Some(wall) = sector.walls.get(seg.wall as usize).copied() else {
            return;
        };
        let surf = sector.surface;
        let next = wall
            .adjoin
            .and_then(|n| self.sectors.get(n as usize))
            .map(|s| s.surface);
        let mode = match next {
            Some(_) => wall.draw_flags.mode(),
            None => WallDrawMode::Solid,
        };

        let view = self.view;
        let texel = D::from_int(TEXELS_PER_UNIT);
        let ceil = height_line(&view, seg, surf.ceil_h);
        let floor = height_line(&view, seg, surf.floor_h);
        let (next_ceil_h, next_floor_h) = next.map_or((surf.ceil_h, surf.floor_h), |n| (n.ceil_h, n.floor_h));
        let next_ceil = height_line(&view, seg, next_ceil_h);
        let next_floor = height_line(&view, seg, next_floor_h);

        let h_mid = (surf.ceil_h - surf.floor_h) * texel;
        let h_top = (surf.ceil_h - next_ceil_h) * texel;
        let h_bot = (next_floor_h - surf.floor_h) * texel;

        let top_step = wall.draw_flags.contains(WallDrawFlags::TOP);
        let bot_step = wall.draw_flags.contains(WallDrawFlags::BOTTOM);
        let open_top = if top_step { next_ceil } else { ceil };
        let open_bot = if bot_step { next_floor } else { floor };

        let bank = ctx.bank;
        let colormap = bank.colormap();
        let width = self.width;
        let flip = wall.flags.contains(WallFlags::FLIP_HORIZ);
        let sign_lit = !wall.flags.contains(WallFlags::ILLUM_SIGN);
        let mut any_open = false;

        for x in seg.x0..=seg.x1 {
            let xi = x as usize;
            let ray = self.col_ray[xi];
            let z = seg.depth_at_ray(ray);
            let mut u = seg.texel_u(z, ray);
            if flip {
                u = wall.texel_len - u;
            }
            let shade = self
                .lighting
                .shade(&view, surf.ambient, wall.light, z)
                .map(|l| &colormap[l]);
            let col = Column {
                x,
                wt: self.window_top[range.start + xi],
                wb: self.window_bot[range.start + xi],
                u,
                shade,
            };
            let (yc, yf) = (ceil.at(x), floor.at(x));
            let (ync, ynf) = (next_ceil.at(x), next_floor.at(x));

            match mode {
                WallDrawMode::Solid => {
                    section(bank, out, width, &col, yc, yf, h_mid, wall.mid.as_ref(), Fill::Opaque)
                }
                WallDrawMode::Mask => {}
                WallDrawMode::Top => {
                    section(bank, out, width, &col, yc, ync, h_top, wall.top.as_ref(), Fill::Opaque)
                }
                WallDrawMode::Bottom => {
                    section(bank, out, width, &col, ynf, yf, h_bot, wall.bottom.as_ref(), Fill::Opaque)
                }
                WallDrawMode::TopBottom => {
                    section(bank, out, width, &col, yc, ync, h_top, wall.top.as_ref(), Fill::Opaque);
                    section(bank, out, width, &col, ynf, yf, h_bot, wall.bottom.as_ref(), Fill::Opaque);
                }
            }

            if let Some(sign) = wall.sign.as_ref() {
                let host = match mode {
                    WallDrawMode::Solid => Some((yc, yf, h_mid)),
                    _ if top_step => Some((yc, ync, h_top)),
                    _ if bot_step => Some((ynf, yf, h_bot)),
                    _ => None,
                };
                if let Some((top, bot, texel_h)) = host {
                    let sign_col = Column {
                        shade: if sign_lit { shade } else { None },
                        ..col
                    };
                    section(bank, out, width, &sign_col, top, bot, texel_h, Some(sign), Fill::Sign);
                }
            }

            self.depth[range.start + xi] = z;

            if mode != WallDrawMode::Solid {
                let ot = open_top.at(x).ceil_to_int().max(col.wt);
                let ob = (open_bot.at(x).ceil_to_int() - 1).min(col.wb);
                any_open |= ot <= ob;
            }
        }

        scratch.edges.push(EdgePair::new(seg.x0, seg.x1, &ceil, &floor));
        self.stats.segments_drawn += 1;

        let Some(next_id) = wall.adjoin.filter(|_| next.is_some() && any_open) else {
            return;
        };
        if scratch.adjoins.len() >= MAX_ADJOIN_SEGMENTS {
            log::error!(
                "adjoin list full ({MAX_ADJOIN_SEGMENTS}): sector {} wall {} not entered",
                seg.sector,
                seg.wall
            );
            self.stats.overflows += 1;
            return;
        }
        scratch.adjoins.push(AdjoinSpan {
            next: next_id,
            seg: *seg,
            opening: EdgePair::new(seg.x0, seg.x1, &open_top, &open_bot),
            trans_mid: wall.flags.contains(WallFlags::ADJ_MID_TRANS) && wall.mid.is_some(),
            open_top_h: if top_step { next_ceil_h } else { surf.ceil_h },
            open_bot_h: if bot_step { next_floor_h } else { surf.floor_h },
        });
    }

    /// Alpha-tested mid texture over a portal opening, drawn after the
    /// sector behind it.
    pub(super) fn draw_trans_mid(&mut self, ctx: &FrameCtx, out: &mut [u8], adj: &AdjoinSpan<D>, level: usize) {
        let Some(range) = self.level_range(level) else {
            return;
        };
        let seg = &adj.seg;
        let Some(sector) = self.sectors.get(seg.sector as usize) else {
            return;
        };
        let Some(wall) = sector.walls.get(seg.wall as usize).copied() else {
            return;
        };
        let ambient = sector.surface.ambient;
        let texel_h = (adj.open_top_h - adj.open_bot_h) * D::from_int(TEXELS_PER_UNIT);
        let colormap = ctx.bank.colormap();
        let flip = wall.flags.contains(WallFlags::FLIP_HORIZ);

        for x in seg.x0.max(self.window_x0)..=seg.x1.min(self.window_x1) {
            let xi = x as usize;
            let ray = self.col_ray[xi];
            let z = seg.depth_at_ray(ray);
            let mut u = seg.texel_u(z, ray);
            if flip {
                u = wall.texel_len - u;
            }
            let shade = self
                .lighting
                .shade(&self.view, ambient, wall.light, z)
                .map(|l| &colormap[l]);
            let col = Column {
                x,
                wt: self.window_top[range.start + xi],
                wb: self.window_bot[range.start + xi],
                u,
                shade,
            };
            section(
                ctx.bank,
                out,
                self.width,
                &col,
                adj.opening.top_at(x),
                adj.opening.bot_at(x),
                texel_h,
                wall.mid.as_ref(),
                Fill::Masked,
            );
        }
    }
}

/*======================================================================*/
/*                               Tests                                  */
/*======================================================================*/
