//! Sector/portal traversal.
//!
//! Each visit works inside a window: a column range plus, per column, the
//! rows still open. Level 0 is the whole screen. A portal wall narrows the
//! window to its opening and the sector behind it is drawn one level deeper
//! with its own copy of the window rows.

use std::mem;

use crate::math::Decimal;
use crate::world::{SectorId, WallId};

use super::flat::EdgePair;
use super::limits::{MAX_ADJOIN_DEPTH, MAX_WALL_SEGMENTS};
use super::merge::merge_segments;
use super::renderer::{AdjoinSave, FrameCtx, Software};
use super::wall::{WallSegment, process_wall};

/// A portal seen this visit, with the rows it leaves open.
#[derive(Clone, Copy, Debug)]
pub struct AdjoinSpan<D> {
    pub next: SectorId,
    pub seg: WallSegment<D>,
    pub opening: EdgePair<D>,
    /// Draw the wall's mid texture over the opening afterwards.
    pub trans_mid: bool,
    /// World heights bounding the opening.
    pub open_top_h: D,
    pub open_bot_h: D,
}

impl<D: Decimal> Software<D> {
    pub(super) fn draw_sector(&mut self, ctx: &FrameCtx, out: &mut [u8], id: SectorId, level: usize) {
        if level >= MAX_ADJOIN_DEPTH {
            return;
        }
        let Some(sec) = self.sectors.get_mut(id as usize) else {
            log::warn!("portal into missing sector {id}");
            return;
        };
        if sec.last_drawn_frame != self.frame {
            sec.last_drawn_frame = self.frame;
            self.stats.sectors_drawn += 1;
        }
        self.stats.max_level = self.stats.max_level.max(level as u32);
        self.process_sector(id);

        let mut scratch = mem::take(&mut self.levels[level]);
        scratch.input.clear();
        scratch.edges.clear();
        scratch.adjoins.clear();

        let sec = &self.sectors[id as usize];
        for seg in &self.frame_segs[sec.seg_start..sec.seg_start + sec.seg_count] {
            let x0 = seg.x0.max(self.window_x0);
            let x1 = seg.x1.min(self.window_x1);
            if x0 <= x1 {
                scratch.input.push(WallSegment { x0, x1, ..*seg });
            }
        }
        let surface = sec.surface;
        self.stats.overflows += merge_segments(&scratch.input, &mut scratch.merged, MAX_WALL_SEGMENTS);

        for i in 0..scratch.merged.len() {
            let seg = scratch.merged[i];
            self.draw_wall(ctx, out, &seg, level, &mut scratch);
        }
        self.draw_flats(ctx, out, &surface, level, &scratch.edges);

        for adj in &scratch.adjoins {
            if let Some((x0, x1)) = self.open_child_window(adj, level) {
                self.save_stack.push(AdjoinSave {
                    window_x0: self.window_x0,
                    window_x1: self.window_x1,
                });
                self.window_x0 = x0;
                self.window_x1 = x1;
                self.draw_sector(ctx, out, adj.next, level + 1);
                if let Some(saved) = self.save_stack.pop() {
                    self.window_x0 = saved.window_x0;
                    self.window_x1 = saved.window_x1;
                }
            }
            if adj.trans_mid {
                self.draw_trans_mid(ctx, out, adj, level);
            }
        }

        self.draw_objects(ctx, out, id, level, &mut scratch.objects);
        self.levels[level] = scratch;
    }

    /// Project the sector's walls once per frame.
    fn process_sector(&mut self, id: SectorId) {
        let frame = self.frame;
        let view = self.view;
        let Some(sec) = self.sectors.get_mut(id as usize) else {
            return;
        };
        if sec.last_processed_frame == frame {
            return;
        }
        sec.last_processed_frame = frame;

        for (dst, src) in sec.verts_view.iter_mut().zip(&sec.verts_world) {
            *dst = view.to_view2(*src);
        }

        sec.seg_start = self.frame_segs.len();
        let mut dropped = 0;
        for (w, wall) in sec.walls.iter_mut().enumerate() {
            wall.visible = false;
            let (Some(&a), Some(&b)) = (sec.verts_view.get(wall.v0), sec.verts_view.get(wall.v1))
            else {
                continue;
            };
            let Some(seg) = process_wall(&view, id, w as WallId, a, b, wall.texel_len) else {
                continue;
            };
            wall.visible = true;
            if self.frame_segs.len() >= MAX_WALL_SEGMENTS {
                dropped += 1;
                continue;
            }
            self.frame_segs.push(seg);
        }
        sec.seg_count = self.frame_segs.len() - sec.seg_start;
        self.stats.segments_processed += sec.seg_count as u32;

        if dropped > 0 {
            log::error!("wall segment table full ({MAX_WALL_SEGMENTS}): sector {id} drops {dropped} walls");
            self.stats.overflows += 1;
        }
    }

    /// Narrow the window for the level behind `adj`. Returns the open
    /// column range, or `None` when the portal is closed everywhere.
    fn open_child_window(&mut self, adj: &AdjoinSpan<D>, level: usize) -> Option<(i32, i32)> {
        let parent = self.level_range(level)?;
        let child = self.level_range(level + 1)?;
        let x0 = adj.seg.x0.max(self.window_x0);
        let x1 = adj.seg.x1.min(self.window_x1);

        let mut open: Option<(i32, i32)> = None;
        for x in x0..=x1 {
            let xi = x as usize;
            let top = self.window_top[parent.start + xi].max(adj.opening.top_at(x).ceil_to_int());
            let bot = self.window_bot[parent.start + xi].min(adj.opening.bot_at(x).ceil_to_int() - 1);
            self.window_top[child.start + xi] = top;
            self.window_bot[child.start + xi] = bot;
            self.depth[child.start + xi] = D::MAX;
            if top <= bot {
                open = Some(open.map_or((x, x), |(first, _)| (first, x)));
            }
        }
        open
    }
}

/*======================================================================*/
/*                               Tests                                  */
/*======================================================================*/
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderConfig;
    use crate::math::{Angle, Fixed16};
    use crate::renderer::{FrameStats, Renderer, SectorDirty};
    use crate::renderer::software::limits::MAX_ADJOIN_SEGMENTS;
    use crate::renderer::software::renderer::LevelScratch;
    use crate::world::{
        Camera, Level, LevelBuilder, SectorFlags, SectorSpec, Sky, Texture, TextureBank,
        TextureId, WallFlags, WallTexture,
    };
    use glam::{Vec3, vec2};

    const W: usize = 320;
    const H: usize = 200;
    const WALL_A: u8 = 10;
    const WALL_B: u8 = 20;
    const FLOOR: u8 = 30;
    const CEIL: u8 = 40;
    const SKY: u8 = 77;

    struct Ids {
        wall_a: TextureId,
        wall_b: TextureId,
        floor: TextureId,
        ceil: TextureId,
        sky: TextureId,
    }

    fn bank() -> (TextureBank, Ids) {
        let mut bank = TextureBank::default_with_checker();
        let mut add = |name: &str, idx: u8| bank.insert(name, Texture::solid(name, 64, 64, idx)).unwrap();
        let ids = Ids {
            wall_a: add("WALLA", WALL_A),
            wall_b: add("WALLB", WALL_B),
            floor: add("FLOOR", FLOOR),
            ceil: add("CEIL", CEIL),
            sky: add("SKY", SKY),
        };
        (bank, ids)
    }

    /// A: x -4..4, z -4..8, height 0..10. B: z 8..16, height 0..6.
    fn two_rooms(ids: &Ids) -> Level {
        let mut b = LevelBuilder::new("two");
        b.sector(
            SectorSpec::rect(vec2(-4.0, -4.0), vec2(4.0, 8.0), 0.0, 10.0)
                .walls(ids.wall_a)
                .floor_tex(ids.floor)
                .ceil_tex(ids.ceil),
        );
        b.sector(
            SectorSpec::rect(vec2(-4.0, 8.0), vec2(4.0, 16.0), 0.0, 6.0)
                .walls(ids.wall_b)
                .floor_tex(ids.floor)
                .ceil_tex(ids.ceil),
        );
        b.build().unwrap()
    }

    fn eye() -> Camera {
        Camera::new(Vec3::new(0.0, 5.0, 0.0), Angle::ZERO, 0)
    }

    fn render<D: Decimal>(level: &Level, bank: &TextureBank, cam: &Camera) -> (Software<D>, Vec<u8>) {
        let mut r = Software::<D>::new(RenderConfig::default());
        r.set_resolution(W, H);
        r.copy_level(level);
        r.set_camera(cam);
        let mut out = vec![0u8; W * H];
        r.draw_frame(level, bank, &mut out);
        (r, out)
    }

    fn px(out: &[u8], x: usize, y: usize) -> u8 {
        out[y * W + x]
    }

    fn check_two_rooms<D: Decimal>() {
        let (bank, ids) = bank();
        let level = two_rooms(&ids);
        let (r, out) = render::<D>(&level, &bank, &eye());

        // A's top step above B's lower ceiling.
        for x in 80..=239 {
            for y in 0..80 {
                assert_eq!(px(&out, x, y), WALL_A, "top section at ({x},{y})");
            }
        }
        let top = r.window_top(1).unwrap();
        let bot = r.window_bot(1).unwrap();
        for x in 80..=239 {
            assert_eq!(top[x], 80, "child window top at {x}");
            assert_eq!(bot[x], 199, "child window bottom at {x}");
        }

        // Through the portal: B's ceiling, far wall and floor.
        assert_eq!(px(&out, 160, 85), CEIL);
        assert_eq!(px(&out, 160, 100), WALL_B);
        assert_eq!(px(&out, 160, 195), FLOOR);
        // A's side walls.
        assert_eq!(px(&out, 40, 100), WALL_A);
        assert_eq!(px(&out, 280, 100), WALL_A);

        let stats = r.stats();
        assert_eq!(stats.sectors_drawn, 2);
        assert_eq!(stats.max_level, 1);
        assert_eq!(stats.overflows, 0);
        let z = r.depth_1d(0).unwrap()[160].to_f32();
        assert!((z - 8.0).abs() < 0.05, "portal depth {z}");
    }

    #[test]
    fn two_sector_scenario_float() {
        check_two_rooms::<f32>();
    }

    #[test]
    fn two_sector_scenario_fixed() {
        check_two_rooms::<Fixed16>();
    }

    #[test]
    fn raising_neighbour_floor_adds_bottom_step() {
        let (bank, ids) = bank();
        let mut level = two_rooms(&ids);
        let (mut r, out) = render::<f32>(&level, &bank, &eye());
        assert_eq!(px(&out, 160, 180), FLOOR);

        level.sectors[1].floor_h = 2.0;
        r.update_sector(&level, 1, SectorDirty::SURFACE);
        let mut out = vec![0u8; W * H];
        r.draw_frame(&level, &bank, &mut out);
        // B's floor line at z = 8 is now row 160.
        assert_eq!(px(&out, 160, 159), FLOOR);
        assert_eq!(px(&out, 160, 180), WALL_A);
        assert_eq!(r.window_bot(1).unwrap()[160], 159);
    }

    #[test]
    fn transparent_mid_is_drawn_over_the_opening() {
        let (mut bank, ids) = bank();
        // Opaque top half, see-through bottom half.
        let grate = bank
            .insert("GRATE", Texture::from_fn("GRATE", 64, 64, |_, v| if v < 32 { 5 } else { 0 }))
            .unwrap();
        let mut level = two_rooms(&ids);
        let portal = level.sectors[0].portal_to(1).unwrap() as usize;
        let wall = &mut level.sectors[0].walls[portal];
        wall.flags |= WallFlags::ADJ_MID_TRANS;
        wall.mid = Some(WallTexture::new(grate));

        let (_, out) = render::<f32>(&level, &bank, &eye());
        // Opening rows 80..=199 carry 48 texels: v = 32 at row 160.
        assert_eq!(px(&out, 160, 100), 5);
        assert_eq!(px(&out, 160, 195), FLOOR);
        assert_eq!(px(&out, 160, 40), WALL_A);
    }

    fn big_room(ids: &Ids, flags: SectorFlags) -> Level {
        let mut b = LevelBuilder::new("yard");
        b.sector(
            SectorSpec::rect(vec2(-32.0, -32.0), vec2(32.0, 32.0), 0.0, 10.0)
                .walls(ids.wall_a)
                .floor_tex(ids.floor)
                .ceil_tex(ids.ceil)
                .flags(flags),
        );
        b.sky(Sky {
            texture: Some(ids.sky),
            parallax: vec2(1.0, 0.0),
        });
        b.build().unwrap()
    }

    fn check_sky<D: Decimal>() {
        let (bank, ids) = bank();

        let level = big_room(&ids, SectorFlags::EXTERIOR);
        let (r, out) = render::<D>(&level, &bank, &eye());
        assert_eq!(px(&out, 160, 10), SKY);
        assert_eq!(px(&out, 160, 190), FLOOR);
        assert!(r.stats().sky_columns > 0);
        // Far wall at z = 32 still owns the depth of the column.
        let z = r.depth_1d(0).unwrap()[160].to_f32();
        assert!((z - 32.0).abs() < 0.05, "depth {z}");

        let level = big_room(&ids, SectorFlags::empty());
        let (r, out) = render::<D>(&level, &bank, &eye());
        assert_eq!(px(&out, 160, 10), CEIL);
        assert_eq!(r.stats().sky_columns, 0);
    }

    fn check_untextured_floor_opens_to_sky<D: Decimal>() {
        let (bank, ids) = bank();
        let mut level = big_room(&ids, SectorFlags::EXTERIOR);
        level.sectors[0].floor_tex = None;
        let (r, out) = render::<D>(&level, &bank, &eye());
        assert_eq!(px(&out, 160, 10), SKY);
        assert_eq!(px(&out, 160, 190), SKY);
        assert!(r.stats().sky_columns > 0);

        // Without a sky flag the untextured floor is just skipped.
        let mut level = big_room(&ids, SectorFlags::empty());
        level.sectors[0].floor_tex = None;
        let (_, out) = render::<D>(&level, &bank, &eye());
        assert_eq!(px(&out, 160, 190), 0);
    }

    #[test]
    fn untextured_floor_opens_to_sky_float() {
        check_untextured_floor_opens_to_sky::<f32>();
    }

    #[test]
    fn untextured_floor_opens_to_sky_fixed() {
        check_untextured_floor_opens_to_sky::<Fixed16>();
    }

    /// Centre column of a sky whose texel value is its column index.
    fn sky_column_at_yaw<D: Decimal>(units: i32, parallax_x: f32) -> u8 {
        let (mut bank, ids) = bank();
        let ramp = bank
            .insert("RAMP", Texture::from_fn("RAMP", 256, 64, |u, _| u as u8))
            .unwrap();
        let mut level = big_room(&ids, SectorFlags::EXTERIOR);
        level.sky = Sky {
            texture: Some(ramp),
            parallax: vec2(parallax_x, 0.0),
        };
        let cam = Camera::new(Vec3::new(0.0, 5.0, 0.0), Angle::new(units), 0);
        let (_, out) = render::<D>(&level, &bank, &cam);
        px(&out, 160, 10)
    }

    #[test]
    fn sky_scrolls_with_yaw_in_both_modes() {
        // 256 texels per turn: one texel every 64 angle units.
        assert_eq!(sky_column_at_yaw::<f32>(64 * 37, 1.0), 37);
        assert_eq!(sky_column_at_yaw::<Fixed16>(64 * 37, 1.0), 37);
        // 384 texels per turn: 2368 * 3 / 128 = 55.5.
        assert_eq!(sky_column_at_yaw::<f32>(64 * 37, 1.5), 55);
        assert_eq!(sky_column_at_yaw::<Fixed16>(64 * 37, 1.5), 55);
    }

    #[test]
    fn sky_sector_float() {
        check_sky::<f32>();
    }

    #[test]
    fn sky_sector_fixed() {
        check_sky::<Fixed16>();
    }

    #[test]
    fn recursion_stops_at_depth_cap() {
        let (bank, ids) = bank();
        let mut b = LevelBuilder::new("corridor");
        for i in 0..(MAX_ADJOIN_DEPTH + 5) {
            let z = i as f32 * 4.0;
            b.sector(
                SectorSpec::rect(vec2(-4.0, z), vec2(4.0, z + 4.0), 0.0, 10.0)
                    .walls(ids.wall_a)
                    .floor_tex(ids.floor)
                    .ceil_tex(ids.ceil),
            );
        }
        let level = b.build().unwrap();
        let cam = Camera::new(Vec3::new(0.0, 5.0, 1.0), Angle::ZERO, 0);
        let (r, _) = render::<f32>(&level, &bank, &cam);
        let stats = r.stats();
        assert_eq!(stats.max_level as usize, MAX_ADJOIN_DEPTH - 1);
        assert_eq!(stats.sectors_drawn as usize, MAX_ADJOIN_DEPTH);
        assert_eq!(stats.overflows, 0);
    }

    #[test]
    fn full_segment_table_drops_the_remaining_walls() {
        let (bank, ids) = bank();
        let level = two_rooms(&ids);
        let (mut r, _) = render::<f32>(&level, &bank, &eye());
        let filler = r.frame_segs[0];

        // Next frame, one slot left before the sector is processed.
        r.frame += 1;
        r.stats = FrameStats::default();
        r.frame_segs.clear();
        r.frame_segs.resize(MAX_WALL_SEGMENTS - 1, filler);
        r.process_sector(0);

        // The portal and both side walls face the camera; only one fits.
        let sec = &r.sectors[0];
        assert_eq!(sec.seg_start, MAX_WALL_SEGMENTS - 1);
        assert_eq!(sec.seg_count, 1);
        assert_eq!(r.frame_segs.len(), MAX_WALL_SEGMENTS);
        assert_eq!(r.stats.overflows, 1);
        assert_eq!(r.stats.segments_processed, 1);
    }

    #[test]
    fn full_adjoin_list_skips_the_portal() {
        let (bank, ids) = bank();
        let level = two_rooms(&ids);
        let (mut r, _) = render::<f32>(&level, &bank, &eye());
        let adj = r.levels[0].adjoins[0];
        let portal = level.sectors[0].portal_to(1).unwrap();
        let seg = *r.frame_segs.iter().find(|s| s.sector == 0 && s.wall == portal).unwrap();

        // Reopen level 0 as at the start of a frame.
        r.window_top[..W].fill(0);
        r.window_bot[..W].fill(H as i32 - 1);
        r.depth[..W].fill(f32::MAX);
        r.stats = FrameStats::default();

        let mut scratch = LevelScratch::default();
        scratch.adjoins.resize(MAX_ADJOIN_SEGMENTS, adj);
        let ctx = FrameCtx { level: &level, bank: &bank };
        let mut out = vec![0u8; W * H];
        r.draw_wall(&ctx, &mut out, &seg, 0, &mut scratch);

        assert_eq!(scratch.adjoins.len(), MAX_ADJOIN_SEGMENTS);
        assert_eq!(r.stats.overflows, 1);
        // The wall itself is still drawn.
        assert_eq!(r.stats.segments_drawn, 1);
        assert_eq!(px(&out, 160, 40), WALL_A);
    }

    #[test]
    fn bad_camera_sector_draws_nothing() {
        let (bank, ids) = bank();
        let level = two_rooms(&ids);
        let mut cam = eye();
        cam.sector = 9;
        let (r, out) = render::<f32>(&level, &bank, &cam);
        assert_eq!(r.stats().sectors_drawn, 0);
        assert!(out.iter().all(|&p| p == 0));
    }
}
