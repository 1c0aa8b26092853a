//! Voxel objects: each run of solid cells is a box, drawn as its visible
//! vertical sides plus a cap when seen from above or below.

use std::cmp::Ordering;
use std::mem;

use smallvec::SmallVec;

use crate::math::{Angle, Decimal, Mat3D, Vec2D, Vec3D};
use crate::world::{SecObject, VoxelId};

use super::clip::{ClipVertex, Frustum};
use super::objects::{ObjectClip, VisObject};
use super::polygon::PolyFill;
use super::renderer::{FrameCtx, Software, ViewParams};

/// One vertical side of a run, in view space.
struct Side<'a, D> {
    a: Vec2D<D>,
    b: Vec2D<D>,
    /// Bottom and top height relative to the eye.
    h0: D,
    h1: D,
    /// Bottom-up.
    colors: &'a [u8],
}

#[inline]
fn lit(c: u8, shade: Option<&[u8; 256]>) -> u8 {
    shade.map_or(c, |cm| cm[c as usize])
}

/// Draw one side. Depth is interpolated as `1/z` across the columns, and
/// each row picks its cell from the height it hits.
fn draw_side<D: Decimal>(
    out: &mut [u8],
    width: usize,
    view: &ViewParams<D>,
    clip: &ObjectClip<D>,
    side: &Side<D>,
    shade: Option<&[u8; 256]>,
) -> bool {
    let (mut a, mut b) = (side.a, side.b);
    let near = view.near;
    if a.z < near && b.z < near {
        return false;
    }
    if a.z < near {
        a = a.lerp(b, (near - a.z) / (b.z - a.z));
    } else if b.z < near {
        b = b.lerp(a, (near - b.z) / (a.z - b.z));
    }
    let (mut sa, mut sb) = (view.project_x(a), view.project_x(b));
    if sb < sa {
        mem::swap(&mut a, &mut b);
        mem::swap(&mut sa, &mut sb);
    }
    let span = sb - sa;
    if span <= D::ZERO {
        return false;
    }

    let (iza, izb) = (a.z.recip(), b.z.recip());
    let cells = side.colors.len() as i32;
    let x0 = sa.ceil_to_int().max(clip.x0);
    let x1 = (sb.ceil_to_int() - 1).min(clip.x1);
    let mut drawn = false;
    for x in x0..=x1 {
        let Some((wt, wb)) = clip.rows(x) else {
            continue;
        };
        let t = (D::from_int(x) - sa) / span;
        let iz = iza + (izb - iza) * t;
        let y_top = view.horizon - side.h1 * iz * view.focal_y;
        let y_bot = view.horizon - side.h0 * iz * view.focal_y;
        let ya = y_top.ceil_to_int().max(wt);
        let yb = (y_bot.ceil_to_int() - 1).min(wb);
        if ya > yb || y_bot <= y_top {
            continue;
        }
        let cells_per_row = D::from_int(cells) / (y_bot - y_top);
        for y in ya..=yb {
            let k = ((D::from_int(y) - y_top) * cells_per_row)
                .floor_to_int()
                .clamp(0, cells - 1);
            let c = side.colors[(cells - 1 - k) as usize];
            if let Some(p) = out.get_mut(y as usize * width + x as usize) {
                *p = lit(c, shade);
            }
        }
        drawn = true;
    }
    drawn
}

/// Cell indices `0..n` along one axis, farthest from the eye's cell first.
/// `eye` may lie outside the grid.
fn back_to_front(n: usize, eye: i32) -> impl Iterator<Item = usize> {
    let k = eye.clamp(-1, n as i32);
    let below = 0..k.max(0) as usize;
    let above = ((k + 1) as usize..n).rev();
    let own = (k >= 0 && (k as usize) < n).then_some(k as usize);
    below.chain(above).chain(own)
}

/// Screen columns spanned by a footprint in view space, or `None` when it
/// lies behind the eye, off screen, or behind walls in every column.
fn footprint_columns<D: Decimal>(
    view: &ViewParams<D>,
    clip: &ObjectClip<D>,
    corners: &[Vec2D<D>; 4],
) -> Option<(i32, i32)> {
    let in_front = corners.iter().filter(|c| c.z >= view.near).count();
    if in_front == 0 {
        return None;
    }
    let (x0, x1) = if in_front < corners.len() {
        // Straddles the near plane; no bound on the projection.
        (clip.x0, clip.x1)
    } else {
        let (mut lo, mut hi) = (view.project_x(corners[0]), view.project_x(corners[0]));
        for c in &corners[1..] {
            let sx = view.project_x(*c);
            lo = lo.min(sx);
            hi = hi.max(sx);
        }
        (lo.ceil_to_int().max(clip.x0), (hi.ceil_to_int() - 1).min(clip.x1))
    };
    (x0..=x1).any(|x| clip.rows(x).is_some()).then_some((x0, x1))
}

impl<D: Decimal> Software<D> {
    pub(super) fn draw_voxel(
        &mut self,
        ctx: &FrameCtx,
        out: &mut [u8],
        obj: &SecObject,
        id: VoxelId,
        vis: &VisObject<D>,
        level: usize,
    ) -> bool {
        let Some(model) = ctx.level.voxel(id) else {
            log::debug!("object refers to missing voxel model {id}");
            return false;
        };
        let (sx, sz) = (model.size_x as usize, model.size_z as usize);
        if model.columns.len() != sx * sz {
            log::warn!("voxel model {}: {} columns for {sx}x{sz}", model.name, model.columns.len());
            return false;
        }

        let view = self.view;
        let obj_rot = Mat3D::<D>::from_yaw_pitch_roll(Angle::from_degrees(obj.yaw), Angle::ZERO, Angle::ZERO);
        let rot = Mat3D::view_yaw(view.yaw).mul_mat(&obj_rot);
        let to_view = |p: Vec3D<D>| vis.view + rot.mul_vec(p);
        // The eye in model space.
        let cam = rot.transpose().mul_vec(-vis.view);

        let cell = D::from_f32(model.cell);
        let half_x = D::from_f32(model.cell * sx as f32 * 0.5);
        let half_z = D::from_f32(model.cell * sz as f32 * 0.5);

        // Footprint corners, projected once for the whole volume.
        let footprint = [(-half_x, -half_z), (half_x, -half_z), (half_x, half_z), (-half_x, half_z)]
            .map(|(x, z)| to_view(Vec3D::new(x, D::ZERO, z)).xz());
        let mut scratch = mem::take(&mut self.model_scratch);
        let Some(clip) = self.object_clip(level, vis.z) else {
            self.model_scratch = scratch;
            return false;
        };
        if footprint_columns(&view, &clip, &footprint).is_none() {
            self.model_scratch = scratch;
            return false;
        }

        // Walk the grid back to front: the axis the eye is farther out on
        // is the outer loop, and both axes converge on the eye's cell.
        let eye_cell = |c: D, half: D| ((c + half) / cell).floor_to_int();
        let (eye_x, eye_z) = (eye_cell(cam.x, half_x), eye_cell(cam.z, half_z));
        let outside = |c: D, half: D| (c.abs() - half).max(D::ZERO);
        let x_outer = outside(cam.x, half_x) >= outside(cam.z, half_z);
        let (outer, inner) = if x_outer {
            ((sx, eye_x), (sz, eye_z))
        } else {
            ((sz, eye_z), (sx, eye_x))
        };

        let colormap = ctx.bank.colormap();
        let shade = self
            .lighting
            .shade(&view, vis.ambient, 0, vis.z)
            .map(|l| &colormap[l]);
        let frustum = Frustum::new(&view);
        let mut drawn = false;

        for a in back_to_front(outer.0, outer.1) {
            for b in back_to_front(inner.0, inner.1) {
                let (ix, iz) = if x_outer { (a, b) } else { (b, a) };
                let ci = ix * sz + iz;
                let col = &model.columns[ci];
                if col.runs.is_empty() {
                    continue;
                }
                let x0 = cell.mul_int(ix as i32) - half_x;
                let z0 = cell.mul_int(iz as i32) - half_z;
                let (x1, z1) = (x0 + cell, z0 + cell);

                // Runs nearest the eye height last.
                let mut runs: SmallVec<[(D, usize); 4]> = col
                    .runs
                    .iter()
                    .enumerate()
                    .filter(|(_, r)| !r.is_empty())
                    .map(|(i, r)| {
                        let y0 = cell.mul_int(r.y0 as i32);
                        let y1 = y0 + cell.mul_int(r.len() as i32);
                        let gap = if cam.y > y1 {
                            cam.y - y1
                        } else if cam.y < y0 {
                            y0 - cam.y
                        } else {
                            D::ZERO
                        };
                        (gap, i)
                    })
                    .collect();
                runs.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

                for &(_, ri) in &runs {
                    let run = &col.runs[ri];
                    let y0 = cell.mul_int(run.y0 as i32);
                    let y1 = y0 + cell.mul_int(run.len() as i32);
                    let corner = |x: D, z: D| to_view(Vec3D::new(x, D::ZERO, z)).xz();
                    let mut sides: SmallVec<[(Vec2D<D>, Vec2D<D>); 2]> = SmallVec::new();
                    if cam.x < x0 {
                        sides.push((corner(x0, z1), corner(x0, z0)));
                    } else if cam.x > x1 {
                        sides.push((corner(x1, z0), corner(x1, z1)));
                    }
                    if cam.z < z0 {
                        sides.push((corner(x0, z0), corner(x1, z0)));
                    } else if cam.z > z1 {
                        sides.push((corner(x1, z1), corner(x0, z1)));
                    }
                    for (a, b) in sides {
                        let side = Side {
                            a,
                            b,
                            h0: vis.view.y + y0,
                            h1: vis.view.y + y1,
                            colors: &run.colors,
                        };
                        drawn |= draw_side(out, self.width, &view, &clip, &side, shade);
                    }

                    let cap = if cam.y > y1 {
                        run.colors.last().map(|&c| (y1, c))
                    } else if cam.y < y0 {
                        run.colors.first().map(|&c| (y0, c))
                    } else {
                        None
                    };
                    if let Some((h, color)) = cap {
                        scratch.poly.clear();
                        for (x, z) in [(x0, z0), (x1, z0), (x1, z1), (x0, z1)] {
                            scratch.poly.push(ClipVertex {
                                pos: to_view(Vec3D::new(x, h, z)),
                                ..Default::default()
                            });
                        }
                        let fill = PolyFill::Flat { color, shade };
                        drawn |= scratch.fill(out, self.width, &frustum, &view, &clip, &fill);
                    }
                }
            }
        }
        self.model_scratch = scratch;
        drawn
    }
}

/*======================================================================*/
/*                               Tests                                  */
/*======================================================================*/
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderConfig;
    use crate::math::Fixed16;
    use crate::renderer::Renderer;
    use crate::world::{
        Camera, Level, LevelBuilder, ObjectPayload, SectorSpec, Texture, TextureBank, VoxelModel,
    };
    use glam::{Vec3, vec2};

    const W: usize = 320;
    const H: usize = 200;

    fn room_with(model: VoxelModel, pos: Vec3) -> (Level, TextureBank) {
        let mut bank = TextureBank::default_with_checker();
        let wall = bank.insert("WALL", Texture::solid("WALL", 64, 64, 3)).unwrap();
        let mut b = LevelBuilder::new("voxel");
        let room = b.sector(
            SectorSpec::rect(vec2(-16.0, -16.0), vec2(16.0, 16.0), 0.0, 10.0)
                .walls(wall)
                .floor_tex(wall)
                .ceil_tex(wall),
        );
        let vid = b.voxel(model);
        b.object(SecObject::new(pos, room, ObjectPayload::Voxel(vid)));
        (b.build().unwrap(), bank)
    }

    fn render<D: Decimal>(level: &Level, bank: &TextureBank, eye_y: f32) -> (Software<D>, Vec<u8>) {
        let mut r = Software::<D>::new(RenderConfig::default());
        r.set_resolution(W, H);
        r.copy_level(level);
        r.set_camera(&Camera::new(Vec3::new(0.0, eye_y, 0.0), Angle::ZERO, 0));
        let mut out = vec![0u8; W * H];
        r.draw_frame(level, bank, &mut out);
        (r, out)
    }

    fn check_pillar<D: Decimal>() {
        let pillar = VoxelModel::from_dense("pillar", [2, 4, 2], 0.5, |_, _, _| Some(70));
        let (level, bank) = room_with(pillar, Vec3::new(0.0, 4.0, 10.0));
        let (r, out) = render::<D>(&level, &bank, 5.0);
        // Front at z = 9.5: columns 152..=168, rows 84..=116.
        assert_eq!(out[100 * W + 160], 70);
        assert_eq!(out[90 * W + 155], 70);
        assert_ne!(out[100 * W + 148], 70);
        assert_ne!(out[80 * W + 160], 70);
        assert_eq!(r.stats().objects_drawn, 1);
    }

    #[test]
    fn pillar_float() {
        check_pillar::<f32>();
    }

    #[test]
    fn pillar_fixed() {
        check_pillar::<Fixed16>();
    }

    #[test]
    fn rows_pick_cells_bottom_up() {
        let stack = VoxelModel::from_dense("stack", [1, 4, 1], 0.5, |_, y, _| Some(71 + y));
        let (level, bank) = room_with(stack, Vec3::new(0.0, 4.0, 10.0));
        let (_, out) = render::<f32>(&level, &bank, 5.0);
        // Face at z = 9.75 spans rows 84..=116, about 8 rows per cell.
        assert_eq!(out[86 * W + 160], 74);
        assert_eq!(out[114 * W + 160], 71);
    }

    #[test]
    fn top_cap_is_drawn_from_above() {
        let tower = VoxelModel::from_dense("tower", [2, 8, 2], 1.0, |_, y, _| {
            Some(if y == 7 { 80 } else { 70 })
        });
        let (level, bank) = room_with(tower, Vec3::new(0.0, 0.0, 10.0));
        let (_, out) = render::<f32>(&level, &bank, 9.0);
        // Above the front face's top edge (row ~117.8), only the cap reaches
        // row 115.
        assert_eq!(out[115 * W + 160], 80);
        assert_eq!(out[150 * W + 160], 70);
    }

    #[test]
    fn grid_walk_converges_on_the_eye_cell() {
        let walk = |n, eye| back_to_front(n, eye).collect::<Vec<_>>();
        assert_eq!(walk(4, -3), [3, 2, 1, 0]);
        assert_eq!(walk(4, 9), [0, 1, 2, 3]);
        assert_eq!(walk(5, 2), [0, 1, 4, 3, 2]);
        assert_eq!(walk(3, 0), [2, 1, 0]);
        assert!(walk(0, 0).is_empty());
    }

    /// Three cells deep along z; cell `z` has colour `90 + z`.
    fn check_depth_order<D: Decimal>(yaw: f32, front: u8) {
        let deep = VoxelModel::from_dense("deep", [1, 1, 3], 1.0, |_, _, z| Some(90 + z));
        let (mut level, bank) = room_with(deep, Vec3::new(0.0, 4.5, 10.0));
        level.objects[0].yaw = yaw;
        let (_, out) = render::<D>(&level, &bank, 5.0);
        assert_eq!(out[100 * W + 160], front);
    }

    #[test]
    fn nearest_cell_is_drawn_last() {
        check_depth_order::<f32>(0.0, 90);
        check_depth_order::<Fixed16>(0.0, 90);
        check_depth_order::<f32>(180.0, 92);
        check_depth_order::<Fixed16>(180.0, 92);
    }

    fn square_at<D: Decimal>(x: f32, z: f32) -> [Vec2D<D>; 4] {
        [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)]
            .map(|(dx, dz)| Vec2D::new(D::from_f32(x + dx), D::from_f32(z + dz)))
    }

    #[test]
    fn footprint_rejects_unseen_volumes() {
        let view = ViewParams::<f32>::for_test(320, 200, 160.0);
        let top = vec![0; W];
        let bot = vec![H as i32 - 1; W];
        let open = vec![f32::MAX; W];
        let clip = ObjectClip::new(0, W as i32 - 1, &top, &bot, &open, 10.0);

        // Widest at z = 9: 142.2..177.8.
        let span = footprint_columns(&view, &clip, &square_at(0.0, 10.0));
        assert_eq!(span, Some((143, 177)));
        assert_eq!(footprint_columns(&view, &clip, &square_at(0.0, -10.0)), None);
        assert_eq!(footprint_columns(&view, &clip, &square_at(40.0, 10.0)), None);
        // Straddling the near plane keeps the whole window.
        assert_eq!(footprint_columns(&view, &clip, &square_at(0.0, 1.5)), Some((0, W as i32 - 1)));

        // A wall at depth 5 across every column hides it.
        let walled = vec![5.0; W];
        let clip = ObjectClip::new(0, W as i32 - 1, &top, &bot, &walled, 10.0);
        assert_eq!(footprint_columns(&view, &clip, &square_at(0.0, 10.0)), None);
    }
}
