//! Per-sector object pass: cull, sort back to front, dispatch by payload.

use std::cmp::Ordering;

use crate::math::{Decimal, Vec3D};
use crate::world::{ObjectFlags, ObjectId, ObjectPayload, SectorId};

use super::limits::{MAX_LIGHT, MAX_VISIBLE_OBJECTS};
use super::renderer::{FrameCtx, Software};

/// An object that survived culling this visit.
#[derive(Clone, Copy, Debug)]
pub struct VisObject<D> {
    pub id: ObjectId,
    /// View-space depth of the object origin; used for sorting and the
    /// depth test against walls.
    pub z: D,
    pub view: Vec3D<D>,
    /// Ambient light of the object's own sector.
    pub ambient: i32,
}

/// The window and depth an object is drawn against.
pub(super) struct ObjectClip<'a, D> {
    pub x0: i32,
    pub x1: i32,
    top: &'a [i32],
    bot: &'a [i32],
    depth: &'a [D],
    pub z: D,
}

impl<'a, D: Decimal> ObjectClip<'a, D> {
    pub fn new(x0: i32, x1: i32, top: &'a [i32], bot: &'a [i32], depth: &'a [D], z: D) -> Self {
        Self {
            x0,
            x1,
            top,
            bot,
            depth,
            z,
        }
    }

    /// Open rows of column `x`, or `None` when the column is outside the
    /// window, closed, or a wall is nearer than the object.
    #[inline]
    pub fn rows(&self, x: i32) -> Option<(i32, i32)> {
        if x < self.x0 || x > self.x1 {
            return None;
        }
        let xi = x as usize;
        if self.z >= *self.depth.get(xi)? {
            return None;
        }
        let (t, b) = (self.top[xi], self.bot[xi]);
        (t <= b).then_some((t, b))
    }
}

impl<D: Decimal> Software<D> {
    pub(super) fn draw_objects(
        &mut self,
        ctx: &FrameCtx,
        out: &mut [u8],
        id: SectorId,
        level: usize,
        list: &mut Vec<VisObject<D>>,
    ) {
        list.clear();
        let Some(sector) = ctx.level.sectors.get(id as usize) else {
            return;
        };
        if sector.objects.is_empty() {
            return;
        }

        for &oid in &sector.objects {
            let Some(obj) = ctx.level.objects.get(oid as usize) else {
                log::debug!("sector {id} lists missing object {oid}");
                continue;
            };
            if obj.flags.contains(ObjectFlags::HIDDEN) {
                continue;
            }
            let view = self.view.to_view3(Vec3D::from_glam(obj.pos));
            let reach = match obj.payload {
                ObjectPayload::Sprite(_) => 0.0,
                ObjectPayload::Model(m) => ctx.level.model(m).map_or(0.0, |m| m.radius),
                ObjectPayload::Voxel(v) => ctx.level.voxel(v).map_or(0.0, |v| {
                    let (sx, sz) = (v.size_x as f32, v.size_z as f32);
                    0.5 * v.cell * (sx * sx + sz * sz).sqrt()
                }),
            };
            if view.z + D::from_f32(reach) < self.view.near {
                continue;
            }
            let ambient = self
                .sectors
                .get(obj.sector as usize)
                .map_or(MAX_LIGHT, |s| s.surface.ambient);
            list.push(VisObject {
                id: oid,
                z: view.z,
                view,
                ambient,
            });
        }

        if list.len() > MAX_VISIBLE_OBJECTS {
            log::error!(
                "sector {id}: {} visible objects, drawing the nearest {MAX_VISIBLE_OBJECTS}",
                list.len()
            );
            list.sort_by(|a, b| a.z.partial_cmp(&b.z).unwrap_or(Ordering::Equal));
            list.truncate(MAX_VISIBLE_OBJECTS);
            self.stats.overflows += 1;
        }
        list.sort_by(|a, b| b.z.partial_cmp(&a.z).unwrap_or(Ordering::Equal));

        for vis in list.iter() {
            let obj = &ctx.level.objects[vis.id as usize];
            let drawn = match obj.payload {
                ObjectPayload::Sprite(s) => self.draw_sprite(ctx, out, obj, s, vis, level),
                ObjectPayload::Model(m) => self.draw_model(ctx, out, obj, m, vis, level),
                ObjectPayload::Voxel(v) => self.draw_voxel(ctx, out, obj, v, vis, level),
            };
            if drawn {
                self.stats.objects_drawn += 1;
            }
        }
    }

    /// Clip for the current visit at `level`.
    pub(super) fn object_clip(&self, level: usize, z: D) -> Option<ObjectClip<'_, D>> {
        let range = self.level_range(level)?;
        Some(ObjectClip::new(
            self.window_x0,
            self.window_x1,
            &self.window_top[range.clone()],
            &self.window_bot[range.clone()],
            &self.depth[range],
            z,
        ))
    }
}

/*======================================================================*/
/*                               Tests                                  */
/*======================================================================*/
