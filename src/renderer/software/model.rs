//! Polygonal 3D objects.

use std::cmp::Ordering;
use std::mem;

use glam::Vec3;

use crate::math::{Angle, Decimal, Mat3D, Vec3D};
use crate::world::{ModelId, SecObject, Shading};

use super::clip::{ClipVertex, Frustum, PolygonClipper};
use super::objects::{ObjectClip, VisObject};
use super::polygon::{PolyFill, ScreenVertex, fill_polygon, project};
use super::renderer::{FrameCtx, Software, ViewParams};

/// World-space light directions and their strength in light levels.
const LIGHTS: [(Vec3, i32); 2] = [
    (Vec3::new(-0.4, -0.8, 0.45), 6),
    (Vec3::new(0.7, -0.2, -0.7), 3),
];
/// Subtracted from the directional term so unlit faces come out darker
/// than the sector.
const LIGHT_BIAS: i32 = 4;

/// Reused buffers for model and voxel drawing.
#[derive(Debug)]
pub struct ModelScratch<D> {
    verts: Vec<Vec3D<D>>,
    vert_light: Vec<i32>,
    faces: Vec<(D, usize)>,
    pub(super) poly: Vec<ClipVertex<D>>,
    screen: Vec<ScreenVertex<D>>,
    pub(super) clipper: PolygonClipper<D>,
}

impl<D> Default for ModelScratch<D> {
    fn default() -> Self {
        Self {
            verts: Vec::new(),
            vert_light: Vec::new(),
            faces: Vec::new(),
            poly: Vec::new(),
            screen: Vec::new(),
            clipper: PolygonClipper::default(),
        }
    }
}

impl<D: Decimal> ModelScratch<D> {
    /// Clip, project and fill one view-space polygon.
    pub(super) fn fill(
        &mut self,
        out: &mut [u8],
        width: usize,
        frustum: &Frustum<D>,
        view: &ViewParams<D>,
        clip: &ObjectClip<D>,
        fill: &PolyFill,
    ) -> bool {
        let clipped = self.clipper.clip(frustum, &self.poly);
        if clipped.is_empty() {
            return false;
        }
        self.screen.clear();
        self.screen.extend(clipped.iter().map(|v| project(view, v)));
        fill_polygon(out, width, &self.screen, clip, fill)
    }
}

/// Object orientation, degrees → rotation.
fn object_rotation<D: Decimal>(obj: &SecObject) -> Mat3D<D> {
    Mat3D::from_yaw_pitch_roll(
        Angle::from_degrees(obj.yaw),
        Angle::from_degrees(obj.pitch),
        Angle::from_degrees(obj.roll),
    )
}

/// Light levels added by the fixed directional lights for a world normal.
fn directional<D: Decimal>(world_normal: Vec3D<D>) -> i32 {
    LIGHTS
        .iter()
        .map(|(dir, strength)| {
            let facing = -world_normal.dot(Vec3D::from_glam(dir.normalize()));
            facing.max(D::ZERO).mul_int(*strength).floor_to_int()
        })
        .sum::<i32>()
        - LIGHT_BIAS
}

impl<D: Decimal> Software<D> {
    pub(super) fn draw_model(
        &mut self,
        ctx: &FrameCtx,
        out: &mut [u8],
        obj: &SecObject,
        id: ModelId,
        vis: &VisObject<D>,
        level: usize,
    ) -> bool {
        let Some(model) = ctx.level.model(id) else {
            log::debug!("object refers to missing model {id}");
            return false;
        };
        let view = self.view;
        let obj_rot = object_rotation::<D>(obj);
        let rot = Mat3D::view_yaw(view.yaw).mul_mat(&obj_rot);

        let mut scratch = mem::take(&mut self.model_scratch);
        scratch.verts.clear();
        scratch
            .verts
            .extend(model.vertices.iter().map(|v| vis.view + rot.mul_vec(Vec3D::from_glam(*v))));
        scratch.vert_light.clear();
        scratch.vert_light.extend(
            model
                .vertex_normals
                .iter()
                .map(|n| directional(obj_rot.mul_vec(Vec3D::from_glam(*n)))),
        );

        // Back faces out, the rest farthest first.
        scratch.faces.clear();
        for (i, poly) in model.polygons.iter().enumerate() {
            let normal = rot.mul_vec(Vec3D::from_glam(poly.normal));
            let first = scratch.verts[poly.indices[0] as usize];
            if !normal.dot(first).is_negative() {
                continue;
            }
            let z_sum = poly
                .indices
                .iter()
                .fold(D::ZERO, |acc, &k| acc + scratch.verts[k as usize].z);
            scratch.faces.push((z_sum / D::from_int(poly.indices.len() as i32), i));
        }
        scratch
            .faces
            .sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

        let frustum = Frustum::new(&view);
        let colormap = ctx.bank.colormap();
        let mut drawn = false;
        if let Some(clip) = self.object_clip(level, vis.z) {
            for f in 0..scratch.faces.len() {
                let poly = &model.polygons[scratch.faces[f].1];
                let face_light = directional(obj_rot.mul_vec(Vec3D::from_glam(poly.normal)));
                let shade = self.lighting.shade(&view, vis.ambient, face_light, vis.z);

                scratch.poly.clear();
                for (k, &vi) in poly.indices.iter().enumerate() {
                    let pos = scratch.verts[vi as usize];
                    let light = match poly.shading {
                        Shading::Gouraud => self
                            .lighting
                            .shade(&view, vis.ambient, scratch.vert_light[vi as usize], pos.z)
                            .map_or(D::ZERO, |l| D::from_int(l as i32)),
                        _ => D::ZERO,
                    };
                    let uv = poly.uvs.get(k).copied().unwrap_or_default();
                    scratch.poly.push(ClipVertex {
                        pos,
                        light,
                        u: D::from_f32(uv.x),
                        v: D::from_f32(uv.y),
                    });
                }

                let fill = match poly.shading {
                    Shading::Flat => PolyFill::Flat {
                        color: poly.color,
                        shade: shade.map(|l| &colormap[l]),
                    },
                    Shading::Gouraud => PolyFill::Gouraud {
                        color: poly.color,
                        colormap: shade.map(|_| colormap),
                    },
                    Shading::Texture => {
                        let tex = poly.texture.map(|t| ctx.bank.texture(t));
                        match tex {
                            Some(Ok(tex)) if !tex.pixels.is_empty() => PolyFill::Textured {
                                tex,
                                shade: shade.map(|l| &colormap[l]),
                            },
                            Some(Err(e)) => {
                                log::debug!("model {}: {e}", model.name);
                                continue;
                            }
                            _ => continue,
                        }
                    }
                };
                drawn |= scratch.fill(out, self.width, &frustum, &view, &clip, &fill);
            }
        }
        self.model_scratch = scratch;
        drawn
    }
}

/*======================================================================*/
/*                               Tests                                  */
/*======================================================================*/
