//! Polygonal object meshes.

use glam::{Vec2, Vec3};
use smallvec::SmallVec;

use crate::world::texture::TextureId;

pub type ModelId = u16;

/// How a polygon is filled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shading {
    /// One colour, one light level per face.
    Flat,
    /// Per-vertex light, dithered between levels.
    Gouraud,
    /// Perspective-correct texture, per-face light.
    Texture,
}

#[derive(Clone, Debug)]
pub struct Polygon {
    /// Convex, wound clockwise when seen from the front.
    pub indices: SmallVec<[u16; 4]>,
    /// Texel coordinates per index (only used by `Shading::Texture`).
    pub uvs: SmallVec<[Vec2; 4]>,
    pub shading: Shading,
    /// Palette index for flat and Gouraud faces.
    pub color: u8,
    pub texture: Option<TextureId>,
    /// Filled in by [`JediModel::new`].
    pub normal: Vec3,
}

impl Polygon {
    pub fn flat(indices: &[u16], color: u8) -> Self {
        Self {
            indices: indices.into(),
            uvs: SmallVec::new(),
            shading: Shading::Flat,
            color,
            texture: None,
            normal: Vec3::ZERO,
        }
    }

    pub fn gouraud(indices: &[u16], color: u8) -> Self {
        Self {
            shading: Shading::Gouraud,
            ..Self::flat(indices, color)
        }
    }

    pub fn textured(indices: &[u16], uvs: &[Vec2], tex: TextureId) -> Self {
        Self {
            uvs: uvs.into(),
            shading: Shading::Texture,
            texture: Some(tex),
            ..Self::flat(indices, 0)
        }
    }
}

#[derive(Clone, Debug)]
pub struct JediModel {
    pub name: String,
    pub vertices: Vec<Vec3>,
    pub polygons: Vec<Polygon>,
    /// Average of adjacent face normals, for Gouraud lighting.
    pub vertex_normals: Vec<Vec3>,
    /// Bounding radius around the local origin.
    pub radius: f32,
}

impl JediModel {
    /// Build a model and derive face normals, vertex normals and radius.
    /// Polygons with out-of-range indices are dropped.
    pub fn new(name: impl Into<String>, vertices: Vec<Vec3>, polygons: Vec<Polygon>) -> Self {
        let name = name.into();
        let mut polygons: Vec<Polygon> = polygons
            .into_iter()
            .filter(|p| {
                let ok = p.indices.len() >= 3
                    && p.indices.iter().all(|&i| (i as usize) < vertices.len());
                if !ok {
                    log::warn!("model {name}: dropping malformed polygon {:?}", p.indices);
                }
                ok
            })
            .collect();

        let mut vertex_normals = vec![Vec3::ZERO; vertices.len()];
        for poly in &mut polygons {
            let a = vertices[poly.indices[0] as usize];
            let b = vertices[poly.indices[1] as usize];
            let c = vertices[poly.indices[2] as usize];
            // Clockwise seen from the front, y up: (b - a) x (c - a) faces out.
            poly.normal = (b - a).cross(c - a).normalize_or_zero();
            for &i in &poly.indices {
                vertex_normals[i as usize] += poly.normal;
            }
        }
        for n in &mut vertex_normals {
            *n = n.normalize_or_zero();
        }

        let radius = vertices.iter().map(|v| v.length()).fold(0.0, f32::max);
        Self {
            name,
            vertices,
            polygons,
            vertex_normals,
            radius,
        }
    }

    /// Axis-aligned cube of half-size `h` centred on the origin, flat shaded.
    pub fn cube(name: &str, h: f32, color: u8) -> Self {
        let v = |x: f32, y: f32, z: f32| Vec3::new(x * h, y * h, z * h);
        let vertices = vec![
            v(-1.0, -1.0, -1.0),
            v(1.0, -1.0, -1.0),
            v(1.0, 1.0, -1.0),
            v(-1.0, 1.0, -1.0),
            v(-1.0, -1.0, 1.0),
            v(1.0, -1.0, 1.0),
            v(1.0, 1.0, 1.0),
            v(-1.0, 1.0, 1.0),
        ];
        let faces: [[u16; 4]; 6] = [
            [0, 3, 2, 1], // -z
            [5, 6, 7, 4], // +z
            [4, 7, 3, 0], // -x
            [1, 2, 6, 5], // +x
            [3, 7, 6, 2], // +y
            [4, 0, 1, 5], // -y
        ];
        let polygons = faces.iter().map(|f| Polygon::flat(f, color)).collect();
        Self::new(name, vertices, polygons)
    }
}

/*======================================================================*/
/*                               Tests                                  */
/*======================================================================*/
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_normals_point_outward() {
        let m = JediModel::cube("box", 1.0, 5);
        for p in &m.polygons {
            let centre = p
                .indices
                .iter()
                .map(|&i| m.vertices[i as usize])
                .sum::<Vec3>()
                / p.indices.len() as f32;
            assert!(p.normal.dot(centre) > 0.0, "face {:?} faces inward", p.indices);
        }
        assert!((m.radius - 3f32.sqrt()).abs() < 1e-5);
    }

    #[test]
    fn malformed_polygons_dropped() {
        let m = JediModel::new(
            "bad",
            vec![Vec3::ZERO, Vec3::X, Vec3::Z],
            vec![Polygon::flat(&[0, 1, 2], 1), Polygon::flat(&[0, 1, 9], 1)],
        );
        assert_eq!(m.polygons.len(), 1);
    }
}
