//! Assemble a [`Level`] from sector outlines.
//!
//! Outlines may be given in either winding; the builder normalises them so
//! the interior lies to the right of every wall (negative signed area with
//! `cross2(a, b) = a.x * b.z - a.z * b.x`). Edges shared by two sectors are
//! linked as adjoins automatically, each side naming the other as mirror.

use std::collections::HashMap;

use glam::Vec2;
use thiserror::Error;

use crate::world::geometry::{
    Adjoin, Level, MAX_LIGHT, Sector, SectorFlags, SectorId, Sky, Vertex, Wall, WallId,
    WallTexture,
};
use crate::world::model::{JediModel, ModelId};
use crate::world::object::SecObject;
use crate::world::sprite::{Sprite, SpriteId};
use crate::world::texture::TextureId;
use crate::world::voxel::{VoxelId, VoxelModel};

/// Vertices closer than this are considered shared.
const WELD_GRID: f32 = 1024.0;

#[derive(Debug, Error, PartialEq)]
pub enum LevelError {
    #[error("sector {sector}: needs at least 3 vertices, got {count}")]
    TooFewVertices { sector: usize, count: usize },

    #[error("sector {sector} wall {wall}: zero length")]
    DegenerateWall { sector: usize, wall: usize },

    #[error("sector {sector}: ceiling {ceil} below floor {floor}")]
    InvertedHeights { sector: usize, floor: f32, ceil: f32 },

    #[error("sector {sector}: ambient {ambient} above {max}", max = MAX_LIGHT)]
    AmbientOutOfRange { sector: usize, ambient: u8 },

    #[error("sector {sector} wall {wall}: vertex index {vertex} out of range")]
    BadVertex {
        sector: usize,
        wall: usize,
        vertex: usize,
    },

    #[error("sector {sector} wall {wall}: adjoin {target:?} does not point back")]
    BadAdjoin {
        sector: usize,
        wall: usize,
        target: Adjoin,
    },

    #[error("object {object}: sector {sector} out of range")]
    BadObjectSector { object: usize, sector: usize },

    #[error("too many sectors ({0})")]
    TooManySectors(usize),
}

/// Outline and surface description of one sector.
#[derive(Clone, Debug)]
pub struct SectorSpec {
    pub points: Vec<Vec2>,
    pub floor_h: f32,
    pub ceil_h: f32,
    pub ambient: u8,
    pub floor_tex: Option<TextureId>,
    pub ceil_tex: Option<TextureId>,
    /// Mid texture of solid walls; top/bottom of portals.
    pub wall_tex: Option<TextureId>,
    pub flags: SectorFlags,
}

impl SectorSpec {
    pub fn new(points: &[Vec2], floor_h: f32, ceil_h: f32) -> Self {
        Self {
            points: points.to_vec(),
            floor_h,
            ceil_h,
            ambient: MAX_LIGHT,
            floor_tex: None,
            ceil_tex: None,
            wall_tex: None,
            flags: SectorFlags::empty(),
        }
    }

    /// Axis-aligned rectangle `min ..= max` (x, z).
    pub fn rect(min: Vec2, max: Vec2, floor_h: f32, ceil_h: f32) -> Self {
        Self::new(
            &[
                Vec2::new(min.x, min.y),
                Vec2::new(min.x, max.y),
                Vec2::new(max.x, max.y),
                Vec2::new(max.x, min.y),
            ],
            floor_h,
            ceil_h,
        )
    }

    pub fn ambient(mut self, ambient: u8) -> Self {
        self.ambient = ambient;
        self
    }

    pub fn floor_tex(mut self, tex: TextureId) -> Self {
        self.floor_tex = Some(tex);
        self
    }

    pub fn ceil_tex(mut self, tex: TextureId) -> Self {
        self.ceil_tex = Some(tex);
        self
    }

    pub fn walls(mut self, tex: TextureId) -> Self {
        self.wall_tex = Some(tex);
        self
    }

    pub fn flags(mut self, flags: SectorFlags) -> Self {
        self.flags = flags;
        self
    }
}

/// Signed area ×2 under `cross2`; negative for normalised outlines.
pub fn signed_area(points: &[Vec2]) -> f32 {
    let n = points.len();
    (0..n)
        .map(|i| {
            let a = points[i];
            let b = points[(i + 1) % n];
            a.x * b.y - a.y * b.x
        })
        .sum()
}

#[derive(Default)]
pub struct LevelBuilder {
    name: String,
    specs: Vec<SectorSpec>,
    objects: Vec<SecObject>,
    models: Vec<JediModel>,
    voxels: Vec<VoxelModel>,
    sprites: Vec<Sprite>,
    sky: Sky,
}

impl LevelBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn sector(&mut self, spec: SectorSpec) -> SectorId {
        self.specs.push(spec);
        (self.specs.len() - 1) as SectorId
    }

    pub fn object(&mut self, obj: SecObject) -> &mut Self {
        self.objects.push(obj);
        self
    }

    pub fn model(&mut self, model: JediModel) -> ModelId {
        self.models.push(model);
        (self.models.len() - 1) as ModelId
    }

    pub fn voxel(&mut self, voxel: VoxelModel) -> VoxelId {
        self.voxels.push(voxel);
        (self.voxels.len() - 1) as VoxelId
    }

    pub fn sprite(&mut self, sprite: Sprite) -> SpriteId {
        self.sprites.push(sprite);
        (self.sprites.len() - 1) as SpriteId
    }

    pub fn sky(&mut self, sky: Sky) -> &mut Self {
        self.sky = sky;
        self
    }

    pub fn build(self) -> Result<Level, LevelError> {
        if self.specs.len() > SectorId::MAX as usize {
            return Err(LevelError::TooManySectors(self.specs.len()));
        }

        let mut sectors = Vec::with_capacity(self.specs.len());
        for (i, spec) in self.specs.into_iter().enumerate() {
            sectors.push(build_sector(i, spec)?);
        }
        link_adjoins(&mut sectors);

        let mut level = Level {
            name: self.name,
            sectors,
            objects: Vec::new(),
            models: self.models,
            voxels: self.voxels,
            sprites: self.sprites,
            sky: self.sky,
        };
        for (i, obj) in self.objects.into_iter().enumerate() {
            if obj.sector as usize >= level.sectors.len() {
                return Err(LevelError::BadObjectSector {
                    object: i,
                    sector: obj.sector as usize,
                });
            }
            level.spawn_object(obj);
        }
        level.validate()?;
        log::debug!(
            "level `{}`: {} sectors, {} objects",
            level.name,
            level.sectors.len(),
            level.objects.len()
        );
        Ok(level)
    }
}

fn build_sector(index: usize, spec: SectorSpec) -> Result<Sector, LevelError> {
    let SectorSpec {
        mut points,
        floor_h,
        ceil_h,
        ambient,
        floor_tex,
        ceil_tex,
        wall_tex,
        flags,
    } = spec;

    if points.len() < 3 {
        return Err(LevelError::TooFewVertices {
            sector: index,
            count: points.len(),
        });
    }
    if ceil_h < floor_h {
        return Err(LevelError::InvertedHeights {
            sector: index,
            floor: floor_h,
            ceil: ceil_h,
        });
    }
    if ambient > MAX_LIGHT {
        return Err(LevelError::AmbientOutOfRange {
            sector: index,
            ambient,
        });
    }
    if signed_area(&points) > 0.0 {
        points.reverse();
    }

    let n = points.len();
    let mut walls = Vec::with_capacity(n);
    for i in 0..n {
        let j = (i + 1) % n;
        if points[i].distance_squared(points[j]) < 1e-8 {
            return Err(LevelError::DegenerateWall {
                sector: index,
                wall: i,
            });
        }
        walls.push(Wall {
            v0: i as u16,
            v1: j as u16,
            mid: wall_tex.map(WallTexture::new),
            ..Default::default()
        });
    }

    Ok(Sector {
        floor_h,
        ceil_h,
        ambient,
        floor_tex,
        ceil_tex,
        floor_offset: Vec2::ZERO,
        ceil_offset: Vec2::ZERO,
        flags,
        vertices: points.into_iter().map(|pos| Vertex { pos }).collect(),
        walls,
        objects: Vec::new(),
    })
}

fn weld_key(p: Vec2) -> (i32, i32) {
    ((p.x * WELD_GRID).round() as i32, (p.y * WELD_GRID).round() as i32)
}

/// Pair every wall `a → b` with a wall `b → a` in another sector. A portal
/// moves the wall's texture from the mid slot to the top/bottom slots.
fn link_adjoins(sectors: &mut [Sector]) {
    let mut edges: HashMap<((i32, i32), (i32, i32)), (SectorId, WallId)> = HashMap::new();
    for (s, sec) in sectors.iter().enumerate() {
        for (w, wall) in sec.walls.iter().enumerate() {
            let (a, b) = sec.wall_endpoints(wall);
            edges.insert((weld_key(a), weld_key(b)), (s as SectorId, w as WallId));
        }
    }

    let mut links = Vec::new();
    for (s, sec) in sectors.iter().enumerate() {
        for (w, wall) in sec.walls.iter().enumerate() {
            let (a, b) = sec.wall_endpoints(wall);
            if let Some(&(os, ow)) = edges.get(&(weld_key(b), weld_key(a))) {
                if os as usize != s {
                    links.push((s, w, Adjoin { sector: os, mirror: ow }));
                }
            }
        }
    }

    for (s, w, adjoin) in links {
        let wall = &mut sectors[s].walls[w];
        wall.adjoin = Some(adjoin);
        if let Some(tex) = wall.mid.take() {
            wall.top = Some(tex);
            wall.bottom = Some(tex);
        }
    }
}

impl Level {
    /// Check vertex indices, adjoin back-references and object parents.
    pub fn validate(&self) -> Result<(), LevelError> {
        for (s, sec) in self.sectors.iter().enumerate() {
            for (w, wall) in sec.walls.iter().enumerate() {
                for v in [wall.v0, wall.v1] {
                    if v as usize >= sec.vertices.len() {
                        return Err(LevelError::BadVertex {
                            sector: s,
                            wall: w,
                            vertex: v as usize,
                        });
                    }
                }
                if let Some(adj) = wall.adjoin {
                    let back = self
                        .sectors
                        .get(adj.sector as usize)
                        .and_then(|o| o.walls.get(adj.mirror as usize))
                        .and_then(|m| m.adjoin);
                    let points_back = back.is_some_and(|b| {
                        b.sector as usize == s && b.mirror as usize == w
                    });
                    if !points_back {
                        return Err(LevelError::BadAdjoin {
                            sector: s,
                            wall: w,
                            target: adj,
                        });
                    }
                }
            }
        }
        for (i, obj) in self.objects.iter().enumerate() {
            if obj.sector as usize >= self.sectors.len() {
                return Err(LevelError::BadObjectSector {
                    object: i,
                    sector: obj.sector as usize,
                });
            }
        }
        Ok(())
    }
}

impl Sector {
    /// Wall of this sector that opens into `other`, if any.
    pub fn portal_to(&self, other: SectorId) -> Option<WallId> {
        self.walls
            .iter()
            .position(|w| w.adjoin.is_some_and(|a| a.sector == other))
            .map(|i| i as WallId)
    }
}

/*======================================================================*/
/*                               Tests                                  */
/*======================================================================*/
#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::object::ObjectPayload;
    use glam::{Vec3, vec2};

    fn two_rooms() -> Level {
        let mut b = LevelBuilder::new("two");
        b.sector(SectorSpec::rect(vec2(-4.0, -4.0), vec2(4.0, 8.0), 0.0, 10.0));
        // Counter-wound outline: the builder must flip it.
        b.sector(SectorSpec::new(
            &[vec2(-4.0, 8.0), vec2(4.0, 8.0), vec2(4.0, 16.0), vec2(-4.0, 16.0)],
            0.0,
            6.0,
        ));
        b.build().unwrap()
    }

    #[test]
    fn winding_is_normalised() {
        let level = two_rooms();
        for sec in &level.sectors {
            let pts: Vec<Vec2> = sec.vertices.iter().map(|v| v.pos).collect();
            assert!(signed_area(&pts) < 0.0);
        }
    }

    #[test]
    fn shared_edge_becomes_adjoin_pair() {
        let level = two_rooms();
        let wa = level.sectors[0].portal_to(1).expect("portal from A");
        let wb = level.sectors[1].portal_to(0).expect("portal from B");
        assert_eq!(
            level.sectors[0].walls[wa as usize].adjoin,
            Some(Adjoin { sector: 1, mirror: wb })
        );
        assert_eq!(
            level.sectors[1].walls[wb as usize].adjoin,
            Some(Adjoin { sector: 0, mirror: wa })
        );
        let solid = level.sectors[0].walls.iter().filter(|w| w.adjoin.is_none()).count();
        assert_eq!(solid, 3);
    }

    #[test]
    fn bad_specs_rejected() {
        let mut b = LevelBuilder::new("bad");
        b.sector(SectorSpec::new(&[vec2(0.0, 0.0), vec2(1.0, 0.0)], 0.0, 1.0));
        assert_eq!(
            b.build().unwrap_err(),
            LevelError::TooFewVertices { sector: 0, count: 2 }
        );

        let mut b = LevelBuilder::new("bad");
        b.sector(SectorSpec::rect(Vec2::ZERO, Vec2::ONE, 5.0, 1.0));
        assert!(matches!(
            b.build(),
            Err(LevelError::InvertedHeights { sector: 0, .. })
        ));
    }

    #[test]
    fn broken_mirror_detected() {
        let mut level = two_rooms();
        let wa = level.sectors[0].portal_to(1).unwrap();
        level.sectors[0].walls[wa as usize].adjoin = Some(Adjoin { sector: 1, mirror: 0 });
        assert!(matches!(level.validate(), Err(LevelError::BadAdjoin { sector: 0, .. })));
    }

    #[test]
    fn move_object_reparents_across_portal() {
        let mut level = two_rooms();
        let id = level.spawn_object(SecObject::new(
            Vec3::new(0.0, 0.0, 2.0),
            0,
            ObjectPayload::Sprite(0),
        ));
        assert_eq!(level.sectors[0].objects, vec![id]);

        assert_eq!(level.move_object(id, Vec3::new(0.0, 0.0, 12.0)), Some(1));
        assert!(level.sectors[0].objects.is_empty());
        assert_eq!(level.sectors[1].objects, vec![id]);

        // Outside every sector: stays where it was.
        assert_eq!(level.move_object(id, Vec3::new(50.0, 0.0, 50.0)), Some(1));
        assert_eq!(level.objects[id as usize].sector, 1);
    }
}
