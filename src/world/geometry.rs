use bitflags::bitflags;
use glam::Vec2;

use crate::world::model::{JediModel, ModelId};
use crate::world::object::{ObjectId, SecObject};
use crate::world::sprite::{Sprite, SpriteId};
use crate::world::texture::TextureId;
use crate::world::voxel::{VoxelId, VoxelModel};

pub type SectorId = u16;
pub type WallId = u16;
pub type VertexId = u16;

/// Brightest light level; sectors at this ambient render fullbright.
pub const MAX_LIGHT: u8 = 31;

/// Runtime snapshot of one map. Owned by the game side; the renderer only
/// ever borrows it and keeps its own converted cache.
#[derive(Debug, Default)]
pub struct Level {
    pub name: String,
    pub sectors: Vec<Sector>,
    pub objects: Vec<SecObject>,
    pub models: Vec<JediModel>,
    pub voxels: Vec<VoxelModel>,
    pub sprites: Vec<Sprite>,
    pub sky: Sky,
}

/// Sky settings shared by every exterior/pit sector.
#[derive(Clone, Copy, Debug)]
pub struct Sky {
    pub texture: Option<TextureId>,
    /// Horizontal texel repeats per full turn, vertical texel offset.
    pub parallax: Vec2,
}

impl Default for Sky {
    fn default() -> Self {
        Self {
            texture: None,
            parallax: Vec2::new(1.0, 0.0),
        }
    }
}

/*---------------------------- sectors -------------------------------*/

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct SectorFlags: u32 {
        /// Ceiling is open sky.
        const EXTERIOR = 0x0001;
        /// Floor is open sky.
        const PIT      = 0x0002;
    }
}

#[derive(Clone, Debug)]
pub struct Sector {
    pub floor_h: f32,
    pub ceil_h: f32,
    /// 0 ..= `MAX_LIGHT`
    pub ambient: u8,
    pub floor_tex: Option<TextureId>,
    pub ceil_tex: Option<TextureId>,
    pub floor_offset: Vec2,
    pub ceil_offset: Vec2,
    pub flags: SectorFlags,
    /// Vertex arena; walls refer into it by index.
    pub vertices: Vec<Vertex>,
    pub walls: Vec<Wall>,
    pub objects: Vec<ObjectId>,
}

impl Sector {
    #[inline]
    pub fn wall_endpoints(&self, wall: &Wall) -> (Vec2, Vec2) {
        (
            self.vertices[wall.v0 as usize].pos,
            self.vertices[wall.v1 as usize].pos,
        )
    }

    /// Even-odd point-in-polygon test over the wall loop.
    pub fn contains(&self, p: Vec2) -> bool {
        let mut inside = false;
        for wall in &self.walls {
            let (a, b) = self.wall_endpoints(wall);
            if (a.y > p.y) != (b.y > p.y) {
                let t = (p.y - a.y) / (b.y - a.y);
                if p.x < a.x + t * (b.x - a.x) {
                    inside = !inside;
                }
            }
        }
        inside
    }
}

/*----------------------------- walls --------------------------------*/

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct WallFlags: u16 {
        /// Draw the mid texture alpha-tested across the portal opening.
        const ADJ_MID_TRANS = 0x0001;
        /// Sign overlay ignores sector light.
        const ILLUM_SIGN    = 0x0002;
        /// Mirror texture U along the wall.
        const FLIP_HORIZ    = 0x0004;
    }
}

/// Other side of a portal: the neighbouring sector and its wall that
/// points back here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Adjoin {
    pub sector: SectorId,
    pub mirror: WallId,
}

/// Texture slot with its own offset in world units.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WallTexture {
    pub tex: TextureId,
    pub offset: Vec2,
}

impl WallTexture {
    pub fn new(tex: TextureId) -> Self {
        Self {
            tex,
            offset: Vec2::ZERO,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Wall {
    pub v0: VertexId,
    pub v1: VertexId,
    pub adjoin: Option<Adjoin>,
    pub top: Option<WallTexture>,
    pub mid: Option<WallTexture>,
    pub bottom: Option<WallTexture>,
    pub sign: Option<WallTexture>,
    pub flags: WallFlags,
    /// Added to the sector ambient.
    pub light: i8,
}

#[derive(Clone, Copy, Debug)]
pub struct Vertex {
    pub pos: Vec2,
}

/*---------------------------- lookups -------------------------------*/

impl Level {
    /// First sector whose polygon contains `p`.
    pub fn sector_at(&self, p: Vec2) -> Option<SectorId> {
        self.sectors
            .iter()
            .position(|s| s.contains(p))
            .map(|i| i as SectorId)
    }

    pub fn model(&self, id: ModelId) -> Option<&JediModel> {
        self.models.get(id as usize)
    }

    pub fn voxel(&self, id: VoxelId) -> Option<&VoxelModel> {
        self.voxels.get(id as usize)
    }

    pub fn sprite(&self, id: SpriteId) -> Option<&Sprite> {
        self.sprites.get(id as usize)
    }
}
