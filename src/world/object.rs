use bitflags::bitflags;
use glam::{Vec2, Vec3};

use crate::world::geometry::{Level, SectorId};
use crate::world::model::ModelId;
use crate::world::sprite::SpriteId;
use crate::world::voxel::VoxelId;

pub type ObjectId = u16;

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct ObjectFlags: u8 {
        const FULLBRIGHT = 0x01;
        const HIDDEN     = 0x02;
    }
}

/// What an object draws as.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ObjectPayload {
    Sprite(SpriteId),
    Model(ModelId),
    Voxel(VoxelId),
}

/// A thing placed in a sector. `pos.y` is the world height of its base.
#[derive(Clone, Debug)]
pub struct SecObject {
    pub pos: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
    pub sector: SectorId,
    pub payload: ObjectPayload,
    pub flags: ObjectFlags,
}

impl SecObject {
    pub fn new(pos: Vec3, sector: SectorId, payload: ObjectPayload) -> Self {
        Self {
            pos,
            yaw: 0.0,
            pitch: 0.0,
            roll: 0.0,
            sector,
            payload,
            flags: ObjectFlags::empty(),
        }
    }
}

impl Level {
    /// Add an object and register it with its sector.
    pub fn spawn_object(&mut self, obj: SecObject) -> ObjectId {
        let id = self.objects.len() as ObjectId;
        if let Some(sec) = self.sectors.get_mut(obj.sector as usize) {
            sec.objects.push(id);
        }
        self.objects.push(obj);
        id
    }

    /// Move an object and re-parent it when it crosses into another sector.
    ///
    /// The new sector is looked up among the current sector's neighbours
    /// first, then the whole level. Positions outside every sector keep the
    /// old parent. Returns the sector the object ends up in.
    pub fn move_object(&mut self, id: ObjectId, pos: Vec3) -> Option<SectorId> {
        let old = self.objects.get(id as usize)?.sector;
        let p = Vec2::new(pos.x, pos.z);

        let neighbour = self.sectors.get(old as usize).and_then(|sec| {
            if sec.contains(p) {
                return Some(old);
            }
            sec.walls
                .iter()
                .filter_map(|w| w.adjoin)
                .map(|a| a.sector)
                .find(|&s| self.sectors[s as usize].contains(p))
        });
        let new = neighbour.or_else(|| self.sector_at(p)).unwrap_or(old);

        if new != old {
            if let Some(sec) = self.sectors.get_mut(old as usize) {
                sec.objects.retain(|&o| o != id);
            }
            self.sectors[new as usize].objects.push(id);
            log::trace!("object {id} moved from sector {old} to {new}");
        }
        let obj = &mut self.objects[id as usize];
        obj.pos = pos;
        obj.sector = new;
        Some(new)
    }
}
