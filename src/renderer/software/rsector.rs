//! The renderer's own copy of each sector, converted to the active scalar.

use bitflags::bitflags;

use crate::math::{Decimal, Vec2D};
use crate::world::{Sector, SectorFlags, SectorId, TextureId, WallFlags, WallTexture};

use super::limits::TEXELS_PER_UNIT;

/// Texture slot with its offset already in texels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RWallTexture<D> {
    pub tex: TextureId,
    pub u_off: D,
    pub v_off: D,
}

impl<D: Decimal> RWallTexture<D> {
    fn from_world(t: &WallTexture) -> Self {
        let scale = TEXELS_PER_UNIT as f32;
        Self {
            tex: t.tex,
            u_off: D::from_f32(t.offset.x * scale),
            v_off: D::from_f32(t.offset.y * scale),
        }
    }
}

bitflags! {
    /// Sections a wall draws, from the height step to its neighbour.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct WallDrawFlags: u8 {
        /// Neighbour ceiling is lower.
        const TOP    = 0x01;
        /// Neighbour floor is higher.
        const BOTTOM = 0x02;
        /// Solid wall, no neighbour.
        const MID    = 0x04;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WallDrawMode {
    Solid,
    /// Open portal, no steps.
    Mask,
    Top,
    Bottom,
    TopBottom,
}

impl WallDrawFlags {
    pub fn mode(self) -> WallDrawMode {
        if self.contains(Self::MID) {
            WallDrawMode::Solid
        } else if self.contains(Self::TOP | Self::BOTTOM) {
            WallDrawMode::TopBottom
        } else if self.contains(Self::TOP) {
            WallDrawMode::Top
        } else if self.contains(Self::BOTTOM) {
            WallDrawMode::Bottom
        } else {
            WallDrawMode::Mask
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct RWall<D> {
    pub v0: usize,
    pub v1: usize,
    pub adjoin: Option<SectorId>,
    pub top: Option<RWallTexture<D>>,
    pub mid: Option<RWallTexture<D>>,
    pub bottom: Option<RWallTexture<D>>,
    pub sign: Option<RWallTexture<D>>,
    pub flags: WallFlags,
    pub light: i32,
    /// Wall length in texels.
    pub texel_len: D,
    pub draw_flags: WallDrawFlags,
    /// Survived culling this frame.
    pub visible: bool,
}

/// Heights, light and flat textures: everything `SectorDirty::SURFACE` covers.
#[derive(Clone, Copy, Debug, Default)]
pub struct SectorSurface<D> {
    pub floor_h: D,
    pub ceil_h: D,
    pub ambient: i32,
    pub floor_tex: Option<TextureId>,
    pub ceil_tex: Option<TextureId>,
    /// Flat offsets in texels.
    pub floor_off: Vec2D<D>,
    pub ceil_off: Vec2D<D>,
    pub flags: SectorFlags,
}

#[derive(Clone, Debug)]
pub struct RSector<D> {
    pub id: SectorId,
    pub surface: SectorSurface<D>,
    pub verts_world: Vec<Vec2D<D>>,
    pub verts_view: Vec<Vec2D<D>>,
    pub walls: Vec<RWall<D>>,

    /// Slice of the frame's segment array produced by this sector.
    pub seg_start: usize,
    pub seg_count: usize,
    pub last_processed_frame: u32,
    pub last_drawn_frame: u32,
}

impl<D: Decimal> RSector<D> {
    pub fn from_world(id: SectorId, src: &Sector) -> Self {
        let mut s = Self {
            id,
            surface: SectorSurface::default(),
            verts_world: Vec::new(),
            verts_view: Vec::new(),
            walls: Vec::new(),
            seg_start: 0,
            seg_count: 0,
            last_processed_frame: 0,
            last_drawn_frame: 0,
        };
        s.copy_geometry(src);
        s.copy_surface(src);
        s
    }

    /// Rebuild vertices and walls, including derived lengths.
    pub fn copy_geometry(&mut self, src: &Sector) {
        self.verts_world.clear();
        self.verts_world
            .extend(src.vertices.iter().map(|v| Vec2D::from_glam(v.pos)));
        self.verts_view.clear();
        self.verts_view.resize(self.verts_world.len(), Vec2D::default());

        self.walls.clear();
        for wall in &src.walls {
            let (a, b) = src.wall_endpoints(wall);
            let texel_len = a.distance(b) * TEXELS_PER_UNIT as f32;
            self.walls.push(RWall {
                v0: wall.v0 as usize,
                v1: wall.v1 as usize,
                adjoin: wall.adjoin.map(|adj| adj.sector),
                top: None,
                mid: None,
                bottom: None,
                sign: None,
                flags: wall.flags,
                light: 0,
                texel_len: D::from_f32(texel_len),
                draw_flags: WallDrawFlags::empty(),
                visible: false,
            });
        }
        // Force the next traversal to re-project.
        self.last_processed_frame = 0;
    }

    /// Refresh heights, light, flags and every texture slot.
    pub fn copy_surface(&mut self, src: &Sector) {
        let scale = TEXELS_PER_UNIT as f32;
        self.surface = SectorSurface {
            floor_h: D::from_f32(src.floor_h),
            ceil_h: D::from_f32(src.ceil_h),
            ambient: i32::from(src.ambient),
            floor_tex: src.floor_tex,
            ceil_tex: src.ceil_tex,
            floor_off: Vec2D::from_glam(src.floor_offset * scale),
            ceil_off: Vec2D::from_glam(src.ceil_offset * scale),
            flags: src.flags,
        };

        for (dst, wall) in self.walls.iter_mut().zip(&src.walls) {
            dst.top = wall.top.as_ref().map(RWallTexture::from_world);
            dst.mid = wall.mid.as_ref().map(RWallTexture::from_world);
            dst.bottom = wall.bottom.as_ref().map(RWallTexture::from_world);
            dst.sign = wall.sign.as_ref().map(RWallTexture::from_world);
            dst.flags = wall.flags;
            dst.light = i32::from(wall.light);
        }
    }
}

/// Recompute the draw flags of every wall of sector `id` from the heights
/// of its neighbours.
pub fn update_draw_flags<D: Decimal>(sectors: &mut [RSector<D>], id: SectorId) {
    let Some(sec) = sectors.get(id as usize) else {
        return;
    };
    let own = sec.surface;
    let flags: Vec<WallDrawFlags> = sec
        .walls
        .iter()
        .map(|wall| match wall.adjoin.and_then(|n| sectors.get(n as usize)) {
            None => WallDrawFlags::MID,
            Some(next) => {
                let mut f = WallDrawFlags::empty();
                if next.surface.ceil_h < own.ceil_h {
                    f |= WallDrawFlags::TOP;
                }
                if next.surface.floor_h > own.floor_h {
                    f |= WallDrawFlags::BOTTOM;
                }
                f
            }
        })
        .collect();

    for (wall, f) in sectors[id as usize].walls.iter_mut().zip(flags) {
        wall.draw_flags = f;
    }
}

/*======================================================================*/
/*                               Tests                                  */
/*======================================================================*/
