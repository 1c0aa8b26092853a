//! Fixed capacities of the software renderer.
//!
//! Exceeding any of these is never fatal: the excess work is dropped and an
//! error is logged (except the adjoin depth, which silently stops).

/// Deepest portal recursion; level 0 is the camera's sector.
pub const MAX_ADJOIN_DEPTH: usize = 40;

/// Wall segments produced per frame across all sectors.
pub const MAX_WALL_SEGMENTS: usize = 2048;

/// Extra pieces the merge step may create while splitting, per sector.
pub const MAX_SPLIT_WALLS: usize = 64;

/// Portals recorded per sector visit.
pub const MAX_ADJOIN_SEGMENTS: usize = 128;

/// Objects drawn per sector visit.
pub const MAX_VISIBLE_OBJECTS: usize = 128;

/// Vertices of a polygon after frustum clipping.
pub const MAX_POLYGON_VERTICES: usize = 32;

/// Brightest light level.
pub const MAX_LIGHT: i32 = 31;

/// Texels per world unit on walls and flats.
pub const TEXELS_PER_UNIT: i32 = 8;

/// View-space near plane.
pub const NEAR_PLANE: f32 = 1.0;
