//! ---------------------------------------------------------------------------
//! Jedi-style software sector renderer
//!
//! * Writes 8-bit palette indices; [`RendererExt`](super::RendererExt) expands
//!   them to 0xAARRGGBB.
//! * Walls are drawn front to back per sector, portals recurse into the
//!   sector behind with a narrowed window, objects are painted back to front
//!   after their sector.
//! * Every routine is generic over [`Decimal`](crate::math::Decimal), so the
//!   same code runs bit-exact in 16.16 fixed point or in `f32`.
//! ---------------------------------------------------------------------------

pub mod columns;
pub mod flat;
pub mod limits;
pub mod merge;
pub mod wall;

mod clip;
mod model;
mod objects;
mod polygon;
mod renderer;
mod rsector;
mod sector;
mod sprite;
mod voxel;
mod wall_draw;

pub use renderer::{Software, ViewParams};
