//! Rendering abstraction layer.
//!
//! *The rest of the engine never touches a pixel buffer directly.*
//! It hands a borrowed [`Level`] and [`TextureBank`] to a type that
//! implements [`Renderer`] and gets an 8-bit indexed frame back.
//!
//! * The software back-end is generic over its scalar type; [`AnyRenderer`]
//!   picks fixed or float at runtime from [`RenderConfig`].
//! * A helper blanket-impl [`RendererExt`] adds `draw_rgba` so call-sites
//!   that want true-colour output stay short.

use bitflags::bitflags;

use crate::config::{NumericMode, RenderConfig};
use crate::math::Fixed16;
use crate::world::{Camera, Level, SectorId, TextureBank};

/// Pixel format handed to window back-ends (0xAARRGGBB).
pub type Rgba = u32;

bitflags! {
    /// Which parts of a sector changed since the last copy.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SectorDirty: u8 {
        /// Vertices or wall list; rebuilds derived lengths.
        const GEOMETRY = 0x01;
        /// Heights, textures, offsets, light, flags.
        const SURFACE  = 0x02;
    }
}

/// Counters for the last finished frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frame: u32,
    pub sectors_drawn: u32,
    pub segments_processed: u32,
    pub segments_drawn: u32,
    pub flat_spans: u32,
    pub sky_columns: u32,
    pub objects_drawn: u32,
    pub max_level: u32,
    /// Any fixed-capacity table that overflowed this frame.
    pub overflows: u32,
}

/// A renderer that keeps its own converted copy of the level geometry.
///
/// Frame flow: `set_resolution` once (and on resize), `copy_level` on load,
/// `update_sector` whenever game logic moves floors or swaps textures, then
/// `set_camera` + `draw_frame` every frame.
pub trait Renderer {
    /// (Re)allocate per-column and per-row scratch. Repeating the current
    /// size is a no-op.
    fn set_resolution(&mut self, width: usize, height: usize);

    fn resolution(&self) -> (usize, usize);

    fn set_camera(&mut self, camera: &Camera);

    /// Full copy of every sector.
    fn copy_level(&mut self, level: &Level);

    fn update_sector(&mut self, level: &Level, id: SectorId, dirty: SectorDirty);

    /// Render into an indexed frame of `width * height` bytes. Never fails;
    /// problems are logged and the affected work is skipped.
    fn draw_frame(&mut self, level: &Level, bank: &TextureBank, target: &mut [u8]);

    fn stats(&self) -> FrameStats;
}

/// Convenience blanket-impl with a true-colour adaptor.
pub trait RendererExt: Renderer {
    /// Draw, expand through the bank's palette and **loan** the finished
    /// buffer to `submit`.
    ///
    /// * `submit(&[Rgba], w, h)` is run exactly once per frame.
    /// * Window callers pass `|fb, w, h| window.update_with_buffer(fb, w, h)`.
    fn draw_rgba<F, R>(
        &mut self,
        level: &Level,
        bank: &TextureBank,
        indexed: &mut Vec<u8>,
        rgba: &mut Vec<Rgba>,
        submit: F,
    ) -> R
    where
        F: FnOnce(&[Rgba], usize, usize) -> R,
    {
        let (w, h) = self.resolution();
        indexed.resize(w * h, 0);
        rgba.resize(w * h, 0);
        self.draw_frame(level, bank, indexed.as_mut_slice());
        bank.expand(indexed.as_slice(), rgba.as_mut_slice());
        submit(rgba.as_slice(), w, h)
    }
}
impl<T: Renderer + ?Sized> RendererExt for T {}

/// Software renderer with the scalar type chosen at runtime.
pub enum AnyRenderer {
    Fixed(Software<Fixed16>),
    Float(Software<f32>),
}

impl AnyRenderer {
    pub fn new(config: &RenderConfig) -> Self {
        let mut r = match config.numeric {
            NumericMode::Fixed => AnyRenderer::Fixed(Software::new(config.clone())),
            NumericMode::Float => AnyRenderer::Float(Software::new(config.clone())),
        };
        r.set_resolution(config.width, config.height);
        r
    }

    pub fn numeric(&self) -> NumericMode {
        match self {
            AnyRenderer::Fixed(_) => NumericMode::Fixed,
            AnyRenderer::Float(_) => NumericMode::Float,
        }
    }
}

macro_rules! dispatch {
    ($self:ident, $r:ident => $e:expr) => {
        match $self {
            AnyRenderer::Fixed($r) => $e,
            AnyRenderer::Float($r) => $e,
        }
    };
}

impl Renderer for AnyRenderer {
    fn set_resolution(&mut self, width: usize, height: usize) {
        dispatch!(self, r => r.set_resolution(width, height))
    }

    fn resolution(&self) -> (usize, usize) {
        dispatch!(self, r => r.resolution())
    }

    fn set_camera(&mut self, camera: &Camera) {
        dispatch!(self, r => r.set_camera(camera))
    }

    fn copy_level(&mut self, level: &Level) {
        dispatch!(self, r => r.copy_level(level))
    }

    fn update_sector(&mut self, level: &Level, id: SectorId, dirty: SectorDirty) {
        dispatch!(self, r => r.update_sector(level, id, dirty))
    }

    fn draw_frame(&mut self, level: &Level, bank: &TextureBank, target: &mut [u8]) {
        dispatch!(self, r => r.draw_frame(level, bank, target))
    }

    fn stats(&self) -> FrameStats {
        dispatch!(self, r => r.stats())
    }
}

pub mod software;
pub use software::Software;
