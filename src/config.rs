//! Renderer settings shared by the library and the binaries.

use clap::{Args, ValueEnum};

/// Scalar type the software pipeline runs with.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum NumericMode {
    /// Bit-exact 16.16 fixed point.
    #[default]
    Fixed,
    /// Single-precision float.
    Float,
}

/// Flattened into binary CLIs with `#[command(flatten)]`.
#[derive(Args, Clone, Debug)]
pub struct RenderConfig {
    /// Frame-buffer width in pixels
    #[arg(long, short = 'W', default_value_t = 320)]
    pub width: usize,

    /// Frame-buffer height in pixels
    #[arg(long, short = 'H', default_value_t = 200)]
    pub height: usize,

    /// Horizontal field of view in degrees
    #[arg(long, default_value_t = 90.0)]
    pub fov: f32,

    /// Vertical stretch of a pixel (1.2 for 320x200 on a 4:3 display)
    #[arg(long, default_value_t = 1.0)]
    pub pixel_aspect: f32,

    /// Arithmetic used by the renderer
    #[arg(long, value_enum, default_value_t = NumericMode::Fixed)]
    pub numeric: NumericMode,

    /// Start with the head-lamp on
    #[arg(long)]
    pub camera_light: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 200,
            fov: 90.0,
            pixel_aspect: 1.0,
            numeric: NumericMode::Fixed,
            camera_light: false,
        }
    }
}

impl RenderConfig {
    /// Pixels per view-space unit at depth 1, horizontally.
    pub fn focal_length(&self, width: usize) -> f32 {
        let half_fov = self.fov.clamp(10.0, 170.0).to_radians() * 0.5;
        width as f32 * 0.5 / half_fov.tan()
    }
}

/*======================================================================*/
/*                               Tests                                  */
/*======================================================================*/
