//! Numeric core shared by both render pipelines.
//!
//! Every renderer routine is written once against [`Decimal`] and
//! instantiated for [`Fixed16`] (bit-exact 16.16) or `f32`.

pub mod angle;
pub mod decimal;
pub mod fixed;
pub mod vector;

pub use angle::{ANGLE_90, ANGLE_180, ANGLE_MASK, ANGLE_MAX, Angle};
pub use decimal::{Decimal, lerp};
pub use fixed::Fixed16;
pub use vector::{Mat3D, Vec2D, Vec3D, cross2};
