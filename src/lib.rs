//! Portal/sector software renderer in the style of the Jedi engine.
//!
//! The game side owns a [`world::Level`]; a [`renderer::Renderer`] keeps its
//! own converted copy and draws it from a [`world::Camera`] into an indexed
//! frame buffer.

pub mod config;
pub mod math;
pub mod renderer;
pub mod world;
