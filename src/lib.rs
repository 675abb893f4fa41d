//! Animated globe core: sphere projection, landmass sampling, route arcs and
//! the draw/pause/fade cycle that animates them.
//!
//! The terminal front end in [`render`] is one consumer of the per-frame
//! [`trail::FrameSnapshot`]s; everything else is independent of any renderer.

pub mod animation;
pub mod config;
pub mod error;
pub mod geo;
pub mod land;
pub mod marker;
pub mod render;
pub mod route;
pub mod settings;
pub mod terminal;
pub mod trail;

pub use error::{GlobeError, Result};
