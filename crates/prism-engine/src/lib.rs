//! Prism engine crate.
//!
//! Renders a rotating, vertex-colored (optionally textured) solid through an
//! immediate-mode graphics contract. The pipeline lives in [`render`] and is
//! backend-agnostic; [`device`] implements the contract on wgpu and [`window`]
//! drives it from a winit event loop.

pub mod assets;
pub mod device;
pub mod error;
pub mod window;
pub mod time;

pub mod logging;
pub mod coords;
pub mod math;
pub mod paint;
pub mod render;

pub use error::SetupError;
