//! Window + runtime loop.
//!
//! Owns the `winit` EventLoop and Window and drives a [`FrameRenderer`](crate::render::FrameRenderer)
//! from the host's redraw events.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig, Scene};
