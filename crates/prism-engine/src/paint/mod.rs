//! Color representation shared by the pipeline and its backends.

pub mod color;

pub use color::Color;
