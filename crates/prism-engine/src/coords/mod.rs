//! Surface-space types shared by the pipeline and its backends.
//!
//! Sizes are physical pixels of the host drawable; the pipeline never works in
//! logical (DPI-scaled) units.

mod size;

pub use size::PixelSize;
