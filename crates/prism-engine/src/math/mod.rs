//! Pure transform math.
//!
//! Nothing here touches a graphics API, so every matrix the pipeline uploads
//! can be checked in plain unit tests.

mod mat4;

pub use mat4::Mat4;
