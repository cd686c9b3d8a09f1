//! Time subsystem.
//!
//! Provides stable, testable frame timing utilities without coupling to the runtime.
//! Intended usage:
//! - one `FrameClock` per window (or per render loop)
//! - call `tick()` once per presented frame to obtain `FrameTime`
//! - a `WallClock` answers "what time is it" for time-driven animation

mod frame_clock;
mod wall_clock;

pub use frame_clock::{FrameClock, FrameTime};
pub use wall_clock::{MonotonicClock, WallClock};
