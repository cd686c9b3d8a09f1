use crate::render::FrameStatus;

/// High-level response after a surface error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface was reconfigured; rendering may resume next frame.
    Reconfigured,
    /// Transient error; skip the current frame.
    SkipFrame,
    /// Fatal error (commonly OOM); terminate gracefully.
    Fatal,
}

impl SurfaceErrorAction {
    /// Status reported for the frame that hit the error.
    pub fn frame_status(self) -> FrameStatus {
        match self {
            SurfaceErrorAction::Reconfigured | SurfaceErrorAction::SkipFrame => FrameStatus::Dropped,
            SurfaceErrorAction::Fatal => FrameStatus::SurfaceLost,
        }
    }
}
