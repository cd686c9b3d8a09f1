use crate::coords::PixelSize;
use crate::error::SetupError;

use super::backend::{GraphicsBackend, TargetsHandle};

/// Owns the color/depth backbuffers bound to the host drawable.
///
/// Backbuffers are recreated, never resized in place, whenever the drawable's
/// pixel size changes. Once attached, the targets are the implicit draw
/// destination of every frame on the owning thread.
#[derive(Debug)]
pub struct SurfaceManager {
    depth: bool,
    size: PixelSize,
    targets: Option<TargetsHandle>,
}

impl SurfaceManager {
    pub fn new(depth: bool) -> Self {
        Self {
            depth,
            size: PixelSize::default(),
            targets: None,
        }
    }

    /// Binds backbuffers of `size` to the host drawable.
    ///
    /// - unchanged size with live targets: no-op
    /// - zero-area size: deferred; existing targets are kept until a usable size arrives
    /// - otherwise: the old targets are released and new ones allocated
    pub fn attach_to<B: GraphicsBackend>(
        &mut self,
        backend: &mut B,
        size: PixelSize,
    ) -> Result<(), SetupError> {
        if self.targets.is_some() && size == self.size {
            return Ok(());
        }

        if size.is_empty() {
            log::debug!(
                "deferring backbuffer allocation for empty surface {}x{}",
                size.width,
                size.height
            );
            return Ok(());
        }

        backend.make_current()?;

        if let Some(old) = self.targets.take() {
            backend.delete_targets(old);
        }

        let targets = backend.create_targets(size, self.depth)?;
        self.targets = Some(targets);
        self.size = size;

        log::info!(
            "surface attached at {}x{} (depth buffer: {})",
            size.width,
            size.height,
            self.depth
        );
        Ok(())
    }

    pub fn targets(&self) -> Option<TargetsHandle> {
        self.targets
    }

    /// Size of the live backbuffers.
    pub fn size(&self) -> PixelSize {
        self.size
    }
}
