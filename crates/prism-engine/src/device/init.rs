/// Knobs for opening the device and configuring the window's swapchain.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Pick an sRGB swapchain format when one is offered.
    ///
    /// Off by default, so clear colors and texels land in the surface
    /// unconverted, as in a plain RGBA8 framebuffer.
    pub prefer_srgb: bool,

    /// `Fifo` paces frames to the display refresh and is always supported.
    pub present_mode: wgpu::PresentMode,

    /// Compositing mode; an unsupported request falls back to the first mode
    /// the surface offers.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    pub power_preference: wgpu::PowerPreference,

    /// Nothing beyond core wgpu is needed to draw the solid.
    pub required_features: wgpu::Features,

    /// Backbuffer and texture allocations are checked against these.
    pub required_limits: wgpu::Limits,

    /// Latency hint for the swapchain; backends may ignore it.
    pub desired_maximum_frame_latency: u32,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            prefer_srgb: false,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            power_preference: wgpu::PowerPreference::default(),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            desired_maximum_frame_latency: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_target_a_linear_vsynced_surface() {
        let init = GpuInit::default();
        assert!(!init.prefer_srgb);
        assert_eq!(init.present_mode, wgpu::PresentMode::Fifo);
        assert!(init.required_features.is_empty());
        assert!(init.required_limits.max_texture_dimension_2d >= 2048);
    }
}
