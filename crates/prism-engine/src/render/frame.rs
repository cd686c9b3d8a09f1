//! Per-frame protocol.
//!
//! One `render_frame` call walks a fixed sequence: clear, depth test,
//! projection, model-view, uniform upload, viewport, attribute pointers,
//! texture, draw, present. Nothing is skipped or reordered, and no GPU state is
//! assumed to survive from the previous frame.

use crate::assets::AssetSource;
use crate::coords::PixelSize;
use crate::error::SetupError;
use crate::math::Mat4;
use crate::time::{MonotonicClock, WallClock};

use super::backend::{FrameStatus, GraphicsBackend, TextureHandle};
use super::config::PipelineConfig;
use super::geometry::{GeometryBuffers, GeometryData};
use super::shader::{symbols, ShaderProgram};
use super::surface::SurfaceManager;
use super::texture;

/// Spin rate of the solid about X and Y.
pub const ROTATION_DEGREES_PER_SECOND: f32 = 90.0;

/// Horizontal half-extent of the frustum on the near plane.
const FRUSTUM_HALF_WIDTH: f32 = 2.0;
const FRUSTUM_NEAR: f32 = 4.0;
const FRUSTUM_FAR: f32 = 10.0;

/// Distance of the solid from the eye.
const MODEL_DEPTH: f32 = -7.0;

/// Perspective frustum keyed on the viewport's aspect ratio.
///
/// Left/right are fixed at `∓2`; bottom/top are `∓2 * height / width`.
/// Only the ratio matters, never the absolute size.
pub fn projection_for(viewport: PixelSize) -> Mat4 {
    let half_height = FRUSTUM_HALF_WIDTH * viewport.inverse_aspect();
    Mat4::frustum(
        -FRUSTUM_HALF_WIDTH,
        FRUSTUM_HALF_WIDTH,
        -half_height,
        half_height,
        FRUSTUM_NEAR,
        FRUSTUM_FAR,
    )
}

/// Model-view: horizontal oscillation `sin(t)` at fixed depth, then the same
/// rotation angle about X and Y.
pub fn modelview_for(time_seconds: f64, rotation_degrees: f32) -> Mat4 {
    Mat4::translation(time_seconds.sin() as f32, 0.0, MODEL_DEPTH).rotate_degrees(
        rotation_degrees,
        rotation_degrees,
        0.0,
    )
}

/// Mutable transform state carried between frames.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TransformState {
    /// Accumulated rotation in degrees. Only ever grows; the trig functions
    /// take care of wrapping.
    pub rotation_degrees: f32,
    pub projection: Mat4,
    pub modelview: Mat4,
}

impl TransformState {
    /// Advances the rotation by `elapsed` seconds of spin.
    ///
    /// Negative and non-finite deltas count as zero so the accumulator stays
    /// finite and monotonic.
    pub fn advance(&mut self, elapsed: f32) {
        if elapsed.is_finite() && elapsed > 0.0 {
            self.rotation_degrees += ROTATION_DEGREES_PER_SECOND * elapsed;
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RenderState {
    Idle,
    Rendering,
}

/// Drives the pipeline: owns the backend, the backbuffers, the program, the
/// uploaded geometry and the optional texture.
///
/// Single-threaded by contract: every call must come from the thread that
/// owns the backend's context. Driving frames from several threads is
/// undefined.
pub struct FrameRenderer<B: GraphicsBackend> {
    backend: B,
    config: PipelineConfig,
    surface: SurfaceManager,
    program: ShaderProgram,
    geometry: GeometryBuffers,
    texture: Option<TextureHandle>,
    transform: TransformState,
    clock: Box<dyn WallClock>,
    state: RenderState,
}

impl<B: GraphicsBackend> FrameRenderer<B> {
    /// Sets up the whole pipeline against the backend's host surface.
    pub fn initialize(
        backend: B,
        config: PipelineConfig,
        geometry: &GeometryData,
        assets: &dyn AssetSource,
    ) -> Result<Self, SetupError> {
        Self::initialize_with_clock(backend, config, geometry, assets, Box::new(MonotonicClock::new()))
    }

    /// Like [`initialize`](Self::initialize) with an explicit wall clock.
    pub fn initialize_with_clock(
        mut backend: B,
        config: PipelineConfig,
        geometry: &GeometryData,
        assets: &dyn AssetSource,
        clock: Box<dyn WallClock>,
    ) -> Result<Self, SetupError> {
        let depth = config.depth_test_enabled;

        let mut surface = SurfaceManager::new(depth);
        let size = backend.surface_size();
        surface.attach_to(&mut backend, size)?;
        if surface.targets().is_none() {
            return Err(SetupError::Context(format!(
                "host surface has no drawable area ({}x{})",
                size.width, size.height
            )));
        }

        let program = ShaderProgram::from_assets(
            &mut backend,
            assets,
            &config.vertex_shader,
            &config.fragment_shader,
            depth,
        )?;

        let loc = program.locations();
        if config.texturing_enabled {
            if loc.tex_coord.is_none() {
                return Err(SetupError::MissingSymbol(symbols::TEX_COORD_IN));
            }
            if loc.texture.is_none() {
                return Err(SetupError::MissingSymbol(symbols::TEXTURE));
            }
            if config.texture.is_none() {
                return Err(SetupError::Config(
                    "texturing is enabled but no texture asset is named".to_string(),
                ));
            }
        } else if loc.texture.is_some() {
            return Err(SetupError::Config(format!(
                "texturing is disabled but the program samples `{}`",
                symbols::TEXTURE
            )));
        }

        program.use_program(&mut backend);

        let geometry = geometry.upload(&mut backend)?;

        let texture = match config.texture_name() {
            Some(name) => Some(texture::load(&mut backend, assets, name)?),
            None => None,
        };

        log::info!(
            "pipeline ready (depth test: {}, texturing: {})",
            config.depth_test_enabled,
            config.texturing_enabled
        );

        Ok(Self {
            backend,
            config,
            surface,
            program,
            geometry,
            texture,
            transform: TransformState::default(),
            clock,
            state: RenderState::Idle,
        })
    }

    /// Recreates the backbuffers after the host surface changed size.
    pub fn resize(&mut self, size: PixelSize) -> Result<(), SetupError> {
        self.surface.attach_to(&mut self.backend, size)
    }

    /// Loads `name` and makes it the bound texture.
    ///
    /// On failure the previously bound texture stays in place untouched.
    pub fn replace_texture(&mut self, assets: &dyn AssetSource, name: &str) -> Result<(), SetupError> {
        if self.program.locations().texture.is_none() {
            return Err(SetupError::Config(
                "the linked program samples no texture".to_string(),
            ));
        }

        let texture = texture::load(&mut self.backend, assets, name)?;
        if let Some(old) = self.texture.replace(texture) {
            self.backend.delete_texture(old);
        }
        Ok(())
    }

    /// Renders and presents one frame. `elapsed` is the time since the
    /// previous frame in seconds.
    pub fn render_frame(&mut self, elapsed: f32) -> FrameStatus {
        let Some(targets) = self.surface.targets() else {
            return FrameStatus::Dropped;
        };

        debug_assert_eq!(self.state, RenderState::Idle, "render_frame re-entered");
        self.state = RenderState::Rendering;

        let depth = self.config.depth_test_enabled;
        let viewport = self.surface.size();
        let loc = *self.program.locations();

        self.backend.clear(targets, self.config.clear_color, depth);

        if depth {
            self.backend.enable_depth_test();
        }

        self.transform.projection = projection_for(viewport);

        self.transform.advance(elapsed);
        self.transform.modelview =
            modelview_for(self.clock.now_seconds(), self.transform.rotation_degrees);

        self.backend
            .set_uniform_mat4(loc.projection, &self.transform.projection);
        self.backend
            .set_uniform_mat4(loc.modelview, &self.transform.modelview);

        self.backend.set_viewport(viewport);

        let layout = self.program.vertex_layout();
        for attribute in &layout.attributes {
            self.backend
                .bind_vertex_attribute(self.geometry.vertices, layout.stride, attribute);
        }

        if let (Some(texture), Some(sampler)) = (self.texture, loc.texture) {
            self.backend.bind_texture(0, texture, sampler);
        }

        self.backend
            .draw_indexed(self.geometry.indices, self.geometry.index_count);

        let status = self.backend.present(targets);

        self.state = RenderState::Idle;
        status
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn surface(&self) -> &SurfaceManager {
        &self.surface
    }

    pub fn program(&self) -> &ShaderProgram {
        &self.program
    }

    pub fn texture(&self) -> Option<TextureHandle> {
        self.texture
    }

    pub fn transform(&self) -> &TransformState {
        &self.transform
    }

    pub fn rotation_degrees(&self) -> f32 {
        self.transform.rotation_degrees
    }

    pub fn state(&self) -> RenderState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::assets::MemoryAssets;
    use crate::render::backend::UniformLocation;
    use crate::render::testing::{bundled_assets, png, Call, FixedClock, RecordingBackend};

    fn renderer(config: PipelineConfig, geometry: GeometryData, size: PixelSize) -> FrameRenderer<RecordingBackend> {
        let backend = RecordingBackend::with_size(size);
        FrameRenderer::initialize_with_clock(
            backend,
            config,
            &geometry,
            &bundled_assets(),
            Box::new(FixedClock(0.0)),
        )
        .unwrap()
    }

    fn textured_cube() -> FrameRenderer<RecordingBackend> {
        renderer(
            PipelineConfig::textured_cube(),
            GeometryData::textured_cube(),
            PixelSize::new(800, 600),
        )
    }

    fn frame_calls(r: &mut FrameRenderer<RecordingBackend>, elapsed: f32) -> Vec<Call> {
        r.backend_mut().clear_calls();
        assert_eq!(r.render_frame(elapsed), FrameStatus::Presented);
        r.backend().calls().to_vec()
    }

    fn uploaded(calls: &[Call], location: UniformLocation) -> Mat4 {
        calls
            .iter()
            .find_map(|c| match c {
                Call::SetUniform { location: l, value } if *l == location => Some(*value),
                _ => None,
            })
            .expect("uniform not uploaded")
    }

    // ── pure transforms ───────────────────────────────────────────────────

    #[test]
    fn projection_depends_only_on_aspect_ratio() {
        assert_eq!(
            projection_for(PixelSize::new(1920, 1080)),
            projection_for(PixelSize::new(1280, 720))
        );
        assert_ne!(
            projection_for(PixelSize::new(800, 400)),
            projection_for(PixelSize::new(800, 600))
        );
    }

    #[test]
    fn wide_surface_halves_vertical_extent() {
        assert_eq!(
            projection_for(PixelSize::new(1000, 500)),
            Mat4::frustum(-2.0, 2.0, -1.0, 1.0, 4.0, 10.0)
        );
    }

    #[test]
    fn modelview_at_rest_is_pure_translation() {
        let t = 1.2_f64;
        let m = modelview_for(t, 0.0);
        assert_relative_eq!(m.get(0, 3), t.sin() as f32, epsilon = 1e-6);
        assert_eq!(m.get(1, 3), 0.0);
        assert_eq!(m.get(2, 3), -7.0);
        assert_eq!(m.get(0, 0), 1.0);
    }

    #[test]
    fn modelview_rotates_before_translating() {
        let m = modelview_for(0.0, 90.0);
        let expected = Mat4::translation(0.0, 0.0, -7.0) * Mat4::rotation_xyz_degrees(90.0, 90.0, 0.0);
        assert_eq!(m, expected);
    }

    // ── rotation accumulator ──────────────────────────────────────────────

    #[test]
    fn one_second_adds_ninety_degrees() {
        let mut r = textured_cube();
        let before = r.rotation_degrees();
        r.render_frame(1.0);
        assert_eq!(r.rotation_degrees() - before, 90.0);
    }

    #[test]
    fn accumulator_is_frame_rate_independent() {
        let mut many = textured_cube();
        for _ in 0..10 {
            many.render_frame(0.1);
        }
        let mut one = textured_cube();
        one.render_frame(1.0);

        assert_relative_eq!(many.rotation_degrees(), 90.0, epsilon = 1e-4);
        assert_relative_eq!(many.rotation_degrees(), one.rotation_degrees(), epsilon = 1e-4);
    }

    #[test]
    fn accumulator_never_decreases() {
        let mut r = textured_cube();
        r.render_frame(0.5);
        let before = r.rotation_degrees();
        r.render_frame(-1.0);
        r.render_frame(f32::NAN);
        assert_eq!(r.rotation_degrees(), before);
    }

    #[test]
    fn infinite_delta_keeps_transforms_finite() {
        let mut r = textured_cube();
        r.render_frame(0.5);
        let before = r.rotation_degrees();

        let modelview = r.program().locations().modelview;
        let calls = frame_calls(&mut r, f32::INFINITY);

        assert_eq!(r.rotation_degrees(), before);
        let m = uploaded(&calls, modelview);
        assert!((0..4).all(|row| (0..4).all(|col| m.get(row, col).is_finite())));
    }

    // ── frame protocol ────────────────────────────────────────────────────

    #[test]
    fn textured_frame_runs_every_step_in_order() {
        let mut r = textured_cube();
        let calls = frame_calls(&mut r, 0.016);
        let names: Vec<&str> = calls.iter().map(Call::name).collect();
        assert_eq!(
            names,
            [
                "clear",
                "enable_depth_test",
                "set_uniform",
                "set_uniform",
                "set_viewport",
                "bind_attribute",
                "bind_attribute",
                "bind_attribute",
                "bind_texture",
                "draw_indexed",
                "present",
            ]
        );
    }

    #[test]
    fn textured_frame_binds_texture_unit_zero_and_draws_all_indices() {
        let mut r = textured_cube();
        let texture = r.texture().unwrap();
        let sampler = r.program().locations().texture.unwrap();
        let calls = frame_calls(&mut r, 0.016);

        assert!(calls.contains(&Call::BindTexture { unit: 0, texture, sampler }));
        assert!(calls.iter().any(|c| matches!(c, Call::DrawIndexed { count: 36, .. })));
        assert!(calls.iter().any(|c| matches!(c, Call::Clear { depth: true, .. })));
    }

    #[test]
    fn flat_quad_skips_depth_and_texture() {
        let mut r = renderer(PipelineConfig::flat_quad(), GeometryData::quad(), PixelSize::new(320, 480));
        let calls = frame_calls(&mut r, 0.016);
        let names: Vec<&str> = calls.iter().map(Call::name).collect();
        assert_eq!(
            names,
            [
                "clear",
                "set_uniform",
                "set_uniform",
                "set_viewport",
                "bind_attribute",
                "bind_attribute",
                "draw_indexed",
                "present",
            ]
        );
        assert!(calls.iter().any(|c| matches!(c, Call::Clear { depth: false, .. })));
        assert!(calls.iter().any(|c| matches!(c, Call::DrawIndexed { count: 6, .. })));
    }

    #[test]
    fn attribute_pointers_use_fixed_stride_and_offsets() {
        let mut r = textured_cube();
        let calls = frame_calls(&mut r, 0.0);
        let offsets: Vec<(u64, u64)> = calls
            .iter()
            .filter_map(|c| match c {
                Call::BindAttribute { stride, attribute, .. } => Some((*stride, attribute.offset)),
                _ => None,
            })
            .collect();
        assert_eq!(offsets, [(36, 0), (36, 12), (36, 28)]);
    }

    #[test]
    fn two_to_one_surface_uploads_unit_vertical_extent() {
        let mut r = renderer(
            PipelineConfig::textured_cube(),
            GeometryData::textured_cube(),
            PixelSize::new(1200, 600),
        );
        let projection = r.program().locations().projection;
        let calls = frame_calls(&mut r, 0.0);

        let p = uploaded(&calls, projection);
        assert_eq!(p, Mat4::frustum(-2.0, 2.0, -1.0, 1.0, 4.0, 10.0));
        assert!(calls.contains(&Call::SetViewport(PixelSize::new(1200, 600))));
    }

    #[test]
    fn uploaded_modelview_follows_clock_and_accumulator() {
        let backend = RecordingBackend::default();
        let mut r = FrameRenderer::initialize_with_clock(
            backend,
            PipelineConfig::colored_cube(),
            &GeometryData::textured_cube(),
            &bundled_assets(),
            Box::new(FixedClock(0.5)),
        )
        .unwrap();
        let modelview = r.program().locations().modelview;

        let calls = frame_calls(&mut r, 1.0);
        assert_eq!(uploaded(&calls, modelview), modelview_for(0.5, 90.0));
    }

    #[test]
    fn resize_recreates_targets_and_updates_projection() {
        let mut r = textured_cube();
        let before = r.surface().targets();
        r.resize(PixelSize::new(400, 400)).unwrap();
        assert_ne!(r.surface().targets(), before);

        let projection = r.program().locations().projection;
        let calls = frame_calls(&mut r, 0.0);
        assert_eq!(uploaded(&calls, projection), Mat4::frustum(-2.0, 2.0, -2.0, 2.0, 4.0, 10.0));
    }

    #[test]
    fn dropped_presentation_is_reported() {
        let mut r = textured_cube();
        r.backend_mut().present_status = FrameStatus::Dropped;
        assert_eq!(r.render_frame(0.016), FrameStatus::Dropped);
        assert_eq!(r.state(), RenderState::Idle);
    }

    // ── setup ─────────────────────────────────────────────────────────────

    #[test]
    fn setup_order_is_surface_program_geometry_texture() {
        let r = textured_cube();
        let names: Vec<&str> = r.backend().calls().iter().map(Call::name).collect();
        assert_eq!(
            names,
            [
                "make_current",
                "create_targets",
                "create_program",
                "use_program",
                "create_buffer",
                "create_buffer",
                "create_texture",
            ]
        );
    }

    #[test]
    fn invalid_shader_aborts_setup_before_any_upload() {
        let assets = bundled_assets().with("shaders/TexturedFragment.wgsl", "this is not wgsl");
        let result = FrameRenderer::initialize(
            RecordingBackend::default(),
            PipelineConfig::textured_cube(),
            &GeometryData::textured_cube(),
            &assets,
        );
        let Err(err) = result else {
            panic!("setup should fail");
        };
        assert!(matches!(err, SetupError::Compile { .. }));
        assert!(!err.diagnostic().unwrap_or_default().is_empty());
    }

    #[test]
    fn texturing_with_untextured_shaders_is_rejected() {
        let config = PipelineConfig {
            vertex_shader: "SimpleVertex".to_string(),
            fragment_shader: "SimpleFragment".to_string(),
            ..PipelineConfig::textured_cube()
        };
        let result = FrameRenderer::initialize(
            RecordingBackend::default(),
            config,
            &GeometryData::textured_cube(),
            &bundled_assets(),
        );
        assert!(matches!(result, Err(SetupError::MissingSymbol("TexCoordIn"))));
    }

    #[test]
    fn textured_shaders_without_texturing_are_rejected() {
        let config = PipelineConfig {
            texturing_enabled: false,
            ..PipelineConfig::textured_cube()
        };
        let result = FrameRenderer::initialize(
            RecordingBackend::default(),
            config,
            &GeometryData::textured_cube(),
            &bundled_assets(),
        );
        let Err(SetupError::Config(message)) = result else {
            panic!("setup should reject a sampled texture that is never bound");
        };
        assert!(message.contains("Texture"), "{message}");
    }

    #[test]
    fn zero_sized_surface_fails_setup() {
        let result = FrameRenderer::initialize(
            RecordingBackend::with_size(PixelSize::new(0, 0)),
            PipelineConfig::flat_quad(),
            &GeometryData::quad(),
            &bundled_assets(),
        );
        assert!(matches!(result, Err(SetupError::Context(_))));
    }

    // ── texture replacement ───────────────────────────────────────────────

    #[test]
    fn missing_texture_leaves_binding_untouched() {
        let mut r = textured_cube();
        let original = r.texture();
        r.backend_mut().clear_calls();

        let err = r.replace_texture(&MemoryAssets::new(), "item_powerup_fish.png").unwrap_err();

        assert!(matches!(err, SetupError::AssetNotFound { .. }));
        assert_eq!(r.texture(), original);
        assert!(r.backend().calls().is_empty());

        let sampler = r.program().locations().texture.unwrap();
        let calls = frame_calls(&mut r, 0.016);
        assert!(calls.contains(&Call::BindTexture {
            unit: 0,
            texture: original.unwrap(),
            sampler,
        }));
    }

    #[test]
    fn replacing_texture_releases_the_old_one() {
        let mut r = textured_cube();
        let original = r.texture().unwrap();
        let assets = MemoryAssets::new().with("textures/fish.png", png(2, 2, [9, 9, 9, 255]));

        r.replace_texture(&assets, "fish.png").unwrap();

        let replacement = r.texture().unwrap();
        assert_ne!(replacement, original);
        assert!(r.backend().calls().contains(&Call::DeleteTexture(original)));
    }
}
