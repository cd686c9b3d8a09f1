use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use crate::assets::AssetSource;
use crate::coords::PixelSize;
use crate::device::{Gpu, GpuInit, WgpuBackend};
use crate::render::{FrameRenderer, FrameStatus, GeometryData, PipelineConfig};
use crate::time::FrameClock;

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "prism".to_string(),
            initial_size: LogicalSize::new(960.0, 640.0),
        }
    }
}

/// What to draw: pipeline variant, geometry and where its assets live.
pub struct Scene {
    pub pipeline: PipelineConfig,
    pub geometry: GeometryData,
    pub assets: Box<dyn AssetSource>,
}

/// Entry point for the runtime.
///
/// Opens one window, sets the pipeline up against it and renders a frame per
/// redraw until the window closes or the surface is lost. Setup failures end
/// the loop and are returned to the caller.
pub struct Runtime;

impl Runtime {
    pub fn run(config: RuntimeConfig, gpu_init: GpuInit, scene: Scene) -> Result<()> {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(config, gpu_init, scene);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[self_referencing]
struct WindowEntry {
    clock: FrameClock,

    window: Window,

    #[borrows(window)]
    #[not_covariant]
    renderer: FrameRenderer<WgpuBackend<'this>>,
}

struct AppState {
    config: RuntimeConfig,
    gpu_init: GpuInit,
    scene: Scene,

    entry: Option<WindowEntry>,
    error: Option<anyhow::Error>,
    exit_requested: bool,
}

impl AppState {
    fn new(config: RuntimeConfig, gpu_init: GpuInit, scene: Scene) -> Self {
        Self {
            config,
            gpu_init,
            scene,
            entry: None,
            error: None,
            exit_requested: false,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{error:#}");
        self.error = Some(error);
        self.exit(event_loop);
    }

    fn exit(&mut self, event_loop: &ActiveEventLoop) {
        self.exit_requested = true;
        self.entry = None;
        event_loop.exit();
    }

    fn create_window_entry(&mut self, event_loop: &ActiveEventLoop) -> Result<WindowEntry> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let gpu_init = self.gpu_init.clone();
        let scene = &self.scene;

        WindowEntryTryBuilder {
            clock: FrameClock::default(),
            window,
            renderer_builder: |w| {
                let gpu = pollster::block_on(Gpu::new(w, gpu_init))?;
                let backend = WgpuBackend::new(gpu, w);
                let renderer = FrameRenderer::initialize(
                    backend,
                    scene.pipeline.clone(),
                    &scene.geometry,
                    scene.assets.as_ref(),
                )
                .context("pipeline setup failed")?;
                Ok::<_, anyhow::Error>(renderer)
            },
        }
        .try_build()
    }

    fn resize(&mut self, event_loop: &ActiveEventLoop, size: PixelSize) {
        let Some(entry) = self.entry.as_mut() else {
            return;
        };
        let result = entry.with_renderer_mut(|r| r.resize(size));
        match result {
            Ok(()) => entry.with_window(|w| w.request_redraw()),
            Err(e) => self.fail(event_loop, anyhow::Error::new(e).context("resize failed")),
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(entry) = self.entry.as_mut() else {
            return;
        };

        let status = entry.with_mut(|fields| {
            let ft = fields.clock.tick();
            fields.renderer.render_frame(ft.dt)
        });

        match status {
            FrameStatus::Presented => {}
            FrameStatus::Dropped => log::debug!("frame dropped"),
            FrameStatus::SurfaceLost => {
                self.fail(event_loop, anyhow::anyhow!("render surface lost"));
            }
        }
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.entry.is_some() || self.exit_requested {
            return;
        }

        match self.create_window_entry(event_loop) {
            Ok(entry) => {
                entry.with_window(|w| w.request_redraw());
                self.entry = Some(entry);
            }
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        event_loop.set_control_flow(ControlFlow::Wait);

        // Continuous animation: every presented frame schedules the next one.
        if let Some(entry) = self.entry.as_ref() {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        match event {
            WindowEvent::CloseRequested => self.exit(event_loop),

            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed
                    && event.physical_key == PhysicalKey::Code(KeyCode::Escape) =>
            {
                self.exit(event_loop)
            }

            WindowEvent::Resized(new_size) => self.resize(event_loop, new_size.into()),

            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(size) = self.entry.as_ref().map(|e| e.with_window(|w| w.inner_size())) {
                    self.resize(event_loop, size.into());
                }
            }

            WindowEvent::RedrawRequested => self.redraw(event_loop),

            _ => {}
        }
    }
}
