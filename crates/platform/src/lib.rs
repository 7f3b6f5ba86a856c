//! Platform layer: windowing, event loop and the model viewer built on them.
//!
//! The viewer loads one object of a model file, frames it with the camera and
//! plays its baked animation on the wgpu backend until the window is closed.

pub mod scene;

use std::{path::PathBuf, sync::Arc, time::Instant};

use anyhow::{Context, Result};
use asset::{LoadOptions, Model, load_model_with, model::DEFAULT_SAMPLE_RATE};
use renderer::{GpuContext, WgpuBackend};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

pub use scene::ModelScene;

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.05,
    g: 0.05,
    b: 0.08,
    a: 1.0,
};

/// What to show and how.
#[derive(Clone, Debug)]
pub struct ViewerConfig {
    pub model: PathBuf,
    pub object: Option<String>,
    pub animation: Option<String>,
    /// Baked frames played per second.
    pub anim_fps: f32,
    /// Frames per second used when baking the clip.
    pub sample_rate: f32,
    pub backends: wgpu::Backends,
    pub width: u32,
    pub height: u32,
}

impl ViewerConfig {
    pub fn new(model: impl Into<PathBuf>) -> Self {
        Self {
            model: model.into(),
            object: None,
            animation: None,
            anim_fps: DEFAULT_SAMPLE_RATE,
            sample_rate: DEFAULT_SAMPLE_RATE,
            backends: wgpu::Backends::all(),
            width: 1280,
            height: 720,
        }
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            sample_rate: self.sample_rate,
            animation: self.animation.clone(),
            ..LoadOptions::default()
        }
    }

    /// Import the configured object with the configured options.
    pub fn load_model(&self) -> Result<Model> {
        load_model_with(&self.model, self.object.as_deref(), &self.load_options())
            .with_context(|| format!("Failed to load model {}", self.model.display()))
    }
}

struct Viewer {
    config: ViewerConfig,
    // Taken when the GPU scene is built in `resumed`.
    model: Option<Model>,
    window: Option<Arc<Window>>,
    gpu: Option<GpuContext>,
    scene: Option<ModelScene<WgpuBackend>>,
    last_frame: Instant,
    error: Option<anyhow::Error>,
}

impl Viewer {
    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attributes = Window::default_attributes()
            .with_title(format!("Model viewer - {}", self.config.model.display()))
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));
        let window = Arc::new(
            event_loop
                .create_window(attributes)
                .context("Failed to create window")?,
        );
        log::info!(
            "Window created: {}x{}",
            window.inner_size().width,
            window.inner_size().height
        );

        let gpu = pollster::block_on(GpuContext::new(window.clone(), self.config.backends))
            .context("Failed to initialize GPU")?;
        let model = self.model.take().context("Model already consumed")?;
        let scene = ModelScene::new(gpu.backend(), model, gpu.aspect(), self.config.anim_fps)?;
        log::info!(
            "Viewer ready: {} vertices, {} bones, {} frames",
            scene.object().vertex_count(),
            scene.object().bone_count(),
            scene.object().frame_count()
        );

        window.request_redraw();
        self.window = Some(window);
        self.gpu = Some(gpu);
        self.scene = Some(scene);
        self.last_frame = Instant::now();
        Ok(())
    }

    fn redraw(&mut self) -> Result<()> {
        let (Some(gpu), Some(scene)) = (self.gpu.as_mut(), self.scene.as_mut()) else {
            return Ok(());
        };
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        scene.advance(gpu.backend(), dt)?;
        let result = gpu.render_frame(CLEAR_COLOR, |backend, pass| {
            scene.render(backend, pass)
        });
        match result {
            Ok(()) => Ok(()),
            Err(e) if GpuContext::is_surface_lost(&e) => {
                log::warn!("Surface lost/outdated, recreating");
                gpu.recreate_surface();
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.error = Some(err);
        event_loop.exit();
    }
}

impl ApplicationHandler for Viewer {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.init(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested. Exiting event loop.");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                log::info!("Resized: {}x{}", size.width, size.height);
                let result = match (self.gpu.as_mut(), self.scene.as_mut()) {
                    (Some(gpu), Some(scene)) => {
                        gpu.resize(size.width, size.height);
                        scene.set_aspect(gpu.backend(), gpu.aspect())
                    }
                    _ => Ok(()),
                };
                if let Err(e) = result {
                    self.fail(event_loop, e);
                }
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.redraw() {
                    self.fail(event_loop, e);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

/// Load the configured model, open a window and play it until closed.
pub fn run_viewer(config: ViewerConfig) -> Result<()> {
    // Load before the window exists so bad paths fail fast.
    let model = config.load_model()?;

    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut viewer = Viewer {
        config,
        model: Some(model),
        window: None,
        gpu: None,
        scene: None,
        last_frame: Instant::now(),
        error: None,
    };
    event_loop
        .run_app(&mut viewer)
        .map_err(|e| anyhow::anyhow!("Event loop error: {e:?}"))?;

    match viewer.error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
