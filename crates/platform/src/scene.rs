//! One animated model framed by a camera, independent of the backend.

use anyhow::{Context, Result};
use asset::Model;
use corelib::{Vec3, Vec4, camera::Camera};
use renderer::{RenderBackend, RenderInstance, RenderObject, RenderView, RendererResult};

/// Direction towards the light (`xyz`) and ambient term (`w`), view extra 0.
const LIGHT: Vec4 = Vec4::new(0.4, 1.0, 0.6, 0.25);

pub struct ModelScene<B: RenderBackend> {
    object: RenderObject<B>,
    instance: RenderInstance<B>,
    view: RenderView<B>,
    camera: Camera,
    /// Baked frames advanced per second of playback.
    anim_fps: f32,
    frame: f32,
}

impl<B: RenderBackend> ModelScene<B> {
    pub fn new(backend: &B, model: Model, aspect: f32, anim_fps: f32) -> Result<Self> {
        let (min, max) = model.bounds().unwrap_or((Vec3::splat(-1.0), Vec3::ONE));
        let camera = Camera::framing(min, max, aspect);

        let object = RenderObject::from_model_owned(backend, model)
            .context("Failed to upload model")?;
        let instance = RenderInstance::new(backend)?;
        let mut view = RenderView::new(backend)?;
        view.set_camera(backend, &camera)?;
        let light = LIGHT.truncate().normalize().extend(LIGHT.w);
        view.set_extra_uniform(backend, 0, light)?;

        let mut scene = Self {
            object,
            instance,
            view,
            camera,
            anim_fps,
            frame: 0.0,
        };
        scene.advance(backend, 0.0)?;
        Ok(scene)
    }

    /// Move playback forward by `dt` seconds and pose the instance.
    pub fn advance(&mut self, backend: &B, dt: f32) -> Result<()> {
        let frames = self.object.frame_count();
        if frames == 0 {
            return Ok(());
        }
        self.frame = (self.frame + dt * self.anim_fps).rem_euclid(frames as f32);
        self.object
            .apply_animation(backend, self.frame, &mut self.instance)?;
        Ok(())
    }

    pub fn set_aspect(&mut self, backend: &B, aspect: f32) -> Result<()> {
        self.camera = self.camera.with_aspect(aspect);
        self.view.set_camera(backend, &self.camera)?;
        Ok(())
    }

    /// Record the model's draw into `pass`.
    pub fn render(&self, backend: &B, pass: &mut B::Pass<'_>) -> RendererResult<()> {
        self.object
            .render(backend, &self.instance, &self.view, pass)
    }

    pub fn draw(&self, backend: &B, pass: &mut B::Pass<'_>) -> Result<()> {
        self.render(backend, pass).context("Failed to draw model")
    }

    #[inline]
    pub fn frame(&self) -> f32 {
        self.frame
    }

    #[inline]
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    #[inline]
    pub fn object(&self) -> &RenderObject<B> {
        &self.object
    }

    #[inline]
    pub fn instance(&self) -> &RenderInstance<B> {
        &self.instance
    }

    #[inline]
    pub fn view(&self) -> &RenderView<B> {
        &self.view
    }
}
