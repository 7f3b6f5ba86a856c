//! Per-camera uniforms.

use corelib::camera::Camera;
use glam::{Mat4, Vec4};

use crate::{
    backend::RenderBackend,
    error::{RendererError, RendererResult},
    types::{MAT4_FLOATS, MAX_EXTRA_UNIFORMS, UniformScope, UniformType},
    uniforms::write_floats,
};

/// Camera state shared by every draw seen through it: projection, view
/// matrix and a few free vec4 slots.
///
/// Extra slot 0 drives the built-in shader's light: `xyz` direction towards
/// the light, `w` ambient term.
pub struct RenderView<B: RenderBackend> {
    uniforms: B::UniformBlock,
    extras: [Vec4; MAX_EXTRA_UNIFORMS],
}

impl<B: RenderBackend> RenderView<B> {
    pub fn new(backend: &B) -> RendererResult<Self> {
        let mut view = Self {
            uniforms: backend.create_uniform_block(UniformScope::View)?,
            extras: [Vec4::ZERO; MAX_EXTRA_UNIFORMS],
        };
        let identity = Mat4::IDENTITY.to_cols_array();
        view.set_uniform_float_mat(backend, UniformType::CameraProjection, &identity)?;
        view.set_uniform_float_mat(backend, UniformType::CameraView, &identity)?;
        Ok(view)
    }

    pub fn set_uniform_float_mat(
        &mut self,
        backend: &B,
        slot: UniformType,
        mat: &[f32],
    ) -> RendererResult<()> {
        if !matches!(slot, UniformType::CameraProjection | UniformType::CameraView) {
            return Err(RendererError::UniformScope {
                slot,
                scope: UniformScope::View,
            });
        }
        if mat.len() != MAT4_FLOATS {
            return Err(RendererError::UniformSize {
                slot,
                floats: mat.len(),
            });
        }
        write_floats(backend, &mut self.uniforms, UniformScope::View, slot, 0, mat)
    }

    pub fn set_extra_uniform(&mut self, backend: &B, index: usize, data: Vec4) -> RendererResult<()> {
        if index >= MAX_EXTRA_UNIFORMS {
            return Err(RendererError::ExtraIndex(index));
        }
        write_floats(
            backend,
            &mut self.uniforms,
            UniformScope::View,
            UniformType::Extra,
            index * 4,
            &data.to_array(),
        )?;
        self.extras[index] = data;
        Ok(())
    }

    /// Upload projection and view matrices of `camera`.
    pub fn set_camera(&mut self, backend: &B, camera: &Camera) -> RendererResult<()> {
        self.set_uniform_float_mat(
            backend,
            UniformType::CameraProjection,
            &camera.proj().to_cols_array(),
        )?;
        self.set_uniform_float_mat(backend, UniformType::CameraView, &camera.view().to_cols_array())
    }

    pub fn extra(&self, index: usize) -> Option<Vec4> {
        self.extras.get(index).copied()
    }

    #[inline]
    pub fn uniforms(&self) -> &B::UniformBlock {
        &self.uniforms
    }
}
