use asset::LoadError;
use thiserror::Error;

use crate::types::{BufferType, UniformScope, UniformType};

#[derive(Debug, Error)]
pub enum RendererError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("{kind:?} buffer: {bytes} bytes do not match {elem_count} elements of {elem_size} bytes")]
    AttribSizeMismatch {
        kind: BufferType,
        bytes: usize,
        elem_size: u32,
        elem_count: usize,
    },
    #[error("{kind:?} buffer expects {expected}-byte elements, got {got}")]
    AttribStride {
        kind: BufferType,
        expected: u32,
        got: u32,
    },
    #[error("{kind:?} buffer holds {elem_count} elements, draw needs {vertex_count}")]
    AttribTooShort {
        kind: BufferType,
        elem_count: usize,
        vertex_count: usize,
    },
    #[error("uniform {slot:?} does not belong to the {scope:?} block")]
    UniformScope { slot: UniformType, scope: UniformScope },
    #[error("uniform {slot:?} cannot take {floats} floats")]
    UniformSize { slot: UniformType, floats: usize },
    #[error("extra uniform index {0} out of range")]
    ExtraIndex(usize),
    #[error("model has {count} bones, renderer supports {max}")]
    TooManyBones { count: usize, max: usize },
    #[error("animation frame {frame} holds {got} bone matrices, expected {expected}")]
    FrameWidth {
        frame: usize,
        got: usize,
        expected: usize,
    },
    #[error("no suitable GPU adapter")]
    NoAdapter,
    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("failed to request device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
}

pub type RendererResult<T> = Result<T, RendererError>;
