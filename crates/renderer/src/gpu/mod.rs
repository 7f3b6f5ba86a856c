//! wgpu implementation of [`RenderBackend`](crate::RenderBackend).

mod backend;
mod context;

pub use backend::{WgpuAttribBuffer, WgpuBackend, WgpuMaterial, WgpuUniformBlock};
pub use context::GpuContext;
