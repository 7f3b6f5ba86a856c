//! Renderer: render objects, instances and views over a pluggable backend.
//! wgpu = 23.x, winit = 0.30.x

pub mod animation;
pub mod backend;
pub mod error;
pub mod gpu;
pub mod headless;
pub mod instance;
pub mod object;
pub mod types;
pub mod view;

mod uniforms;

pub use backend::{DrawCall, MaterialDesc, RenderBackend};
pub use error::{RendererError, RendererResult};
pub use gpu::{GpuContext, WgpuBackend};
pub use headless::{HeadlessBackend, HeadlessPass};
pub use instance::RenderInstance;
pub use object::RenderObject;
pub use types::{BufferType, MAX_BONES, MAX_EXTRA_UNIFORMS, UniformScope, UniformType};
pub use view::RenderView;
