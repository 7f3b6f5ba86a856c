//! The seam between render objects and a concrete GPU API.
//!
//! Render types are generic over a [`RenderBackend`], so the backend is fixed
//! when an object is constructed and calls are statically dispatched.

use asset::TextureData;

use crate::{
    error::RendererResult,
    types::{BufferType, UniformScope, UniformType},
};

/// Description of a material: a tint and an optional base color texture.
#[derive(Clone, Copy, Debug)]
pub struct MaterialDesc<'a> {
    pub label: &'a str,
    pub base_color: [f32; 4],
    pub texture: Option<&'a TextureData>,
}

impl Default for MaterialDesc<'_> {
    fn default() -> Self {
        Self {
            label: "default",
            base_color: [1.0; 4],
            texture: None,
        }
    }
}

/// Everything bound for one draw.
pub struct DrawCall<'a, B: RenderBackend + ?Sized> {
    pub attribs: [Option<&'a B::AttribBuffer>; BufferType::COUNT],
    pub vertex_count: u32,
    /// `None` draws with the backend's default material.
    pub material: Option<&'a B::Material>,
    pub instance: &'a B::UniformBlock,
    pub view: &'a B::UniformBlock,
}

pub trait RenderBackend {
    type AttribBuffer;
    type UniformBlock;
    type Material;
    /// Recording target handed to [`RenderBackend::draw`].
    type Pass<'a>;

    fn name(&self) -> &'static str;

    /// Upload `elem_count` elements of `elem_size` bytes. Size checks are done
    /// by the caller.
    fn create_attrib_buffer(
        &self,
        kind: BufferType,
        data: &[u8],
        elem_size: u32,
        elem_count: usize,
    ) -> RendererResult<Self::AttribBuffer>;

    /// Zero-initialized block holding every slot of `scope`.
    fn create_uniform_block(&self, scope: UniformScope) -> RendererResult<Self::UniformBlock>;

    /// Write `data` at byte `offset` of `slot`. The caller guarantees the range
    /// fits [`UniformType::capacity`] and that `slot` belongs to the block.
    fn write_uniform(
        &self,
        block: &mut Self::UniformBlock,
        slot: UniformType,
        offset: usize,
        data: &[u8],
    ) -> RendererResult<()>;

    fn create_material(&self, desc: &MaterialDesc<'_>) -> RendererResult<Self::Material>;

    fn draw(&self, pass: &mut Self::Pass<'_>, call: &DrawCall<'_, Self>) -> RendererResult<()>;
}
