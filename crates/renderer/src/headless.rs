//! CPU-only backend: buffers live in memory and draws are recorded instead of
//! executed. Used for tests and for running the loader/animation path without
//! a GPU.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
};

use glam::Mat4;

use crate::{
    backend::{DrawCall, MaterialDesc, RenderBackend},
    error::RendererResult,
    types::{BufferType, UniformScope, UniformType},
};

#[derive(Default)]
pub struct HeadlessBackend {
    next_id: AtomicU64,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct HeadlessBuffer {
    pub id: u64,
    pub kind: BufferType,
    pub data: Vec<f32>,
    pub elem_size: u32,
    pub elem_count: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HeadlessUniforms {
    pub id: u64,
    pub scope: UniformScope,
    pub slots: HashMap<UniformType, Vec<f32>>,
}

impl HeadlessUniforms {
    /// Matrix at `index` of a matrix slot.
    pub fn matrix(&self, slot: UniformType, index: usize) -> Option<Mat4> {
        self.slots
            .get(&slot)?
            .get(index * 16..(index + 1) * 16)
            .map(Mat4::from_cols_slice)
    }

    pub fn floats(&self, slot: UniformType) -> &[f32] {
        self.slots.get(&slot).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct HeadlessMaterial {
    pub id: u64,
    pub label: String,
    pub base_color: [f32; 4],
    pub texture_size: Option<(u32, u32)>,
}

/// One recorded draw.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawRecord {
    pub vertex_count: u32,
    /// Buffer id bound to each [`BufferType`] slot.
    pub attribs: [Option<u64>; BufferType::COUNT],
    /// `None` when the default material was used.
    pub material: Option<String>,
    pub instance: HeadlessUniforms,
    pub view: HeadlessUniforms,
}

/// Draw log filled by [`HeadlessBackend::draw`].
#[derive(Clone, Debug, Default)]
pub struct HeadlessPass {
    pub draws: Vec<DrawRecord>,
}

impl HeadlessPass {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertices_drawn(&self) -> u64 {
        self.draws.iter().map(|d| u64::from(d.vertex_count)).sum()
    }
}

fn to_floats(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

impl RenderBackend for HeadlessBackend {
    type AttribBuffer = HeadlessBuffer;
    type UniformBlock = HeadlessUniforms;
    type Material = HeadlessMaterial;
    type Pass<'a> = HeadlessPass;

    fn name(&self) -> &'static str {
        "headless"
    }

    fn create_attrib_buffer(
        &self,
        kind: BufferType,
        data: &[u8],
        elem_size: u32,
        elem_count: usize,
    ) -> RendererResult<HeadlessBuffer> {
        Ok(HeadlessBuffer {
            id: self.id(),
            kind,
            data: to_floats(data),
            elem_size,
            elem_count,
        })
    }

    fn create_uniform_block(&self, scope: UniformScope) -> RendererResult<HeadlessUniforms> {
        let slots = scope
            .slots()
            .iter()
            .map(|&slot| (slot, vec![0.0; slot.capacity() / 4]))
            .collect();
        Ok(HeadlessUniforms {
            id: self.id(),
            scope,
            slots,
        })
    }

    fn write_uniform(
        &self,
        block: &mut HeadlessUniforms,
        slot: UniformType,
        offset: usize,
        data: &[u8],
    ) -> RendererResult<()> {
        if let Some(floats) = block.slots.get_mut(&slot) {
            let start = offset / 4;
            let values = to_floats(data);
            floats[start..start + values.len()].copy_from_slice(&values);
        }
        Ok(())
    }

    fn create_material(&self, desc: &MaterialDesc<'_>) -> RendererResult<HeadlessMaterial> {
        Ok(HeadlessMaterial {
            id: self.id(),
            label: desc.label.to_string(),
            base_color: desc.base_color,
            texture_size: desc.texture.map(|t| (t.width, t.height)),
        })
    }

    fn draw(&self, pass: &mut HeadlessPass, call: &DrawCall<'_, Self>) -> RendererResult<()> {
        pass.draws.push(DrawRecord {
            vertex_count: call.vertex_count,
            attribs: call.attribs.map(|b| b.map(|b| b.id)),
            material: call.material.map(|m| m.label.clone()),
            instance: call.instance.clone(),
            view: call.view.clone(),
        });
        Ok(())
    }
}
