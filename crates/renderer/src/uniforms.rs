use crate::{
    backend::RenderBackend,
    error::{RendererError, RendererResult},
    types::{UniformScope, UniformType},
};

/// Checked float write into a uniform block.
pub(crate) fn write_floats<B: RenderBackend>(
    backend: &B,
    block: &mut B::UniformBlock,
    scope: UniformScope,
    slot: UniformType,
    offset_floats: usize,
    data: &[f32],
) -> RendererResult<()> {
    if slot.scope() != scope {
        return Err(RendererError::UniformScope { slot, scope });
    }
    let end = (offset_floats + data.len()) * 4;
    if data.is_empty() || end > slot.capacity() {
        return Err(RendererError::UniformSize {
            slot,
            floats: data.len(),
        });
    }
    log::trace!(
        "[{}] uniform {slot:?} <- {} floats at {offset_floats}",
        backend.name(),
        data.len()
    );
    backend.write_uniform(block, slot, offset_floats * 4, bytemuck::cast_slice(data))
}
