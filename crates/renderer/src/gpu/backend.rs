use std::sync::Arc;

use asset::TextureData;
use parking_lot::Mutex;
use wgpu::{
    BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayout, BindGroupLayoutDescriptor,
    BindGroupLayoutEntry, BindingResource, BindingType, BlendState, Buffer, BufferBindingType,
    BufferDescriptor, BufferSize, BufferUsages, ColorTargetState, ColorWrites, DepthBiasState,
    DepthStencilState, Device, Extent3d, FragmentState, PipelineLayoutDescriptor, Queue,
    RenderPipeline, RenderPipelineDescriptor, Sampler, SamplerBindingType, ShaderModuleDescriptor,
    ShaderSource, ShaderStages, TextureDescriptor, TextureDimension, TextureFormat,
    TextureSampleType, TextureUsages, TextureViewDimension, VertexAttribute, VertexBufferLayout,
    VertexFormat, VertexState, VertexStepMode, util::DeviceExt,
};

use crate::{
    backend::{DrawCall, MaterialDesc, RenderBackend},
    error::RendererResult,
    types::{BufferType, UniformScope, UniformType},
};

pub(crate) const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

/// Largest attribute stride; sizes the zero buffer bound to empty slots.
const MAX_ATTRIB_STRIDE: u64 = 16;

pub struct WgpuAttribBuffer {
    pub kind: BufferType,
    pub buffer: Buffer,
}

/// One uniform buffer per slot plus the bind group over all of them.
pub struct WgpuUniformBlock {
    pub scope: UniformScope,
    buffers: Vec<(UniformType, Buffer)>,
    bind_group: BindGroup,
}

pub struct WgpuMaterial {
    pub label: String,
    bind_group: BindGroup,
}

/// Device, queue and the single skinned pipeline every render object uses.
pub struct WgpuBackend {
    device: Device,
    queue: Queue,
    view_layout: BindGroupLayout,
    instance_layout: BindGroupLayout,
    material_layout: BindGroupLayout,
    sampler: Sampler,
    pipeline: RenderPipeline,
    default_material: WgpuMaterial,
    // Grown on demand; shared by every slot left empty in a draw.
    zero_buffer: Mutex<Option<Arc<Buffer>>>,
}

fn vertex_format(kind: BufferType) -> VertexFormat {
    match kind.components() {
        2 => VertexFormat::Float32x2,
        3 => VertexFormat::Float32x3,
        _ => VertexFormat::Float32x4,
    }
}

fn uniform_entry(binding: u32, visibility: ShaderStages, slot: UniformType) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry {
        binding,
        visibility,
        ty: BindingType::Buffer {
            ty: BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: BufferSize::new(slot.capacity() as u64),
        },
        count: None,
    }
}

fn block_layout(device: &Device, scope: UniformScope) -> BindGroupLayout {
    let entries: Vec<BindGroupLayoutEntry> = scope
        .slots()
        .iter()
        .enumerate()
        .map(|(i, &slot)| {
            let visibility = match slot {
                UniformType::Extra => ShaderStages::VERTEX | ShaderStages::FRAGMENT,
                _ => ShaderStages::VERTEX,
            };
            uniform_entry(i as u32, visibility, slot)
        })
        .collect();
    device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some(match scope {
            UniformScope::Instance => "Instance BGL",
            UniformScope::View => "View BGL",
        }),
        entries: &entries,
    })
}

fn material_layout(device: &Device) -> BindGroupLayout {
    device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some("Material BGL"),
        entries: &[
            BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStages::FRAGMENT,
                ty: BindingType::Buffer {
                    ty: BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: BufferSize::new(16),
                },
                count: None,
            },
            BindGroupLayoutEntry {
                binding: 1,
                visibility: ShaderStages::FRAGMENT,
                ty: BindingType::Texture {
                    sample_type: TextureSampleType::Float { filterable: true },
                    view_dimension: TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            BindGroupLayoutEntry {
                binding: 2,
                visibility: ShaderStages::FRAGMENT,
                ty: BindingType::Sampler(SamplerBindingType::Filtering),
                count: None,
            },
        ],
    })
}

fn build_material(
    device: &Device,
    queue: &Queue,
    layout: &BindGroupLayout,
    sampler: &Sampler,
    desc: &MaterialDesc<'_>,
) -> WgpuMaterial {
    let white = TextureData::solid([255; 4]);
    let tex = desc.texture.unwrap_or(&white);
    let size = Extent3d {
        width: tex.width,
        height: tex.height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&TextureDescriptor {
        label: Some(desc.label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: TextureFormat::Rgba8UnormSrgb,
        usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &tex.data,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(tex.width * tex.bytes_per_pixel()),
            rows_per_image: Some(tex.height),
        },
        size,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

    let params = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Material UBO"),
        contents: bytemuck::cast_slice(&desc.base_color),
        usage: BufferUsages::UNIFORM,
    });

    let bind_group = device.create_bind_group(&BindGroupDescriptor {
        label: Some(desc.label),
        layout,
        entries: &[
            BindGroupEntry {
                binding: 0,
                resource: params.as_entire_binding(),
            },
            BindGroupEntry {
                binding: 1,
                resource: BindingResource::TextureView(&view),
            },
            BindGroupEntry {
                binding: 2,
                resource: BindingResource::Sampler(sampler),
            },
        ],
    });
    WgpuMaterial {
        label: desc.label.to_string(),
        bind_group,
    }
}

impl WgpuBackend {
    /// Build layouts, the skinned pipeline and the default material for a
    /// color target of `color_format` with a [`DEPTH_FORMAT`] depth buffer.
    pub fn new(device: Device, queue: Queue, color_format: TextureFormat) -> Self {
        let view_layout = block_layout(&device, UniformScope::View);
        let instance_layout = block_layout(&device, UniformScope::Instance);
        let material_layout = material_layout(&device);

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Material sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let shader = device.create_shader_module(ShaderModuleDescriptor {
            label: Some("Skinned WGSL"),
            source: ShaderSource::Wgsl(include_str!("../shaders/skinned.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("Skinned PipelineLayout"),
            bind_group_layouts: &[&view_layout, &instance_layout, &material_layout],
            push_constant_ranges: &[],
        });

        let attributes: [[VertexAttribute; 1]; BufferType::COUNT] = std::array::from_fn(|i| {
            [VertexAttribute {
                format: vertex_format(BufferType::ALL[i]),
                offset: 0,
                shader_location: i as u32,
            }]
        });
        let buffers: Vec<VertexBufferLayout<'_>> = BufferType::ALL
            .iter()
            .map(|kind| VertexBufferLayout {
                array_stride: u64::from(kind.stride()),
                step_mode: VertexStepMode::Vertex,
                attributes: &attributes[kind.slot()],
            })
            .collect();

        let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("Skinned Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &buffers,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(ColorTargetState {
                    format: color_format,
                    blend: Some(BlendState::ALPHA_BLENDING),
                    write_mask: ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let default_material = build_material(
            &device,
            &queue,
            &material_layout,
            &sampler,
            &MaterialDesc::default(),
        );

        Self {
            device,
            queue,
            view_layout,
            instance_layout,
            material_layout,
            sampler,
            pipeline,
            default_material,
            zero_buffer: Mutex::new(None),
        }
    }

    #[inline]
    pub fn device(&self) -> &Device {
        &self.device
    }

    #[inline]
    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    /// Zero-filled vertex buffer large enough for `vertex_count` vertices of
    /// any attribute.
    fn zero_buffer(&self, vertex_count: u32) -> Arc<Buffer> {
        let needed = (u64::from(vertex_count) * MAX_ATTRIB_STRIDE).max(MAX_ATTRIB_STRIDE);
        let mut slot = self.zero_buffer.lock();
        match slot.as_ref() {
            Some(buffer) if buffer.size() >= needed => buffer.clone(),
            _ => {
                let size = needed.next_power_of_two();
                log::debug!("Growing zero attribute buffer to {size} bytes");
                let buffer = Arc::new(self.device.create_buffer(&BufferDescriptor {
                    label: Some("Zero attribute VB"),
                    size,
                    usage: BufferUsages::VERTEX,
                    mapped_at_creation: false,
                }));
                *slot = Some(buffer.clone());
                buffer
            }
        }
    }
}

impl RenderBackend for WgpuBackend {
    type AttribBuffer = WgpuAttribBuffer;
    type UniformBlock = WgpuUniformBlock;
    type Material = WgpuMaterial;
    type Pass<'a> = wgpu::RenderPass<'a>;

    fn name(&self) -> &'static str {
        "wgpu"
    }

    fn create_attrib_buffer(
        &self,
        kind: BufferType,
        data: &[u8],
        _elem_size: u32,
        _elem_count: usize,
    ) -> RendererResult<WgpuAttribBuffer> {
        // Sizes stay 4-aligned: every attribute is made of f32s.
        let size = (data.len() as u64).max(wgpu::COPY_BUFFER_ALIGNMENT);
        let buffer = self.device.create_buffer(&BufferDescriptor {
            label: Some(&format!("{kind:?} VB")),
            size,
            usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        if !data.is_empty() {
            self.queue.write_buffer(&buffer, 0, data);
        }
        Ok(WgpuAttribBuffer { kind, buffer })
    }

    fn create_uniform_block(&self, scope: UniformScope) -> RendererResult<WgpuUniformBlock> {
        let buffers: Vec<(UniformType, Buffer)> = scope
            .slots()
            .iter()
            .map(|&slot| {
                let buffer = self.device.create_buffer(&BufferDescriptor {
                    label: Some(&format!("{slot:?} UBO")),
                    size: slot.capacity() as u64,
                    usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                });
                (slot, buffer)
            })
            .collect();
        let entries: Vec<BindGroupEntry<'_>> = buffers
            .iter()
            .enumerate()
            .map(|(i, (_, buffer))| BindGroupEntry {
                binding: i as u32,
                resource: buffer.as_entire_binding(),
            })
            .collect();
        let layout = match scope {
            UniformScope::Instance => &self.instance_layout,
            UniformScope::View => &self.view_layout,
        };
        let bind_group = self.device.create_bind_group(&BindGroupDescriptor {
            label: Some(match scope {
                UniformScope::Instance => "Instance BG",
                UniformScope::View => "View BG",
            }),
            layout,
            entries: &entries,
        });
        Ok(WgpuUniformBlock {
            scope,
            buffers,
            bind_group,
        })
    }

    fn write_uniform(
        &self,
        block: &mut WgpuUniformBlock,
        slot: UniformType,
        offset: usize,
        data: &[u8],
    ) -> RendererResult<()> {
        if let Some((_, buffer)) = block.buffers.iter().find(|(s, _)| *s == slot) {
            self.queue.write_buffer(buffer, offset as u64, data);
        }
        Ok(())
    }

    fn create_material(&self, desc: &MaterialDesc<'_>) -> RendererResult<WgpuMaterial> {
        Ok(build_material(
            &self.device,
            &self.queue,
            &self.material_layout,
            &self.sampler,
            desc,
        ))
    }

    fn draw(&self, pass: &mut wgpu::RenderPass<'_>, call: &DrawCall<'_, Self>) -> RendererResult<()> {
        let material = call.material.unwrap_or(&self.default_material);
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &call.view.bind_group, &[]);
        pass.set_bind_group(1, &call.instance.bind_group, &[]);
        pass.set_bind_group(2, &material.bind_group, &[]);

        let zero = call
            .attribs
            .iter()
            .any(Option::is_none)
            .then(|| self.zero_buffer(call.vertex_count));
        for kind in BufferType::ALL {
            let slot = kind.slot() as u32;
            match (call.attribs[kind.slot()], zero.as_ref()) {
                (Some(attrib), _) => pass.set_vertex_buffer(slot, attrib.buffer.slice(..)),
                (None, Some(zero)) => pass.set_vertex_buffer(slot, zero.slice(..)),
                (None, None) => {}
            }
        }
        log::trace!(
            "[wgpu] draw {} vertices with material '{}'",
            call.vertex_count,
            material.label
        );
        pass.draw(0..call.vertex_count, 0..1);
        Ok(())
    }
}
