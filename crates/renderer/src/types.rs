//! Attribute slots, uniform slots and their size limits.

/// Maximum bones a render instance can hold.
pub const MAX_BONES: usize = 64;

/// Number of vec4 extra uniforms carried by a view.
pub const MAX_EXTRA_UNIFORMS: usize = 8;

/// Floats in one 4x4 matrix.
pub const MAT4_FLOATS: usize = 16;

/// Vertex attribute slot. Each slot holds at most one buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferType {
    Vertex,
    Texcoord,
    Normal,
    Color,
    BoneIdx,
    BoneWeight,
}

impl BufferType {
    pub const COUNT: usize = 6;

    pub const ALL: [BufferType; Self::COUNT] = [
        Self::Vertex,
        Self::Texcoord,
        Self::Normal,
        Self::Color,
        Self::BoneIdx,
        Self::BoneWeight,
    ];

    /// Vertex buffer slot / shader location.
    #[inline]
    pub const fn slot(self) -> usize {
        self as usize
    }

    /// Float components per element.
    pub const fn components(self) -> u32 {
        match self {
            Self::Vertex | Self::Normal => 3,
            Self::Texcoord => 2,
            Self::Color | Self::BoneIdx | Self::BoneWeight => 4,
        }
    }

    /// Bytes per element.
    #[inline]
    pub const fn stride(self) -> u32 {
        self.components() * 4
    }
}

/// Which uniform block a slot lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UniformScope {
    /// Per placement: [`RenderInstance`](crate::RenderInstance).
    Instance,
    /// Per camera: [`RenderView`](crate::RenderView).
    View,
}

/// Uniform slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UniformType {
    CameraProjection,
    Transform,
    BoneTransform,
    CameraView,
    /// `MAX_EXTRA_UNIFORMS` free vec4 slots on the view.
    Extra,
}

impl UniformType {
    pub const fn scope(self) -> UniformScope {
        match self {
            Self::Transform | Self::BoneTransform => UniformScope::Instance,
            Self::CameraProjection | Self::CameraView | Self::Extra => UniformScope::View,
        }
    }

    /// Size of the slot's buffer in bytes.
    pub const fn capacity(self) -> usize {
        match self {
            Self::CameraProjection | Self::Transform | Self::CameraView => MAT4_FLOATS * 4,
            Self::BoneTransform => MAX_BONES * MAT4_FLOATS * 4,
            Self::Extra => MAX_EXTRA_UNIFORMS * 16,
        }
    }
}

impl UniformScope {
    /// Slots of the block, in binding order.
    pub const fn slots(self) -> &'static [UniformType] {
        match self {
            Self::Instance => &[UniformType::Transform, UniformType::BoneTransform],
            Self::View => &[
                UniformType::CameraProjection,
                UniformType::CameraView,
                UniformType::Extra,
            ],
        }
    }

    /// Binding index of `slot` inside this block.
    pub fn binding(self, slot: UniformType) -> Option<u32> {
        self.slots().iter().position(|&s| s == slot).map(|i| i as u32)
    }
}
