//! Per-object geometry returned by the whole-file importers.

use glam::Vec3;

/// Positions and normals of one sub-object, as a non-indexed triangle list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjectMesh {
    pub name: Option<String>,
    pub vertices: Vec<f32>,
    pub normals: Vec<f32>,
}

impl ObjectMesh {
    pub fn new(name: Option<String>) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    pub fn push(&mut self, position: [f32; 3], normal: [f32; 3]) {
        self.vertices.extend_from_slice(&position);
        self.normals.extend_from_slice(&normal);
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }

    /// Returns `true` if the object holds at least one whole triangle.
    pub fn is_valid(&self) -> bool {
        let n = self.vertex_count();
        n > 0 && n % 3 == 0 && self.normals.len() == self.vertices.len()
    }
}

/// Unit normal of a counter-clockwise triangle, `+Z` for degenerate input.
pub fn face_normal(a: [f32; 3], b: [f32; 3], c: [f32; 3]) -> [f32; 3] {
    let (a, b, c) = (Vec3::from(a), Vec3::from(b), Vec3::from(c));
    (b - a)
        .cross(c - a)
        .try_normalize()
        .unwrap_or(Vec3::Z)
        .to_array()
}
