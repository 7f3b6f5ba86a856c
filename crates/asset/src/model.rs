//! Flat, upload-ready model representation produced by the loaders.

use glam::{Mat4, Vec3};

use crate::error::{LoadError, LoadResult};

/// Bone influences stored per vertex.
pub const BONES_PER_VERTEX: usize = 4;

/// Default bake rate for animation clips, in frames per second.
pub const DEFAULT_SAMPLE_RATE: f32 = 30.0;

/// Default upper bound on skin joints.
pub const DEFAULT_MAX_BONES: usize = 64;

/// Knobs for the importers.
#[derive(Clone, Debug, PartialEq)]
pub struct LoadOptions {
    /// Frames per second used when baking an animation clip.
    pub sample_rate: f32,
    /// Clip to bake; `None` takes the first clip in the file.
    pub animation: Option<String>,
    /// Skins with more joints than this are rejected.
    pub max_bones: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            animation: None,
            max_bones: DEFAULT_MAX_BONES,
        }
    }
}

/// Non-indexed triangle list with per-vertex skinning data and baked
/// animation frames (`anim_frames[frame][bone]`).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Model {
    pub vertices: Vec<f32>,
    pub texcoords: Vec<f32>,
    pub normals: Vec<f32>,
    pub bone_indices: Vec<f32>,
    pub bone_weights: Vec<f32>,
    pub anim_frames: Vec<Vec<Mat4>>,
    pub bone_count: usize,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }

    #[inline]
    pub fn frame_count(&self) -> usize {
        self.anim_frames.len()
    }

    #[inline]
    pub fn is_skinned(&self) -> bool {
        self.bone_count > 0
    }

    /// Append one vertex. Weights are renormalized to sum to one unless they
    /// are all zero (unskinned vertex).
    pub fn push_vertex(
        &mut self,
        position: [f32; 3],
        texcoord: [f32; 2],
        normal: [f32; 3],
        joints: [u16; BONES_PER_VERTEX],
        weights: [f32; BONES_PER_VERTEX],
    ) {
        self.vertices.extend_from_slice(&position);
        self.texcoords.extend_from_slice(&texcoord);
        self.normals.extend_from_slice(&normal);
        self.bone_indices.extend(joints.iter().map(|&j| f32::from(j)));
        self.bone_weights.extend_from_slice(&normalize_weights(weights));
    }

    /// Axis-aligned bounds of the positions, or `None` for an empty model.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut points = self.vertices.chunks_exact(3).map(Vec3::from_slice);
        let first = points.next()?;
        Some(points.fold((first, first), |(min, max), p| (min.min(p), max.max(p))))
    }

    /// Check the length and range invariants between the attribute arrays
    /// and the animation frames.
    pub fn validate(&self) -> LoadResult<()> {
        if self.vertices.len() % 3 != 0 {
            return Err(invalid(format!(
                "position array length {} is not a multiple of 3",
                self.vertices.len()
            )));
        }
        let n = self.vertex_count();
        let expect = |name: &str, len: usize, per_vertex: usize| {
            if len == n * per_vertex {
                Ok(())
            } else {
                Err(invalid(format!(
                    "{name} array has {len} floats, expected {} for {n} vertices",
                    n * per_vertex
                )))
            }
        };
        expect("texcoord", self.texcoords.len(), 2)?;
        expect("normal", self.normals.len(), 3)?;
        expect("bone index", self.bone_indices.len(), BONES_PER_VERTEX)?;
        expect("bone weight", self.bone_weights.len(), BONES_PER_VERTEX)?;

        if self.bone_count > 0 {
            if let Some(bad) = self
                .bone_indices
                .iter()
                .find(|&&i| i < 0.0 || i as usize >= self.bone_count)
            {
                return Err(invalid(format!(
                    "bone index {bad} out of range for {} bones",
                    self.bone_count
                )));
            }
        }
        if let Some((frame, bones)) = self
            .anim_frames
            .iter()
            .enumerate()
            .find(|(_, bones)| bones.len() != self.bone_count)
        {
            return Err(invalid(format!(
                "animation frame {frame} has {} matrices, expected {}",
                bones.len(),
                self.bone_count
            )));
        }
        Ok(())
    }
}

fn invalid(msg: String) -> LoadError {
    LoadError::InvalidData(msg)
}

pub(crate) fn normalize_weights(weights: [f32; BONES_PER_VERTEX]) -> [f32; BONES_PER_VERTEX] {
    let sum: f32 = weights.iter().sum();
    if sum <= f32::EPSILON {
        return [0.0; BONES_PER_VERTEX];
    }
    weights.map(|w| w / sum)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Model {
        let mut model = Model::new();
        for p in [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
            model.push_vertex(p, [0.0, 0.0], [0.0, 0.0, 1.0], [0, 1, 0, 0], [2.0, 2.0, 0.0, 0.0]);
        }
        model.bone_count = 2;
        model.anim_frames = vec![vec![Mat4::IDENTITY; 2]; 3];
        model
    }

    #[test]
    fn array_lengths_follow_vertex_count() {
        let model = triangle();
        assert_eq!(model.vertex_count(), 3);
        assert_eq!(model.vertices.len(), model.vertex_count() * 3);
        assert_eq!(model.texcoords.len(), model.vertex_count() * 2);
        assert_eq!(model.bone_weights.len(), model.vertex_count() * BONES_PER_VERTEX);
        assert!(model.validate().is_ok());
    }

    #[test]
    fn weights_are_renormalized() {
        let model = triangle();
        assert_eq!(&model.bone_weights[..4], &[0.5, 0.5, 0.0, 0.0]);
        assert_eq!(normalize_weights([0.0; 4]), [0.0; 4]);
    }

    #[test]
    fn frame_bone_mismatch_is_invalid() {
        let mut model = triangle();
        model.anim_frames[1].pop();
        let err = model.validate().unwrap_err();
        assert_eq!(err.code(), 4);
    }

    #[test]
    fn bone_index_out_of_range_is_invalid() {
        let mut model = triangle();
        model.bone_count = 1;
        model.anim_frames = Vec::new();
        assert!(matches!(model.validate(), Err(LoadError::InvalidData(_))));
    }

    #[test]
    fn truncated_normals_are_invalid() {
        let mut model = triangle();
        model.normals.pop();
        assert!(model.validate().is_err());
    }

    #[test]
    fn bounds_cover_all_positions() {
        let (min, max) = triangle().bounds().unwrap();
        assert_eq!(min, Vec3::ZERO);
        assert_eq!(max, Vec3::new(1.0, 1.0, 0.0));
        assert!(Model::new().bounds().is_none());
    }
}
