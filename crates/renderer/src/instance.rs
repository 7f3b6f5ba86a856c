//! Per-placement uniforms.

use corelib::transform::Transform;
use glam::Mat4;

use crate::{
    backend::RenderBackend,
    error::{RendererError, RendererResult},
    types::{MAT4_FLOATS, MAX_BONES, UniformScope, UniformType},
    uniforms::write_floats,
};

/// Data of one placement of a [`RenderObject`](crate::RenderObject): world
/// transform and the bone matrices of its current animation pose.
pub struct RenderInstance<B: RenderBackend> {
    uniforms: B::UniformBlock,
    pub(crate) bone_matrices: Vec<Mat4>,
}

impl<B: RenderBackend> RenderInstance<B> {
    /// Identity transform, identity bones.
    pub fn new(backend: &B) -> RendererResult<Self> {
        let mut instance = Self {
            uniforms: backend.create_uniform_block(UniformScope::Instance)?,
            bone_matrices: vec![Mat4::IDENTITY; MAX_BONES],
        };
        instance.set_uniform_float_mat(
            backend,
            UniformType::Transform,
            &Mat4::IDENTITY.to_cols_array(),
        )?;
        instance.upload_bones(backend)?;
        Ok(instance)
    }

    /// Upload a matrix (or, for [`UniformType::BoneTransform`], consecutive
    /// matrices) to one of the instance slots.
    pub fn set_uniform_float_mat(
        &mut self,
        backend: &B,
        slot: UniformType,
        mat: &[f32],
    ) -> RendererResult<()> {
        let valid_len = match slot {
            UniformType::Transform => mat.len() == MAT4_FLOATS,
            UniformType::BoneTransform => mat.len() % MAT4_FLOATS == 0,
            _ => {
                return Err(RendererError::UniformScope {
                    slot,
                    scope: UniformScope::Instance,
                });
            }
        };
        if !valid_len {
            return Err(RendererError::UniformSize {
                slot,
                floats: mat.len(),
            });
        }
        write_floats(backend, &mut self.uniforms, UniformScope::Instance, slot, 0, mat)
    }

    pub fn set_transform(&mut self, backend: &B, transform: &Transform) -> RendererResult<()> {
        self.set_matrix(backend, transform.matrix())
    }

    pub fn set_matrix(&mut self, backend: &B, matrix: Mat4) -> RendererResult<()> {
        self.set_uniform_float_mat(backend, UniformType::Transform, &matrix.to_cols_array())
    }

    /// Replace the bone pose and upload it. An oversized pose is rejected
    /// without touching the current one.
    pub fn set_bone_matrices(&mut self, backend: &B, bones: &[Mat4]) -> RendererResult<()> {
        check_bone_count(bones.len())?;
        self.bone_matrices.clear();
        self.bone_matrices.extend_from_slice(bones);
        self.upload_bones(backend)
    }

    pub(crate) fn upload_bones(&mut self, backend: &B) -> RendererResult<()> {
        check_bone_count(self.bone_matrices.len())?;
        if self.bone_matrices.is_empty() {
            return Ok(());
        }
        write_floats(
            backend,
            &mut self.uniforms,
            UniformScope::Instance,
            UniformType::BoneTransform,
            0,
            bytemuck::cast_slice(&self.bone_matrices),
        )
    }

    #[inline]
    pub fn num_bones(&self) -> usize {
        self.bone_matrices.len()
    }

    /// Current pose, as last sampled or set.
    #[inline]
    pub fn bone_matrices(&self) -> &[Mat4] {
        &self.bone_matrices
    }

    #[inline]
    pub fn uniforms(&self) -> &B::UniformBlock {
        &self.uniforms
    }
}

pub(crate) fn check_bone_count(count: usize) -> RendererResult<()> {
    if count > MAX_BONES {
        return Err(RendererError::TooManyBones {
            count,
            max: MAX_BONES,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessBackend;
    use glam::{Quat, Vec3};

    #[test]
    fn starts_at_identity() {
        let backend = HeadlessBackend::new();
        let instance = RenderInstance::new(&backend).unwrap();
        let block = instance.uniforms();
        assert_eq!(block.matrix(UniformType::Transform, 0), Some(Mat4::IDENTITY));
        for bone in 0..MAX_BONES {
            assert_eq!(block.matrix(UniformType::BoneTransform, bone), Some(Mat4::IDENTITY));
        }
        assert_eq!(instance.num_bones(), MAX_BONES);
        assert!(instance.bone_matrices().iter().all(|&m| m == Mat4::IDENTITY));
    }

    #[test]
    fn transform_is_uploaded() {
        let backend = HeadlessBackend::new();
        let mut instance = RenderInstance::new(&backend).unwrap();
        let t = Transform::from_trs(Vec3::new(1.0, 2.0, 3.0), Quat::from_rotation_x(0.5), Vec3::splat(2.0));
        instance.set_transform(&backend, &t).unwrap();
        assert_eq!(
            instance.uniforms().matrix(UniformType::Transform, 0),
            Some(t.matrix())
        );
    }

    #[test]
    fn rejects_foreign_and_malformed_slots() {
        let backend = HeadlessBackend::new();
        let mut instance = RenderInstance::new(&backend).unwrap();
        let m = Mat4::IDENTITY.to_cols_array();
        assert!(matches!(
            instance.set_uniform_float_mat(&backend, UniformType::CameraView, &m),
            Err(RendererError::UniformScope { .. })
        ));
        assert!(matches!(
            instance.set_uniform_float_mat(&backend, UniformType::Transform, &m[..12]),
            Err(RendererError::UniformSize { floats: 12, .. })
        ));
        assert!(matches!(
            instance.set_uniform_float_mat(&backend, UniformType::BoneTransform, &[0.0; 20]),
            Err(RendererError::UniformSize { floats: 20, .. })
        ));
    }

    #[test]
    fn bone_pose_is_bounded() {
        let backend = HeadlessBackend::new();
        let mut instance = RenderInstance::new(&backend).unwrap();
        let pose = [Mat4::from_translation(Vec3::Z); 3];
        instance.set_bone_matrices(&backend, &pose).unwrap();
        assert_eq!(instance.bone_matrices(), &pose);
        assert_eq!(
            instance.uniforms().matrix(UniformType::BoneTransform, 2),
            Some(pose[2])
        );
        // Bones past the pose keep their previous value.
        assert_eq!(
            instance.uniforms().matrix(UniformType::BoneTransform, 3),
            Some(Mat4::IDENTITY)
        );

        let too_many = vec![Mat4::IDENTITY; MAX_BONES + 1];
        assert!(matches!(
            instance.set_bone_matrices(&backend, &too_many),
            Err(RendererError::TooManyBones { count: 65, max: 64 })
        ));
        assert_eq!(instance.bone_matrices(), &pose);
    }
}
