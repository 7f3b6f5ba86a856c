//! Mesh + material bundle rendered through instances and views.

use std::{path::Path, sync::Arc};

use asset::{Model, load_model};
use bytemuck::Pod;
use glam::Mat4;

use crate::{
    animation::sample_frames,
    backend::{DrawCall, RenderBackend},
    error::{RendererError, RendererResult},
    instance::{RenderInstance, check_bone_count},
    types::{BufferType, MAX_BONES},
    view::RenderView,
};

/// An uploaded attribute buffer and its element layout.
pub struct AttribSlot<B: RenderBackend> {
    pub buffer: B::AttribBuffer,
    pub elem_size: u32,
    pub elem_count: usize,
}

/// The parts of a drawable that do not change per placement: attribute
/// buffers, material and baked animation frames. One object can be rendered
/// any number of times with different [`RenderInstance`]s and
/// [`RenderView`]s.
pub struct RenderObject<B: RenderBackend> {
    attribs: [Option<AttribSlot<B>>; BufferType::COUNT],
    material: Option<Arc<B::Material>>,
    /// Skinning matrices, indexed by frame then bone.
    pub anim_frames: Vec<Vec<Mat4>>,
    bone_count: usize,
}

impl<B: RenderBackend> Default for RenderObject<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: RenderBackend> RenderObject<B> {
    /// Empty object; nothing is drawn until a vertex buffer is set.
    pub fn new() -> Self {
        Self {
            attribs: std::array::from_fn(|_| None),
            material: None,
            anim_frames: Vec::new(),
            bone_count: 0,
        }
    }

    /// Upload a copy of `model`.
    pub fn from_model(backend: &B, model: &Model) -> RendererResult<Self> {
        let mut object = Self::new();
        object.upload_model(backend, model)?;
        object.anim_frames = model.anim_frames.clone();
        Ok(object)
    }

    /// Upload `model`, taking over its animation frames without copying.
    pub fn from_model_owned(backend: &B, model: Model) -> RendererResult<Self> {
        let mut object = Self::new();
        object.upload_model(backend, &model)?;
        object.anim_frames = model.anim_frames;
        Ok(object)
    }

    /// Import `path` (optionally one named object of it) and replace this
    /// object's buffers, frames and material.
    pub fn load(
        &mut self,
        backend: &B,
        path: impl AsRef<Path>,
        object_name: Option<&str>,
        material: Option<Arc<B::Material>>,
    ) -> RendererResult<()> {
        let model = load_model(path, object_name)?;
        self.replace_with(backend, model, material)
    }

    /// Replace buffers and frames with `model` and set `material`.
    pub fn replace_with(
        &mut self,
        backend: &B,
        model: Model,
        material: Option<Arc<B::Material>>,
    ) -> RendererResult<()> {
        self.attribs = std::array::from_fn(|_| None);
        self.upload_model(backend, &model)?;
        self.anim_frames = model.anim_frames;
        self.material = material;
        Ok(())
    }

    fn upload_model(&mut self, backend: &B, model: &Model) -> RendererResult<()> {
        model.validate()?;
        if model.bone_count > MAX_BONES {
            return Err(RendererError::TooManyBones {
                count: model.bone_count,
                max: MAX_BONES,
            });
        }
        let n = model.vertex_count();
        let colors = vec![1.0f32; n * 4];
        let streams: [(BufferType, &[f32]); BufferType::COUNT] = [
            (BufferType::Vertex, model.vertices.as_slice()),
            (BufferType::Texcoord, model.texcoords.as_slice()),
            (BufferType::Normal, model.normals.as_slice()),
            (BufferType::Color, colors.as_slice()),
            (BufferType::BoneIdx, model.bone_indices.as_slice()),
            (BufferType::BoneWeight, model.bone_weights.as_slice()),
        ];
        for (kind, data) in streams {
            self.set_attrib_buffer(backend, kind, data, kind.stride(), n)?;
        }
        self.bone_count = model.bone_count;
        log::debug!(
            "[{}] uploaded model: {n} vertices, {} bones, {} frames",
            backend.name(),
            model.bone_count,
            model.frame_count()
        );
        Ok(())
    }

    /// Upload `elem_count` elements of `elem_size` bytes into slot `kind`,
    /// replacing whatever the slot held.
    pub fn set_attrib_buffer<T: Pod>(
        &mut self,
        backend: &B,
        kind: BufferType,
        data: &[T],
        elem_size: u32,
        elem_count: usize,
    ) -> RendererResult<()> {
        if elem_size != kind.stride() {
            return Err(RendererError::AttribStride {
                kind,
                expected: kind.stride(),
                got: elem_size,
            });
        }
        let bytes: &[u8] = bytemuck::cast_slice(data);
        if bytes.len() != elem_size as usize * elem_count {
            return Err(RendererError::AttribSizeMismatch {
                kind,
                bytes: bytes.len(),
                elem_size,
                elem_count,
            });
        }
        let buffer = backend.create_attrib_buffer(kind, bytes, elem_size, elem_count)?;
        self.attribs[kind.slot()] = Some(AttribSlot {
            buffer,
            elem_size,
            elem_count,
        });
        Ok(())
    }

    pub fn attrib(&self, kind: BufferType) -> Option<&AttribSlot<B>> {
        self.attribs[kind.slot()].as_ref()
    }

    pub fn set_material(&mut self, material: Option<Arc<B::Material>>) {
        self.material = material;
    }

    pub fn material(&self) -> Option<&Arc<B::Material>> {
        self.material.as_ref()
    }

    /// Vertices drawn per call: the element count of the vertex buffer.
    pub fn vertex_count(&self) -> usize {
        self.attrib(BufferType::Vertex).map_or(0, |slot| slot.elem_count)
    }

    pub fn bone_count(&self) -> usize {
        self.bone_count
    }

    pub fn frame_count(&self) -> usize {
        self.anim_frames.len()
    }

    /// Pose `instance` at fractional `frame` of the baked clip and upload its
    /// bone matrices. Does nothing for objects without frames. Frames that do
    /// not fit the skeleton are rejected before the instance is touched.
    pub fn apply_animation(
        &self,
        backend: &B,
        frame: f32,
        instance: &mut RenderInstance<B>,
    ) -> RendererResult<()> {
        self.check_frames()?;
        if !sample_frames(&self.anim_frames, frame, &mut instance.bone_matrices) {
            return Ok(());
        }
        instance.upload_bones(backend)
    }

    fn check_frames(&self) -> RendererResult<()> {
        let Some(first) = self.anim_frames.first() else {
            return Ok(());
        };
        check_bone_count(first.len())?;
        let expected = if self.bone_count > 0 {
            self.bone_count
        } else {
            first.len()
        };
        match self
            .anim_frames
            .iter()
            .position(|bones| bones.len() != expected)
        {
            Some(frame) => Err(RendererError::FrameWidth {
                frame,
                got: self.anim_frames[frame].len(),
                expected,
            }),
            None => Ok(()),
        }
    }

    /// Issue one draw of this object for `instance` seen through `view`.
    pub fn render(
        &self,
        backend: &B,
        instance: &RenderInstance<B>,
        view: &RenderView<B>,
        pass: &mut B::Pass<'_>,
    ) -> RendererResult<()> {
        let vertex_count = self.vertex_count();
        if vertex_count == 0 {
            log::trace!("[{}] skipping draw of empty render object", backend.name());
            return Ok(());
        }
        if let Some((kind, slot)) = BufferType::ALL
            .iter()
            .filter_map(|&kind| self.attrib(kind).map(|slot| (kind, slot)))
            .find(|(_, slot)| slot.elem_count < vertex_count)
        {
            return Err(RendererError::AttribTooShort {
                kind,
                elem_count: slot.elem_count,
                vertex_count,
            });
        }
        let call = DrawCall {
            attribs: std::array::from_fn(|i| self.attribs[i].as_ref().map(|s| &s.buffer)),
            vertex_count: u32::try_from(vertex_count).unwrap_or(u32::MAX),
            material: self.material.as_deref(),
            instance: instance.uniforms(),
            view: view.uniforms(),
        };
        backend.draw(pass, &call)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        backend::MaterialDesc,
        headless::{HeadlessBackend, HeadlessPass},
        types::UniformType,
    };
    use glam::Vec3;

    fn skinned_triangle() -> Model {
        let mut model = Model::new();
        for p in [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
            model.push_vertex(p, [0.5, 0.5], [0.0, 0.0, 1.0], [0, 1, 0, 0], [0.5, 0.5, 0.0, 0.0]);
        }
        model.bone_count = 2;
        model.anim_frames = (0..3)
            .map(|i| vec![Mat4::from_translation(Vec3::Y * i as f32), Mat4::IDENTITY])
            .collect();
        model
    }

    fn setup(
        backend: &HeadlessBackend,
    ) -> (
        RenderObject<HeadlessBackend>,
        RenderInstance<HeadlessBackend>,
        RenderView<HeadlessBackend>,
    ) {
        let object = RenderObject::from_model(backend, &skinned_triangle()).unwrap();
        let instance = RenderInstance::new(backend).unwrap();
        let view = RenderView::new(backend).unwrap();
        (object, instance, view)
    }

    #[test]
    fn upload_fills_every_slot() {
        let backend = HeadlessBackend::new();
        let object = RenderObject::from_model(&backend, &skinned_triangle()).unwrap();
        for kind in BufferType::ALL {
            let slot = object.attrib(kind).expect("slot uploaded");
            assert_eq!(slot.elem_count, 3);
            assert_eq!(slot.elem_size, kind.stride());
            assert_eq!(slot.buffer.data.len(), 3 * kind.components() as usize);
        }
        let colors = &object.attrib(BufferType::Color).unwrap().buffer.data;
        assert!(colors.iter().all(|&c| c == 1.0));
        assert_eq!(object.vertex_count(), 3);
        assert_eq!(object.bone_count(), 2);
        assert_eq!(object.frame_count(), 3);
    }

    #[test]
    fn owned_and_borrowed_construction_agree() {
        let backend = HeadlessBackend::new();
        let model = skinned_triangle();
        let copied = RenderObject::from_model(&backend, &model).unwrap();
        let owned = RenderObject::from_model_owned(&backend, model).unwrap();
        assert_eq!(copied.anim_frames, owned.anim_frames);
        for kind in BufferType::ALL {
            assert_eq!(
                copied.attrib(kind).unwrap().buffer.data,
                owned.attrib(kind).unwrap().buffer.data
            );
        }
    }

    #[test]
    fn invalid_model_is_rejected() {
        let backend = HeadlessBackend::new();
        let mut model = skinned_triangle();
        model.normals.pop();
        assert!(matches!(
            RenderObject::from_model(&backend, &model),
            Err(RendererError::Load(_))
        ));

        let mut model = skinned_triangle();
        model.bone_count = MAX_BONES + 1;
        model.anim_frames.clear();
        assert!(matches!(
            RenderObject::from_model_owned(&backend, model),
            Err(RendererError::TooManyBones { .. })
        ));
    }

    #[test]
    fn apply_animation_uploads_sampled_pose() {
        let backend = HeadlessBackend::new();
        let (object, mut instance, _) = setup(&backend);

        object.apply_animation(&backend, 1.5, &mut instance).unwrap();
        assert_eq!(instance.num_bones(), 2);
        let bone0 = instance.uniforms().matrix(UniformType::BoneTransform, 0).unwrap();
        assert!((bone0.w_axis.y - 1.5).abs() < 1e-6);

        // Wraps past the end of the clip.
        object.apply_animation(&backend, 4.0, &mut instance).unwrap();
        let bone0 = instance.uniforms().matrix(UniformType::BoneTransform, 0).unwrap();
        assert!((bone0.w_axis.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn apply_animation_without_frames_keeps_pose() {
        let backend = HeadlessBackend::new();
        let mut model = skinned_triangle();
        model.anim_frames.clear();
        let object = RenderObject::from_model_owned(&backend, model).unwrap();
        let mut instance = RenderInstance::new(&backend).unwrap();
        object.apply_animation(&backend, 2.0, &mut instance).unwrap();
        assert_eq!(instance.num_bones(), MAX_BONES);
        assert_eq!(
            instance.uniforms().matrix(UniformType::BoneTransform, 0),
            Some(Mat4::IDENTITY)
        );
    }

    #[test]
    fn malformed_frames_leave_pose_untouched() {
        let backend = HeadlessBackend::new();
        let (mut object, mut instance, _) = setup(&backend);
        object.apply_animation(&backend, 1.0, &mut instance).unwrap();
        let pose = instance.bone_matrices().to_vec();

        object.anim_frames = vec![vec![Mat4::IDENTITY; MAX_BONES + 1]];
        assert!(matches!(
            object.apply_animation(&backend, 0.0, &mut instance),
            Err(RendererError::TooManyBones { count: 65, max: 64 })
        ));
        assert_eq!(instance.bone_matrices(), pose.as_slice());

        let mut frames = skinned_triangle().anim_frames;
        frames[1].push(Mat4::IDENTITY);
        object.anim_frames = frames;
        assert!(matches!(
            object.apply_animation(&backend, 0.0, &mut instance),
            Err(RendererError::FrameWidth {
                frame: 1,
                got: 3,
                expected: 2
            })
        ));
        assert_eq!(instance.num_bones(), 2);
        let bone0 = instance.uniforms().matrix(UniformType::BoneTransform, 0).unwrap();
        assert_eq!(bone0, Mat4::from_translation(Vec3::Y));
    }

    #[test]
    fn render_records_one_draw() {
        let backend = HeadlessBackend::new();
        let (mut object, mut instance, mut view) = setup(&backend);
        let material = backend
            .create_material(&MaterialDesc {
                label: "red",
                base_color: [1.0, 0.0, 0.0, 1.0],
                texture: None,
            })
            .unwrap();
        object.set_material(Some(Arc::new(material)));
        instance
            .set_matrix(&backend, Mat4::from_translation(Vec3::X))
            .unwrap();
        view.set_extra_uniform(&backend, 0, glam::Vec4::ONE).unwrap();

        let mut pass = HeadlessPass::new();
        object.render(&backend, &instance, &view, &mut pass).unwrap();
        object.render(&backend, &instance, &view, &mut pass).unwrap();

        assert_eq!(pass.draws.len(), 2);
        assert_eq!(pass.vertices_drawn(), 6);
        let draw = &pass.draws[0];
        assert_eq!(draw.vertex_count, 3);
        assert_eq!(draw.material.as_deref(), Some("red"));
        assert!(draw.attribs.iter().all(Option::is_some));
        assert_eq!(
            draw.instance.matrix(UniformType::Transform, 0),
            Some(Mat4::from_translation(Vec3::X))
        );
        assert_eq!(&draw.view.floats(UniformType::Extra)[..4], &[1.0; 4]);
    }

    #[test]
    fn empty_object_draws_nothing() {
        let backend = HeadlessBackend::new();
        let object = RenderObject::<HeadlessBackend>::new();
        let instance = RenderInstance::new(&backend).unwrap();
        let view = RenderView::new(&backend).unwrap();
        let mut pass = HeadlessPass::new();
        object.render(&backend, &instance, &view, &mut pass).unwrap();
        assert!(pass.draws.is_empty());
    }

    #[test]
    fn missing_slots_draw_with_defaults() {
        let backend = HeadlessBackend::new();
        let mut object = RenderObject::new();
        let positions = [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        object
            .set_attrib_buffer(&backend, BufferType::Vertex, &positions, 12, 3)
            .unwrap();
        let instance = RenderInstance::new(&backend).unwrap();
        let view = RenderView::new(&backend).unwrap();
        let mut pass = HeadlessPass::new();
        object.render(&backend, &instance, &view, &mut pass).unwrap();

        let draw = &pass.draws[0];
        assert!(draw.attribs[BufferType::Vertex.slot()].is_some());
        assert!(draw.attribs[BufferType::Normal.slot()].is_none());
        assert_eq!(draw.material, None);
    }

    #[test]
    fn attrib_buffer_checks_layout() {
        let backend = HeadlessBackend::new();
        let mut object = RenderObject::<HeadlessBackend>::new();
        let data = [0.0f32; 6];
        assert!(matches!(
            object.set_attrib_buffer(&backend, BufferType::Vertex, &data, 8, 3),
            Err(RendererError::AttribStride { expected: 12, got: 8, .. })
        ));
        assert!(matches!(
            object.set_attrib_buffer(&backend, BufferType::Vertex, &data, 12, 3),
            Err(RendererError::AttribSizeMismatch { bytes: 24, .. })
        ));
        assert!(object.attrib(BufferType::Vertex).is_none());
    }

    #[test]
    fn short_attribute_fails_the_draw() {
        let backend = HeadlessBackend::new();
        let (mut object, instance, view) = setup(&backend);
        object
            .set_attrib_buffer(&backend, BufferType::Texcoord, &[0.0f32; 4], 8, 2)
            .unwrap();
        let mut pass = HeadlessPass::new();
        let err = object.render(&backend, &instance, &view, &mut pass).unwrap_err();
        assert!(matches!(
            err,
            RendererError::AttribTooShort {
                kind: BufferType::Texcoord,
                elem_count: 2,
                vertex_count: 3
            }
        ));
        assert!(pass.draws.is_empty());
    }

    #[test]
    fn load_reports_loader_status() {
        let backend = HeadlessBackend::new();
        let mut object = RenderObject::<HeadlessBackend>::new();
        let err = object
            .load(&backend, "/no/such/model.glb", None, None)
            .unwrap_err();
        match err {
            RendererError::Load(load) => assert_eq!(load.code(), 1),
            other => panic!("unexpected error {other}"),
        }
    }
}
