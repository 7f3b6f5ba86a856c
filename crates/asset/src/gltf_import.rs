//! glTF 2.0 (`.gltf` / `.glb`) import.
//!
//! Design notes
//! - One node is selected per model; all of its triangle primitives are
//!   expanded through their index lists into a single triangle soup.
//! - Skinned nodes ignore their own transform (as glTF requires); unskinned
//!   nodes keep their local-space vertices in [`Model`] but are placed in world
//!   space by [`load_gltf_objects`].
//! - Animation is baked up front into skinning matrices, see [`crate::skeleton`].

use std::path::Path;

use glam::{Mat3, Mat4, Quat, Vec3};
use gltf::{
    Document, Node,
    animation::util::ReadOutputs,
    buffer::Data as BufferData,
    mesh::Mode,
};

use crate::{
    error::{LoadError, LoadResult},
    mesh::{ObjectMesh, face_normal},
    model::{BONES_PER_VERTEX, LoadOptions, Model},
    skeleton::{Clip, Interpolation, NodePose, Skeleton, Track, bake_clip},
};

/// Import one object of a glTF file into a [`Model`].
pub fn load_gltf_model(
    path: &Path,
    object_name: Option<&str>,
    options: &LoadOptions,
) -> LoadResult<Model> {
    let (doc, buffers, _images) = gltf::import(path)?;
    model_from_document(&doc, &buffers, object_name, options)
}

/// Same as [`load_gltf_model`] for an in-memory `.gltf`/`.glb` (external
/// buffers are not resolved).
pub fn load_gltf_model_from_slice(
    bytes: &[u8],
    object_name: Option<&str>,
    options: &LoadOptions,
) -> LoadResult<Model> {
    let (doc, buffers, _images) = gltf::import_slice(bytes)?;
    model_from_document(&doc, &buffers, object_name, options)
}

/// Import every mesh node of a glTF file as world-space positions/normals.
pub fn load_gltf_objects(path: &Path) -> LoadResult<Vec<ObjectMesh>> {
    let (doc, buffers, _images) = gltf::import(path)?;
    objects_from_document(&doc, &buffers)
}

pub fn load_gltf_objects_from_slice(bytes: &[u8]) -> LoadResult<Vec<ObjectMesh>> {
    let (doc, buffers, _images) = gltf::import_slice(bytes)?;
    objects_from_document(&doc, &buffers)
}

fn model_from_document(
    doc: &Document,
    buffers: &[BufferData],
    object_name: Option<&str>,
    options: &LoadOptions,
) -> LoadResult<Model> {
    let nodes = scene_nodes(doc);
    let (node, _world) = select_node(&nodes, object_name)?;
    let clip = select_clip(doc, buffers, options.animation.as_deref())?;

    let mut model = Model::new();
    let skin = node.skin();
    for prim in node.mesh().into_iter().flat_map(|m| m.primitives()) {
        let Some(data) = read_primitive(&prim, buffers, skin.is_some())? else {
            continue;
        };
        data.for_each_triangle(|corners| {
            for c in corners {
                model.push_vertex(c.position, c.texcoord, c.normal, c.joints, c.weights);
            }
        });
    }
    if model.vertex_count() == 0 {
        return Err(LoadError::Parse(format!(
            "node {:?} has no triangle geometry",
            node.name()
        )));
    }

    if let Some(skin) = skin {
        let skeleton = read_skeleton(doc, &skin, buffers, options)?;
        model.bone_count = skeleton.bone_count();
        if let Some(clip) = clip {
            model.anim_frames = bake_clip(&skeleton, &clip, options.sample_rate)?;
        }
    } else if clip.is_some() {
        log::debug!(
            "Node {:?} is not skinned; animation is not baked",
            node.name()
        );
    }
    Ok(model)
}

fn objects_from_document(doc: &Document, buffers: &[BufferData]) -> LoadResult<Vec<ObjectMesh>> {
    let mut objects = Vec::new();
    for (node, world) in scene_nodes(doc) {
        let Some(mesh) = node.mesh() else {
            continue;
        };
        let world = if node.skin().is_some() {
            Mat4::IDENTITY
        } else {
            world
        };
        let normal_matrix = Mat3::from_mat4(world).inverse().transpose();

        let name = node.name().or(mesh.name()).map(str::to_string);
        let mut object = ObjectMesh::new(name);
        for prim in mesh.primitives() {
            let Some(data) = read_primitive(&prim, buffers, false)? else {
                continue;
            };
            data.for_each_triangle(|corners| {
                for c in corners {
                    let p = world.transform_point3(Vec3::from(c.position));
                    let n = (normal_matrix * Vec3::from(c.normal))
                        .try_normalize()
                        .unwrap_or(Vec3::Z);
                    object.push(p.to_array(), n.to_array());
                }
            });
        }
        if object.vertex_count() > 0 {
            objects.push(object);
        }
    }
    if objects.is_empty() {
        return Err(LoadError::Parse("glTF contains no mesh geometry".into()));
    }
    Ok(objects)
}

/// Depth-first list of nodes with their world matrices. Uses the default
/// scene, else every scene, else the parentless nodes.
fn scene_nodes(doc: &Document) -> Vec<(Node<'_>, Mat4)> {
    let roots: Vec<Node<'_>> = match doc.default_scene() {
        Some(scene) => scene.nodes().collect(),
        None if doc.scenes().count() > 0 => doc.scenes().flat_map(|s| s.nodes()).collect(),
        None => {
            let parents = parent_map(doc);
            doc.nodes().filter(|n| parents[n.index()].is_none()).collect()
        }
    };

    fn visit<'a>(node: Node<'a>, parent: Mat4, depth: usize, out: &mut Vec<(Node<'a>, Mat4)>) {
        // glTF node graphs are trees; the depth cap only guards broken files.
        if depth > 256 {
            log::warn!("glTF node hierarchy deeper than 256, truncating");
            return;
        }
        let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());
        let children: Vec<Node<'a>> = node.children().collect();
        out.push((node, world));
        for child in children {
            visit(child, world, depth + 1, out);
        }
    }

    let mut out = Vec::new();
    for root in roots {
        visit(root, Mat4::IDENTITY, 0, &mut out);
    }
    out
}

fn parent_map(doc: &Document) -> Vec<Option<usize>> {
    let mut parents = vec![None; doc.nodes().len()];
    for node in doc.nodes() {
        for child in node.children() {
            parents[child.index()] = Some(node.index());
        }
    }
    parents
}

fn select_node<'a, 'n>(
    nodes: &'n [(Node<'a>, Mat4)],
    object_name: Option<&str>,
) -> LoadResult<&'n (Node<'a>, Mat4)> {
    let mut meshes = nodes.iter().filter(|(n, _)| n.mesh().is_some());
    match object_name {
        Some(name) => meshes
            .find(|(n, _)| {
                n.name() == Some(name) || n.mesh().is_some_and(|m| m.name() == Some(name))
            })
            .ok_or_else(|| LoadError::ObjectNotFound(name.to_string())),
        None => {
            let all: Vec<_> = meshes.collect();
            all.iter()
                .find(|(n, _)| n.skin().is_some())
                .or_else(|| all.first())
                .copied()
                .ok_or_else(|| LoadError::Parse("glTF contains no mesh nodes".into()))
        }
    }
}

fn select_clip(
    doc: &Document,
    buffers: &[BufferData],
    name: Option<&str>,
) -> LoadResult<Option<Clip>> {
    let animation = match name {
        Some(name) => Some(
            doc.animations()
                .find(|a| a.name() == Some(name))
                .ok_or_else(|| LoadError::AnimationNotFound(name.to_string()))?,
        ),
        None => doc.animations().next(),
    };
    Ok(animation.map(|a| read_clip(&a, buffers)))
}

fn read_clip(animation: &gltf::Animation<'_>, buffers: &[BufferData]) -> Clip {
    let mut clip = Clip {
        name: animation.name().map(str::to_string),
        ..Clip::default()
    };

    for channel in animation.channels() {
        let node = channel.target().node().index();
        let interpolation = channel.sampler().interpolation();
        let reader = channel.reader(|b| buffers.get(b.index()).map(|d| d.0.as_slice()));
        let Some(inputs) = reader.read_inputs() else {
            continue;
        };
        let times: Vec<f32> = inputs.collect();
        let Some(outputs) = reader.read_outputs() else {
            continue;
        };

        let inserted = match outputs {
            ReadOutputs::Translations(it) => {
                track(times, it.map(Vec3::from).collect(), interpolation)
                    .map(|t| clip.translations.insert(node, t))
                    .is_some()
            }
            ReadOutputs::Rotations(it) => track(
                times,
                it.into_f32().map(|q| Quat::from_array(q).normalize()).collect(),
                interpolation,
            )
            .map(|t| clip.rotations.insert(node, t))
            .is_some(),
            ReadOutputs::Scales(it) => track(times, it.map(Vec3::from).collect(), interpolation)
                .map(|t| clip.scales.insert(node, t))
                .is_some(),
            ReadOutputs::MorphTargetWeights(_) => {
                log::debug!("Skipping morph target channel on node {node}");
                true
            }
        };
        if !inserted {
            log::warn!(
                "Animation {:?}: malformed channel on node {node}, skipped",
                clip.name
            );
        }
    }
    clip
}

/// Build a track; cubic-spline outputs come as (in-tangent, value,
/// out-tangent) triples and keep only the value, interpolated linearly.
fn track<T: Copy>(
    times: Vec<f32>,
    values: Vec<T>,
    interpolation: gltf::animation::Interpolation,
) -> Option<Track<T>> {
    use gltf::animation::Interpolation as Gltf;
    match interpolation {
        Gltf::Step => Track::new(times, values, Interpolation::Step),
        Gltf::Linear => Track::new(times, values, Interpolation::Linear),
        Gltf::CubicSpline => {
            let values = values.into_iter().skip(1).step_by(3).collect();
            Track::new(times, values, Interpolation::Linear)
        }
    }
}

fn read_skeleton(
    doc: &Document,
    skin: &gltf::Skin<'_>,
    buffers: &[BufferData],
    options: &LoadOptions,
) -> LoadResult<Skeleton> {
    let joints: Vec<usize> = skin.joints().map(|j| j.index()).collect();
    if joints.len() > options.max_bones {
        return Err(LoadError::TooManyBones {
            count: joints.len(),
            max: options.max_bones,
        });
    }

    let reader = skin.reader(|b| buffers.get(b.index()).map(|d| d.0.as_slice()));
    let inverse_bind: Vec<Mat4> = match reader.read_inverse_bind_matrices() {
        Some(it) => it.map(|m| Mat4::from_cols_array_2d(&m)).collect(),
        None => vec![Mat4::IDENTITY; joints.len()],
    };
    if inverse_bind.len() != joints.len() {
        return Err(LoadError::InvalidData(format!(
            "skin has {} joints but {} inverse bind matrices",
            joints.len(),
            inverse_bind.len()
        )));
    }

    let rest = doc
        .nodes()
        .map(|n| {
            let (t, r, s) = n.transform().decomposed();
            NodePose {
                translation: Vec3::from(t),
                rotation: Quat::from_array(r).normalize(),
                scale: Vec3::from(s),
            }
        })
        .collect();

    Ok(Skeleton {
        parents: parent_map(doc),
        rest,
        joints,
        inverse_bind,
    })
}

/// One expanded triangle corner.
#[derive(Clone, Copy, Debug)]
struct Corner {
    position: [f32; 3],
    texcoord: [f32; 2],
    normal: [f32; 3],
    joints: [u16; BONES_PER_VERTEX],
    weights: [f32; BONES_PER_VERTEX],
}

/// Attribute streams of one primitive, still indexed.
struct PrimitiveData {
    positions: Vec<[f32; 3]>,
    normals: Option<Vec<[f32; 3]>>,
    texcoords: Option<Vec<[f32; 2]>>,
    joints: Option<Vec<[u16; 4]>>,
    weights: Option<Vec<[f32; 4]>>,
    indices: Vec<u32>,
}

impl PrimitiveData {
    fn corner(&self, i: usize, flat_normal: [f32; 3]) -> Corner {
        Corner {
            position: self.positions[i],
            texcoord: self.texcoords.as_ref().map_or([0.0, 0.0], |t| t[i]),
            normal: self.normals.as_ref().map_or(flat_normal, |n| n[i]),
            joints: self.joints.as_ref().map_or([0; 4], |j| j[i]),
            weights: self.weights.as_ref().map_or([0.0; 4], |w| w[i]),
        }
    }

    fn for_each_triangle(&self, mut f: impl FnMut([Corner; 3])) {
        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let flat = face_normal(self.positions[a], self.positions[b], self.positions[c]);
            f([
                self.corner(a, flat),
                self.corner(b, flat),
                self.corner(c, flat),
            ]);
        }
    }
}

/// Read a triangle primitive. Returns `Ok(None)` for primitives that are
/// skipped (other topologies, no positions).
fn read_primitive(
    prim: &gltf::Primitive<'_>,
    buffers: &[BufferData],
    skinned: bool,
) -> LoadResult<Option<PrimitiveData>> {
    if prim.mode() != Mode::Triangles {
        log::warn!(
            "Skipping primitive {} with mode {:?}; only triangle lists are supported",
            prim.index(),
            prim.mode()
        );
        return Ok(None);
    }
    let reader = prim.reader(|b| buffers.get(b.index()).map(|d| d.0.as_slice()));
    let Some(positions) = reader.read_positions() else {
        log::warn!("Skipping primitive {} without positions", prim.index());
        return Ok(None);
    };
    let positions: Vec<[f32; 3]> = positions.collect();
    let n = positions.len();

    let normals: Option<Vec<[f32; 3]>> = reader.read_normals().map(Iterator::collect);
    let texcoords: Option<Vec<[f32; 2]>> =
        reader.read_tex_coords(0).map(|t| t.into_f32().collect());
    let (joints, weights) = if skinned {
        (
            reader.read_joints(0).map(|j| j.into_u16().collect::<Vec<_>>()),
            reader.read_weights(0).map(|w| w.into_f32().collect::<Vec<_>>()),
        )
    } else {
        (None, None)
    };
    let indices: Vec<u32> = match reader.read_indices() {
        Some(it) => it.into_u32().collect(),
        None => (0..n as u32).collect(),
    };

    let check = |what: &str, len: Option<usize>| match len {
        Some(len) if len != n => Err(LoadError::InvalidData(format!(
            "primitive {}: {what} has {len} entries, positions have {n}",
            prim.index()
        ))),
        _ => Ok(()),
    };
    check("NORMAL", normals.as_ref().map(Vec::len))?;
    check("TEXCOORD_0", texcoords.as_ref().map(Vec::len))?;
    check("JOINTS_0", joints.as_ref().map(Vec::len))?;
    check("WEIGHTS_0", weights.as_ref().map(Vec::len))?;
    if indices.len() % 3 != 0 {
        return Err(LoadError::InvalidData(format!(
            "primitive {}: {} indices do not form whole triangles",
            prim.index(),
            indices.len()
        )));
    }
    if let Some(&bad) = indices.iter().find(|&&i| i as usize >= n) {
        return Err(LoadError::InvalidData(format!(
            "primitive {}: index {bad} out of range for {n} vertices",
            prim.index()
        )));
    }

    Ok(Some(PrimitiveData {
        positions,
        normals,
        texcoords,
        joints,
        weights,
        indices,
    }))
}
