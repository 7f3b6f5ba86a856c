//! Node hierarchy, keyframe tracks and baking of skinning matrices.
//!
//! Format-agnostic: the glTF importer fills these types, the baker turns a
//! clip into `frames × joints` matrices of `global(joint) * inverse_bind`.

use std::collections::HashMap;

use glam::{Mat4, Quat, Vec3};

use crate::error::{LoadError, LoadResult};

/// Upper bound on baked frames per clip; about 18 minutes at 30 fps.
pub const MAX_BAKED_FRAMES: usize = 1 << 15;

/// Local TRS of one node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodePose {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl NodePose {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    #[inline]
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

impl Default for NodePose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Full node hierarchy plus the joints of one skin.
#[derive(Clone, Debug, Default)]
pub struct Skeleton {
    /// Parent of every node in the file.
    pub parents: Vec<Option<usize>>,
    /// Rest pose of every node.
    pub rest: Vec<NodePose>,
    /// Node index of each joint, in skin order.
    pub joints: Vec<usize>,
    pub inverse_bind: Vec<Mat4>,
}

impl Skeleton {
    #[inline]
    pub fn bone_count(&self) -> usize {
        self.joints.len()
    }

    /// World matrices of all nodes for the given local poses.
    ///
    /// A parent chain longer than the node count means a cycle; the walk stops
    /// there and treats the node reached as a root.
    pub fn global_matrices(&self, poses: &[NodePose]) -> Vec<Mat4> {
        let n = poses.len();
        let mut globals: Vec<Option<Mat4>> = vec![None; n];
        let mut chain = Vec::new();
        for start in 0..n {
            chain.clear();
            let mut cursor = Some(start);
            while let Some(i) = cursor {
                if globals[i].is_some() || chain.len() > n {
                    break;
                }
                chain.push(i);
                cursor = self.parents.get(i).copied().flatten().filter(|&p| p < n);
            }
            let mut acc = cursor.and_then(|i| globals[i]).unwrap_or(Mat4::IDENTITY);
            for &i in chain.iter().rev() {
                acc *= poses[i].matrix();
                globals[i] = Some(acc);
            }
        }
        globals.into_iter().map(|m| m.unwrap_or(Mat4::IDENTITY)).collect()
    }

    /// Skinning matrix per joint for the given local poses.
    pub fn skinning_matrices(&self, poses: &[NodePose]) -> Vec<Mat4> {
        let globals = self.global_matrices(poses);
        self.joints
            .iter()
            .zip(&self.inverse_bind)
            .map(|(&node, inverse_bind)| {
                globals.get(node).copied().unwrap_or(Mat4::IDENTITY) * *inverse_bind
            })
            .collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interpolation {
    Step,
    Linear,
}

/// Keyframes of one animated property.
#[derive(Clone, Debug)]
pub struct Track<T> {
    times: Vec<f32>,
    values: Vec<T>,
    interpolation: Interpolation,
}

impl<T: Copy> Track<T> {
    /// Returns `None` when keys and values disagree in length or are empty.
    pub fn new(times: Vec<f32>, values: Vec<T>, interpolation: Interpolation) -> Option<Self> {
        if times.is_empty() || times.len() != values.len() {
            return None;
        }
        Some(Self {
            times,
            values,
            interpolation,
        })
    }

    pub fn end_time(&self) -> f32 {
        self.times.last().copied().unwrap_or(0.0)
    }

    /// Value at time `t`, clamped to the first/last key outside the range.
    pub fn sample(&self, t: f32, lerp: impl Fn(T, T, f32) -> T) -> T {
        let last = self.times.len() - 1;
        if t <= self.times[0] {
            return self.values[0];
        }
        if t >= self.times[last] {
            return self.values[last];
        }
        let next = self.times.partition_point(|&k| k <= t);
        let prev = next - 1;
        match self.interpolation {
            Interpolation::Step => self.values[prev],
            Interpolation::Linear => {
                let span = self.times[next] - self.times[prev];
                let f = if span > 0.0 {
                    (t - self.times[prev]) / span
                } else {
                    0.0
                };
                lerp(self.values[prev], self.values[next], f)
            }
        }
    }
}

/// One animation clip as per-node TRS tracks.
#[derive(Clone, Debug, Default)]
pub struct Clip {
    pub name: Option<String>,
    pub translations: HashMap<usize, Track<Vec3>>,
    pub rotations: HashMap<usize, Track<Quat>>,
    pub scales: HashMap<usize, Track<Vec3>>,
}

impl Clip {
    pub fn duration(&self) -> f32 {
        let t = self.translations.values().map(Track::end_time);
        let r = self.rotations.values().map(Track::end_time);
        let s = self.scales.values().map(Track::end_time);
        t.chain(r).chain(s).fold(0.0, f32::max)
    }

    /// Local poses of all nodes at time `t`; untracked properties keep the
    /// rest pose.
    pub fn pose(&self, rest: &[NodePose], t: f32) -> Vec<NodePose> {
        let mut poses = rest.to_vec();
        for (&node, track) in &self.translations {
            if let Some(p) = poses.get_mut(node) {
                p.translation = track.sample(t, Vec3::lerp);
            }
        }
        for (&node, track) in &self.rotations {
            if let Some(p) = poses.get_mut(node) {
                p.rotation = track.sample(t, Quat::slerp).normalize();
            }
        }
        for (&node, track) in &self.scales {
            if let Some(p) = poses.get_mut(node) {
                p.scale = track.sample(t, Vec3::lerp);
            }
        }
        poses
    }
}

/// Bake `clip` into `floor(duration * sample_rate) + 1` frames of skinning
/// matrices.
pub fn bake_clip(skeleton: &Skeleton, clip: &Clip, sample_rate: f32) -> LoadResult<Vec<Vec<Mat4>>> {
    if !(sample_rate.is_finite() && sample_rate > 0.0) {
        return Err(LoadError::InvalidData(format!(
            "sample rate must be positive, got {sample_rate}"
        )));
    }
    let duration = clip.duration();
    let steps = (f64::from(duration) * f64::from(sample_rate)).floor();
    if steps.is_nan() || steps >= MAX_BAKED_FRAMES as f64 {
        return Err(LoadError::InvalidData(format!(
            "clip {:?} of {duration}s at {sample_rate} fps exceeds {MAX_BAKED_FRAMES} frames",
            clip.name
        )));
    }
    let frame_count = steps as usize + 1;
    log::debug!(
        "Baking clip {:?}: {duration:.3}s at {sample_rate} fps -> {frame_count} frames x {} bones",
        clip.name,
        skeleton.bone_count()
    );

    Ok((0..frame_count)
        .map(|i| {
            let t = (i as f32 / sample_rate).min(duration);
            skeleton.skinning_matrices(&clip.pose(&skeleton.rest, t))
        })
        .collect())
}
