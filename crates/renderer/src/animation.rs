//! Sampling of baked animation frames.

use glam::Mat4;

/// Write the bone matrices at fractional `frame` into `out`.
///
/// The frame wraps around the clip (negative values too) and neighbouring
/// frames are blended component-wise; the last frame blends into the first.
/// Returns `false` and leaves `out` untouched when there is nothing to sample.
pub fn sample_frames(frames: &[Vec<Mat4>], frame: f32, out: &mut Vec<Mat4>) -> bool {
    if frames.is_empty() || !frame.is_finite() {
        return false;
    }
    let n = frames.len();
    let pos = frame.rem_euclid(n as f32);
    let base = pos.floor();
    let i0 = (base as usize) % n;
    let i1 = (i0 + 1) % n;
    let t = pos - base;

    out.clear();
    if t <= f32::EPSILON {
        out.extend_from_slice(&frames[i0]);
    } else {
        out.extend(
            frames[i0]
                .iter()
                .zip(&frames[i1])
                .map(|(a, b)| *a * (1.0 - t) + *b * t),
        );
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn frames() -> Vec<Vec<Mat4>> {
        (0..4)
            .map(|i| vec![Mat4::from_translation(Vec3::X * i as f32), Mat4::IDENTITY])
            .collect()
    }

    fn x_of(m: &Mat4) -> f32 {
        m.w_axis.x
    }

    #[test]
    fn integer_frame_is_exact() {
        let mut out = Vec::new();
        assert!(sample_frames(&frames(), 2.0, &mut out));
        assert_eq!(out, frames()[2]);
    }

    #[test]
    fn halfway_is_component_average() {
        let mut out = Vec::new();
        sample_frames(&frames(), 1.5, &mut out);
        assert!((x_of(&out[0]) - 1.5).abs() < 1e-6);
        assert!(out[1].abs_diff_eq(Mat4::IDENTITY, 1e-6));
    }

    #[test]
    fn frames_wrap_around() {
        let mut out = Vec::new();
        sample_frames(&frames(), 4.0, &mut out);
        assert_eq!(out, frames()[0]);
        sample_frames(&frames(), 9.0, &mut out);
        assert_eq!(out, frames()[1]);
    }

    #[test]
    fn last_frame_blends_into_first() {
        let mut out = Vec::new();
        sample_frames(&frames(), 3.5, &mut out);
        assert!((x_of(&out[0]) - 1.5).abs() < 1e-6);
        sample_frames(&frames(), -0.5, &mut out);
        assert!((x_of(&out[0]) - 1.5).abs() < 1e-6);
    }

    #[test]
    fn nothing_to_sample() {
        let mut out = vec![Mat4::IDENTITY];
        assert!(!sample_frames(&[], 1.0, &mut out));
        assert!(!sample_frames(&frames(), f32::NAN, &mut out));
        assert_eq!(out, vec![Mat4::IDENTITY]);
    }
}
