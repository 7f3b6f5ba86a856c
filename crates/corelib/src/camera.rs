use crate::{Mat4, Quat, Vec3};

const FRAMING_FOV_Y_DEG: f32 = 45.0;

/// Simple perspective camera (right-handed).
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y_rad: f32,
    pub z_near: f32,
    pub z_far: f32,
    pub aspect: f32,
}

impl Camera {
    #[allow(clippy::too_many_arguments)]
    pub fn new_perspective(
        eye: Vec3,
        target: Vec3,
        up: Vec3,
        fov_y_rad: f32,
        z_near: f32,
        z_far: f32,
        aspect: f32,
    ) -> Self {
        Self {
            eye,
            target,
            up,
            fov_y_rad,
            z_near,
            z_far,
            aspect,
        }
    }

    /// Camera looking down -Z at the center of an axis-aligned box, far enough
    /// back for the whole box to fit the vertical field of view.
    pub fn framing(min: Vec3, max: Vec3, aspect: f32) -> Self {
        let center = (min + max) * 0.5;
        let radius = ((max - min).length() * 0.5).max(1e-3);
        let fov_y_rad = FRAMING_FOV_Y_DEG.to_radians();
        let distance = radius / (fov_y_rad * 0.5).sin() * 1.1;
        Self {
            eye: center + Vec3::Z * distance,
            target: center,
            up: Vec3::Y,
            fov_y_rad,
            z_near: (distance - radius * 2.0).max(distance * 0.01),
            z_far: distance + radius * 4.0,
            aspect,
        }
    }

    /// Rotate the eye around the target about the world Y axis.
    pub fn orbit_y(mut self, angle_rad: f32) -> Self {
        let offset = self.eye - self.target;
        self.eye = self.target + Quat::from_rotation_y(angle_rad) * offset;
        self
    }

    #[inline]
    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    /// Projection with depth in [0, 1], as wgpu expects.
    #[inline]
    pub fn proj(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_y_rad,
            self.aspect.max(1e-6),
            self.z_near,
            self.z_far,
        )
    }

    #[inline]
    pub fn proj_view(&self) -> Mat4 {
        self.proj() * self.view()
    }

    #[inline]
    pub fn with_aspect(mut self, aspect: f32) -> Self {
        self.aspect = aspect;
        self
    }
}
