//! Perspective camera and viewport: pointer → NDC → world ray, and world → screen.

use foundation::math::Vec3;

use crate::picking::Ray;

/// Output surface size in CSS pixels plus the device pixel ratio.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Viewport {
    pub width_px: f64,
    pub height_px: f64,
    pub pixel_ratio: f64,
}

impl Viewport {
    pub fn new(width_px: f64, height_px: f64, pixel_ratio: f64) -> Self {
        Self {
            width_px,
            height_px,
            pixel_ratio,
        }
    }

    pub fn aspect(&self) -> f64 {
        if self.height_px <= 0.0 {
            1.0
        } else {
            (self.width_px / self.height_px).max(1e-6)
        }
    }

    /// Drawing-buffer size in physical pixels.
    pub fn physical_size(&self) -> [u32; 2] {
        let ratio = if self.pixel_ratio > 0.0 { self.pixel_ratio } else { 1.0 };
        [
            (self.width_px * ratio).round().max(0.0) as u32,
            (self.height_px * ratio).round().max(0.0) as u32,
        ]
    }

    /// Normalized device coordinates (`x` right, `y` up, both in `[-1, 1]`).
    pub fn pointer_to_ndc(&self, x_px: f64, y_px: f64) -> Option<[f64; 2]> {
        if self.width_px <= 0.0 || self.height_px <= 0.0 {
            return None;
        }
        Some([
            (x_px / self.width_px) * 2.0 - 1.0,
            -(y_px / self.height_px) * 2.0 + 1.0,
        ])
    }

    pub fn ndc_to_pointer(&self, ndc: [f64; 2]) -> [f64; 2] {
        [
            (ndc[0] + 1.0) * 0.5 * self.width_px,
            (1.0 - ndc[1]) * 0.5 * self.height_px,
        ]
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280.0, 720.0, 1.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PerspectiveCamera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y_deg: f64,
    pub aspect: f64,
    pub near: f64,
    pub far: f64,
}

/// Orthonormal camera frame: right, up, forward.
struct Basis {
    right: Vec3,
    up: Vec3,
    forward: Vec3,
}

impl PerspectiveCamera {
    pub fn look_at(position: Vec3, target: Vec3, up: Vec3, fov_y_deg: f64, near: f64, far: f64) -> Self {
        Self {
            position,
            target,
            up,
            fov_y_deg,
            aspect: 1.0,
            near,
            far,
        }
    }

    pub fn set_aspect(&mut self, aspect: f64) {
        if aspect.is_finite() && aspect > 0.0 {
            self.aspect = aspect;
        }
    }

    fn basis(&self) -> Option<Basis> {
        let forward = (self.target - self.position).normalize()?;
        let right = forward.cross(self.up).normalize()?;
        let up = right.cross(forward);
        Some(Basis { right, up, forward })
    }

    fn tan_half_fov(&self) -> f64 {
        (self.fov_y_deg.to_radians() * 0.5).tan()
    }

    /// Ray from the eye through a point in normalized device coordinates.
    pub fn ray_from_ndc(&self, ndc: [f64; 2]) -> Option<Ray> {
        let b = self.basis()?;
        let t = self.tan_half_fov();
        let dir = b.forward + b.right * (ndc[0] * t * self.aspect) + b.up * (ndc[1] * t);
        Some(Ray::new(self.position, dir.normalize()?))
    }

    /// Point in front of the camera → NDC, or `None` when behind the near plane.
    pub fn project_to_ndc(&self, world: Vec3) -> Option<[f64; 2]> {
        let b = self.basis()?;
        let v = world - self.position;
        let depth = v.dot(b.forward);
        if depth < self.near {
            return None;
        }
        let t = self.tan_half_fov();
        Some([
            v.dot(b.right) / (depth * t * self.aspect),
            v.dot(b.up) / (depth * t),
        ])
    }

    pub fn project_to_screen(&self, world: Vec3, viewport: &Viewport) -> Option<[f64; 2]> {
        self.project_to_ndc(world).map(|ndc| viewport.ndc_to_pointer(ndc))
    }
}

#[cfg(test)]
mod tests {
    use super::{PerspectiveCamera, Viewport};
    use foundation::math::Vec3;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    fn camera() -> PerspectiveCamera {
        let mut c = PerspectiveCamera::look_at(
            Vec3::new(-10.0, -90.0, 130.0),
            Vec3::ZERO,
            Vec3::new(0.0, 0.0, 1.0),
            30.0,
            0.1,
            1000.0,
        );
        c.set_aspect(16.0 / 9.0);
        c
    }

    #[test]
    fn pointer_center_is_ndc_origin() {
        let vp = Viewport::new(800.0, 600.0, 2.0);
        assert_eq!(vp.pointer_to_ndc(400.0, 300.0), Some([0.0, 0.0]));
        assert_eq!(vp.pointer_to_ndc(0.0, 0.0), Some([-1.0, 1.0]));
        assert_eq!(vp.physical_size(), [1600, 1200]);
        assert!(Viewport::new(0.0, 600.0, 1.0).pointer_to_ndc(1.0, 1.0).is_none());
    }

    #[test]
    fn center_ray_points_at_target() {
        let c = camera();
        let ray = c.ray_from_ndc([0.0, 0.0]).expect("ray");
        let expected = (c.target - c.position).normalize().unwrap();
        assert_close(ray.dir.dot(expected), 1.0, 1e-12);
    }

    #[test]
    fn projection_and_ray_agree() {
        let c = camera();
        let world = Vec3::new(12.0, 4.0, 6.0);
        let ndc = c.project_to_ndc(world).expect("in front");
        let ray = c.ray_from_ndc(ndc).expect("ray");
        let to_point = (world - c.position).normalize().unwrap();
        assert_close(ray.dir.dot(to_point), 1.0, 1e-9);
    }

    #[test]
    fn points_behind_camera_do_not_project() {
        let c = camera();
        assert!(c.project_to_ndc(Vec3::new(-20.0, -180.0, 260.0)).is_none());
    }
}
