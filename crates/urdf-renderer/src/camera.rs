//! Orbit camera around the robot

use std::f32::consts::{FRAC_PI_3, PI};

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

/// Longitudinal angle of the default view
pub const DEFAULT_ALPHA: f32 = -FRAC_PI_3;
/// Latitudinal angle of the default view (5π/12)
pub const DEFAULT_BETA: f32 = 5.0 * PI / 12.0;

const MIN_RADIUS: f32 = 0.01;
const BETA_LIMIT: f32 = 0.01;

/// Camera uniform data for GPU
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub eye: [f32; 4],
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self {
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            eye: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

/// Camera orbiting a target point, Z up
///
/// `alpha` rotates around the up axis, `beta` is measured down from it.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitCamera {
    pub alpha: f32,
    pub beta: f32,
    pub radius: f32,
    pub target: Vec3,
    pub fov_y_radians: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            beta: DEFAULT_BETA,
            radius: 1.0,
            target: Vec3::ZERO,
            fov_y_radians: 45.0_f32.to_radians(),
            near: 0.01,
            far: 1000.0,
        }
    }
}

impl OrbitCamera {
    /// Return to the default angles and target, keeping the radius
    pub fn reset(&mut self) {
        self.alpha = DEFAULT_ALPHA;
        self.beta = DEFAULT_BETA;
        self.target = Vec3::ZERO;
    }

    pub fn set_radius(&mut self, radius: f32) {
        self.radius = radius.max(MIN_RADIUS);
    }

    pub fn position(&self) -> Vec3 {
        let (sin_a, cos_a) = self.alpha.sin_cos();
        let (sin_b, cos_b) = self.beta.sin_cos();
        self.target + self.radius * Vec3::new(cos_a * sin_b, sin_a * sin_b, cos_b)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.target, Vec3::Z)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_y_radians, aspect.max(0.0001), self.near, self.far)
    }

    pub fn orbit(&mut self, delta_alpha: f32, delta_beta: f32) {
        self.alpha += delta_alpha;
        self.beta = (self.beta + delta_beta).clamp(BETA_LIMIT, PI - BETA_LIMIT);
    }

    pub fn uniform(&self, aspect: f32) -> CameraUniform {
        let position = self.position();
        CameraUniform {
            view_proj: (self.projection_matrix(aspect) * self.view_matrix()).to_cols_array_2d(),
            eye: [position.x, position.y, position.z, 1.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_position_keeps_radius() {
        let mut camera = OrbitCamera::default();
        camera.set_radius(2.5);
        assert_relative_eq!(
            camera.position().distance(camera.target),
            2.5,
            epsilon = 1e-5
        );
    }

    #[test]
    fn test_reset_restores_angles_but_not_radius() {
        let mut camera = OrbitCamera::default();
        camera.set_radius(3.0);
        camera.orbit(1.0, -0.5);
        camera.target = Vec3::new(1.0, 2.0, 3.0);

        camera.reset();
        assert_relative_eq!(camera.alpha, DEFAULT_ALPHA);
        assert_relative_eq!(camera.beta, DEFAULT_BETA);
        assert_eq!(camera.target, Vec3::ZERO);
        assert_relative_eq!(camera.radius, 3.0);
    }

    #[test]
    fn test_orbit_clamps_beta() {
        let mut camera = OrbitCamera::default();
        camera.orbit(0.0, 10.0);
        assert!(camera.beta < PI);
        camera.orbit(0.0, -10.0);
        assert!(camera.beta > 0.0);
    }

    #[test]
    fn test_uniform_is_finite() {
        let uniform = OrbitCamera::default().uniform(16.0 / 9.0);
        assert!(uniform.view_proj.iter().flatten().all(|v| v.is_finite()));
    }
}
