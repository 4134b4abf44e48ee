//! Orbit camera for the 3D scenes
//!
//! Scenes are z-up: the camera orbits around the vertical z axis and pitches
//! toward or away from the xy plane.

use glam::{Mat4, Vec3};

const MIN_DISTANCE: f32 = 0.5;
const MAX_PITCH: f32 = 1.5;

/// Perspective camera orbiting a target point
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    pub position: Vec3,
    pub target: Vec3,
    pub fov: f32,
    pub aspect_ratio: f32,
    pub near: f32,
    pub far: f32,
    pub distance: f32,
    pub yaw: f32,
    pub pitch: f32,
}

impl OrbitCamera {
    pub fn new(aspect_ratio: f32, target: Vec3, distance: f32) -> Self {
        let mut camera = Self {
            position: Vec3::ZERO,
            target,
            fov: 45.0f32.to_radians(),
            aspect_ratio,
            near: 0.05,
            far: 500.0,
            distance: distance.max(MIN_DISTANCE),
            yaw: 0.6,
            pitch: 0.35,
        };
        camera.update_orbital();
        camera
    }

    /// Recompute the eye position from the orbital parameters
    pub fn update_orbital(&mut self) {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        self.position = self.target
            + self.distance * Vec3::new(cos_pitch * cos_yaw, cos_pitch * sin_yaw, sin_pitch);
    }

    pub fn orbit(&mut self, delta_yaw: f32, delta_pitch: f32) {
        self.yaw += delta_yaw;
        self.pitch = (self.pitch + delta_pitch).clamp(-MAX_PITCH, MAX_PITCH);
        self.update_orbital();
    }

    pub fn zoom(&mut self, delta: f32) {
        self.distance = (self.distance - delta).max(MIN_DISTANCE);
        self.update_orbital();
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Z)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect_ratio, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Camera-to-world transform (inverse of the view matrix)
    pub fn frame_matrix(&self) -> Mat4 {
        self.view_matrix().inverse()
    }

    pub fn update_aspect_ratio(&mut self, aspect_ratio: f32) {
        self.aspect_ratio = aspect_ratio;
    }

    /// Multi-line dump of the frame and view matrices for debugging
    pub fn describe(&self) -> String {
        format!(
            "camera position = {:?}\n  frame matrix:\n{}\n  view matrix:\n{}",
            self.position,
            format_matrix(&self.frame_matrix()),
            format_matrix(&self.view_matrix())
        )
    }
}

fn format_matrix(m: &Mat4) -> String {
    (0..4)
        .map(|r| {
            let row = m.row(r);
            format!("    {:>9.4} {:>9.4} {:>9.4} {:>9.4}", row.x, row.y, row.z, row.w)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Camera uniform data for shaders. The view matrix is needed to build
/// camera-facing billboards.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub position: [f32; 4],
}

impl CameraUniform {
    pub fn from_camera(camera: &OrbitCamera) -> Self {
        Self {
            view_proj: camera.view_projection().to_cols_array_2d(),
            view: camera.view_matrix().to_cols_array_2d(),
            position: camera.position.extend(1.0).to_array(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn orbit_keeps_distance_to_target() {
        let target = Vec3::new(0.0, 0.0, 1.0);
        let mut camera = OrbitCamera::new(16.0 / 9.0, target, 8.0);
        camera.orbit(0.7, -0.2);
        assert_relative_eq!((camera.position - target).length(), 8.0, epsilon = 1e-4);
    }

    #[test]
    fn pitch_and_zoom_are_clamped() {
        let mut camera = OrbitCamera::new(1.0, Vec3::ZERO, 2.0);
        camera.orbit(0.0, 10.0);
        assert_relative_eq!(camera.pitch, MAX_PITCH);
        camera.zoom(100.0);
        assert_relative_eq!(camera.distance, MIN_DISTANCE);
    }

    #[test]
    fn frame_matrix_places_eye_at_camera_position() {
        let camera = OrbitCamera::new(1.0, Vec3::ZERO, 5.0);
        let eye = camera.frame_matrix().transform_point3(Vec3::ZERO);
        assert_relative_eq!(eye.x, camera.position.x, epsilon = 1e-4);
        assert_relative_eq!(eye.y, camera.position.y, epsilon = 1e-4);
        assert_relative_eq!(eye.z, camera.position.z, epsilon = 1e-4);
    }
}
