use glam::{Mat4, Vec3};

/// An orbit camera: looks at a fixed target from a distance, yaw/pitch
/// controlled, wrapping `glam`'s view/projection builders directly.
pub struct OrbitCamera {
    pub target: Vec3,
    pub distance: f32,
    pub yaw: f32,
    pub pitch: f32,
    pub fov_y_radians: f32,
    pub near: f32,
    pub far: f32,
}

impl OrbitCamera {
    pub fn new(target: Vec3, distance: f32) -> Self {
        Self {
            target,
            distance,
            yaw: 0.0,
            pitch: 0.0,
            fov_y_radians: 60f32.to_radians(),
            near: 0.1,
            far: 100.0,
        }
    }

    pub fn eye(&self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        self.target + Vec3::new(cy * cp, sp, sy * cp) * self.distance
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye(), self.target, Vec3::Y)
    }

    pub fn projection(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov_y_radians, aspect, self.near, self.far)
    }

    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.projection(aspect) * self.view()
    }

    pub fn orbit(&mut self, delta_yaw: f32, delta_pitch: f32) {
        self.yaw += delta_yaw;
        let pitch_limit = 89f32.to_radians();
        self.pitch = (self.pitch + delta_pitch).clamp(-pitch_limit, pitch_limit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_camera_at_zero_yaw_and_pitch_sits_on_the_positive_x_axis() {
        let camera = OrbitCamera::new(Vec3::ZERO, 5.0);
        let eye = camera.eye();
        assert!((eye.x - 5.0).abs() < 1e-4);
        assert!(eye.y.abs() < 1e-4);
        assert!(eye.z.abs() < 1e-4);
    }

    #[test]
    fn orbiting_clamps_pitch_to_just_under_the_poles() {
        let mut camera = OrbitCamera::new(Vec3::ZERO, 5.0);
        camera.orbit(0.0, 10.0);
        assert!(camera.pitch < 90f32.to_radians());
    }

    #[test]
    fn view_projection_is_the_product_of_projection_and_view() {
        let camera = OrbitCamera::new(Vec3::ZERO, 5.0);
        let combined = camera.view_projection(16.0 / 9.0);
        let expected = camera.projection(16.0 / 9.0) * camera.view();
        assert_eq!(combined, expected);
    }
}
