use ultraviolet::{projection, Mat4, Vec3};

/// Fixed look-at camera. Only the aspect ratio changes at runtime (window
/// resize); eye, target and projection parameters are constants.
#[derive(Debug)]
pub struct Camera {
    pub eye: Vec3,
    pub center: Vec3,
    pub up: Vec3,
    pub settings: CameraSettings,
}

#[derive(Debug)]
pub struct CameraSettings {
    pub z_near: f32,
    pub z_far: f32,
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub aspect_ratio: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            z_near: 0.1,
            z_far: 1000.0,
            fov: 50.0,
            aspect_ratio: 1.0,
        }
    }
}

impl Camera {
    pub fn new(aspect_ratio: f32) -> Self {
        Self {
            eye: Vec3::new(0.0, 3.0, 15.0),
            center: Vec3::zero(),
            up: Vec3::new(0.0, 1.0, 0.0),
            settings: CameraSettings {
                aspect_ratio,
                ..Default::default()
            },
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at(self.eye, self.center, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        projection::rh_yup::perspective_vk(
            self.settings.fov.to_radians(),
            self.settings.aspect_ratio,
            self.settings.z_near,
            self.settings.z_far,
        )
    }

    pub fn update_aspect_ratio(&mut self, aspect_ratio: f32) {
        self.settings.aspect_ratio = aspect_ratio;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_matrix_moves_the_eye_to_the_origin() {
        let camera = Camera::new(1.0);
        let eye = camera.eye;
        let transformed = camera.view_matrix() * eye.into_homogeneous_point();
        assert!(transformed.x.abs() < 1e-5);
        assert!(transformed.y.abs() < 1e-5);
        assert!(transformed.z.abs() < 1e-5);
    }
}
