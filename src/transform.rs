use ultraviolet::{Mat4, Rotor3, Vec3};

/// Per-object model transform: translation x rotation x scale.
#[derive(Clone, Debug, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub orientation: Rotor3,
    pub scale: Vec3,
}

impl Transform {
    /// The demo's scene objects spin around the world Y axis.
    pub fn spinning(position: Vec3, angle_y: f32, scale: Vec3) -> Self {
        Self {
            position,
            orientation: Rotor3::from_rotation_xz(angle_y),
            scale,
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zero(),
            orientation: Rotor3::identity(),
            scale: Vec3::one(),
        }
    }
}

impl From<Transform> for Mat4 {
    fn from(transform: Transform) -> Self {
        let isometry = ultraviolet::Isometry3::new(transform.position, transform.orientation);
        isometry.into_homogeneous_matrix() * Mat4::from_nonuniform_scale(transform.scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_applies_scale_before_translation() {
        let transform = Transform {
            position: Vec3::new(1.0, 2.0, 3.0),
            orientation: Rotor3::identity(),
            scale: Vec3::new(2.0, 2.0, 2.0),
        };
        let m: Mat4 = transform.into();
        let p = m * Vec3::new(1.0, 0.0, 0.0).into_homogeneous_point();
        assert!((p.x - 3.0).abs() < 1e-6);
        assert!((p.y - 2.0).abs() < 1e-6);
        assert!((p.z - 3.0).abs() < 1e-6);
    }
}
