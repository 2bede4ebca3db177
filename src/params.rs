//! Runtime-tunable occlusion parameters and their keyboard dispatch.

use winit::event::VirtualKeyCode;

pub struct TuningParams {
    pub ssao_level: f32,
    pub ssao_radius: f32,
    pub show_shading: bool,
    pub show_ao: bool,
    pub weight_by_angle: bool,
    pub randomize_points: bool,
    pub point_count: u32,
}

impl Default for TuningParams {
    fn default() -> Self {
        Self {
            ssao_level: 1.0,
            ssao_radius: 0.05,
            show_shading: true,
            show_ao: true,
            weight_by_angle: true,
            randomize_points: true,
            point_count: 10,
        }
    }
}

/// Requests the key handler cannot satisfy on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    None,
    TogglePause,
    ReloadShaders,
}

impl TuningParams {
    /// Key map: N angle weighting, R randomize, S/X sample count,
    /// Q shading, W occlusion, A/Z radius, P pause, L reload.
    pub fn handle_key(&mut self, key: VirtualKeyCode) -> KeyAction {
        match key {
            VirtualKeyCode::N => self.weight_by_angle = !self.weight_by_angle,
            VirtualKeyCode::R => self.randomize_points = !self.randomize_points,
            // The counter is unsigned and unclamped: decrementing past zero
            // wraps. Kept as-is; the shader bounds its loop by the kernel
            // size.
            VirtualKeyCode::S => self.point_count = self.point_count.wrapping_add(1),
            VirtualKeyCode::X => self.point_count = self.point_count.wrapping_sub(1),
            VirtualKeyCode::Q => self.show_shading = !self.show_shading,
            VirtualKeyCode::W => self.show_ao = !self.show_ao,
            VirtualKeyCode::A => self.ssao_radius += 0.01,
            VirtualKeyCode::Z => self.ssao_radius -= 0.01,
            VirtualKeyCode::P => return KeyAction::TogglePause,
            VirtualKeyCode::L => return KeyAction::ReloadShaders,
            _ => {}
        }
        KeyAction::None
    }

    /// Shading contribution of the geometry pass.
    pub fn shading_level(&self) -> f32 {
        if self.show_shading {
            if self.show_ao {
                0.7
            } else {
                1.0
            }
        } else {
            0.0
        }
    }

    /// Occlusion contribution of the screen-space pass.
    pub fn occlusion_level(&self) -> f32 {
        if self.show_ao {
            if self.show_shading {
                0.3
            } else {
                1.0
            }
        } else {
            0.0
        }
    }

    /// Radius in texture coordinates, scaled with the viewport width.
    pub fn scaled_radius(&self, viewport_width: u32) -> f32 {
        self.ssao_radius * viewport_width as f32 / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_count_wraps_below_zero() {
        let mut params = TuningParams {
            point_count: 0,
            ..Default::default()
        };
        // Documented edge case: the unsigned counter wraps to its maximum
        // instead of clamping.
        params.handle_key(VirtualKeyCode::X);
        assert_eq!(params.point_count, u32::MAX);

        params.handle_key(VirtualKeyCode::S);
        assert_eq!(params.point_count, 0);
    }

    #[test]
    fn toggles_flip_their_flags() {
        let mut params = TuningParams::default();
        assert!(params.weight_by_angle);
        params.handle_key(VirtualKeyCode::N);
        assert!(!params.weight_by_angle);
        params.handle_key(VirtualKeyCode::R);
        assert!(!params.randomize_points);
        params.handle_key(VirtualKeyCode::Q);
        assert!(!params.show_shading);
        params.handle_key(VirtualKeyCode::W);
        assert!(!params.show_ao);
    }

    #[test]
    fn level_formulas_follow_the_visibility_toggles() {
        let mut params = TuningParams::default();
        assert_eq!(params.shading_level(), 0.7);
        assert_eq!(params.occlusion_level(), 0.3);

        params.show_ao = false;
        assert_eq!(params.shading_level(), 1.0);
        assert_eq!(params.occlusion_level(), 0.0);

        params.show_shading = false;
        params.show_ao = true;
        assert_eq!(params.shading_level(), 0.0);
        assert_eq!(params.occlusion_level(), 1.0);
    }

    #[test]
    fn pause_and_reload_are_reported_to_the_caller() {
        let mut params = TuningParams::default();
        assert_eq!(params.handle_key(VirtualKeyCode::P), KeyAction::TogglePause);
        assert_eq!(
            params.handle_key(VirtualKeyCode::L),
            KeyAction::ReloadShaders
        );
        assert_eq!(params.handle_key(VirtualKeyCode::T), KeyAction::None);
    }

    #[test]
    fn radius_scales_with_viewport_width() {
        let params = TuningParams::default();
        assert!((params.scaled_radius(1000) - 0.05).abs() < 1e-6);
        assert!((params.scaled_radius(500) - 0.025).abs() < 1e-6);
    }
}
