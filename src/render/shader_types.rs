//! CPU-side mirrors of the shader interface blocks. All structs are plain
//! `repr(C)` data matching std140 layout, uploaded with byte casts.

use bytemuck::{Pod, Zeroable};
use ultraviolet::Mat4;

use crate::kernel::{SampleKernel, KERNEL_SIZE};

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct CameraBlock {
    pub proj_matrix: Mat4,
}

/// Per-draw push constants of the geometry program.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct DrawPushConstants {
    pub mv_matrix: Mat4,
    pub shading_level: f32,
}

/// Scalar parameters of the occlusion program.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct SsaoParamsBlock {
    pub ssao_radius: f32,
    pub ssao_level: f32,
    pub object_level: f32,
    pub weight_by_angle: u32,
    pub randomize_points: u32,
    pub point_count: u32,
}

/// The read-only sample kernel block: 256 hemisphere directions plus 256
/// jitter vectors, 16-byte stride each.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct SamplePointsBlock {
    pub points: [[f32; 4]; KERNEL_SIZE],
    pub random_vectors: [[f32; 4]; KERNEL_SIZE],
}

impl From<&SampleKernel> for SamplePointsBlock {
    fn from(kernel: &SampleKernel) -> Self {
        Self {
            points: kernel.points,
            random_vectors: kernel.random_vectors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_match_their_std140_sizes() {
        assert_eq!(std::mem::size_of::<CameraBlock>(), 64);
        assert_eq!(std::mem::size_of::<DrawPushConstants>(), 68);
        assert_eq!(std::mem::size_of::<SsaoParamsBlock>(), 24);
        assert_eq!(std::mem::size_of::<SamplePointsBlock>(), 2 * KERNEL_SIZE * 16);
    }
}
