//! Hemisphere sample kernel for the occlusion pass.
//!
//! The kernel is generated once at startup from a seeded generator and
//! uploaded as a read-only uniform block; it is never mutated afterwards.

pub const KERNEL_SIZE: usize = 256;

pub const DEFAULT_SEED: u32 = 0x1337_1337;

/// Multiplicative congruential generator producing floats in `[0, 1)`.
///
/// The scrambled state lands in the mantissa bits of a float in `[1, 2)`
/// and is shifted down by subtracting 1.0.
pub struct KernelRng {
    state: u32,
}

impl KernelRng {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    pub fn next_float(&mut self) -> f32 {
        self.state = self.state.wrapping_mul(16807);
        let tmp = self.state ^ (self.state >> 4) ^ (self.state << 15);
        f32::from_bits((tmp >> 9) | 0x3F80_0000) - 1.0
    }
}

pub struct SampleKernel {
    /// Unit-length directions in the upper hemisphere (z >= 0), w = 0.
    pub points: [[f32; 4]; KERNEL_SIZE],
    /// Raw [0, 1) 4-tuples used to reorient the kernel per pixel.
    pub random_vectors: [[f32; 4]; KERNEL_SIZE],
}

impl SampleKernel {
    pub fn generate(seed: u32) -> Self {
        let mut rng = KernelRng::new(seed);

        let mut points = [[0.0f32; 4]; KERNEL_SIZE];
        for point in points.iter_mut() {
            // Rejection-sample inside the unit sphere, restricted to the
            // upper half, then normalize.
            loop {
                let x = rng.next_float() * 2.0 - 1.0;
                let y = rng.next_float() * 2.0 - 1.0;
                let z = rng.next_float();
                let len = (x * x + y * y + z * z).sqrt();
                if len <= 1.0 {
                    *point = [x / len, y / len, z / len, 0.0];
                    break;
                }
            }
        }

        let mut random_vectors = [[0.0f32; 4]; KERNEL_SIZE];
        for vector in random_vectors.iter_mut() {
            *vector = [
                rng.next_float(),
                rng.next_float(),
                rng.next_float(),
                rng.next_float(),
            ];
        }

        Self {
            points,
            random_vectors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rng_first_output_matches_hand_computed_bits() {
        let mut rng = KernelRng::new(DEFAULT_SEED);
        let state = DEFAULT_SEED.wrapping_mul(16807);
        let tmp = state ^ (state >> 4) ^ (state << 15);
        let expected = f32::from_bits((tmp >> 9) | 0x3F80_0000) - 1.0;
        assert_eq!(rng.next_float().to_bits(), expected.to_bits());
    }

    #[test]
    fn rng_outputs_stay_in_unit_interval() {
        let mut rng = KernelRng::new(1);
        for _ in 0..10_000 {
            let v = rng.next_float();
            assert!((0.0..1.0).contains(&v), "out of range: {v}");
        }
    }

    #[test]
    fn kernel_is_deterministic_for_a_fixed_seed() {
        let a = SampleKernel::generate(DEFAULT_SEED);
        let b = SampleKernel::generate(DEFAULT_SEED);
        assert_eq!(a.points, b.points);
        assert_eq!(a.random_vectors, b.random_vectors);

        let c = SampleKernel::generate(DEFAULT_SEED ^ 1);
        assert_ne!(a.points, c.points);
    }

    #[test]
    fn points_are_unit_length_in_the_upper_hemisphere() {
        let kernel = SampleKernel::generate(DEFAULT_SEED);
        for p in kernel.points.iter() {
            let len = (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt();
            assert!((len - 1.0).abs() < 1e-5, "length {len}");
            assert!(p[2] >= 0.0, "below hemisphere: {:?}", p);
            assert_eq!(p[3], 0.0);
        }
    }

    #[test]
    fn random_vectors_are_raw_unit_interval_tuples() {
        let kernel = SampleKernel::generate(DEFAULT_SEED);
        for v in kernel.random_vectors.iter() {
            for component in v {
                assert!((0.0..1.0).contains(component));
            }
        }
    }
}
