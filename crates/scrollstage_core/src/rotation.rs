//! Rotation sampling for stacked images
//!
//! Each stacking pass samples one rotation per image. The source is injected
//! so tests can supply fixed angles.

use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Supplies rotation angles in degrees
pub trait RotationSource {
    /// Sample an angle in `[-range, range]`
    fn sample(&mut self, range: f32) -> f32;

    /// Called at the start of every stacking pass
    fn begin_pass(&mut self) {}
}

/// Uniform random angles from a seedable generator
pub struct RandomRotation {
    seed: Option<u64>,
    rng: StdRng,
}

impl RandomRotation {
    /// Fresh entropy for every pass
    pub fn new() -> Self {
        Self {
            seed: None,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Same sequence on every pass
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomRotation {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RandomRotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RandomRotation")
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}

impl RotationSource for RandomRotation {
    fn sample(&mut self, range: f32) -> f32 {
        if range <= 0.0 {
            return 0.0;
        }
        self.rng.random_range(-range..=range)
    }

    fn begin_pass(&mut self) {
        self.rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
    }
}

/// Cycles through a fixed list of angles, clamped to the requested range
#[derive(Debug, Clone)]
pub struct FixedRotations {
    angles: Vec<f32>,
    next: usize,
}

impl FixedRotations {
    pub fn new(angles: impl Into<Vec<f32>>) -> Self {
        Self {
            angles: angles.into(),
            next: 0,
        }
    }
}

impl RotationSource for FixedRotations {
    fn sample(&mut self, range: f32) -> f32 {
        if self.angles.is_empty() {
            return 0.0;
        }
        let angle = self.angles[self.next % self.angles.len()];
        self.next += 1;
        angle.clamp(-range, range)
    }

    fn begin_pass(&mut self) {
        self.next = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_stays_in_range() {
        let mut source = RandomRotation::new();
        for _ in 0..200 {
            let angle = source.sample(5.0);
            assert!((-5.0..=5.0).contains(&angle));
        }
        assert_eq!(source.sample(0.0), 0.0);
    }

    #[test]
    fn test_seeded_passes_repeat() {
        let mut source = RandomRotation::seeded(42);
        source.begin_pass();
        let first: Vec<f32> = (0..4).map(|_| source.sample(5.0)).collect();
        source.begin_pass();
        let second: Vec<f32> = (0..4).map(|_| source.sample(5.0)).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_fixed_cycles_and_clamps() {
        let mut source = FixedRotations::new(vec![3.0, -9.0]);
        assert_eq!(source.sample(5.0), 3.0);
        assert_eq!(source.sample(5.0), -5.0);
        assert_eq!(source.sample(5.0), 3.0);
        source.begin_pass();
        assert_eq!(source.sample(5.0), 3.0);
    }
}
