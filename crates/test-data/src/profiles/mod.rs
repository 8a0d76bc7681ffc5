//! Runner performance profiles.
//!
//! A profile turns a target pace into the speed a runner actually holds and
//! the cadence and stride that produce it.

mod runner;

pub use runner::RunnerProfile;

use rand_distr::{Distribution, Normal};

/// Samples a speed multiplier around 1.0 for a coefficient of variation.
pub fn sample_variance(variance: f64, rng: &mut impl rand::Rng) -> f64 {
    if variance <= 0.0 {
        return 1.0;
    }
    match Normal::new(1.0, variance) {
        Ok(normal) => normal.sample(rng).clamp(0.7, 1.4),
        Err(_) => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_zero_variance_is_exact() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(sample_variance(0.0, &mut rng), 1.0);
    }

    #[test]
    fn test_variance_is_clamped() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let v = sample_variance(0.5, &mut rng);
            assert!((0.7..=1.4).contains(&v));
        }
    }
}
