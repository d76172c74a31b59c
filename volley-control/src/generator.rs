//! Integer generators backing weighted selection

use crate::compile::NodeId;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

/// Source of uniformly distributed integers in `[0, bound)`
pub trait IntegerGenerator: Send {
    /// `bound` is always positive
    fn next_int(&mut self, bound: u32) -> u32;
}

/// Builds a generator for one weighted-distribution node on one thread
pub type GeneratorFactory = Arc<dyn Fn(NodeId) -> Box<dyn IntegerGenerator> + Send + Sync>;

/// Pseudo-random generator over `StdRng`
#[derive(Debug)]
pub struct RandomIntegerGenerator {
    rng: StdRng,
}

impl RandomIntegerGenerator {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }
}

impl IntegerGenerator for RandomIntegerGenerator {
    fn next_int(&mut self, bound: u32) -> u32 {
        self.rng.random_range(0..bound)
    }
}

/// Counts upwards modulo the bound: 0, 1, 2, ...
///
/// Gives exact, reproducible selection counts for weighted fixtures.
#[derive(Debug, Default, Clone)]
pub struct SequentialIntegerGenerator {
    counter: u64,
}

impl SequentialIntegerGenerator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IntegerGenerator for SequentialIntegerGenerator {
    fn next_int(&mut self, bound: u32) -> u32 {
        let value = (self.counter % u64::from(bound)) as u32;
        self.counter += 1;
        value
    }
}

/// Factory handing every node its own [`SequentialIntegerGenerator`]
pub fn sequential_factory() -> GeneratorFactory {
    Arc::new(|_| Box::new(SequentialIntegerGenerator::new()))
}

/// Probability that a child of the given weight is selected
pub fn calculate_probability(weight: i64, cumulative: i64) -> f64 {
    if cumulative <= 0 {
        return 0.0;
    }
    weight.max(0) as f64 / cumulative as f64
}

/// Exact selection counts a sequential generator produces over `iterations` draws
pub fn expected_counts(weights: &[i64], iterations: i64) -> Vec<i64> {
    let total: i64 = weights.iter().filter(|w| **w > 0).sum();
    if total == 0 {
        return vec![0; weights.len()];
    }
    let completed = iterations / total;
    let mut remaining = iterations % total;
    weights
        .iter()
        .map(|&w| {
            if w <= 0 {
                return 0;
            }
            let partial = remaining.clamp(0, w);
            remaining -= w;
            completed * w + partial
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_wraps_at_bound() {
        let mut generator = SequentialIntegerGenerator::new();
        let values: Vec<u32> = (0..7).map(|_| generator.next_int(3)).collect();
        assert_eq!(values, vec![0, 1, 2, 0, 1, 2, 0]);
    }

    #[test]
    fn test_seeded_generator_is_reproducible() {
        let mut a = RandomIntegerGenerator::seeded(42);
        let mut b = RandomIntegerGenerator::seeded(42);
        for _ in 0..100 {
            let x = a.next_int(100);
            assert_eq!(x, b.next_int(100));
            assert!(x < 100);
        }
    }

    #[test]
    fn test_calculate_probability() {
        assert_eq!(calculate_probability(9, 100), 0.09);
        assert_eq!(calculate_probability(-5, 100), 0.0);
        assert_eq!(calculate_probability(5, 0), 0.0);
    }

    #[test]
    fn test_expected_counts() {
        assert_eq!(expected_counts(&[90, 9, 1], 1030), vec![930, 90, 10]);
        assert_eq!(expected_counts(&[0, 1, 9, 0, 90, 0], 1000), vec![0, 10, 90, 0, 900, 0]);
        assert_eq!(expected_counts(&[33, 66], 1000), vec![340, 660]);
        assert_eq!(expected_counts(&[0, 0], 10), vec![0, 0]);
    }
}
