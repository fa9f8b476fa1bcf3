use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RngError {
    #[error("Invalid range: min ({min}) must be <= max ({max})")]
    InvalidRange { min: String, max: String },
    #[error("Index range must be non-empty (max must be > 0)")]
    EmptyRange,
    #[error("Probability {0} is outside [0, 1]")]
    InvalidProbability(f64),
    #[error("Sample size {sample_size} exceeds population size {population_size}")]
    SampleTooLarge {
        population_size: usize,
        sample_size: usize,
    },
    #[error("Alphabet cannot be empty")]
    EmptyAlphabet,
}

/// Seeded, reproducible source of randomness for every stochastic operation in the crate.
///
/// Two `SeededRng` built from the same non-zero seed yield identical draw streams. A seed of `0`
/// asks for a fresh seed from system entropy; the effective seed is still reported by
/// [`SeededRng::seed`] so a run can be replayed afterwards.
#[derive(Debug, Clone)]
pub struct SeededRng {
    /// The effective seed (never 0 once constructed)
    seed: u64,
    /// Portable generator, so streams stay stable across platforms
    engine: ChaCha8Rng,
}

impl SeededRng {
    /// Creates a new `SeededRng`
    ///
    /// # Arguments
    /// * `seed` - Seed for the generator, `0` means "draw one from system entropy"
    ///
    /// # Returns
    /// * `Self` - A generator positioned at the start of its stream
    pub fn new(seed: u64) -> Self {
        let seed = Self::resolve_seed(seed);
        Self {
            seed,
            engine: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    fn resolve_seed(seed: u64) -> u64 {
        if seed == 0 {
            rand::rng().random_range(1..=u64::MAX)
        } else {
            seed
        }
    }

    /// Returns the effective seed of the current stream.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Reseeds the generator in place, restarting its stream.
    pub fn reseed(&mut self, new_seed: u64) {
        self.seed = Self::resolve_seed(new_seed);
        self.engine = ChaCha8Rng::seed_from_u64(self.seed);
    }

    /// Uniform integer in `[min, max]` (both ends inclusive).
    pub fn random_int(&mut self, min: i64, max: i64) -> Result<i64, RngError> {
        if min > max {
            return Err(RngError::InvalidRange {
                min: min.to_string(),
                max: max.to_string(),
            });
        }
        Ok(self.engine.random_range(min..=max))
    }

    /// Uniform index in `[0, max)`.
    pub fn random_index(&mut self, max: usize) -> Result<usize, RngError> {
        if max == 0 {
            return Err(RngError::EmptyRange);
        }
        Ok(self.below(max))
    }

    /// Uniform double in `[0, 1)`.
    pub fn random_double(&mut self) -> f64 {
        self.engine.random::<f64>()
    }

    /// Uniform double in `[min, max)`. A degenerate range `min == max` returns `min`.
    pub fn random_double_range(&mut self, min: f64, max: f64) -> Result<f64, RngError> {
        if min.is_nan() || max.is_nan() || min > max {
            return Err(RngError::InvalidRange {
                min: min.to_string(),
                max: max.to_string(),
            });
        }
        if min == max {
            return Ok(min);
        }
        Ok(self.engine.random_range(min..max))
    }

    /// Returns `true` with the given probability.
    pub fn random_bool(&mut self, probability: f64) -> Result<bool, RngError> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(RngError::InvalidProbability(probability));
        }
        Ok(self.random_double() < probability)
    }

    /// Draws `sample_size` distinct indices from `[0, population_size)`.
    ///
    /// The whole index range is shuffled and truncated, so the returned order is the shuffled
    /// order and not sorted.
    pub fn sample_without_replacement(
        &mut self,
        population_size: usize,
        sample_size: usize,
    ) -> Result<Vec<usize>, RngError> {
        if sample_size > population_size {
            return Err(RngError::SampleTooLarge {
                population_size,
                sample_size,
            });
        }
        let mut population: Vec<usize> = (0..population_size).collect();
        self.shuffle(&mut population);
        population.truncate(sample_size);
        Ok(population)
    }

    /// Draws `sample_size` independent indices from `[0, population_size)`.
    pub fn sample_with_replacement(
        &mut self,
        population_size: usize,
        sample_size: usize,
    ) -> Result<Vec<usize>, RngError> {
        if population_size == 0 && sample_size > 0 {
            return Err(RngError::EmptyRange);
        }
        Ok((0..sample_size).map(|_| self.below(population_size)).collect())
    }

    /// Builds a string of `length` symbols drawn independently from `alphabet`.
    pub fn random_string(&mut self, alphabet: &str, length: usize) -> Result<String, RngError> {
        let symbols: Vec<char> = alphabet.chars().collect();
        if symbols.is_empty() {
            return Err(RngError::EmptyAlphabet);
        }
        Ok((0..length)
            .map(|_| symbols[self.below(symbols.len())])
            .collect())
    }

    /// Picks a random element of `items`, `None` when the slice is empty.
    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let idx = self.below(items.len());
        items.get(idx)
    }

    /// Shuffles `items` in place.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.engine);
    }

    /// Uniform index in `[0, upper)` for callers that already guarantee `upper > 0`.
    pub(crate) fn below(&mut self, upper: usize) -> usize {
        debug_assert!(upper > 0, "below() called with an empty range");
        self.engine.random_range(0..upper)
    }
}

impl Default for SeededRng {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_stream() {
        let mut a = SeededRng::new(42);
        let mut b = SeededRng::new(42);
        for _ in 0..100 {
            assert_eq!(a.random_int(-50, 50).unwrap(), b.random_int(-50, 50).unwrap());
            assert_eq!(a.random_double().to_bits(), b.random_double().to_bits());
        }
    }

    #[test]
    fn test_zero_seed_resolves_to_nonzero() {
        let rng = SeededRng::new(0);
        assert_ne!(rng.seed(), 0);
    }

    #[test]
    fn test_reseed_restarts_stream() {
        let mut rng = SeededRng::new(7);
        let first: Vec<usize> = (0..10).map(|_| rng.random_index(1000).unwrap()).collect();
        rng.reseed(7);
        let second: Vec<usize> = (0..10).map(|_| rng.random_index(1000).unwrap()).collect();
        assert_eq!(first, second);
        assert_eq!(rng.seed(), 7);
    }

    #[test]
    fn test_random_int_inclusive_bounds() {
        let mut rng = SeededRng::new(1);
        for _ in 0..200 {
            let v = rng.random_int(3, 5).unwrap();
            assert!((3..=5).contains(&v));
        }
        assert_eq!(rng.random_int(9, 9).unwrap(), 9);
    }

    #[test]
    fn test_precondition_violations_are_errors() {
        let mut rng = SeededRng::new(1);
        assert!(matches!(
            rng.random_int(5, 3),
            Err(RngError::InvalidRange { .. })
        ));
        assert_eq!(rng.random_index(0), Err(RngError::EmptyRange));
        assert_eq!(rng.random_bool(1.5), Err(RngError::InvalidProbability(1.5)));
        assert!(rng.random_bool(-0.1).is_err());
        assert!(rng.random_double_range(2.0, 1.0).is_err());
        assert_eq!(
            rng.sample_without_replacement(3, 4),
            Err(RngError::SampleTooLarge {
                population_size: 3,
                sample_size: 4
            })
        );
        assert_eq!(rng.random_string("", 4), Err(RngError::EmptyAlphabet));
    }

    #[test]
    fn test_random_double_in_unit_interval() {
        let mut rng = SeededRng::new(99);
        for _ in 0..1000 {
            let v = rng.random_double();
            assert!((0.0..1.0).contains(&v));
        }
        let v = rng.random_double_range(-2.0, 2.0).unwrap();
        assert!((-2.0..2.0).contains(&v));
    }

    #[test]
    fn test_random_bool_extremes() {
        let mut rng = SeededRng::new(3);
        for _ in 0..100 {
            assert!(!rng.random_bool(0.0).unwrap());
            assert!(rng.random_bool(1.0).unwrap());
        }
    }

    #[test]
    fn test_sample_without_replacement_distinct() {
        let mut rng = SeededRng::new(5);
        let sample = rng.sample_without_replacement(20, 10).unwrap();
        assert_eq!(sample.len(), 10);
        let mut sorted = sample.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), 10);
        assert!(sample.iter().all(|&i| i < 20));
    }

    #[test]
    fn test_shuffle_is_a_seeded_permutation() {
        let mut a: Vec<u32> = (0..32).collect();
        let mut b = a.clone();
        SeededRng::new(9).shuffle(&mut a);
        SeededRng::new(9).shuffle(&mut b);
        assert_eq!(a, b);
        assert_ne!(a, (0..32).collect::<Vec<u32>>());
        a.sort_unstable();
        assert_eq!(a, (0..32).collect::<Vec<u32>>());
    }

    #[test]
    fn test_sample_with_replacement_in_range() {
        let mut rng = SeededRng::new(5);
        let sample = rng.sample_with_replacement(3, 50).unwrap();
        assert_eq!(sample.len(), 50);
        assert!(sample.iter().all(|&i| i < 3));
        assert!(rng.sample_with_replacement(0, 0).unwrap().is_empty());
    }

    #[test]
    fn test_random_string_uses_alphabet() {
        let mut rng = SeededRng::new(11);
        let s = rng.random_string("ACGT", 64).unwrap();
        assert_eq!(s.len(), 64);
        assert!(s.chars().all(|c| "ACGT".contains(c)));
    }
}
