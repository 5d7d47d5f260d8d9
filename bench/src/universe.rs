//! Immutable pool of identifiers lookups are sampled from

use std::sync::Arc;

use rand::Rng;

use crate::types::{BenchmarkError, BenchmarkResult};

/// Read-only after construction; clones share the same pool
#[derive(Debug, Clone)]
pub struct KeyUniverse {
    ids: Arc<[String]>,
}

impl KeyUniverse {
    pub fn new(ids: Vec<String>) -> BenchmarkResult<Self> {
        if ids.is_empty() {
            return Err(BenchmarkError::EmptyUniverse);
        }
        Ok(Self { ids: ids.into() })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Uniform draw with replacement
    pub fn sample_with<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        &self.ids[rng.random_range(0..self.ids.len())]
    }

    /// Uniform draw with replacement using the calling thread's RNG
    #[must_use]
    pub fn sample(&self) -> &str {
        self.sample_with(&mut rand::rng())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    #[test]
    fn test_empty_universe_rejected() {
        assert!(matches!(
            KeyUniverse::new(Vec::new()),
            Err(BenchmarkError::EmptyUniverse)
        ));
    }

    #[test]
    fn test_sample_stays_in_pool() {
        let universe =
            KeyUniverse::new(vec!["1.1.1.1".to_string(), "2.2.2.2".to_string()]).unwrap();
        assert_eq!(universe.len(), 2);

        let mut rng = StdRng::seed_from_u64(3);
        let seen: HashSet<&str> = (0..200).map(|_| universe.sample_with(&mut rng)).collect();
        assert_eq!(seen, HashSet::from(["1.1.1.1", "2.2.2.2"]));
    }

    #[test]
    fn test_concurrent_sampling() {
        let universe = KeyUniverse::new((0..16).map(|i| format!("10.0.0.{i}")).collect()).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let universe = universe.clone();
                std::thread::spawn(move || {
                    (0..1000).all(|_| universe.sample().starts_with("10.0.0."))
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap());
        }
    }
}
