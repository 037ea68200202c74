use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{LmError, Result};
use crate::tokenizer::TokenId;

/// Guard against `ln(0)` when converting probabilities to log scores.
const LOG_EPSILON: f64 = 1e-10;

/// Picks one token from a weighted distribution.
///
/// # Responsibilities
/// - Normalize arbitrary non-negative weights into probabilities
/// - Temperature rescaling through log scores and a stable softmax
/// - Top-k truncation with renormalization
/// - Reproducible draws when seeded
///
/// # Invariants
/// - Identical `(weights, temperature, top_k, seed)` always selects the
///   identical token. Candidate order is a total order (probability
///   descending, token id ascending) so map iteration order never
///   leaks into the outcome.
/// - The random state is private to one sampler; each generation
///   request builds its own.
pub struct Sampler {
	rng: StdRng,
	temperature: f64,
	top_k: usize,
}

impl Sampler {
	/// Creates a sampler.
	///
	/// # Parameters
	/// - `temperature`: Sharpens (< 1.0) or flattens (> 1.0) the
	///   distribution; must be > 0.
	/// - `top_k`: Keep only the `top_k` most probable candidates; 0
	///   means no truncation.
	/// - `seed`: Fixed seed for reproducible draws, or `None` for
	///   operating-system entropy.
	///
	/// # Errors
	/// `InvalidConfiguration` when `temperature` is not strictly
	/// positive.
	pub fn new(temperature: f64, top_k: usize, seed: Option<u64>) -> Result<Self> {
		if !(temperature > 0.0) {
			return Err(LmError::InvalidConfiguration(format!(
				"temperature must be > 0, got {temperature}"
			)));
		}

		let rng = match seed {
			Some(seed) => StdRng::seed_from_u64(seed),
			None => StdRng::from_os_rng(),
		};

		Ok(Sampler {
			rng,
			temperature,
			top_k,
		})
	}

	/// Samples one token id from `weights`.
	///
	/// Weights can be raw counts or probabilities; they are normalized
	/// internally.
	///
	/// # Errors
	/// `EmptyDistribution` when `weights` is empty.
	pub fn sample(&mut self, weights: &HashMap<TokenId, f64>) -> Result<TokenId> {
		if weights.is_empty() {
			return Err(LmError::EmptyDistribution);
		}

		let mut candidates = normalize(weights);

		if self.temperature != 1.0 {
			apply_temperature(&mut candidates, self.temperature);
		}

		if self.top_k > 0 && self.top_k < candidates.len() {
			truncate_top_k(&mut candidates, self.top_k);
		}

		// Walk the cumulative distribution with a single uniform draw
		let r = self.rng.random::<f64>();
		let mut cumulative = 0.0;
		for (token, probability) in &candidates {
			cumulative += probability;
			if r < cumulative {
				return Ok(*token);
			}
		}

		// Rounding starved every candidate, fall back to the mode
		Ok(candidates[0].0)
	}
}

/// Weights to probabilities, sorted by probability descending with
/// ascending token id breaking ties.
fn normalize(weights: &HashMap<TokenId, f64>) -> Vec<(TokenId, f64)> {
	let total: f64 = weights.values().sum();

	let mut candidates: Vec<(TokenId, f64)> = if total > 0.0 {
		weights
			.iter()
			.map(|(token, weight)| (*token, weight / total))
			.collect()
	} else {
		// Degenerate all-zero input, treat every candidate as equal
		let uniform = 1.0 / weights.len() as f64;
		weights.keys().map(|token| (*token, uniform)).collect()
	};

	sort_candidates(&mut candidates);
	candidates
}

/// Rescales probabilities through `ln(p) / temperature` and a
/// numerically stable softmax.
fn apply_temperature(candidates: &mut [(TokenId, f64)], temperature: f64) {
	let scaled: Vec<f64> = candidates
		.iter()
		.map(|(_, probability)| (probability + LOG_EPSILON).ln() / temperature)
		.collect();

	let max_score = scaled.iter().copied().fold(f64::NEG_INFINITY, f64::max);
	let exponentials: Vec<f64> = scaled.iter().map(|score| (score - max_score).exp()).collect();
	let sum: f64 = exponentials.iter().sum();

	for (candidate, exponential) in candidates.iter_mut().zip(&exponentials) {
		candidate.1 = exponential / sum;
	}

	sort_candidates(candidates);
}

/// Keeps the `k` most probable candidates and renormalizes them.
fn truncate_top_k(candidates: &mut Vec<(TokenId, f64)>, k: usize) {
	candidates.truncate(k);

	let total: f64 = candidates.iter().map(|(_, probability)| probability).sum();
	for candidate in candidates.iter_mut() {
		candidate.1 /= total;
	}
}

fn sort_candidates(candidates: &mut [(TokenId, f64)]) {
	candidates.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
}

#[cfg(test)]
mod tests {
	use super::*;

	fn weights(pairs: &[(TokenId, f64)]) -> HashMap<TokenId, f64> {
		pairs.iter().copied().collect()
	}

	#[test]
	fn empty_distribution_is_an_error() {
		let mut sampler = Sampler::new(1.0, 0, Some(1)).unwrap();

		assert!(matches!(
			sampler.sample(&HashMap::new()),
			Err(LmError::EmptyDistribution)
		));
	}

	#[test]
	fn non_positive_temperature_is_rejected() {
		assert!(Sampler::new(0.0, 0, None).is_err());
		assert!(Sampler::new(-0.5, 0, None).is_err());
		assert!(Sampler::new(0.7, 0, None).is_ok());
	}

	#[test]
	fn identical_seed_reproduces_the_draw() {
		let distribution = weights(&[(1, 0.1), (2, 0.2), (3, 0.7)]);

		let mut first = Sampler::new(1.0, 0, Some(42)).unwrap();
		let mut second = Sampler::new(1.0, 0, Some(42)).unwrap();

		for _ in 0..10 {
			assert_eq!(
				first.sample(&distribution).unwrap(),
				second.sample(&distribution).unwrap()
			);
		}
	}

	#[test]
	fn top_k_one_always_picks_the_mode() {
		let distribution = weights(&[(5, 0.5), (2, 0.3), (9, 0.2)]);

		for seed in 0..20 {
			let mut sampler = Sampler::new(1.0, 1, Some(seed)).unwrap();
			assert_eq!(sampler.sample(&distribution).unwrap(), 5);
		}
	}

	#[test]
	fn equal_probabilities_break_ties_on_the_lower_id() {
		let distribution = weights(&[(5, 0.5), (3, 0.5)]);

		for seed in 0..20 {
			let mut sampler = Sampler::new(1.0, 1, Some(seed)).unwrap();
			assert_eq!(sampler.sample(&distribution).unwrap(), 3);
		}
	}

	#[test]
	fn raw_counts_work_as_weights() {
		let distribution = weights(&[(1, 3.0), (2, 1.0)]);

		let mut sampler = Sampler::new(1.0, 1, Some(7)).unwrap();
		assert_eq!(sampler.sample(&distribution).unwrap(), 1);
	}

	#[test]
	fn low_temperature_locks_onto_the_mode() {
		let distribution = weights(&[(1, 0.999_999), (2, 0.000_001)]);

		for seed in 0..50 {
			let mut sampler = Sampler::new(0.1, 0, Some(seed)).unwrap();
			assert_eq!(sampler.sample(&distribution).unwrap(), 1);
		}
	}

	#[test]
	fn high_temperature_still_returns_a_known_candidate() {
		let distribution = weights(&[(1, 0.9), (2, 0.1)]);

		let mut sampler = Sampler::new(2.0, 0, Some(11)).unwrap();
		let token = sampler.sample(&distribution).unwrap();
		assert!(distribution.contains_key(&token));
	}

	#[test]
	fn all_zero_weights_fall_back_to_uniform() {
		let distribution = weights(&[(1, 0.0), (2, 0.0)]);

		let mut sampler = Sampler::new(1.0, 0, Some(3)).unwrap();
		let token = sampler.sample(&distribution).unwrap();
		assert!(token == 1 || token == 2);
	}
}
