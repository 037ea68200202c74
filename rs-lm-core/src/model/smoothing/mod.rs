//! Probability smoothing over sparse n-gram counts.
//!
//! Raw counts assign zero probability to anything unseen. A smoothing
//! strategy turns an artifact plus a context into a full distribution,
//! reserving mass for tokens the primary order never observed.

use std::collections::HashMap;

use crate::model::artifact::{NGramArtifact, NextTokenCounts};
use crate::tokenizer::TokenId;

/// Fixed-weight interpolation across every order, from the primary
/// table down to the unigram frequencies.
pub mod simple_backoff;

/// Absolute discounting with continuation probabilities.
pub mod kneser_ney;

/// Replaceable policy turning counts into a next-token distribution.
///
/// # Invariants
/// - Returned probabilities are non-negative.
/// - The sum stays close to 1.0; the sampler renormalizes anyway, so
///   approximate normalization is tolerated.
/// - Tokens absent from the returned map have probability zero.
pub trait SmoothingStrategy: Send + Sync {
	/// Distribution over next tokens after `context`.
	///
	/// `context` holds up to `order - 1` ids; callers truncate longer
	/// histories to the last `order - 1` elements beforehand.
	fn smoothed_distribution(
		&self,
		artifact: &NGramArtifact,
		context: &[TokenId],
	) -> HashMap<TokenId, f64>;

	/// Short machine-readable name.
	fn strategy_name(&self) -> &'static str;

	/// Human-readable description including parameters.
	fn description(&self) -> String {
		format!("{} smoothing strategy", self.strategy_name())
	}
}

/// Sum of one context's counts as a float, the denominator for its
/// probabilities.
pub(crate) fn count_total(counts: &NextTokenCounts) -> f64 {
	counts.values().map(|count| f64::from(*count)).sum()
}
