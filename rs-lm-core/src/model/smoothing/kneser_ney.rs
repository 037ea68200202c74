use std::collections::HashMap;

use crate::error::{LmError, Result};
use crate::model::artifact::NGramArtifact;
use crate::tokenizer::TokenId;

use super::{count_total, SmoothingStrategy};

/// Kneser-Ney smoothing: absolute discounting plus continuation
/// probabilities.
///
/// Every observed count gives up a fixed discount `d`; the collected
/// mass is redistributed in proportion to how many *distinct* contexts
/// a token has followed, not how often it occurred. A token frequent
/// only after one dominant context keeps a low continuation
/// probability, a token seen after many contexts a high one.
///
/// For a context with total count `C` and `u` distinct outcomes:
///
/// ```text
/// P(w) = max(count(w) - d, 0) / C  +  lambda * P_cont(w)
/// lambda = d * u / C
/// P_cont(w) = continuation(w) / total_unique_bigrams
/// ```
pub struct KneserNey {
	discount: f64,
}

impl KneserNey {
	/// Kneser-Ney with the customary discount of 0.75.
	pub fn default() -> Self {
		KneserNey { discount: 0.75 }
	}

	/// Kneser-Ney with an explicit discount.
	///
	/// # Errors
	/// `InvalidConfiguration` when `discount` is outside [0, 1].
	pub fn new(discount: f64) -> Result<Self> {
		if !(0.0..=1.0).contains(&discount) {
			return Err(LmError::InvalidConfiguration(format!(
				"discount must be between 0 and 1, got {discount}"
			)));
		}
		Ok(KneserNey { discount })
	}

	/// Fixed amount subtracted from every observed count.
	pub fn discount(&self) -> f64 {
		self.discount
	}
}

impl SmoothingStrategy for KneserNey {
	fn smoothed_distribution(
		&self,
		artifact: &NGramArtifact,
		context: &[TokenId],
	) -> HashMap<TokenId, f64> {
		// A context without primary mass collapses to the pure
		// continuation distribution
		let primary = match artifact.next_token_counts(context) {
			Some(counts) if !counts.is_empty() => counts,
			_ => return continuation_probabilities(artifact),
		};
		let context_total = count_total(primary);

		// Reserved backoff mass grows with the variety of outcomes
		let lambda = self.discount * primary.len() as f64 / context_total;

		let continuation = continuation_probabilities(artifact);
		let uniform = 1.0 / artifact.vocab_size().max(1) as f64;

		let mut result = HashMap::new();
		for (token, count) in primary {
			let discounted = (f64::from(*count) - self.discount).max(0.0) / context_total;
			let continuation_prob = continuation.get(token).copied().unwrap_or(uniform);
			result.insert(*token, discounted + lambda * continuation_prob);
		}

		// Tokens unseen under this context get backoff mass only
		for (token, continuation_prob) in &continuation {
			result.entry(*token).or_insert(lambda * continuation_prob);
		}

		result
	}

	fn strategy_name(&self) -> &'static str {
		"KneserNey"
	}

	fn description(&self) -> String {
		format!("Kneser-Ney Smoothing (discount={:.2})", self.discount)
	}
}

/// Continuation probability of every token with bigram statistics: its
/// share of the distinct (context, next) bigram pairs. Falls back to a
/// uniform distribution over the vocabulary when no bigram statistics
/// exist at all.
fn continuation_probabilities(artifact: &NGramArtifact) -> HashMap<TokenId, f64> {
	let total_unique = artifact.total_unique_bigrams();

	if total_unique == 0 {
		let uniform = 1.0 / artifact.vocab_size().max(1) as f64;
		return artifact
			.vocabulary()
			.values()
			.map(|id| (*id, uniform))
			.collect();
	}

	artifact
		.continuation_counts()
		.iter()
		.map(|(token, count)| (*token, f64::from(*count) / total_unique as f64))
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::trainer::NGramTrainer;
	use crate::tokenizer::whitespace::WhitespaceTokenizer;

	fn bigram_artifact() -> NGramArtifact {
		NGramTrainer::new(2).unwrap().train_tokens(&[1, 2, 1, 3])
	}

	#[test]
	fn discount_outside_unit_interval_is_rejected() {
		assert!(KneserNey::new(1.5).is_err());
		assert!(KneserNey::new(-0.1).is_err());
		assert!(KneserNey::new(0.5).is_ok());
		assert!((KneserNey::default().discount() - 0.75).abs() < f64::EPSILON);
	}

	#[test]
	fn observed_context_mass_sums_to_one() {
		let artifact = bigram_artifact();
		let kneser_ney = KneserNey::default();

		// Context "1": C = 2, u = 2, lambda = 0.75; continuation is
		// 1/3 for each of the three tokens
		let distribution = kneser_ney.smoothed_distribution(&artifact, &[1]);

		assert!((distribution[&2] - 0.375).abs() < 1e-9);
		assert!((distribution[&3] - 0.375).abs() < 1e-9);
		assert!((distribution[&1] - 0.25).abs() < 1e-9);

		let mass: f64 = distribution.values().sum();
		assert!((mass - 1.0).abs() < 1e-9);
	}

	#[test]
	fn unknown_context_collapses_to_continuation_probabilities() {
		let artifact = bigram_artifact();
		let kneser_ney = KneserNey::default();

		let distribution = kneser_ney.smoothed_distribution(&artifact, &[9]);

		for token in 1..=3 {
			assert!((distribution[&token] - 1.0 / 3.0).abs() < 1e-9);
		}
	}

	#[test]
	fn no_bigram_statistics_fall_back_to_uniform_over_vocabulary() {
		let tokenizer = WhitespaceTokenizer::empty();
		let artifact = NGramTrainer::new(2).unwrap().train_from_text("", &tokenizer);
		let kneser_ney = KneserNey::default();

		let distribution = kneser_ney.smoothed_distribution(&artifact, &[1]);

		assert_eq!(distribution.len(), 1);
		assert!((distribution[&0] - 1.0).abs() < 1e-9);
	}

	#[test]
	fn diverse_contexts_outweigh_one_dominant_context() {
		// Token 8 always follows token 7; token 9 follows three
		// different tokens. Same raw frequency, different diversity.
		let tokens = [7, 8, 7, 8, 7, 8, 1, 9, 2, 9, 3, 9];
		let artifact = NGramTrainer::new(2).unwrap().train_tokens(&tokens);
		let kneser_ney = KneserNey::default();

		let distribution = kneser_ney.smoothed_distribution(&artifact, &[42]);

		assert!((distribution[&9] - 3.0 * distribution[&8]).abs() < 1e-9);
	}
}
