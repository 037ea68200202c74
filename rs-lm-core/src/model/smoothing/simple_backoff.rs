use std::collections::HashMap;

use crate::error::{LmError, Result};
use crate::model::artifact::NGramArtifact;
use crate::tokenizer::TokenId;

use super::{count_total, SmoothingStrategy};

/// Descent stops once the leftover interpolation weight drops below
/// this threshold.
const BACKOFF_FLOOR: f64 = 0.01;

/// Fixed-weight interpolated backoff.
///
/// The primary order keeps `1 - weight` of the probability mass. The
/// rest cascades down the lower orders: each order with statistics
/// takes `1 - weight` of whatever is still unassigned, and the unigram
/// table absorbs the final remainder. The blend is the same however
/// sparse the primary order is.
pub struct SimpleBackoff {
	backoff_weight: f64,
}

impl SimpleBackoff {
	/// Backoff with the usual weight of 0.4.
	pub fn default() -> Self {
		SimpleBackoff { backoff_weight: 0.4 }
	}

	/// Backoff with an explicit weight.
	///
	/// # Errors
	/// `InvalidConfiguration` when `backoff_weight` is outside [0, 1].
	pub fn new(backoff_weight: f64) -> Result<Self> {
		if !(0.0..=1.0).contains(&backoff_weight) {
			return Err(LmError::InvalidConfiguration(format!(
				"backoff weight must be between 0 and 1, got {backoff_weight}"
			)));
		}
		Ok(SimpleBackoff { backoff_weight })
	}

	/// Share of the mass handed to lower orders.
	pub fn backoff_weight(&self) -> f64 {
		self.backoff_weight
	}
}

impl SmoothingStrategy for SimpleBackoff {
	fn smoothed_distribution(
		&self,
		artifact: &NGramArtifact,
		context: &[TokenId],
	) -> HashMap<TokenId, f64> {
		let w = self.backoff_weight;
		let mut result = HashMap::new();

		// Primary order keeps 1 - w of the mass
		if let Some(primary) = artifact.next_token_counts(context) {
			let total = count_total(primary);
			if total > 0.0 {
				for (token, count) in primary {
					result.insert(*token, f64::from(*count) / total * (1.0 - w));
				}
			}
		}

		// Lower orders share the rest, the context shrinking from its
		// oldest side at every level
		let mut remaining = w;
		let mut current_context = context;

		for order in (1..artifact.order()).rev() {
			if remaining <= BACKOFF_FLOOR {
				break;
			}
			if !current_context.is_empty() {
				current_context = &current_context[1..];
			}

			if let Some(lower) = artifact.lower_order_counts(order, current_context) {
				let total = count_total(lower);
				if total > 0.0 {
					let level_weight = remaining * (1.0 - w);
					for (token, count) in lower {
						*result.entry(*token).or_insert(0.0) +=
							f64::from(*count) / total * level_weight;
					}
					remaining *= w;
				}
			}
		}

		// Whatever is left tops up the unigram distribution
		if remaining > BACKOFF_FLOOR {
			if let Some(unigrams) = artifact.lower_order_counts(1, &[]) {
				let total = count_total(unigrams);
				if total > 0.0 {
					for (token, count) in unigrams {
						*result.entry(*token).or_insert(0.0) +=
							f64::from(*count) / total * remaining;
					}
				}
			}
		}

		result
	}

	fn strategy_name(&self) -> &'static str {
		"SimpleBackoff"
	}

	fn description(&self) -> String {
		format!("Simple Backoff (weight={:.2})", self.backoff_weight)
	}
}
