use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::tokenizer::TokenId;

/// Next-token id to occurrence count, for one context.
pub type NextTokenCounts = HashMap<TokenId, u32>;

/// Context key to next-token counts. Keys join the context token ids
/// with `:`; the unigram table uses a single empty key.
pub type CountTable = HashMap<String, NextTokenCounts>;

/// Persisted result of n-gram training.
///
/// Holds the count tables for the primary order and every lower order,
/// the Kneser-Ney continuation statistics, the vocabulary snapshot and
/// training metadata.
///
/// # Invariants
/// - Context keys in `primary_counts` hold exactly `order - 1` ids;
///   keys in `lower_order_counts[k]` hold exactly `k - 1`.
/// - Continuation counts never exceed `total_unique_bigrams`.
/// - Immutable after training; a loaded artifact is owned by a single
///   model and never mutated.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NGramArtifact {
	pub(crate) order: usize,
	pub(crate) primary_counts: CountTable,
	pub(crate) lower_order_counts: HashMap<usize, CountTable>,
	pub(crate) continuation_counts: HashMap<TokenId, u32>,
	pub(crate) total_unique_bigrams: u64,
	pub(crate) vocabulary: HashMap<String, TokenId>,
	pub(crate) metadata: ModelMetadata,
}

/// Training information carried alongside the count tables.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ModelMetadata {
	pub model_type: String,
	pub order: usize,
	pub tokenizer_type: String,
	pub vocab_size: usize,
	pub total_tokens: usize,
	pub total_ngrams: usize,
	pub trained_at: String,
	pub corpus_info: String,
}

impl NGramArtifact {
	/// Creates an empty artifact for the given order.
	///
	/// The trainer fills it; everyone else only reads it.
	pub(crate) fn new(order: usize) -> Self {
		NGramArtifact {
			order,
			primary_counts: HashMap::new(),
			lower_order_counts: HashMap::new(),
			continuation_counts: HashMap::new(),
			total_unique_bigrams: 0,
			vocabulary: HashMap::new(),
			metadata: ModelMetadata {
				model_type: format!("{order}-gram"),
				order,
				tokenizer_type: String::new(),
				vocab_size: 0,
				total_tokens: 0,
				total_ngrams: 0,
				trained_at: chrono::Utc::now().to_rfc3339(),
				corpus_info: String::new(),
			},
		}
	}

	/// Joins context token ids into a table key, `[12, 7, 45]` becoming
	/// `"12:7:45"`. An empty context yields the empty key used by the
	/// unigram table.
	pub fn make_key(context: &[TokenId]) -> String {
		context
			.iter()
			.map(|id| id.to_string())
			.collect::<Vec<_>>()
			.join(":")
	}

	/// Primary n-gram order.
	pub fn order(&self) -> usize {
		self.order
	}

	/// Occurrences of `next` after `context` at the primary order, 0
	/// when never observed.
	pub fn count(&self, context: &[TokenId], next: TokenId) -> u32 {
		match self.next_token_counts(context) {
			Some(counts) => counts.get(&next).copied().unwrap_or(0),
			None => 0,
		}
	}

	/// All next tokens observed after `context` at the primary order.
	pub fn next_token_counts(&self, context: &[TokenId]) -> Option<&NextTokenCounts> {
		self.primary_counts.get(&Self::make_key(context))
	}

	/// All next tokens observed after `context` at a lower order.
	///
	/// `order` here is the backoff order (1 = unigram, 2 = bigram, ...).
	/// The unigram table is queried with an empty context.
	pub fn lower_order_counts(&self, order: usize, context: &[TokenId]) -> Option<&NextTokenCounts> {
		self.lower_order_counts
			.get(&order)
			.and_then(|table| table.get(&Self::make_key(context)))
	}

	/// Number of distinct one-token contexts `token` was observed
	/// after, the Kneser-Ney diversity statistic. 0 when never seen.
	pub fn continuation_count(&self, token: TokenId) -> u32 {
		self.continuation_counts.get(&token).copied().unwrap_or(0)
	}

	/// Full continuation count table.
	pub fn continuation_counts(&self) -> &HashMap<TokenId, u32> {
		&self.continuation_counts
	}

	/// Count of distinct (context, next) bigram pairs, the normalizer
	/// for continuation probabilities.
	pub fn total_unique_bigrams(&self) -> u64 {
		self.total_unique_bigrams
	}

	/// Sum of every count at the primary order.
	pub fn total_ngram_count(&self) -> u64 {
		self.primary_counts
			.values()
			.map(|next_counts| next_counts.values().map(|c| u64::from(*c)).sum::<u64>())
			.sum()
	}

	/// Surface string to token id snapshot taken at training time.
	pub fn vocabulary(&self) -> &HashMap<String, TokenId> {
		&self.vocabulary
	}

	/// Vocabulary size, unknown token included.
	pub fn vocab_size(&self) -> usize {
		self.vocabulary.len()
	}

	/// Training metadata.
	pub fn metadata(&self) -> &ModelMetadata {
		&self.metadata
	}

	/// Serializes the artifact to a binary file.
	///
	/// Uses `postcard` for compact serialization.
	pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
		let bytes = postcard::to_stdvec(self)?;
		std::fs::write(path, bytes)?;
		Ok(())
	}

	/// Loads an artifact previously written by [`NGramArtifact::save`].
	pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
		let bytes = std::fs::read(path)?;
		Ok(postcard::from_bytes(&bytes)?)
	}
}
