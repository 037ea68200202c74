use std::collections::{HashMap, HashSet};
use std::path::Path;

use log::info;

use crate::error::{LmError, Result};
use crate::io::read_text;
use crate::model::artifact::{CountTable, NGramArtifact, NextTokenCounts};
use crate::tokenizer::{TokenId, Tokenizer};

/// Trains n-gram artifacts of a fixed order.
///
/// # Responsibilities
/// - Sliding-window counting at the primary order and every lower
///   order down to the unigram table
/// - Continuation statistics for Kneser-Ney smoothing
/// - Corpus file to persisted artifact in one call
pub struct NGramTrainer {
	order: usize,
}

impl NGramTrainer {
	/// Creates a trainer for `order`-grams.
	///
	/// # Errors
	/// `InvalidConfiguration` when `order < 2`.
	pub fn new(order: usize) -> Result<Self> {
		if order < 2 {
			return Err(LmError::InvalidConfiguration(format!(
				"order must be >= 2, got {order}"
			)));
		}
		Ok(NGramTrainer { order })
	}

	/// Primary order this trainer counts at.
	pub fn order(&self) -> usize {
		self.order
	}

	/// Counts a token sequence into a fresh artifact.
	///
	/// # Behavior
	/// - Counting is pure and deterministic: windows slide left to
	///   right, one position at a time, no skips.
	/// - A sequence shorter than the order yields an empty primary
	///   table, which is a valid artifact that will dead-end on the
	///   first generation step.
	/// - Vocabulary and tokenizer metadata stay empty here; they are
	///   filled by [`NGramTrainer::train_from_text`].
	pub fn train_tokens(&self, tokens: &[TokenId]) -> NGramArtifact {
		let primary_counts = count_windows(tokens, self.order);

		let mut lower_order_counts = HashMap::new();
		for order in (1..self.order).rev() {
			lower_order_counts.insert(order, count_windows(tokens, order));
		}

		// Continuation statistics read the bigram table; at order 2 the
		// primary table is that table.
		let bigram_table = if self.order == 2 {
			Some(&primary_counts)
		} else {
			lower_order_counts.get(&2)
		};

		let mut continuation_counts = HashMap::new();
		let mut total_unique_bigrams: u64 = 0;
		if let Some(bigrams) = bigram_table {
			let mut predecessors: HashMap<TokenId, HashSet<&str>> = HashMap::new();
			for (context, next_counts) in bigrams {
				total_unique_bigrams += next_counts.len() as u64;
				for next in next_counts.keys() {
					predecessors.entry(*next).or_insert_with(HashSet::new).insert(context);
				}
			}
			continuation_counts = predecessors
				.into_iter()
				.map(|(token, contexts)| (token, contexts.len() as u32))
				.collect();
		}

		let mut artifact = NGramArtifact::new(self.order);
		artifact.primary_counts = primary_counts;
		artifact.lower_order_counts = lower_order_counts;
		artifact.continuation_counts = continuation_counts;
		artifact.total_unique_bigrams = total_unique_bigrams;
		artifact.metadata.total_tokens = tokens.len();
		artifact.metadata.total_ngrams = tokens.len().saturating_sub(self.order - 1);
		artifact
	}

	/// Encodes a corpus and counts it, snapshotting the tokenizer
	/// vocabulary and filling the training metadata.
	pub fn train_from_text(&self, corpus: &str, tokenizer: &dyn Tokenizer) -> NGramArtifact {
		let tokens = tokenizer.encode(corpus);
		let mut artifact = self.train_tokens(&tokens);

		artifact.vocabulary = tokenizer.vocabulary().clone();
		artifact.metadata.tokenizer_type = tokenizer.kind().to_string();
		artifact.metadata.vocab_size = tokenizer.vocab_size();
		artifact.metadata.corpus_info = format!(
			"{} characters, {} tokens",
			corpus.chars().count(),
			tokens.len()
		);

		artifact
	}

	/// Reads a corpus file, trains, and persists the artifact.
	///
	/// # Parameters
	/// - `corpus_path`: Input text file.
	/// - `output_path`: Destination for the serialized artifact.
	/// - `tokenizer`: Tokenizer whose vocabulary is snapshotted into
	///   the artifact.
	///
	/// # Returns
	/// The trained artifact, already written to `output_path`.
	pub fn train_file<PC, PO>(
		&self,
		corpus_path: PC,
		output_path: PO,
		tokenizer: &dyn Tokenizer,
	) -> Result<NGramArtifact>
	where
		PC: AsRef<Path>,
		PO: AsRef<Path>,
	{
		let corpus = read_text(corpus_path)?;
		let artifact = self.train_from_text(&corpus, tokenizer);
		artifact.save(output_path)?;

		info!(
			"trained {} on {} tokens, vocabulary {}",
			artifact.metadata().model_type,
			artifact.metadata().total_tokens,
			artifact.vocab_size()
		);

		Ok(artifact)
	}
}

/// Sliding-window counting at one order.
///
/// `windows(1)` splits into an empty context and the token itself, so
/// the unigram table falls out of the same loop under the empty key.
fn count_windows(tokens: &[TokenId], order: usize) -> CountTable {
	let mut table = CountTable::new();

	for window in tokens.windows(order) {
		let (context, next) = window.split_at(order - 1);
		let next_counts = table
			.entry(NGramArtifact::make_key(context))
			.or_insert_with(NextTokenCounts::new);
		*next_counts.entry(next[0]).or_insert(0) += 1;
	}

	table
}
