use std::path::Path;

use log::debug;

use crate::clock::{Clock, SystemClock};
use crate::error::{LmError, Result};
use crate::model::artifact::{ModelMetadata, NGramArtifact};
use crate::model::request::{GenerateRequest, GenerateResponse, Usage};
use crate::model::sampler::Sampler;
use crate::model::smoothing::simple_backoff::SimpleBackoff;
use crate::model::smoothing::SmoothingStrategy;
use crate::tokenizer::code::CodeTokenizer;
use crate::tokenizer::whitespace::WhitespaceTokenizer;
use crate::tokenizer::Tokenizer;

/// A trained n-gram model ready to generate text.
///
/// `NGramModel` ties together the count artifact produced by training,
/// the tokenizer whose vocabulary the counts refer to, and a smoothing
/// strategy that turns counts into next-token distributions.
///
/// # Responsibilities
/// - Run the generation loop: encode the prompt, repeatedly smooth and
///   sample, honor stop sequences, decode the result
/// - Reconstruct the tokenizer from artifact metadata when loading a
///   persisted model
/// - Account tokens and wall-clock latency for every run
///
/// # Invariants
/// - The tokenizer vocabulary matches the ids stored in the artifact
/// - Generation never mutates the artifact; every run only reads counts
pub struct NGramModel {
	/// Count tables and metadata produced by training.
	artifact: NGramArtifact,

	/// Tokenizer whose vocabulary the artifact was trained with.
	tokenizer: Box<dyn Tokenizer>,

	/// Strategy turning raw counts into next-token distributions.
	smoothing: Box<dyn SmoothingStrategy>,

	/// Time source for latency accounting.
	clock: Box<dyn Clock>,
}

impl NGramModel {
	/// Assembles a model from its three parts.
	///
	/// The caller is responsible for passing the tokenizer the artifact
	/// was trained with; latency is measured with the system clock.
	pub fn new(
		artifact: NGramArtifact,
		tokenizer: Box<dyn Tokenizer>,
		smoothing: Box<dyn SmoothingStrategy>,
	) -> Self {
		NGramModel {
			artifact,
			tokenizer,
			smoothing,
			clock: Box::new(SystemClock),
		}
	}

	/// Loads a persisted artifact and rebuilds the matching tokenizer.
	///
	/// The tokenizer is reconstructed from the vocabulary snapshot using
	/// the recorded tokenizer kind; unknown kinds fall back to plain
	/// whitespace tokenization.
	///
	/// # Errors
	/// I/O and deserialization errors from reading the artifact.
	pub fn from_artifact<P: AsRef<Path>>(
		path: P,
		smoothing: Box<dyn SmoothingStrategy>,
	) -> Result<Self> {
		let artifact = NGramArtifact::load(path)?;

		let tokenizer: Box<dyn Tokenizer> = match artifact.metadata().tokenizer_type.as_str() {
			"code" => Box::new(CodeTokenizer::new(artifact.vocabulary().clone())),
			_ => Box::new(WhitespaceTokenizer::new(artifact.vocabulary().clone())),
		};

		Ok(NGramModel::new(artifact, tokenizer, smoothing))
	}

	/// Loads a persisted artifact with the default backoff smoothing.
	///
	/// # Errors
	/// Same as [`NGramModel::from_artifact`].
	pub fn from_artifact_default<P: AsRef<Path>>(path: P) -> Result<Self> {
		NGramModel::from_artifact(path, Box::new(SimpleBackoff::default()))
	}

	/// Replaces the time source used for latency accounting.
	pub fn set_clock(&mut self, clock: Box<dyn Clock>) {
		self.clock = clock;
	}

	/// Generates text from a prompt.
	///
	/// # Behavior
	/// - The prompt is encoded once; generated tokens are appended to
	///   that buffer and the response text decodes the whole buffer.
	/// - Each step takes the last `order - 1` tokens (fewer when the
	///   buffer is shorter) as context, smooths a distribution from the
	///   artifact and samples the next token.
	/// - An empty distribution is a dead end and stops the run early.
	/// - When stop sequences are present, the buffer is decoded after
	///   every step and the run stops as soon as the text ends with any
	///   of them.
	///
	/// # Errors
	/// - `EmptyPrompt` when the prompt encodes to no tokens.
	/// - `InvalidConfiguration` when the sampling settings are rejected.
	pub fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
		let started = self.clock.now_millis();

		let mut tokens = self.tokenizer.encode(&request.prompt);
		if tokens.is_empty() {
			return Err(LmError::EmptyPrompt);
		}
		let input_tokens = tokens.len();

		let mut sampler = Sampler::new(request.temperature, request.top_k, request.seed)?;
		let context_len = self.artifact.order() - 1;

		let mut output_tokens = 0;
		for _ in 0..request.max_tokens {
			let start = tokens.len().saturating_sub(context_len);
			let distribution = self
				.smoothing
				.smoothed_distribution(&self.artifact, &tokens[start..]);
			if distribution.is_empty() {
				// Dead end, nothing was ever observed here
				break;
			}

			tokens.push(sampler.sample(&distribution)?);
			output_tokens += 1;

			if !request.stop_sequences.is_empty() {
				let text = self.tokenizer.decode(&tokens);
				if request.stop_sequences.iter().any(|stop| text.ends_with(stop.as_str())) {
					break;
				}
			}
		}

		let generated_text = self.tokenizer.decode(&tokens);
		let latency_ms = self.clock.now_millis().saturating_sub(started);
		debug!(
			"generated {} tokens from {} prompt tokens in {} ms",
			output_tokens, input_tokens, latency_ms
		);

		Ok(GenerateResponse {
			generated_text,
			usage: Usage::new(input_tokens, output_tokens),
			latency_ms,
			model: self.model_name(),
		})
	}

	/// Public identifier of this model, derived from its order.
	pub fn model_name(&self) -> String {
		format!("{}-gram-v1", self.artifact.order())
	}

	/// Order of the underlying artifact.
	pub fn order(&self) -> usize {
		self.artifact.order()
	}

	/// Number of entries in the live tokenizer vocabulary.
	pub fn vocab_size(&self) -> usize {
		self.tokenizer.vocab_size()
	}

	/// Training metadata recorded in the artifact.
	pub fn metadata(&self) -> &ModelMetadata {
		self.artifact.metadata()
	}

	/// Count artifact backing this model.
	pub fn artifact(&self) -> &NGramArtifact {
		&self.artifact
	}

	/// Tokenizer backing this model.
	pub fn tokenizer(&self) -> &dyn Tokenizer {
		self.tokenizer.as_ref()
	}

	/// Smoothing strategy used for every generation step.
	pub fn smoothing(&self) -> &dyn SmoothingStrategy {
		self.smoothing.as_ref()
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicU64, Ordering};

	use super::*;
	use crate::model::trainer::NGramTrainer;

	/// Clock advancing by a fixed step on every read.
	struct TickingClock(AtomicU64);

	impl Clock for TickingClock {
		fn now_millis(&self) -> u64 {
			self.0.fetch_add(25, Ordering::SeqCst)
		}
	}

	fn backoff_model(corpus: &str, order: usize) -> NGramModel {
		let tokenizer = WhitespaceTokenizer::from_corpus(corpus);
		let trainer = NGramTrainer::new(order).unwrap();
		let artifact = trainer.train_from_text(corpus, &tokenizer);
		NGramModel::new(
			artifact,
			Box::new(tokenizer),
			Box::new(SimpleBackoff::default()),
		)
	}

	#[test]
	fn seeded_runs_are_reproducible() {
		let model = backoff_model("the cat sat on the mat the dog sat on the rug", 2);
		let request = GenerateRequest {
			prompt: "the".to_owned(),
			max_tokens: 5,
			seed: Some(42),
			..GenerateRequest::default()
		};

		let first = model.generate(&request).unwrap();
		let second = model.generate(&request).unwrap();

		assert_eq!(first.generated_text, second.generated_text);
		assert_eq!(first.usage, second.usage);
		assert_eq!(first.usage.output_tokens, 5);
	}

	#[test]
	fn empty_prompt_is_rejected() {
		let model = backoff_model("a b c", 2);
		let request = GenerateRequest::new("   ");

		assert!(matches!(model.generate(&request), Err(LmError::EmptyPrompt)));
	}

	#[test]
	fn unknown_prompt_words_still_generate() {
		let model = backoff_model("the cat sat", 2);
		let request = GenerateRequest {
			prompt: "zzz".to_owned(),
			max_tokens: 3,
			seed: Some(7),
			..GenerateRequest::default()
		};

		// The prompt encodes to the unknown token; backoff still finds
		// unigram mass to sample from
		let response = model.generate(&request).unwrap();
		assert_eq!(response.usage.input_tokens, 1);
		assert_eq!(response.usage.output_tokens, 3);
	}

	#[test]
	fn untrained_model_dead_ends_immediately() {
		let tokenizer = WhitespaceTokenizer::from_corpus("");
		let trainer = NGramTrainer::new(2).unwrap();
		let artifact = trainer.train_from_text("", &tokenizer);
		let model = NGramModel::new(
			artifact,
			Box::new(tokenizer),
			Box::new(SimpleBackoff::default()),
		);

		let response = model.generate(&GenerateRequest::new("anything")).unwrap();

		assert_eq!(response.usage.output_tokens, 0);
		assert_eq!(response.generated_text, "[UNK]");
	}

	#[test]
	fn stop_sequences_halt_the_run() {
		// With this corpus and greedy selection, "a" is always followed
		// by "b"
		let model = backoff_model("a b a b a b", 2);
		let request = GenerateRequest {
			prompt: "a".to_owned(),
			max_tokens: 10,
			top_k: 1,
			seed: Some(1),
			stop_sequences: vec!["b".to_owned()],
			..GenerateRequest::default()
		};

		let response = model.generate(&request).unwrap();

		assert_eq!(response.generated_text, "a b");
		assert_eq!(response.usage.output_tokens, 1);
	}

	#[test]
	fn usage_counts_prompt_and_generated_tokens() {
		let model = backoff_model("the cat sat on the mat", 2);
		let request = GenerateRequest {
			prompt: "the cat".to_owned(),
			max_tokens: 3,
			seed: Some(9),
			..GenerateRequest::default()
		};

		let usage = model.generate(&request).unwrap().usage;

		assert_eq!(usage.input_tokens, 2);
		assert_eq!(usage.output_tokens, 3);
		assert_eq!(usage.total_tokens, 5);
	}

	#[test]
	fn latency_comes_from_the_injected_clock() {
		let mut model = backoff_model("a b c d", 2);
		model.set_clock(Box::new(TickingClock(AtomicU64::new(0))));

		let request = GenerateRequest {
			prompt: "a".to_owned(),
			max_tokens: 1,
			seed: Some(3),
			..GenerateRequest::default()
		};

		// The clock is read once at the start and once at the end
		assert_eq!(model.generate(&request).unwrap().latency_ms, 25);
	}

	#[test]
	fn model_name_reflects_the_order() {
		let model = backoff_model("a b c d e f", 3);

		assert_eq!(model.model_name(), "3-gram-v1");
		assert_eq!(model.order(), 3);
	}
}
