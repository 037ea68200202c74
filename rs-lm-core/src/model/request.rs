use serde::{Deserialize, Serialize};

/// Parameters for a single generation run.
///
/// A request carries the prompt plus the sampling knobs. Every field except
/// `prompt` has a default, so `GenerateRequest::new("...")` is the common way
/// to build one and struct update syntax covers the rest.
///
/// Deserialization applies the same defaults, so a JSON body containing only
/// `{"prompt": "..."}` is a complete request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerateRequest {
	/// Text used to seed the generation.
	pub prompt: String,

	/// Maximum number of tokens to generate.
	pub max_tokens: usize,

	/// Sampling temperature (must be > 0.0, 1.0 leaves weights untouched).
	pub temperature: f64,

	/// Keep only the `top_k` most probable tokens at each step (0 disables).
	pub top_k: usize,

	/// Optional RNG seed for reproducible runs.
	pub seed: Option<u64>,

	/// Generation stops as soon as the decoded text ends with any of these.
	pub stop_sequences: Vec<String>,
}

impl GenerateRequest {
	/// Creates a request for the given prompt with default sampling settings.
	pub fn new<S: Into<String>>(prompt: S) -> Self {
		Self {
			prompt: prompt.into(),
			..Self::default()
		}
	}
}

impl Default for GenerateRequest {
	fn default() -> Self {
		Self {
			prompt: String::new(),
			max_tokens: 50,
			temperature: 1.0,
			top_k: 50,
			seed: None,
			stop_sequences: Vec::new(),
		}
	}
}

/// Token accounting for one generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
	/// Number of tokens produced by encoding the prompt.
	pub input_tokens: usize,

	/// Number of tokens generated after the prompt.
	pub output_tokens: usize,

	/// Sum of input and output tokens.
	pub total_tokens: usize,
}

impl Usage {
	/// Builds a usage record, deriving the total from the two parts.
	pub fn new(input_tokens: usize, output_tokens: usize) -> Self {
		Self {
			input_tokens,
			output_tokens,
			total_tokens: input_tokens + output_tokens,
		}
	}
}

/// Result of a generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
	/// Decoded text covering the prompt tokens and everything generated.
	pub generated_text: String,

	/// Token accounting for this run.
	pub usage: Usage,

	/// Wall-clock duration of the run in milliseconds.
	pub latency_ms: u64,

	/// Identifier of the model that produced the text.
	pub model: String,
}
