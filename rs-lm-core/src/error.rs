use thiserror::Error;

/// Result type used by every fallible operation in this crate.
pub type Result<T> = std::result::Result<T, LmError>;

/// Canonical error enum for training, sampling and generation.
///
/// # Invariants
/// - Every variant is fatal to the single call that raised it.
///   Nothing in this crate retries internally.
/// - A dead end during generation (no known continuation) is a normal
///   stop condition, not an error, and never surfaces here.
#[derive(Debug, Error)]
pub enum LmError {
	/// A training or sampling parameter was out of range.
	#[error("invalid configuration: {0}")]
	InvalidConfiguration(String),

	/// The prompt tokenized to an empty sequence.
	#[error("prompt produced no tokens")]
	EmptyPrompt,

	/// The sampler was handed no candidates at all. The generation loop
	/// treats an empty smoothed distribution as a dead end before
	/// sampling, so this only surfaces when the sampler is driven
	/// directly.
	#[error("cannot sample from an empty distribution")]
	EmptyDistribution,

	/// Filesystem failure while reading a corpus or moving an artifact.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	/// Binary artifact encode or decode failure.
	#[error("serialization error: {0}")]
	Serialization(#[from] postcard::Error),
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn display_names_the_failing_parameter() {
		let error = LmError::InvalidConfiguration("order must be >= 2, got 1".to_string());
		assert_eq!(
			error.to_string(),
			"invalid configuration: order must be >= 2, got 1"
		);
	}

	#[test]
	fn io_errors_convert_automatically() {
		fn read_missing() -> Result<String> {
			Ok(std::fs::read_to_string("/nonexistent/corpus.txt")?)
		}
		assert!(matches!(read_missing(), Err(LmError::Io(_))));
	}
}
