//! Tokenizers turning raw text into token id sequences and back.
//!
//! The model layer consumes tokenizers exclusively through the
//! [`Tokenizer`] trait: `encode`, `decode` and vocabulary accessors.
//! It never inspects tokenizer internals.

use std::collections::HashMap;

/// Word-per-token tokenizer splitting on Unicode whitespace.
///
/// The simplest possible scheme. Punctuation stays glued to words and
/// case is significant.
pub mod whitespace;

/// Symbol and indentation aware tokenizer for source code.
///
/// Compresses leading whitespace into indent tokens, protects string
/// literals, and splits single-character code symbols into their own
/// tokens.
pub mod code;

/// Token identifier used across the whole crate.
pub type TokenId = u32;

/// Surface form of the reserved unknown token.
pub const UNK_TOKEN: &str = "[UNK]";

/// Id of the unknown token, always reserved at 0.
pub const UNK_ID: TokenId = 0;

/// Bidirectional text to token id conversion.
///
/// # Invariants
/// - `encode` then `decode` restores the input up to the tokenizer's
///   own normalization (whitespace collapsing, unknown words).
/// - Ids are dense integers starting at [`UNK_ID`].
pub trait Tokenizer: Send + Sync {
	/// Converts text into an ordered sequence of token ids.
	///
	/// Words absent from the vocabulary map to [`UNK_ID`].
	fn encode(&self, text: &str) -> Vec<TokenId>;

	/// Restores text from a sequence of token ids.
	///
	/// Unknown ids render as [`UNK_TOKEN`].
	fn decode(&self, tokens: &[TokenId]) -> String;

	/// Number of entries in the vocabulary, unknown token included.
	fn vocab_size(&self) -> usize;

	/// Surface string to id mapping.
	fn vocabulary(&self) -> &HashMap<String, TokenId>;

	/// Stable identifier stored in artifact metadata so a reloaded
	/// model can rebuild the matching tokenizer.
	fn kind(&self) -> &'static str;
}
