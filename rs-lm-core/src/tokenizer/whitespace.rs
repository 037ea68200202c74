use std::collections::HashMap;

use super::{TokenId, Tokenizer, UNK_ID, UNK_TOKEN};

/// Tokenizer splitting text on runs of Unicode whitespace.
///
/// # Notes
/// - Punctuation stays attached to words (`"Hello,"` and `"Hello"` are
///   distinct tokens) and matching is case sensitive.
/// - Words outside the vocabulary encode to [`UNK_ID`].
pub struct WhitespaceTokenizer {
	word_to_id: HashMap<String, TokenId>,
	id_to_word: HashMap<TokenId, String>,
}

impl WhitespaceTokenizer {
	/// Creates a tokenizer over an existing vocabulary.
	///
	/// Used when reloading a persisted model whose vocabulary is part of
	/// the artifact.
	pub fn new(vocabulary: HashMap<String, TokenId>) -> Self {
		let id_to_word = vocabulary
			.iter()
			.map(|(word, id)| (*id, word.clone()))
			.collect();

		WhitespaceTokenizer {
			word_to_id: vocabulary,
			id_to_word,
		}
	}

	/// Builds a vocabulary from a corpus.
	///
	/// Ids are assigned in first-seen order starting at 1, with
	/// [`UNK_TOKEN`] fixed at id 0, so the same corpus always yields the
	/// same vocabulary.
	pub fn from_corpus(corpus: &str) -> Self {
		let mut word_to_id = HashMap::new();
		word_to_id.insert(UNK_TOKEN.to_string(), UNK_ID);

		let mut next_id: TokenId = 1;
		for word in corpus.split_whitespace() {
			if !word_to_id.contains_key(word) {
				word_to_id.insert(word.to_string(), next_id);
				next_id += 1;
			}
		}

		WhitespaceTokenizer::new(word_to_id)
	}

	/// Creates a tokenizer whose vocabulary holds only [`UNK_TOKEN`].
	pub fn empty() -> Self {
		let mut word_to_id = HashMap::new();
		word_to_id.insert(UNK_TOKEN.to_string(), UNK_ID);
		WhitespaceTokenizer::new(word_to_id)
	}

	/// Id of a word, or [`UNK_ID`] when absent.
	pub fn token_id(&self, word: &str) -> TokenId {
		self.word_to_id.get(word).copied().unwrap_or(UNK_ID)
	}

	/// Surface form of an id, or [`UNK_TOKEN`] when absent.
	pub fn token(&self, id: TokenId) -> &str {
		self.id_to_word.get(&id).map(String::as_str).unwrap_or(UNK_TOKEN)
	}
}

impl Tokenizer for WhitespaceTokenizer {
	fn encode(&self, text: &str) -> Vec<TokenId> {
		text.split_whitespace()
			.map(|word| self.token_id(word))
			.collect()
	}

	fn decode(&self, tokens: &[TokenId]) -> String {
		tokens
			.iter()
			.map(|id| self.token(*id))
			.collect::<Vec<_>>()
			.join(" ")
	}

	fn vocab_size(&self) -> usize {
		self.word_to_id.len()
	}

	fn vocabulary(&self) -> &HashMap<String, TokenId> {
		&self.word_to_id
	}

	fn kind(&self) -> &'static str {
		"whitespace"
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn corpus_words_get_first_seen_ids() {
		let tokenizer = WhitespaceTokenizer::from_corpus("the cat sat the mat");

		assert_eq!(tokenizer.vocab_size(), 5);
		assert_eq!(tokenizer.token_id("the"), 1);
		assert_eq!(tokenizer.token_id("cat"), 2);
		assert_eq!(tokenizer.token_id("sat"), 3);
		assert_eq!(tokenizer.token_id("mat"), 4);
	}

	#[test]
	fn unknown_words_encode_to_unk() {
		let tokenizer = WhitespaceTokenizer::from_corpus("the cat");

		assert_eq!(tokenizer.encode("the dog"), vec![1, UNK_ID]);
	}

	#[test]
	fn blank_text_encodes_to_nothing() {
		let tokenizer = WhitespaceTokenizer::from_corpus("the cat");

		assert!(tokenizer.encode("").is_empty());
		assert!(tokenizer.encode("   \n\t ").is_empty());
	}

	#[test]
	fn decode_joins_with_single_spaces() {
		let tokenizer = WhitespaceTokenizer::from_corpus("the cat sat");

		assert_eq!(tokenizer.decode(&[1, 2, 3]), "the cat sat");
		assert_eq!(tokenizer.decode(&[]), "");
	}

	#[test]
	fn unknown_ids_decode_to_unk_token() {
		let tokenizer = WhitespaceTokenizer::from_corpus("the cat");

		assert_eq!(tokenizer.decode(&[1, 99]), "the [UNK]");
	}

	#[test]
	fn empty_tokenizer_only_knows_unk() {
		let tokenizer = WhitespaceTokenizer::empty();

		assert_eq!(tokenizer.vocab_size(), 1);
		assert_eq!(tokenizer.encode("anything at all"), vec![UNK_ID, UNK_ID, UNK_ID]);
	}
}
