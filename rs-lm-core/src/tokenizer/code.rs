use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use super::{TokenId, Tokenizer, UNK_ID, UNK_TOKEN};

/// Token inserted between lines when it is part of the vocabulary.
pub const NEWLINE_TOKEN: &str = "[NL]";

/// Prefix of indentation tokens; the suffix is the indent level.
pub const INDENT_PREFIX: &str = "INDENT_";

/// Single-character code symbols that become standalone tokens.
static SYMBOL_PATTERN: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"([{}()\[\];,.<>:?!@#$%^&*+=|~`/\\-])").expect("valid pattern"));

/// Double- or single-quoted literals, protected from symbol splitting.
static STRING_PATTERN: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r#""[^"]*"|'[^']*'"#).expect("valid pattern"));

/// Tokenizer specialized for source code.
///
/// # Behavior
/// - Leading whitespace of a line compresses into a single
///   `INDENT_<level>` token, one level per four spaces (a tab counts as
///   four). Less than a full level produces no token.
/// - String and character literals survive as single tokens.
/// - Code symbols split into their own tokens, so `getName()` becomes
///   `getName`, `(`, `)`.
/// - Line breaks encode to [`NEWLINE_TOKEN`] only when the vocabulary
///   contains it.
pub struct CodeTokenizer {
	word_to_id: HashMap<String, TokenId>,
	id_to_word: HashMap<TokenId, String>,
	next_id: TokenId,
}

impl CodeTokenizer {
	/// Creates a tokenizer over an existing vocabulary.
	pub fn new(vocabulary: HashMap<String, TokenId>) -> Self {
		let id_to_word = vocabulary
			.iter()
			.map(|(word, id)| (*id, word.clone()))
			.collect();
		let next_id = vocabulary.len() as TokenId;

		CodeTokenizer {
			word_to_id: vocabulary,
			id_to_word,
			next_id,
		}
	}

	/// Builds a vocabulary from source text.
	///
	/// Ids are assigned in first-seen order starting at 1, with
	/// [`UNK_TOKEN`] fixed at id 0. [`NEWLINE_TOKEN`] is not added
	/// automatically; call [`CodeTokenizer::add_token`] when line
	/// structure should survive encoding.
	pub fn from_corpus(code: &str) -> Self {
		let mut word_to_id = HashMap::new();
		word_to_id.insert(UNK_TOKEN.to_string(), UNK_ID);

		let mut next_id: TokenId = 1;
		for line in split_lines(code) {
			for token in tokenize_line(line) {
				if !word_to_id.contains_key(&token) {
					word_to_id.insert(token, next_id);
					next_id += 1;
				}
			}
		}

		CodeTokenizer::new(word_to_id)
	}

	/// Creates a tokenizer whose vocabulary holds only [`UNK_TOKEN`].
	pub fn empty() -> Self {
		let mut word_to_id = HashMap::new();
		word_to_id.insert(UNK_TOKEN.to_string(), UNK_ID);
		CodeTokenizer::new(word_to_id)
	}

	/// Adds one token to the vocabulary if absent.
	///
	/// Existing ids are never reassigned; the new token takes the next
	/// free id.
	pub fn add_token(&mut self, token: &str) {
		if !self.word_to_id.contains_key(token) {
			self.word_to_id.insert(token.to_string(), self.next_id);
			self.id_to_word.insert(self.next_id, token.to_string());
			self.next_id += 1;
		}
	}

	/// Splits text into token strings without mapping them to ids.
	///
	/// [`NEWLINE_TOKEN`] appears between lines unconditionally here,
	/// which makes this useful for inspecting how text will split.
	pub fn tokenize(&self, text: &str) -> Vec<String> {
		let mut result = Vec::new();
		let lines = split_lines(text);

		for (i, line) in lines.iter().enumerate() {
			result.extend(tokenize_line(line));
			if i < lines.len() - 1 {
				result.push(NEWLINE_TOKEN.to_string());
			}
		}

		result
	}
}

impl Tokenizer for CodeTokenizer {
	fn encode(&self, text: &str) -> Vec<TokenId> {
		if text.is_empty() {
			return Vec::new();
		}

		let mut result = Vec::new();
		let lines = split_lines(text);

		for (i, line) in lines.iter().enumerate() {
			for token in tokenize_line(line) {
				result.push(self.word_to_id.get(&token).copied().unwrap_or(UNK_ID));
			}

			// Line breaks only become tokens when the vocabulary knows [NL]
			if i < lines.len() - 1 {
				if let Some(&nl_id) = self.word_to_id.get(NEWLINE_TOKEN) {
					result.push(nl_id);
				}
			}
		}

		result
	}

	fn decode(&self, tokens: &[TokenId]) -> String {
		if tokens.is_empty() {
			return String::new();
		}

		let mut out = String::new();
		let mut previous: Option<&str> = None;

		for id in tokens {
			let token = self
				.id_to_word
				.get(id)
				.map(String::as_str)
				.unwrap_or(UNK_TOKEN);

			if token == NEWLINE_TOKEN {
				out.push('\n');
				previous = Some(token);
				continue;
			}

			if let Some(level) = indent_token_level(token) {
				out.push_str(&"    ".repeat(level));
				previous = Some(token);
				continue;
			}

			// No space right after a line break, an indent or an opening
			// bracket, and none before closers or punctuation.
			let need_space = match previous {
				None => false,
				Some(prev) => {
					prev != NEWLINE_TOKEN
						&& !prev.starts_with(INDENT_PREFIX)
						&& space_after(prev)
						&& space_before(token)
				}
			};
			if need_space {
				out.push(' ');
			}

			out.push_str(token);
			previous = Some(token);
		}

		out.trim().to_string()
	}

	fn vocab_size(&self) -> usize {
		self.word_to_id.len()
	}

	fn vocabulary(&self) -> &HashMap<String, TokenId> {
		&self.word_to_id
	}

	fn kind(&self) -> &'static str {
		"code"
	}
}

/// Splits on `\n`, dropping trailing empty lines so a final newline
/// does not produce a phantom line.
fn split_lines(text: &str) -> Vec<&str> {
	let mut lines: Vec<&str> = text.split('\n').collect();
	while lines.last() == Some(&"") {
		lines.pop();
	}
	lines
}

/// Splits one line into token strings.
///
/// Order of operations matters: indentation first, then literal
/// protection, then symbol separation, then whitespace splitting.
fn tokenize_line(line: &str) -> Vec<String> {
	let mut tokens = Vec::new();
	if line.is_empty() {
		return tokens;
	}

	let body = line.trim_start_matches(|c: char| c == ' ' || c == '\t');
	let indent_len = line.len() - body.len();
	if indent_len > 0 {
		let level = indent_level(&line[..indent_len]);
		if level > 0 {
			tokens.push(format!("{INDENT_PREFIX}{level}"));
		}
	}

	// Literals swap to placeholders so symbol splitting cannot cut them
	let mut literals = HashMap::new();
	let mut literal_index = 0;
	let protected = STRING_PATTERN.replace_all(body, |captures: &regex::Captures| {
		let placeholder = format!("___STRING_{literal_index}___");
		literals.insert(placeholder.clone(), captures[0].to_string());
		literal_index += 1;
		placeholder
	});

	let separated = SYMBOL_PATTERN.replace_all(&protected, " $1 ");

	for part in separated.split_whitespace() {
		match literals.get(part) {
			Some(literal) => tokens.push(literal.clone()),
			None => tokens.push(part.to_string()),
		}
	}

	tokens
}

/// Indent level of a leading whitespace run: four spaces per level, a
/// tab counting as four spaces.
fn indent_level(indent: &str) -> usize {
	let mut spaces = 0;
	for c in indent.chars() {
		if c == '\t' {
			spaces += 4;
		} else {
			spaces += 1;
		}
	}
	spaces / 4
}

/// Level of an `INDENT_<n>` token, or `None` for every other token.
fn indent_token_level(token: &str) -> Option<usize> {
	token
		.strip_prefix(INDENT_PREFIX)
		.and_then(|suffix| suffix.parse().ok())
}

fn space_before(token: &str) -> bool {
	!matches!(token, ")" | "]" | "}" | ";" | "," | ".")
}

fn space_after(token: &str) -> bool {
	!matches!(token, "(" | "{" | "[")
}
