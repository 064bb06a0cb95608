use std::fmt;

use serde::{Deserialize, Serialize};

/// Prefix used in the textual form of a word-start piece.
pub const WORD_START: char = '▁';

/// Reserved boundary markers.
///
/// Markers are atoms: they are never split into characters, never merged
/// with neighbouring symbols and always survive tokenization verbatim.
/// `Start` is only used as left-context padding and is never emitted by
/// the generator.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Marker {
	SentenceEnd,
	ParagraphEnd,
	StoryEnd,
	Start,
}

impl Marker {
	/// Every reserved marker, in declaration order.
	pub const ALL: [Marker; 4] = [Marker::SentenceEnd, Marker::ParagraphEnd, Marker::StoryEnd, Marker::Start];

	/// Textual form as it appears in the cleaned corpus.
	pub fn as_str(&self) -> &'static str {
		match self {
			Marker::SentenceEnd => "<EOS>",
			Marker::ParagraphEnd => "<EOP>",
			Marker::StoryEnd => "<EOT>",
			Marker::Start => "<START>",
		}
	}

	/// Returns the marker whose textual form is exactly `s`.
	pub fn parse(s: &str) -> Option<Marker> {
		Marker::ALL.into_iter().find(|m| m.as_str() == s)
	}

	/// Returns the longest marker starting at the beginning of `s`.
	fn longest_prefix_of(s: &str) -> Option<Marker> {
		Marker::ALL
			.into_iter()
			.filter(|m| s.starts_with(m.as_str()))
			.max_by_key(|m| m.as_str().len())
	}
}

impl fmt::Display for Marker {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A piece of a whitespace-delimited word, either a marker or plain text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fragment<'a> {
	Marker(Marker),
	Text(&'a str),
}

/// Splits a word into marker and non-marker fragments.
///
/// The cleaning stage sometimes glues a marker onto a word (`word<EOS>`).
/// Markers are resolved as maximal matches scanning left to right, and a
/// text fragment never spans a marker.
///
/// # Example
/// `"ab<EOS>cd"` → `[Text("ab"), Marker(SentenceEnd), Text("cd")]`
pub fn split_fragments(word: &str) -> Vec<Fragment<'_>> {
	let mut fragments = Vec::new();
	let mut text_start = 0;
	let mut i = 0;

	while i < word.len() {
		if let Some(marker) = Marker::longest_prefix_of(&word[i..]) {
			if text_start < i {
				fragments.push(Fragment::Text(&word[text_start..i]));
			}
			fragments.push(Fragment::Marker(marker));
			i += marker.as_str().len();
			text_start = i;
			continue;
		}
		// Advance one UTF-8 character
		i += word[i..].chars().next().map_or(1, char::len_utf8);
	}

	if text_start < word.len() {
		fragments.push(Fragment::Text(&word[text_start..]));
	}
	fragments
}

/// A unit produced by the tokenizer and consumed by the language model.
///
/// Ordering is derived so vocabularies can be kept in ordered sets and
/// iterated deterministically.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Token {
	Marker(Marker),
	/// A subword unit. `word_start` is set on the first piece of each word
	/// and tells detokenization where whitespace belongs.
	Piece { text: String, word_start: bool },
}

impl Token {
	pub fn piece(text: impl Into<String>, word_start: bool) -> Self {
		Token::Piece { text: text.into(), word_start }
	}

	pub fn as_marker(&self) -> Option<Marker> {
		match self {
			Token::Marker(m) => Some(*m),
			Token::Piece { .. } => None,
		}
	}

	pub fn is_marker(&self, marker: Marker) -> bool {
		self.as_marker() == Some(marker)
	}
}

impl From<Marker> for Token {
	fn from(marker: Marker) -> Self {
		Token::Marker(marker)
	}
}

impl fmt::Display for Token {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Token::Marker(m) => fmt::Display::fmt(m, f),
			Token::Piece { text, word_start: true } => write!(f, "{WORD_START}{text}"),
			Token::Piece { text, word_start: false } => f.write_str(text),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_every_marker() {
		for marker in Marker::ALL {
			assert_eq!(Marker::parse(marker.as_str()), Some(marker));
		}
		assert_eq!(Marker::parse("<EOS"), None);
		assert_eq!(Marker::parse("EOS"), None);
	}

	#[test]
	fn splits_attached_markers() {
		assert_eq!(
			split_fragments("ab<EOS>cd"),
			vec![Fragment::Text("ab"), Fragment::Marker(Marker::SentenceEnd), Fragment::Text("cd")]
		);
		assert_eq!(
			split_fragments("<EOP><EOT>"),
			vec![Fragment::Marker(Marker::ParagraphEnd), Fragment::Marker(Marker::StoryEnd)]
		);
	}

	#[test]
	fn keeps_partial_markers_as_text() {
		assert_eq!(split_fragments("<EO"), vec![Fragment::Text("<EO")]);
		assert_eq!(split_fragments("x<"), vec![Fragment::Text("x<")]);
	}

	#[test]
	fn splits_multibyte_words() {
		assert_eq!(
			split_fragments("دن<EOS>"),
			vec![Fragment::Text("دن"), Fragment::Marker(Marker::SentenceEnd)]
		);
	}

	#[test]
	fn displays_word_start_pieces() {
		assert_eq!(Token::piece("دن", true).to_string(), "▁دن");
		assert_eq!(Token::piece("ن", false).to_string(), "ن");
		assert_eq!(Token::from(Marker::StoryEnd).to_string(), "<EOT>");
	}
}
