use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::context_counts::ContextCounts;
use crate::tokenizer::{Marker, Token};

/// Two-token trigram context: `(w-2, w-1)`.
pub type Context = (Token, Token);

/// Unigram, bigram and trigram count tables.
///
/// Built once through `NGramCountsBuilder` and read-only afterwards.
///
/// # Invariants
/// - The keys of `unigrams` are the vocabulary; they never contain the
///   start marker, which only appears as padding context
/// - `total_unigrams` equals the sum of the unigram counts
/// - Context totals equal the sum of their transition counts
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct NGramCounts {
	unigrams: BTreeMap<Token, usize>,
	total_unigrams: usize,
	/// Preceding token → next-token counts.
	bigrams: HashMap<Token, ContextCounts>,
	/// Two preceding tokens → next-token counts.
	trigrams: HashMap<Context, ContextCounts>,
}

impl NGramCounts {
	/// Tokens seen during training, in ascending order.
	pub fn vocabulary(&self) -> impl Iterator<Item = &Token> {
		self.unigrams.keys()
	}

	pub fn vocabulary_size(&self) -> usize {
		self.unigrams.len()
	}

	/// Number of (non-padding) tokens seen during training.
	pub fn total_unigrams(&self) -> usize {
		self.total_unigrams
	}

	pub fn unigram_count(&self, token: &Token) -> usize {
		self.unigrams.get(token).copied().unwrap_or(0)
	}

	/// Relative frequency of `token` over the whole corpus, 0 for an empty corpus.
	pub fn unigram_frequency(&self, token: &Token) -> f64 {
		if self.total_unigrams == 0 {
			return 0.0;
		}
		self.unigram_count(token) as f64 / self.total_unigrams as f64
	}

	pub fn bigram_context(&self, previous: &Token) -> Option<&ContextCounts> {
		self.bigrams.get(previous)
	}

	pub fn trigram_context(&self, context: &Context) -> Option<&ContextCounts> {
		self.trigrams.get(context)
	}
}

/// Accumulates n-gram counts document by document.
///
/// Each document is padded on the left with two start markers so that the
/// first real token is counted under the `(<START>, <START>)` context.
/// No smoothing happens here; estimation is left to the model.
#[derive(Debug, Default)]
pub struct NGramCountsBuilder {
	counts: NGramCounts,
}

impl NGramCountsBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Counts every position of an already tokenized document.
	pub fn add_document(&mut self, tokens: &[Token]) -> &mut Self {
		let start = Token::Marker(Marker::Start);
		let mut context: Context = (start.clone(), start);

		for token in tokens {
			*self.counts.unigrams.entry(token.clone()).or_insert(0) += 1;
			self.counts.total_unigrams += 1;

			self.counts.bigrams.entry(context.1.clone()).or_default().add_transition(token);
			self.counts.trigrams.entry(context.clone()).or_default().add_transition(token);

			context = (context.1, token.clone());
		}
		self
	}

	/// Finishes counting and returns the read-only tables.
	pub fn build(self) -> NGramCounts {
		self.counts
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn start() -> Token {
		Token::Marker(Marker::Start)
	}

	fn word(text: &str) -> Token {
		Token::piece(text, true)
	}

	#[test]
	fn pads_documents_with_start_context() {
		let mut builder = NGramCountsBuilder::new();
		builder.add_document(&[word("a"), word("b")]);
		let counts = builder.build();

		let first = counts.trigram_context(&(start(), start())).unwrap();
		assert_eq!(first.count(&word("a")), 1);
		let second = counts.trigram_context(&(start(), word("a"))).unwrap();
		assert_eq!(second.count(&word("b")), 1);
		assert_eq!(counts.bigram_context(&start()).unwrap().total(), 1);
		assert_eq!(counts.bigram_context(&word("a")).unwrap().count(&word("b")), 1);
	}

	#[test]
	fn vocabulary_excludes_padding() {
		let mut builder = NGramCountsBuilder::new();
		builder.add_document(&[word("a"), Token::Marker(Marker::SentenceEnd)]).add_document(&[]);
		let counts = builder.build();

		assert_eq!(counts.vocabulary_size(), 2);
		assert_eq!(counts.total_unigrams(), 2);
		assert!(counts.vocabulary().all(|t| !t.is_marker(Marker::Start)));
	}

	#[test]
	fn empty_corpus_has_zero_frequency() {
		let counts = NGramCounts::default();
		assert_eq!(counts.unigram_frequency(&word("a")), 0.0);
		assert!(counts.bigram_context(&start()).is_none());
	}
}
