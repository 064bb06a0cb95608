use std::collections::{BTreeSet, HashMap};

use log::{debug, info};

use super::bpe_tokenizer::{BpeTokenizer, MergePair, merge_pair};
use super::token::{Fragment, Marker, split_fragments};

/// Learns a BPE vocabulary and merge table from a corpus.
///
/// Documents are ingested one at a time into a word-frequency table; the
/// table is the training working set and is dropped once `train` returns
/// the immutable tokenizer.
///
/// # Invariants
/// - Each key of `word_freqs` is the current symbol sequence of one
///   distinct marker-free word
/// - Reserved markers never enter `word_freqs`, so they never pair
#[derive(Debug, Default)]
pub struct VocabularyTrainer {
	/// Word (as its current symbols) → occurrences in the corpus.
	word_freqs: HashMap<Vec<String>, usize>,
	/// Distinct single characters seen in the corpus.
	alphabet: BTreeSet<String>,
}

impl VocabularyTrainer {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a document to the word-frequency table.
	///
	/// Words are split on whitespace, then around reserved markers. Marker
	/// fragments are atoms and are skipped; every text fragment is counted
	/// as one word decomposed into characters.
	pub fn add_document(&mut self, document: &str) {
		for word in document.split_whitespace() {
			for fragment in split_fragments(word) {
				if let Fragment::Text(text) = fragment {
					let symbols: Vec<String> = text.chars().map(String::from).collect();
					self.alphabet.extend(symbols.iter().cloned());
					*self.word_freqs.entry(symbols).or_insert(0) += 1;
				}
			}
		}
	}

	/// Number of distinct words ingested so far.
	pub fn distinct_words(&self) -> usize {
		self.word_freqs.len()
	}

	/// Learns merges until the vocabulary reaches `vocab_size` or no pair
	/// remains, and returns the resulting tokenizer.
	///
	/// The vocabulary counts the reserved markers. Running out of pairs
	/// before the target is reached is not an error.
	pub fn train(mut self, vocab_size: usize) -> BpeTokenizer {
		let (vocabulary, merges) = self.learn(vocab_size);
		BpeTokenizer::new(vocabulary, merges)
	}

	fn learn(&mut self, vocab_size: usize) -> (BTreeSet<String>, Vec<MergePair>) {
		let mut vocabulary = self.alphabet.clone();
		vocabulary.extend(Marker::ALL.iter().map(|m| m.as_str().to_owned()));
		let mut merges = Vec::new();

		info!(
			"Learning vocabulary: {} distinct words, {} base symbols, target {}",
			self.word_freqs.len(),
			vocabulary.len(),
			vocab_size
		);

		while vocabulary.len() < vocab_size {
			let pair_counts = self.count_pairs();
			let Some((pair, count)) = best_pair(pair_counts) else {
				info!("No mergeable pair left, stopping at {} symbols", vocabulary.len());
				break;
			};

			debug!("Merge #{}: ({}, {}) x{}", merges.len() + 1, pair.0, pair.1, count);
			self.apply_merge(&pair);
			vocabulary.insert(format!("{}{}", pair.0, pair.1));
			merges.push(pair);
		}

		info!("Vocabulary learned: {} symbols, {} merges", vocabulary.len(), merges.len());
		(vocabulary, merges)
	}

	/// Counts adjacent pairs weighted by word frequency.
	///
	/// Markers never reach `word_freqs`, so no pair involves one.
	fn count_pairs(&self) -> HashMap<(&str, &str), usize> {
		let mut pair_counts = HashMap::new();
		for (symbols, freq) in &self.word_freqs {
			for window in symbols.windows(2) {
				let (left, right) = (window[0].as_str(), window[1].as_str());
				debug_assert!(Marker::parse(left).is_none() && Marker::parse(right).is_none());
				*pair_counts.entry((left, right)).or_insert(0) += freq;
			}
		}
		pair_counts
	}

	/// Rewrites every word with `pair` merged.
	fn apply_merge(&mut self, pair: &MergePair) {
		let word_freqs = std::mem::take(&mut self.word_freqs);
		for (mut symbols, freq) in word_freqs {
			merge_pair(&mut symbols, &pair.0, &pair.1);
			*self.word_freqs.entry(symbols).or_insert(0) += freq;
		}
	}
}

/// Picks the pair with the highest count.
///
/// Ties go to the lexicographically smallest `(left, right)`, so the
/// choice never depends on hash iteration order.
fn best_pair(pair_counts: HashMap<(&str, &str), usize>) -> Option<(MergePair, usize)> {
	pair_counts
		.into_iter()
		.max_by(|(pair_a, count_a), (pair_b, count_b)| count_a.cmp(count_b).then_with(|| pair_b.cmp(pair_a)))
		.map(|((left, right), count)| ((left.to_owned(), right.to_owned()), count))
}

/// Learns a tokenizer from `documents` with a target vocabulary size.
pub fn learn_vocabulary<S: AsRef<str>>(documents: &[S], vocab_size: usize) -> BpeTokenizer {
	let mut trainer = VocabularyTrainer::new();
	for document in documents {
		trainer.add_document(document.as_ref());
	}
	trainer.train(vocab_size)
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	fn trainer(documents: &[&str]) -> VocabularyTrainer {
		let mut trainer = VocabularyTrainer::new();
		for document in documents {
			trainer.add_document(document);
		}
		trainer
	}

	#[test]
	fn weights_pairs_by_word_frequency() {
		// Unweighted counting over distinct words would tie and pick (a, b)
		let mut trainer = trainer(&["ab cd cd cd"]);
		let (_, merges) = trainer.learn(Marker::ALL.len() + 4 + 1);
		assert_eq!(merges, vec![("c".to_owned(), "d".to_owned())]);
	}

	#[test]
	fn breaks_ties_lexicographically() {
		let mut trainer = trainer(&["ba dc"]);
		let (_, merges) = trainer.learn(usize::MAX);
		assert_eq!(merges, vec![("b".to_owned(), "a".to_owned()), ("d".to_owned(), "c".to_owned())]);
	}

	#[test]
	fn stops_when_no_pair_remains() {
		let mut trainer = trainer(&["ab ab"]);
		let (vocabulary, merges) = trainer.learn(1_000);
		assert_eq!(merges.len(), 1);
		assert!(vocabulary.contains("ab"));
		assert!(vocabulary.len() < 1_000);
	}

	#[test]
	fn never_merges_markers() {
		let tokenizer = learn_vocabulary(&["ab<EOS> ab <EOS> <EOP> ab<EOT>"], 100);
		for (left, right) in tokenizer.merges() {
			assert!(!left.contains('<') && !right.contains('<'));
		}
		assert_eq!(tokenizer.merges(), [("a".to_owned(), "b".to_owned())].as_slice());
	}

	#[test]
	fn base_alphabet_above_target_learns_nothing() {
		let tokenizer = learn_vocabulary(&["abcdef"], 3);
		assert!(tokenizer.merges().is_empty());
	}

	#[test]
	fn learned_merges_round_trip_through_tokenize() {
		let tokenizer = learn_vocabulary(&["ایک دن ایک دن <EOS> ایک"], 20);
		let tokens = tokenizer.tokenize("ایک دن <EOS>");
		assert_eq!(tokenizer.detokenize(&tokens), "ایک دن <EOS>");
		assert!(tokens.len() < "ایکدن".chars().count() + 1);
	}

	proptest! {
		#![proptest_config(ProptestConfig::with_cases(50))]

		#[test]
		fn vocabulary_respects_target(
			words in prop::collection::vec("[a-d]{1,6}|<EOS>|<EOP>", 1..30),
			extra in 0..20usize,
		) {
			let document = words.join(" ");
			let mut trainer = trainer(&[document.as_str()]);
			let base = trainer.alphabet.len() + Marker::ALL.len();
			let target = base + extra;
			let (vocabulary, _) = trainer.learn(target);

			prop_assert!(vocabulary.len() <= target);
			for symbols in trainer.word_freqs.keys() {
				for symbol in symbols {
					prop_assert!(vocabulary.contains(symbol));
				}
			}
		}
	}
}
