use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::token::{Fragment, Marker, Token, split_fragments};
use crate::error::Result;

/// A learned merge rule: adjacent `(left, right)` becomes `left + right`.
pub type MergePair = (String, String);

/// Subword tokenizer replaying an ordered BPE merge table.
///
/// # Responsibilities
/// - Split text into marker atoms and subword pieces (`tokenize`)
/// - Rebuild text from tokens (`detokenize`)
/// - Load and save the vocabulary / merge artifacts
///
/// # Invariants
/// - The vocabulary always contains every reserved marker
/// - `merges` is in learned order and is never reordered
///
/// An empty merge table is valid: the tokenizer then segments every word
/// into single characters.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct BpeTokenizer {
	vocabulary: BTreeSet<String>,
	merges: Vec<MergePair>,
}

impl Default for BpeTokenizer {
	fn default() -> Self {
		Self::new(BTreeSet::new(), Vec::new())
	}
}

impl BpeTokenizer {
	/// Creates a tokenizer from a vocabulary and an ordered merge table.
	///
	/// Reserved markers are added to the vocabulary when missing.
	pub fn new(mut vocabulary: BTreeSet<String>, merges: Vec<MergePair>) -> Self {
		for marker in Marker::ALL {
			vocabulary.insert(marker.as_str().to_owned());
		}
		Self { vocabulary, merges }
	}

	/// Loads a tokenizer from `vocab.json` and `merges.txt` style files.
	///
	/// # Behavior
	/// - A missing or malformed vocabulary falls back to an empty one.
	/// - A missing merge file falls back to an empty merge table;
	///   malformed lines are skipped.
	/// - Both fallbacks are logged, never returned as errors: the result
	///   is at worst a characters-only tokenizer.
	pub fn load<PV, PM>(vocab_path: PV, merges_path: PM) -> Self
	where
		PV: AsRef<Path>,
		PM: AsRef<Path>,
	{
		let vocabulary = read_vocabulary(&vocab_path).unwrap_or_else(|e| {
			warn!("Vocabulary {} unavailable ({e}), using an empty vocabulary", vocab_path.as_ref().display());
			BTreeSet::new()
		});
		let merges = read_merges(&merges_path).unwrap_or_else(|e| {
			warn!("Merge table {} unavailable ({e}), using an empty merge table", merges_path.as_ref().display());
			Vec::new()
		});

		info!("Tokenizer loaded: {} symbols, {} merges", vocabulary.len(), merges.len());
		Self::new(vocabulary, merges)
	}

	/// Writes the vocabulary as a JSON array and the merges one pair per line.
	pub fn save<PV, PM>(&self, vocab_path: PV, merges_path: PM) -> Result<()>
	where
		PV: AsRef<Path>,
		PM: AsRef<Path>,
	{
		let mut vocab_file = BufWriter::new(File::create(vocab_path)?);
		serde_json::to_writer_pretty(&mut vocab_file, &self.vocabulary)?;
		vocab_file.flush()?;

		let mut merges_file = BufWriter::new(File::create(merges_path)?);
		for (left, right) in &self.merges {
			writeln!(merges_file, "{left} {right}")?;
		}
		merges_file.flush()?;
		Ok(())
	}

	pub fn vocabulary(&self) -> &BTreeSet<String> {
		&self.vocabulary
	}

	pub fn merges(&self) -> &[MergePair] {
		&self.merges
	}

	/// Splits `text` into tokens.
	///
	/// Each whitespace-delimited word is first split around markers; every
	/// text fragment is segmented by replaying the whole merge table in
	/// learned order. The first piece of each text fragment is tagged as a
	/// word start.
	pub fn tokenize(&self, text: &str) -> Vec<Token> {
		let mut tokens = Vec::new();
		for word in text.split_whitespace() {
			for fragment in split_fragments(word) {
				match fragment {
					Fragment::Marker(marker) => tokens.push(Token::Marker(marker)),
					Fragment::Text(text) => {
						let pieces = self.segment(text);
						tokens.extend(
							pieces
								.into_iter()
								.enumerate()
								.map(|(i, piece)| Token::piece(piece, i == 0)),
						);
					}
				}
			}
		}
		tokens
	}

	/// Segments a marker-free fragment into subword strings.
	pub fn segment(&self, fragment: &str) -> Vec<String> {
		let mut symbols: Vec<String> = fragment.chars().map(String::from).collect();
		for (left, right) in &self.merges {
			if symbols.len() < 2 {
				break;
			}
			merge_pair(&mut symbols, left, right);
		}
		symbols
	}

	/// Rebuilds text from tokens.
	///
	/// Markers are surrounded by single spaces, word-start pieces are
	/// preceded by one, continuation pieces are glued to the previous unit.
	/// Space runs are collapsed and the result is trimmed.
	pub fn detokenize(&self, tokens: &[Token]) -> String {
		let mut text = String::new();
		for token in tokens {
			match token {
				Token::Marker(marker) => {
					text.push(' ');
					text.push_str(marker.as_str());
					text.push(' ');
				}
				Token::Piece { text: piece, word_start } => {
					if *word_start {
						text.push(' ');
					}
					text.push_str(piece);
				}
			}
		}
		collapse_spaces(&text).trim().to_owned()
	}
}

/// Replaces every non-overlapping `(left, right)` occurrence, scanning
/// left to right, with the concatenation.
pub(crate) fn merge_pair(symbols: &mut Vec<String>, left: &str, right: &str) {
	let mut i = 0;
	while i + 1 < symbols.len() {
		if symbols[i] == left && symbols[i + 1] == right {
			let merged = symbols.remove(i + 1);
			symbols[i].push_str(&merged);
		}
		i += 1;
	}
}

/// Collapses runs of the space character into a single space.
pub(crate) fn collapse_spaces(text: &str) -> String {
	let mut out = String::with_capacity(text.len());
	let mut previous_space = false;
	for c in text.chars() {
		if c == ' ' {
			if !previous_space {
				out.push(c);
			}
			previous_space = true;
		} else {
			out.push(c);
			previous_space = false;
		}
	}
	out
}

fn read_vocabulary<P: AsRef<Path>>(path: P) -> Result<BTreeSet<String>> {
	let reader = BufReader::new(File::open(path)?);
	let symbols: Vec<String> = serde_json::from_reader(reader)?;
	Ok(symbols.into_iter().collect())
}

fn read_merges<P: AsRef<Path>>(path: P) -> Result<Vec<MergePair>> {
	let reader = BufReader::new(File::open(&path)?);
	let mut merges = Vec::new();
	for line in reader.lines() {
		let line = line?;
		let parts: Vec<&str> = line.trim().split(' ').collect();
		if let [left, right] = parts.as_slice() {
			if !left.is_empty() && !right.is_empty() {
				merges.push(((*left).to_owned(), (*right).to_owned()));
			}
		}
	}
	Ok(merges)
}
