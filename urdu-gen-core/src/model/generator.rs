use std::iter::FusedIterator;
use std::sync::Arc;

use log::info;
use rand::Rng;

use super::ngram_counts::Context;
use super::trigram_model::TrigramModel;
use super::weights::InterpolationWeights;
use crate::tokenizer::bpe_tokenizer::collapse_spaces;
use crate::tokenizer::{BpeTokenizer, Marker, Token};

/// Story generator pairing a tokenizer with a trigram model.
///
/// # Responsibilities
/// - Tokenize the prefix and pad it with start markers
/// - Drive the sampling loop until the story-end marker or the token budget
/// - Turn the produced tokens into display text
///
/// Generation holds no mutable state: a single `StoryGenerator` can serve
/// any number of concurrent generations, each with its own random source.
/// The model is shared with every `TokenStream` handed out.
#[derive(Clone, Debug)]
pub struct StoryGenerator {
	tokenizer: BpeTokenizer,
	model: Arc<TrigramModel>,
}

impl StoryGenerator {
	pub fn new(tokenizer: BpeTokenizer, model: TrigramModel) -> Self {
		Self { tokenizer, model: Arc::new(model) }
	}

	/// Tokenizes `documents` with `tokenizer` and trains a model on them.
	pub fn train<S: AsRef<str>>(tokenizer: BpeTokenizer, weights: InterpolationWeights, documents: &[S]) -> Self {
		let tokenized: Vec<Vec<Token>> = documents.iter().map(|d| tokenizer.tokenize(d.as_ref())).collect();
		let model = TrigramModel::fit(weights, &tokenized);
		Self::new(tokenizer, model)
	}

	pub fn tokenizer(&self) -> &BpeTokenizer {
		&self.tokenizer
	}

	pub fn model(&self) -> &TrigramModel {
		&self.model
	}

	/// Generates a story and returns its display text.
	///
	/// At most `max_length` tokens are sampled after the prefix.
	pub fn generate<R: Rng + ?Sized>(&self, prefix: &str, max_length: usize, temperature: f64, rng: &mut R) -> String {
		let tokens: Vec<Token> = self.stream(prefix, max_length, temperature, rng).collect();
		info!("Generated {} tokens from a {}-char prefix", tokens.len(), prefix.chars().count());
		self.render(&tokens)
	}

	/// Lazy variant of `generate`.
	///
	/// The returned iterator first yields the prefix tokens, then one
	/// sampled token per call. It stops after the story-end marker or once
	/// `max_length` tokens were sampled. Dropping it early is the only
	/// cancellation needed.
	///
	/// The stream owns a handle on the model, so it can outlive `self`.
	pub fn stream<R: Rng>(&self, prefix: &str, max_length: usize, temperature: f64, rng: R) -> TokenStream<R> {
		let start = Token::Marker(Marker::Start);
		TokenStream {
			model: Arc::clone(&self.model),
			rng,
			prefix: self.tokenizer.tokenize(prefix).into_iter(),
			context: (start.clone(), start),
			remaining: max_length,
			temperature,
			state: GenerationState::AwaitingContext,
		}
	}

	/// Turns generated tokens into display text.
	///
	/// The tokens are detokenized, then sentence ends become a space,
	/// paragraph ends a blank line, and story ends disappear. Space runs
	/// and runs of blank lines are collapsed.
	pub fn render(&self, tokens: &[Token]) -> String {
		let mut text = self.tokenizer.detokenize(tokens);
		for marker in Marker::ALL {
			text = text.replace(marker.as_str(), display_form(marker));
		}
		clean_display(&text)
	}
}

/// Display text of a marker.
fn display_form(marker: Marker) -> &'static str {
	match marker {
		Marker::SentenceEnd => " ",
		Marker::ParagraphEnd => "\n\n",
		Marker::StoryEnd | Marker::Start => "",
	}
}

/// Raw display fragment of a single streamed token.
///
/// Concatenating the fragments of a token sequence and passing the result
/// through `clean_display` gives the same text as `StoryGenerator::render`.
pub fn display_fragment(token: &Token) -> String {
	match token {
		Token::Marker(marker) => format!(" {} ", display_form(*marker)),
		Token::Piece { text, word_start: true } => format!(" {text}"),
		Token::Piece { text, word_start: false } => text.clone(),
	}
}

/// Collapses space runs, strips spaces around line breaks, limits line
/// break runs to one blank line and trims the text.
pub fn clean_display(text: &str) -> String {
	let collapsed = collapse_spaces(text);
	let lines: Vec<&str> = collapsed.split('\n').map(str::trim).collect();

	let mut out = String::with_capacity(collapsed.len());
	let mut newlines = 0;
	for (i, line) in lines.iter().enumerate() {
		if i > 0 {
			newlines += 1;
			if newlines <= 2 {
				out.push('\n');
			}
		}
		if !line.is_empty() {
			out.push_str(line);
			newlines = 0;
		}
	}
	out.trim().to_owned()
}

/// Generation states.
///
/// `AwaitingContext` replays the prefix into the context window,
/// `Sampling` draws one token per step, `Terminated` is reached on the
/// story-end marker or when the budget is spent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GenerationState {
	AwaitingContext,
	Sampling,
	Terminated,
}

/// Iterator over the tokens of one generation.
///
/// Created by `StoryGenerator::stream`.
pub struct TokenStream<R: Rng> {
	model: Arc<TrigramModel>,
	rng: R,
	prefix: std::vec::IntoIter<Token>,
	context: Context,
	remaining: usize,
	temperature: f64,
	state: GenerationState,
}

impl<R: Rng> TokenStream<R> {
	pub fn state(&self) -> GenerationState {
		self.state
	}

	fn push_context(&mut self, token: &Token) {
		let previous = std::mem::replace(&mut self.context.1, token.clone());
		self.context.0 = previous;
	}
}

impl<R: Rng> Iterator for TokenStream<R> {
	type Item = Token;

	fn next(&mut self) -> Option<Token> {
		loop {
			match self.state {
				GenerationState::AwaitingContext => match self.prefix.next() {
					Some(token) => {
						self.push_context(&token);
						return Some(token);
					}
					None => self.state = GenerationState::Sampling,
				},
				GenerationState::Sampling => {
					if self.remaining == 0 {
						self.state = GenerationState::Terminated;
						continue;
					}
					let Some(token) = self.model.sample_next(&self.context, self.temperature, &mut self.rng) else {
						// Empty vocabulary
						self.state = GenerationState::Terminated;
						continue;
					};
					self.remaining -= 1;
					if token.is_marker(Marker::StoryEnd) {
						self.state = GenerationState::Terminated;
					}
					self.push_context(&token);
					return Some(token);
				}
				GenerationState::Terminated => return None,
			}
		}
	}
}

impl<R: Rng> FusedIterator for TokenStream<R> {}
