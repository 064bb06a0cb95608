use std::fs;
use std::path::Path;

use log::{debug, info};
use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::prelude::IteratorRandom;
use serde::{Deserialize, Serialize};

use super::context_counts::ContextCounts;
use super::ngram_counts::{Context, NGramCounts, NGramCountsBuilder};
use super::weights::InterpolationWeights;
use crate::error::Result;
use crate::tokenizer::Token;

/// Label reported by `ModelInfo`.
pub const MODEL_TYPE: &str = "Trigram Language Model (MLE + Interpolation)";

/// Trigram language model with fixed linear interpolation.
///
/// # Responsibilities
/// - Count n-grams over tokenized documents (`fit`)
/// - Estimate `P(token | w-2, w-1)` by interpolating unigram, bigram and
///   trigram maximum-likelihood estimates
/// - Sample the next token under a temperature
/// - Save / load a binary snapshot
///
/// A trained model is immutable and can be shared read-only between
/// concurrent generations; all randomness comes from the caller.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TrigramModel {
	weights: InterpolationWeights,
	counts: NGramCounts,
}

/// Summary statistics of a model.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ModelInfo {
	pub model_type: String,
	pub vocabulary_size: usize,
	pub total_tokens: usize,
	pub interpolation_weights: WeightsInfo,
	pub is_trained: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct WeightsInfo {
	pub lambda1_unigram: f64,
	pub lambda2_bigram: f64,
	pub lambda3_trigram: f64,
}

impl TrigramModel {
	/// Creates an untrained model.
	pub fn new(weights: InterpolationWeights) -> Self {
		Self::from_counts(weights, NGramCounts::default())
	}

	pub fn from_counts(weights: InterpolationWeights, counts: NGramCounts) -> Self {
		Self { weights, counts }
	}

	/// Trains a model on already tokenized documents in a single pass.
	pub fn fit<D: AsRef<[Token]>>(weights: InterpolationWeights, documents: &[D]) -> Self {
		let mut builder = NGramCountsBuilder::new();
		for document in documents {
			builder.add_document(document.as_ref());
		}
		let model = Self::from_counts(weights, builder.build());
		info!(
			"Trigram model trained on {} documents: {} tokens, vocabulary {}",
			documents.len(),
			model.counts.total_unigrams(),
			model.counts.vocabulary_size()
		);
		model
	}

	pub fn weights(&self) -> &InterpolationWeights {
		&self.weights
	}

	pub fn counts(&self) -> &NGramCounts {
		&self.counts
	}

	pub fn is_trained(&self) -> bool {
		self.counts.total_unigrams() > 0
	}

	pub fn info(&self) -> ModelInfo {
		ModelInfo {
			model_type: MODEL_TYPE.to_owned(),
			vocabulary_size: self.counts.vocabulary_size(),
			total_tokens: self.counts.total_unigrams(),
			interpolation_weights: WeightsInfo {
				lambda1_unigram: self.weights.unigram(),
				lambda2_bigram: self.weights.bigram(),
				lambda3_trigram: self.weights.trigram(),
			},
			is_trained: self.is_trained(),
		}
	}

	/// Interpolated probability of `token` after `context`.
	///
	/// Each estimate is 0 when its context was never observed, so the
	/// result is 0 only when none of the three estimates has mass.
	pub fn probability(&self, context: &Context, token: &Token) -> f64 {
		let bigram = self.counts.bigram_context(&context.1);
		let trigram = self.counts.trigram_context(context);
		self.interpolate(bigram, trigram, token)
	}

	fn interpolate(&self, bigram: Option<&ContextCounts>, trigram: Option<&ContextCounts>, token: &Token) -> f64 {
		let p_unigram = self.counts.unigram_frequency(token);
		let p_bigram = bigram.map_or(0.0, |c| c.relative_frequency(token));
		let p_trigram = trigram.map_or(0.0, |c| c.relative_frequency(token));
		self.weights.combine(p_unigram, p_bigram, p_trigram).min(1.0)
	}

	/// Samples the next token after `context`.
	///
	/// # Behavior
	/// - Every vocabulary token is scored with `probability`; zero scores
	///   are discarded.
	/// - Surviving scores are reshaped to `p^(1/temperature)` and a token
	///   is drawn proportionally. Temperatures below 1 sharpen the
	///   distribution, above 1 flatten it.
	/// - If no token has mass, a token is drawn uniformly from the
	///   vocabulary.
	///
	/// Returns `None` only for a model with an empty vocabulary.
	pub fn sample_next<R: Rng + ?Sized>(&self, context: &Context, temperature: f64, rng: &mut R) -> Option<Token> {
		let bigram = self.counts.bigram_context(&context.1);
		let trigram = self.counts.trigram_context(context);

		let (candidates, probabilities): (Vec<&Token>, Vec<f64>) = self
			.counts
			.vocabulary()
			.map(|token| (token, self.interpolate(bigram, trigram, token)))
			.filter(|(_, p)| *p > 0.0)
			.unzip();

		if candidates.is_empty() {
			debug!("No probability mass after ({}, {}), sampling uniformly", context.0, context.1);
			return self.counts.vocabulary().choose(rng).cloned();
		}

		let weights = temperature_weights(&probabilities, temperature);
		let index = match WeightedIndex::new(&weights) {
			Ok(distribution) => distribution.sample(rng),
			// Unreachable with a finite maximum weight of 1, kept as a greedy fallback
			Err(_) => argmax(&probabilities),
		};
		Some(candidates[index].clone())
	}

	/// Writes a `postcard` snapshot of the whole model.
	pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
		if let Some(parent) = path.as_ref().parent() {
			if !parent.as_os_str().is_empty() {
				fs::create_dir_all(parent)?;
			}
		}
		let bytes = postcard::to_stdvec(self)?;
		fs::write(path, bytes)?;
		Ok(())
	}

	/// Reads a snapshot written by `save`.
	pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
		let bytes = fs::read(path)?;
		Ok(postcard::from_bytes(&bytes)?)
	}
}

/// Reshapes probabilities to `p^(1/temperature)`, scaled so the largest
/// weight is 1.
///
/// Computed as `exp((ln p - ln p_max) / temperature)`, which keeps the
/// mode at exactly 1 even when `p^(1/temperature)` would underflow.
/// A non-positive (or NaN) temperature is treated as the smallest
/// positive one, i.e. greedy selection.
fn temperature_weights(probabilities: &[f64], temperature: f64) -> Vec<f64> {
	let temperature = if temperature > 0.0 { temperature } else { f64::MIN_POSITIVE };
	let log_max = probabilities.iter().copied().fold(f64::NEG_INFINITY, f64::max).ln();
	probabilities
		.iter()
		.map(|p| ((p.ln() - log_max) / temperature).exp())
		.collect()
}

fn argmax(values: &[f64]) -> usize {
	values
		.iter()
		.enumerate()
		.max_by(|a, b| a.1.total_cmp(b.1))
		.map_or(0, |(i, _)| i)
}
