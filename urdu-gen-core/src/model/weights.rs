use serde::{Deserialize, Serialize};

use crate::error::{GenError, Result};

/// Maximum distance of the weight sum from 1.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Linear interpolation weights for the unigram, bigram and trigram
/// estimates.
///
/// # Invariants
/// - Every weight is finite and non-negative
/// - The weights sum to 1 within `WEIGHT_SUM_TOLERANCE`
///
/// The invariant is checked once, at construction.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct InterpolationWeights {
	unigram: f64,
	bigram: f64,
	trigram: f64,
}

impl Default for InterpolationWeights {
	fn default() -> Self {
		Self { unigram: 0.1, bigram: 0.3, trigram: 0.6 }
	}
}

impl InterpolationWeights {
	/// Validates and creates a set of weights.
	///
	/// # Errors
	/// Returns `GenError::InvalidWeights` if a weight is negative or not
	/// finite, or if the weights do not sum to 1.
	pub fn new(unigram: f64, bigram: f64, trigram: f64) -> Result<Self> {
		let invalid = |reason: String| GenError::InvalidWeights { unigram, bigram, trigram, reason };

		if [unigram, bigram, trigram].iter().any(|w| !w.is_finite() || *w < 0.0) {
			return Err(invalid("weights must be finite and non-negative".to_owned()));
		}
		let sum = unigram + bigram + trigram;
		if (sum - 1.0).abs() >= WEIGHT_SUM_TOLERANCE {
			return Err(invalid(format!("weights must sum to 1.0, got {sum}")));
		}

		Ok(Self { unigram, bigram, trigram })
	}

	pub fn unigram(&self) -> f64 {
		self.unigram
	}

	pub fn bigram(&self) -> f64 {
		self.bigram
	}

	pub fn trigram(&self) -> f64 {
		self.trigram
	}

	/// `λ1·p_uni + λ2·p_bi + λ3·p_tri`
	pub fn combine(&self, p_unigram: f64, p_bigram: f64, p_trigram: f64) -> f64 {
		self.unigram * p_unigram + self.bigram * p_bigram + self.trigram * p_trigram
	}
}
