use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::tokenizer::Token;

/// Next-token counts observed after one context.
///
/// A `ContextCounts` is a node of the n-gram chain: outgoing edges are
/// the tokens seen after the context, weighted by their number of
/// observations. The context itself is the key under which the node is
/// stored (`NGramCounts`).
///
/// # Invariants
/// - `total` equals the sum of all transition counts
/// - Each transition count is strictly positive
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ContextCounts {
	/// Next token → number of observations.
	transitions: HashMap<Token, usize>,
	/// Number of observations of the context.
	total: usize,
}

impl ContextCounts {
	/// Records one occurrence of `next` after this context.
	pub(crate) fn add_transition(&mut self, next: &Token) {
		*self.transitions.entry(next.clone()).or_insert(0) += 1;
		self.total += 1;
	}

	/// Number of times `next` followed this context.
	pub fn count(&self, next: &Token) -> usize {
		self.transitions.get(next).copied().unwrap_or(0)
	}

	/// Number of times this context was observed.
	pub fn total(&self) -> usize {
		self.total
	}

	/// Maximum-likelihood estimate of `next` given this context.
	///
	/// Defined as 0 when the context was never observed.
	pub fn relative_frequency(&self, next: &Token) -> f64 {
		if self.total == 0 {
			return 0.0;
		}
		self.count(next) as f64 / self.total as f64
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn counts_and_frequencies() {
		let a = Token::piece("a", true);
		let b = Token::piece("b", false);
		let mut counts = ContextCounts::default();
		counts.add_transition(&a);
		counts.add_transition(&a);
		counts.add_transition(&b);

		assert_eq!(counts.total(), 3);
		assert_eq!(counts.count(&a), 2);
		assert!((counts.relative_frequency(&b) - 1.0 / 3.0).abs() < 1e-12);
		assert_eq!(counts.relative_frequency(&Token::piece("c", true)), 0.0);
	}

	#[test]
	fn unseen_context_has_zero_frequency() {
		assert_eq!(ContextCounts::default().relative_frequency(&Token::piece("a", true)), 0.0);
	}
}
