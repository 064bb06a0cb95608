use thiserror::Error;

/// Result alias used throughout the core crate.
pub type Result<T> = std::result::Result<T, GenError>;

/// Errors surfaced by the core crate.
///
/// Missing tokenizer or model artifacts are not errors: they degrade to
/// empty states (see `BpeTokenizer::load` and `StoryGeneratorApi::ensure_model`).
#[derive(Error, Debug)]
pub enum GenError {
	/// Interpolation weights are negative, non-finite or do not sum to 1.
	#[error("Invalid interpolation weights ({unigram}, {bigram}, {trigram}): {reason}")]
	InvalidWeights {
		unigram: f64,
		bigram: f64,
		trigram: f64,
		reason: String,
	},

	/// A generation request is outside its accepted bounds.
	#[error("Invalid request: {0}")]
	InvalidRequest(String),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	/// Model snapshot could not be encoded or decoded.
	#[error("Snapshot error: {0}")]
	Snapshot(#[from] postcard::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}
