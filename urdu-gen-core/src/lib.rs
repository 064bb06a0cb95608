//! Urdu short-story generation library.
//!
//! This crate provides:
//! - A BPE subword tokenizer that keeps boundary markers atomic
//! - A trigram language model with linear interpolation
//! - Temperature-controlled story generation, eager or token by token
//! - A request / response facade for transports (HTTP server, CLI)
//!
//! All randomness is supplied by the caller, and trained models are
//! immutable, so one model can serve concurrent requests without locking.

/// Subword tokenization (training, segmentation, reconstruction).
pub mod tokenizer;

/// Trigram model and generation logic.
pub mod model;

/// Generation facade used by transports.
pub mod api;

/// Configuration file handling.
pub mod config;

/// Error types.
pub mod error;

/// Corpus I/O utilities.
///
/// Not exposed
pub(crate) mod io;

pub use api::StoryGeneratorApi;
pub use config::GeneratorConfig;
pub use error::{GenError, Result};

/// Reads every `.txt` document of `dir`, in name order.
///
/// Documents are trimmed and empty ones skipped.
pub fn read_corpus<P: AsRef<std::path::Path>>(dir: P) -> Result<Vec<String>> {
	Ok(io::read_corpus(dir)?)
}
