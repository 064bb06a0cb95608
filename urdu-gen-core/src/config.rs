use std::path::{Path, PathBuf};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::weights::InterpolationWeights;

/// Application name used by `confy` to locate the configuration file.
pub const APP_NAME: &str = "urdu-gen";

/// Paths, training parameters and server settings.
///
/// Every field has a default, so a partial configuration file is valid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeneratorConfig {
	/// Directory of cleaned `.txt` documents used when no snapshot exists.
	pub corpus_dir: PathBuf,
	pub vocab_path: PathBuf,
	pub merges_path: PathBuf,
	/// Binary model snapshot.
	pub model_path: PathBuf,
	/// Target vocabulary size when learning the tokenizer.
	pub vocab_size: usize,
	pub lambda1: f64,
	pub lambda2: f64,
	pub lambda3: f64,
	pub host: String,
	pub port: u16,
}

impl Default for GeneratorConfig {
	fn default() -> Self {
		let weights = InterpolationWeights::default();
		Self {
			corpus_dir: PathBuf::from("data/corpus"),
			vocab_path: PathBuf::from("data/tokenizer/vocab.json"),
			merges_path: PathBuf::from("data/tokenizer/merges.txt"),
			model_path: PathBuf::from("data/trigram_model.bin"),
			vocab_size: 2000,
			lambda1: weights.unigram(),
			lambda2: weights.bigram(),
			lambda3: weights.trigram(),
			host: "127.0.0.1".to_owned(),
			port: 5000,
		}
	}
}

impl GeneratorConfig {
	/// Loads the user configuration, falling back to defaults.
	pub fn load() -> Self {
		match confy::load(APP_NAME, Some("config")) {
			Ok(config) => config,
			Err(err) => {
				warn!("Failed to load config, using defaults: {err}");
				Self::default()
			}
		}
	}

	/// Loads the configuration stored at `path`, falling back to defaults.
	///
	/// A missing file is created with the default values.
	pub fn load_path<P: AsRef<Path>>(path: P) -> Self {
		match confy::load_path(path.as_ref()) {
			Ok(config) => config,
			Err(err) => {
				warn!("Failed to load config {}, using defaults: {err}", path.as_ref().display());
				Self::default()
			}
		}
	}

	/// Validated interpolation weights.
	///
	/// # Errors
	/// Returns `GenError::InvalidWeights` when the configured weights are invalid.
	pub fn weights(&self) -> Result<InterpolationWeights> {
		InterpolationWeights::new(self.lambda1, self.lambda2, self.lambda3)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_weights_are_valid() {
		assert_eq!(GeneratorConfig::default().weights().unwrap(), InterpolationWeights::default());
	}

	#[test]
	fn invalid_weights_are_rejected() {
		let config = GeneratorConfig { lambda1: 0.2, ..GeneratorConfig::default() };
		assert!(config.weights().is_err());
	}

	#[test]
	fn load_path_reads_partial_files() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("config.toml");
		std::fs::write(&path, "port = 8080\nvocab_size = 300\n").unwrap();

		let config = GeneratorConfig::load_path(&path);
		assert_eq!(config.port, 8080);
		assert_eq!(config.vocab_size, 300);
		assert_eq!(config.host, "127.0.0.1");
	}
}
