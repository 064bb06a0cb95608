//! Boundary between the core and its callers.
//!
//! `StoryGeneratorApi` loads (or trains) everything it needs from a
//! `GeneratorConfig` and answers generation requests with a
//! `GenerationResponse`; internal faults never cross this boundary as
//! anything else.

use log::{info, warn};
use rand::Rng;
use rand::rngs::StdRng;

use crate::config::GeneratorConfig;
use crate::error::Result;
use crate::io;
use crate::model::generation_input::{GenerationRequest, GenerationResponse};
use crate::model::generator::{StoryGenerator, TokenStream};
use crate::model::trigram_model::{ModelInfo, TrigramModel};
use crate::tokenizer::BpeTokenizer;

/// Generation facade shared read-only by callers.
#[derive(Clone, Debug)]
pub struct StoryGeneratorApi {
	generator: StoryGenerator,
}

impl StoryGeneratorApi {
	pub fn new(generator: StoryGenerator) -> Self {
		Self { generator }
	}

	/// Loads the tokenizer and the model described by `config`.
	///
	/// # Behavior
	/// - Tokenizer artifacts degrade to a characters-only tokenizer.
	/// - The model snapshot is loaded when present and readable.
	/// - Otherwise the model is trained on the corpus directory and the
	///   snapshot is written; a failed write is only logged.
	/// - Without any corpus document the model stays empty (untrained).
	///
	/// # Errors
	/// Only configuration errors (invalid interpolation weights) are
	/// returned, before anything is trained.
	pub fn ensure_model(config: &GeneratorConfig) -> Result<Self> {
		let weights = config.weights()?;
		let tokenizer = BpeTokenizer::load(&config.vocab_path, &config.merges_path);

		if config.model_path.exists() {
			match TrigramModel::load(&config.model_path) {
				Ok(model) => {
					info!("Model snapshot loaded from {}", config.model_path.display());
					return Ok(Self::new(StoryGenerator::new(tokenizer, model)));
				}
				Err(e) => warn!("Model snapshot {} unreadable ({e}), retraining", config.model_path.display()),
			}
		} else {
			info!("Model snapshot {} not found, training from {}", config.model_path.display(), config.corpus_dir.display());
		}

		let corpus = io::read_corpus(&config.corpus_dir).unwrap_or_else(|e| {
			warn!("Corpus directory {} unavailable: {e}", config.corpus_dir.display());
			Vec::new()
		});
		if corpus.is_empty() {
			warn!("No corpus documents found, starting with an empty model");
			return Ok(Self::new(StoryGenerator::new(tokenizer, TrigramModel::new(weights))));
		}

		let generator = StoryGenerator::train(tokenizer, weights, &corpus);
		match generator.model().save(&config.model_path) {
			Ok(()) => info!("Saved trained model to {}", config.model_path.display()),
			Err(e) => warn!("Failed to save model to {}: {e}", config.model_path.display()),
		}
		Ok(Self::new(generator))
	}

	pub fn generator(&self) -> &StoryGenerator {
		&self.generator
	}

	pub fn model_info(&self) -> ModelInfo {
		self.generator.model().info()
	}

	/// Answers `request` using the request's own random source.
	pub fn generate(&self, request: &GenerationRequest) -> GenerationResponse {
		let mut rng = request.rng();
		self.generate_with(request, &mut rng)
	}

	/// Answers `request` drawing from `rng` (the request seed is ignored).
	pub fn generate_with<R: Rng + ?Sized>(&self, request: &GenerationRequest, rng: &mut R) -> GenerationResponse {
		if let Err(e) = request.validate() {
			return GenerationResponse::failure(&request.prefix, e);
		}
		let story = self.generator.generate(&request.prefix, request.max_length, request.temperature, rng);
		GenerationResponse::success(story, &request.prefix)
	}

	/// Token stream for incremental delivery of `request`.
	///
	/// # Errors
	/// Returns `GenError::InvalidRequest` when the request is out of bounds.
	pub fn stream(&self, request: &GenerationRequest) -> Result<TokenStream<StdRng>> {
		request.validate()?;
		Ok(self.generator.stream(&request.prefix, request.max_length, request.temperature, request.rng()))
	}
}
