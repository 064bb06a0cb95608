//! Trigram language model and story generation.
//!
//! This module provides:
//! - Count tables built once per corpus (`NGramCounts`, `ContextCounts`)
//! - Interpolation weights (`InterpolationWeights`)
//! - The interpolated trigram model with temperature sampling (`TrigramModel`)
//! - The generation loop and its lazy variant (`StoryGenerator`, `TokenStream`)
//! - Request / response contracts for callers (`GenerationRequest`, `GenerationResponse`)

/// High-level generation loop on top of a tokenizer and a trigram model.
///
/// Exposes eager generation, lazy token streaming and display cleanup.
pub mod generator;

/// Interpolated trigram model.
///
/// Handles training, probability estimation, temperature sampling and
/// snapshot persistence.
pub mod trigram_model;

/// Unigram / bigram / trigram count tables and their builder.
pub mod ngram_counts;

/// Next-token counts of a single context.
///
/// Tracks transitions and their total for maximum-likelihood estimates.
pub mod context_counts;

/// Validated interpolation weights.
pub mod weights;

/// Generation request and response structures.
///
/// Stores generation parameters (prefix, budget, temperature, seed) and
/// their bounds, plus the success / failure response shape.
pub mod generation_input;

pub use generation_input::{GenerationRequest, GenerationResponse};
pub use generator::{StoryGenerator, TokenStream};
pub use trigram_model::{ModelInfo, TrigramModel};
pub use weights::InterpolationWeights;
