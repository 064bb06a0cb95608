use std::ops::RangeInclusive;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::error::{GenError, Result};

/// Accepted range of `GenerationRequest::max_length`.
pub const MAX_LENGTH_RANGE: RangeInclusive<usize> = 1..=5000;

/// Accepted range of `GenerationRequest::temperature`.
pub const TEMPERATURE_RANGE: RangeInclusive<f64> = 0.1..=2.0;

/// Parameters of one generation, as received from a caller.
///
/// Missing fields take their defaults when deserialized: empty prefix,
/// 500 tokens, temperature 0.8, no seed.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct GenerationRequest {
	/// Starting text, may be empty.
	pub prefix: String,

	/// Maximum number of sampled tokens (the prefix is not counted).
	pub max_length: usize,

	/// Sampling temperature.
	pub temperature: f64,

	/// Seed making the generation reproducible. `None` draws from OS entropy.
	pub seed: Option<u64>,
}

impl Default for GenerationRequest {
	fn default() -> Self {
		Self {
			prefix: String::new(),
			max_length: 500,
			temperature: 0.8,
			seed: None,
		}
	}
}

impl GenerationRequest {
	pub fn new(prefix: impl Into<String>, max_length: usize, temperature: f64) -> Self {
		Self {
			prefix: prefix.into(),
			max_length,
			temperature,
			seed: None,
		}
	}

	pub fn with_seed(mut self, seed: u64) -> Self {
		self.seed = Some(seed);
		self
	}

	/// Checks the length and temperature bounds.
	///
	/// # Errors
	/// Returns `GenError::InvalidRequest` describing the first violated bound.
	pub fn validate(&self) -> Result<()> {
		if !MAX_LENGTH_RANGE.contains(&self.max_length) {
			return Err(GenError::InvalidRequest(format!(
				"max_length must be between {} and {}, got {}",
				MAX_LENGTH_RANGE.start(),
				MAX_LENGTH_RANGE.end(),
				self.max_length
			)));
		}
		if !TEMPERATURE_RANGE.contains(&self.temperature) {
			return Err(GenError::InvalidRequest(format!(
				"temperature must be between {} and {}, got {}",
				TEMPERATURE_RANGE.start(),
				TEMPERATURE_RANGE.end(),
				self.temperature
			)));
		}
		Ok(())
	}

	/// Random source for this request: seeded when `seed` is set.
	pub fn rng(&self) -> StdRng {
		match self.seed {
			Some(seed) => StdRng::seed_from_u64(seed),
			None => StdRng::from_os_rng(),
		}
	}
}

/// Outcome of a generation, as returned to a caller.
///
/// Serialized as `{"success": true, "story": ..., "prefix": ...}` or
/// `{"success": false, "prefix": ..., "error": ...}`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GenerationResponse {
	pub success: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub story: Option<String>,
	pub prefix: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

impl GenerationResponse {
	pub fn success(story: String, prefix: impl Into<String>) -> Self {
		Self {
			success: true,
			story: Some(story),
			prefix: prefix.into(),
			error: None,
		}
	}

	pub fn failure(prefix: impl Into<String>, error: impl ToString) -> Self {
		Self {
			success: false,
			story: None,
			prefix: prefix.into(),
			error: Some(error.to_string()),
		}
	}
}
