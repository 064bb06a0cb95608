//! Subword tokenization.
//!
//! - Reserved boundary markers and the typed `Token` (`token`)
//! - Merge table replay, segmentation and reconstruction (`bpe_tokenizer`)
//! - Vocabulary and merge learning (`bpe_trainer`)

/// Boundary markers, tokens and marker-aware word splitting.
pub mod token;

/// Tokenizer replaying a learned merge table.
pub mod bpe_tokenizer;

/// Frequency-weighted BPE training.
pub mod bpe_trainer;

pub use bpe_tokenizer::{BpeTokenizer, MergePair};
pub use bpe_trainer::{VocabularyTrainer, learn_vocabulary};
pub use token::{Marker, Token};
