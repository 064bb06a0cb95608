use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use log::info;
use urdu_gen_core::model::generation_input::GenerationRequest;
use urdu_gen_core::model::generator::StoryGenerator;
use urdu_gen_core::tokenizer::{BpeTokenizer, VocabularyTrainer};
use urdu_gen_core::{GeneratorConfig, StoryGeneratorApi, read_corpus};

/// Train and run the Urdu story generator offline.
#[derive(Parser, Debug)]
#[command(name = "urdu-gen", version)]
struct Cli {
    /// Configuration file (defaults to the user configuration)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Learn the BPE vocabulary and merges from the corpus directory
    TrainTokenizer {
        /// Target vocabulary size, markers included
        #[arg(long)]
        vocab_size: Option<usize>,
    },
    /// Train the trigram model with the saved tokenizer and write the snapshot
    TrainModel,
    /// Generate a story, training the model first if no snapshot exists
    Generate {
        /// Text the story starts with
        #[arg(default_value = "")]
        prefix: String,
        #[arg(long, default_value_t = 500)]
        max_length: usize,
        #[arg(long, default_value_t = 0.8)]
        temperature: f64,
        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn create_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

fn train_tokenizer(config: &GeneratorConfig, vocab_size: usize) -> Result<(), Box<dyn std::error::Error>> {
    let corpus = read_corpus(&config.corpus_dir)?;
    let mut trainer = VocabularyTrainer::new();
    for document in &corpus {
        trainer.add_document(document);
    }
    info!("{} documents, {} distinct words", corpus.len(), trainer.distinct_words());

    let tokenizer = trainer.train(vocab_size);
    create_parent(&config.vocab_path)?;
    create_parent(&config.merges_path)?;
    tokenizer.save(&config.vocab_path, &config.merges_path)?;
    println!(
        "Tokenizer saved: {} symbols, {} merges ({}, {})",
        tokenizer.vocabulary().len(),
        tokenizer.merges().len(),
        config.vocab_path.display(),
        config.merges_path.display()
    );
    Ok(())
}

fn train_model(config: &GeneratorConfig) -> Result<(), Box<dyn std::error::Error>> {
    let weights = config.weights()?;
    let tokenizer = BpeTokenizer::load(&config.vocab_path, &config.merges_path);
    let corpus = read_corpus(&config.corpus_dir)?;
    if corpus.is_empty() {
        return Err(format!("no documents in {}", config.corpus_dir.display()).into());
    }

    let generator = StoryGenerator::train(tokenizer, weights, &corpus);
    generator.model().save(&config.model_path)?;
    let model_info = generator.model().info();
    println!(
        "Model saved to {}: {} distinct tokens, {} training tokens",
        config.model_path.display(),
        model_info.vocabulary_size,
        model_info.total_tokens
    );
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => GeneratorConfig::load_path(path),
        None => GeneratorConfig::load(),
    };

    match cli.command {
        Command::TrainTokenizer { vocab_size } => train_tokenizer(&config, vocab_size.unwrap_or(config.vocab_size)),
        Command::TrainModel => train_model(&config),
        Command::Generate { prefix, max_length, temperature, seed } => {
            let api = StoryGeneratorApi::ensure_model(&config)?;
            let mut request = GenerationRequest::new(prefix, max_length, temperature);
            request.seed = seed;

            let response = api.generate(&request);
            match (response.story, response.error) {
                (Some(story), _) => {
                    println!("{story}");
                    Ok(())
                }
                (None, error) => Err(error.unwrap_or_else(|| "generation failed".to_owned()).into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_defaults() {
        let cli = Cli::try_parse_from(["urdu-gen", "generate"]).unwrap();
        match cli.command {
            Command::Generate { prefix, max_length, temperature, seed } => {
                assert_eq!(prefix, "");
                assert_eq!(max_length, 500);
                assert_eq!(temperature, 0.8);
                assert_eq!(seed, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn global_config_after_subcommand() {
        let cli = Cli::try_parse_from(["urdu-gen", "train-tokenizer", "--vocab-size", "300", "--config", "gen.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("gen.toml")));
        assert!(matches!(cli.command, Command::TrainTokenizer { vocab_size: Some(300) }));
    }

    #[test]
    fn unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["urdu-gen", "serve"]).is_err());
    }
}
