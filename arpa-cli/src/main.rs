use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

mod commands;
mod output;
mod vocabulary;

use arpa_support::ModelConfig;
use commands::dump::Direction;
use commands::mix::Policy;
use output::{format_pretty, ModelSummary};
use vocabulary::Vocabulary;

#[derive(Parser)]
#[command(name = "arpa", about = "Train, prune, mix and convert ARPA back-off n-gram language models", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// ARPA or binary model file to summarise (shorthand with no subcommand).
    path: Option<PathBuf>,

    /// Emit the summary as JSON instead of a colored terminal report.
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Train a model from a plain-text corpus.
    Train(TrainArgs),

    /// Mix two trained models (spec §4.8: linear, backward, loglinear, bayes).
    Mix(MixArgs),

    /// Prune a trained model with an entropy threshold (spec §4.7).
    Prune(PruneArgs),

    /// Convert between ARPA text and the binary mirror (spec §4.9).
    Dump(DumpArgs),
}

#[derive(Args)]
struct TrainArgs {
    /// Corpus file or directory (one sentence per line).
    corpus: PathBuf,

    /// Destination ARPA text file.
    output: PathBuf,

    #[command(flatten)]
    config: ModelConfig,

    /// Discount family: good-turing, const, natural, add-smooth, witten-bell,
    /// kneser-ney, modified-kneser-ney.
    #[arg(long, default_value = "modified-kneser-ney")]
    discount: String,

    /// Delta/const parameter for const/add-smooth discounts.
    #[arg(long, default_value_t = 0.5)]
    delta: f64,
}

#[derive(Args)]
struct MixArgs {
    /// Primary model (mutated in place conceptually; output is separate).
    primary: PathBuf,

    /// Secondary model.
    secondary: PathBuf,

    /// Destination ARPA text file.
    output: PathBuf,

    /// Mixing policy: linear, backward, loglinear, bayes.
    #[arg(long, default_value = "linear")]
    policy: String,

    /// Weight assigned to `primary` (the complement goes to `secondary`).
    #[arg(long, default_value_t = 0.5)]
    lambda: f64,
}

#[derive(Args)]
struct PruneArgs {
    /// ARPA text file to prune.
    input: PathBuf,

    /// Destination ARPA text file.
    output: PathBuf,

    /// Perplexity-change threshold; higher prunes more aggressively.
    #[arg(long, default_value_t = 1.0)]
    theta: f64,

    /// Lowest n-gram order eligible for pruning (floored at 2).
    #[arg(long, default_value_t = 2)]
    min_gram: u8,
}

#[derive(Args)]
struct DumpArgs {
    /// Input model file.
    input: PathBuf,

    /// Output model file.
    output: PathBuf,

    /// Omit oc/dc counts from the binary mirror.
    #[arg(long)]
    arpa_only: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Train(a)) => {
            commands::train::run(&a.corpus, &a.output, &a.config, &a.discount, a.delta)
        }
        Some(Command::Mix(a)) => {
            let policy = Policy::parse(&a.policy)?;
            commands::mix::run(&a.primary, &a.secondary, &a.output, policy, a.lambda)
        }
        Some(Command::Prune(a)) => commands::prune::run(&a.input, &a.output, a.theta, a.min_gram),
        Some(Command::Dump(a)) => {
            let direction = commands::dump::direction_from_extension(&a.input);
            commands::dump::run(&a.input, &a.output, direction, a.arpa_only)
        }
        None => match cli.path {
            Some(path) => summarize(&path, cli.json),
            None => {
                eprintln!("usage: arpa <path> | arpa <train|mix|prune|dump> ...");
                Ok(())
            }
        },
    }
}

/// Bare-path default: load `path` (ARPA text, detected by extension) and
/// print a model summary, without requiring a subcommand.
fn summarize(path: &PathBuf, json: bool) -> Result<()> {
    let direction = commands::dump::direction_from_extension(path);
    if direction != Direction::ArpaToBinary {
        anyhow::bail!("cannot summarise a binary model without a word list; pass an .arpa file");
    }
    let mut vocab = Vocabulary::new();
    let text = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    vocab.prime_from_arpa(&text);
    let trie = arpa_core::from_arpa(&text, &vocab)?;
    let summary = ModelSummary::of(&trie);
    if json {
        println!("{}", output::format_json(&summary));
    } else {
        println!("{}", format_pretty(&summary));
    }
    Ok(())
}
