//! NixAI Control - validate assistant answers about NixOS
//!
//! Wires the local Nix tooling, the NixOS wiki and search.nixos.org into
//! the validator and prints the verdict.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

// Version is embedded at build time
const VERSION: &str = env!("NIXAI_VERSION");

#[derive(Parser)]
#[command(name = "nixaictl")]
#[command(about = "NixAI - validate answers about NixOS before you apply them", long_about = None)]
#[command(version = VERSION)]
struct Cli {
    /// Config file (default: XDG config, then /etc/nixai/validator.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Where the answer text comes from; stdin when neither is given
#[derive(Args, Debug)]
pub struct AnswerSource {
    /// Answer text
    #[arg(long, conflicts_with = "answer_file")]
    answer: Option<String>,

    /// Read the answer from a file
    #[arg(long)]
    answer_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full validation pipeline on an answer
    Validate {
        #[arg(long)]
        question: String,

        #[command(flatten)]
        source: AnswerSource,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,

        /// Skip Nix tooling and network lookups
        #[arg(long)]
        offline: bool,
    },

    /// Run only the static NixOS and flake pattern checks
    CheckPatterns {
        #[command(flatten)]
        source: AnswerSource,

        #[arg(long)]
        json: bool,
    },

    /// Check what the documentation says about a question
    Precheck {
        #[arg(long)]
        question: String,

        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Validate {
            question,
            source,
            json,
            offline,
        } => commands::validate(config, &question, &source, json, offline).await,
        Commands::CheckPatterns { source, json } => commands::check_patterns(&source, json),
        Commands::Precheck { question, json } => commands::precheck(config, &question, json).await,
    }
}
