//! Command handlers for nixaictl.

use crate::AnswerSource;
use anyhow::{bail, Context, Result};
use nixai_common::collaborators::{NixToolExecutor, NixosWikiClient, SearchNixosClient};
use nixai_common::format;
use nixai_common::{EnhancedValidator, QualityLevel, ValidatorConfig};
use owo_colors::OwoColorize;
use std::io::{self, IsTerminal, Read};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::warn;

pub fn load_config(path: Option<&Path>) -> Result<ValidatorConfig> {
    match path {
        Some(path) => ValidatorConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(ValidatorConfig::load_or_default()),
    }
}

fn read_answer(source: &AnswerSource) -> Result<String> {
    if let Some(answer) = &source.answer {
        return Ok(answer.clone());
    }
    if let Some(path) = &source.answer_file {
        return std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read answer from {}", path.display()));
    }
    if io::stdin().is_terminal() {
        bail!("No answer given: use --answer, --answer-file or pipe it on stdin");
    }
    let mut answer = String::new();
    io::stdin()
        .read_to_string(&mut answer)
        .context("Failed to read answer from stdin")?;
    Ok(answer)
}

/// Validator with every collaborator that could be constructed
fn online_validator(config: ValidatorConfig) -> EnhancedValidator {
    let per_call = config.timeouts.per_call();
    let mut builder = EnhancedValidator::builder()
        .instance("nixaictl")
        .tools(Arc::new(NixToolExecutor::new(config.tools.clone())));

    match NixosWikiClient::new(&config.wiki, per_call) {
        Ok(wiki) => builder = builder.search(Arc::new(wiki)),
        Err(e) => warn!("Wiki search disabled: {}", e),
    }
    match SearchNixosClient::new(config.search.clone(), per_call) {
        Ok(search) => builder = builder.source_verifier(Arc::new(search)),
        Err(e) => warn!("search.nixos.org verification disabled: {}", e),
    }
    builder.config(config).build()
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn colored_quality_line(level: QualityLevel, line: &str) -> String {
    match level {
        QualityLevel::Excellent => line.green().bold().to_string(),
        QualityLevel::Good => line.cyan().bold().to_string(),
        QualityLevel::Fair => line.yellow().bold().to_string(),
        QualityLevel::Poor => line.red().bold().to_string(),
    }
}

pub async fn validate(
    config: ValidatorConfig,
    question: &str,
    source: &AnswerSource,
    json: bool,
    offline: bool,
) -> Result<ExitCode> {
    let answer = read_answer(source)?;
    let validator = if offline {
        EnhancedValidator::offline(config)
    } else {
        online_validator(config)
    };

    let result = validator.validate(question, &answer).await;

    if json {
        print_json(&result)?;
    } else {
        let text = format::render(&result);
        let quality = format::quality_line(&result);
        let body = text.strip_prefix(quality.as_str()).unwrap_or(&text);
        if io::stdout().is_terminal() {
            print!("{}{}", colored_quality_line(result.quality_level, &quality), body);
        } else {
            print!("{}", text);
        }
    }

    Ok(if result.quality_level == QualityLevel::Poor {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    })
}

pub fn check_patterns(source: &AnswerSource, json: bool) -> Result<ExitCode> {
    let answer = read_answer(source)?;
    let validator = EnhancedValidator::offline(ValidatorConfig::default());
    let (nixos, flake) = validator.check_patterns(&answer);

    if json {
        print_json(&serde_json::json!({ "nixos": nixos, "flake": flake }))?;
    } else if nixos.is_none() && flake.is_none() {
        println!("No NixOS or flake content found");
    } else {
        for result in nixos.iter().chain(flake.iter()) {
            print!("{}", format::render_pattern_result(result));
        }
    }

    let valid = nixos.iter().chain(flake.iter()).all(|r| r.is_valid);
    Ok(if valid { ExitCode::SUCCESS } else { ExitCode::from(1) })
}

pub async fn precheck(config: ValidatorConfig, question: &str, json: bool) -> Result<ExitCode> {
    let per_call = config.timeouts.per_call();
    let wiki = NixosWikiClient::new(&config.wiki, per_call).context("Failed to set up wiki search")?;
    let validator = EnhancedValidator::builder()
        .instance("nixaictl")
        .search(Arc::new(wiki))
        .config(config)
        .build();
    let ctx = validator.call_context();

    let Some(result) = validator
        .validate_question(&ctx, question)
        .await
        .context("Pre-check failed")?
    else {
        bail!("Pre-check needs wiki search");
    };

    if json {
        print_json(&result)?;
    } else {
        print!("{}", format::render_precheck(&result));
    }
    Ok(ExitCode::SUCCESS)
}
