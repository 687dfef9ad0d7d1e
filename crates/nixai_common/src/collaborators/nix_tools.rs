//! Process-backed tool executor.
//!
//! Runs the local Nix tooling. A binary that cannot be spawned is
//! `Unavailable`; a clean non-zero exit is a decisive negative answer.
//! Children are killed when the calling future is dropped, so a deadline
//! in [`crate::context::CallContext`] also stops the process.

use super::{OptionCheck, PackageCheck, SyntaxCheck, ToolExecutor};
use crate::config::ToolsConfig;
use crate::error::CollaboratorError;
use async_trait::async_trait;
use std::process::{Output, Stdio};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

const EXPERIMENTAL_FEATURES: &[&str] = &["--extra-experimental-features", "nix-command flakes"];

/// Tool executor that shells out to nix, nix-instantiate, nixos-option, which
#[derive(Debug, Clone, Default)]
pub struct NixToolExecutor {
    tools: ToolsConfig,
}

impl NixToolExecutor {
    pub fn new(tools: ToolsConfig) -> Self {
        Self { tools }
    }

    async fn run(&self, program: &str, args: &[&str], stdin: Option<&str>) -> Result<Output, CollaboratorError> {
        debug!(program, ?args, "running tool check");
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command
            .spawn()
            .map_err(|e| CollaboratorError::Unavailable(format!("{}: {}", program, e)))?;

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(input.as_bytes()).await?;
            // Close stdin so the tool sees EOF
            drop(pipe);
        }

        Ok(child.wait_with_output().await?)
    }
}

fn stderr_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}

fn stdout_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Parse `nix search --json` output into a package check
pub(crate) fn parse_nix_search(json: &str) -> Result<PackageCheck, CollaboratorError> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    let entries = value
        .as_object()
        .ok_or_else(|| CollaboratorError::Malformed("nix search output is not an object".to_string()))?;

    Ok(match entries.iter().next() {
        Some((attr, meta)) => PackageCheck {
            exists: true,
            attr: Some(attr.clone()),
            version: meta.get("version").and_then(|v| v.as_str()).map(String::from),
            description: meta.get("description").and_then(|v| v.as_str()).map(String::from),
        },
        None => PackageCheck::missing(),
    })
}

/// Parse `nix-env -qaP` output ("attr  name-version" per line)
pub(crate) fn parse_nix_env_query(output: &str, name: &str) -> PackageCheck {
    output
        .lines()
        .filter_map(|line| {
            let mut cols = line.split_whitespace();
            Some((cols.next()?, cols.next().unwrap_or("")))
        })
        .find(|(attr, _)| attr.rsplit('.').next() == Some(name))
        .map(|(attr, name_version)| PackageCheck {
            exists: true,
            attr: Some(attr.to_string()),
            version: name_version
                .strip_prefix(name)
                .map(|v| v.trim_start_matches('-').to_string())
                .filter(|v| !v.is_empty()),
            description: None,
        })
        .unwrap_or_else(PackageCheck::missing)
}

/// Parse `nixos-option` output for Type: and Default: lines
pub(crate) fn parse_nixos_option(output: &str) -> OptionCheck {
    let lower = output.to_lowercase();
    if lower.contains("does not exist") || lower.starts_with("error") {
        return OptionCheck::default();
    }

    let lines: Vec<&str> = output.lines().map(str::trim).collect();
    // Values sit either after the label or on the following line
    let field = |label: &str| -> Option<String> {
        let idx = lines.iter().position(|l| l.starts_with(label))?;
        let inline = lines[idx][label.len()..].trim();
        if !inline.is_empty() {
            return Some(inline.to_string());
        }
        lines
            .get(idx + 1)
            .map(|l| l.to_string())
            .filter(|l| !l.is_empty())
    };

    OptionCheck {
        valid: true,
        option_type: field("Type:"),
        default: field("Default:"),
    }
}

#[async_trait]
impl ToolExecutor for NixToolExecutor {
    async fn check_syntax(&self, expr: &str) -> Result<SyntaxCheck, CollaboratorError> {
        let output = self
            .run(&self.tools.nix_instantiate, &["--parse", "-"], Some(expr))
            .await?;
        if output.status.success() {
            Ok(SyntaxCheck::valid())
        } else {
            Ok(SyntaxCheck::invalid(stderr_text(&output)))
        }
    }

    async fn check_package(&self, name: &str) -> Result<PackageCheck, CollaboratorError> {
        let pattern = format!("^{}$", name);
        let mut args: Vec<&str> = EXPERIMENTAL_FEATURES.to_vec();
        args.extend(["search", "nixpkgs", pattern.as_str(), "--json"]);
        let output = self.run(&self.tools.nix, &args, None).await?;

        if output.status.success() {
            return parse_nix_search(&stdout_text(&output));
        }
        let stderr = stderr_text(&output);
        if stderr.contains("no results") {
            Ok(PackageCheck::missing())
        } else {
            Err(CollaboratorError::Unavailable(format!("nix search failed: {}", stderr)))
        }
    }

    async fn find_package_fallback(&self, name: &str) -> Result<PackageCheck, CollaboratorError> {
        let output = self.run(&self.tools.nix_env, &["-qaP", name], None).await?;
        if output.status.success() {
            return Ok(parse_nix_env_query(&stdout_text(&output), name));
        }
        let stderr = stderr_text(&output);
        if stderr.contains("matches no derivations") {
            Ok(PackageCheck::missing())
        } else {
            Err(CollaboratorError::Unavailable(format!("nix-env query failed: {}", stderr)))
        }
    }

    async fn check_option(&self, path: &str) -> Result<OptionCheck, CollaboratorError> {
        let output = self.run(&self.tools.nixos_option, &[path], None).await?;
        if !output.status.success() {
            return Ok(OptionCheck::default());
        }
        Ok(parse_nixos_option(&stdout_text(&output)))
    }

    async fn check_command(&self, binary: &str) -> Result<bool, CollaboratorError> {
        let output = self.run(&self.tools.which, &[binary], None).await?;
        Ok(output.status.success())
    }

    async fn check_flake(&self, source: &str) -> Result<SyntaxCheck, CollaboratorError> {
        let dir = tempfile::Builder::new().prefix("nixai-flake-").tempdir()?;
        tokio::fs::write(dir.path().join("flake.nix"), source).await?;
        let dir_arg = dir.path().to_string_lossy().to_string();

        let mut args: Vec<&str> = EXPERIMENTAL_FEATURES.to_vec();
        args.extend(["flake", "check", dir_arg.as_str(), "--no-build"]);
        let output = self.run(&self.tools.nix, &args, None).await?;
        if output.status.success() {
            Ok(SyntaxCheck::valid())
        } else {
            Ok(SyntaxCheck::invalid(stderr_text(&output)))
        }
    }
}
