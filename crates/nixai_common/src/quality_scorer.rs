//! Automated Quality Scorer
//!
//! Scores an answer out of 100 across five capped categories:
//! - syntax (30): parse checks of fenced Nix blocks, +5 for a passing flake
//! - package (25): existence of every package the answer names
//! - option (25): validity of every NixOS option the answer assigns
//! - command (10): presence of every binary the answer tells you to run
//! - structure (10): idioms of a well-formed NixOS answer
//!
//! A check that errors or times out is unverified: it stays in the
//! denominator but earns nothing, and scoring always completes.

use crate::collaborators::ToolExecutor;
use crate::context::CallContext;
use crate::error::CollaboratorError;
use crate::extract;
use crate::types::{Severity, ValidationIssue};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use tracing::{debug, warn};

pub const SCORER_NAME: &str = "automated-quality-scorer";
/// Source label for the scorer's tool checks
pub const NIX_TOOLS_SOURCE: &str = "nix-tools";
/// Source label for option checks
pub const NIXOS_OPTION_SOURCE: &str = "nixos-option";

pub const SYNTAX_CAP: u32 = 30;
pub const PACKAGE_CAP: u32 = 25;
pub const OPTION_CAP: u32 = 25;
pub const COMMAND_CAP: u32 = 10;
pub const STRUCTURE_CAP: u32 = 10;

const FLAKE_BONUS: u32 = 5;
const STRUCTURE_STEP: u32 = 2;

static WITH_PKGS_LIST: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"with\s+pkgs;\s*\[").ok());

// ============================================================================
// Result Types
// ============================================================================

/// Outcome of one collaborator check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum CheckOutcome {
    Verified,
    Refuted,
    /// Call failed or timed out; carries the error code
    Unverified(String),
}

impl CheckOutcome {
    pub fn is_verified(&self) -> bool {
        matches!(self, CheckOutcome::Verified)
    }

    pub fn is_refuted(&self) -> bool {
        matches!(self, CheckOutcome::Refuted)
    }

    pub fn is_decisive(&self) -> bool {
        !matches!(self, CheckOutcome::Unverified(_))
    }

    fn from_error(err: &CollaboratorError) -> Self {
        CheckOutcome::Unverified(err.code().to_string())
    }
}

/// One checked item and what the tool said about it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemCheck {
    pub subject: String,
    pub outcome: CheckOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ItemCheck {
    fn new(subject: impl Into<String>, outcome: CheckOutcome) -> Self {
        Self {
            subject: subject.into(),
            outcome,
            detail: None,
        }
    }

    fn with_detail(mut self, detail: Option<String>) -> Self {
        self.detail = detail.filter(|d| !d.is_empty());
        self
    }
}

/// Points per category; the sum is the overall score
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub syntax: u32,
    pub package: u32,
    pub option: u32,
    pub command: u32,
    pub structure: u32,
}

impl ScoreBreakdown {
    pub fn total(&self) -> u32 {
        self.syntax + self.package + self.option + self.command + self.structure
    }
}

/// Tool-level view of the scorer's checks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolValidationSummary {
    pub successful_checks: Vec<String>,
    pub failed_checks: Vec<String>,
    pub unverified_checks: Vec<String>,
    /// successful / decisive, or `None` when nothing was decided
    pub confidence: Option<f64>,
}

impl ToolValidationSummary {
    pub fn decisive_checks(&self) -> usize {
        self.successful_checks.len() + self.failed_checks.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomatedQualityScore {
    pub overall_score: u32,
    pub breakdown: ScoreBreakdown,
    pub syntax_checks: Vec<ItemCheck>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flake_check: Option<ItemCheck>,
    pub package_checks: Vec<ItemCheck>,
    pub option_checks: Vec<ItemCheck>,
    pub command_checks: Vec<ItemCheck>,
    pub issues: Vec<ValidationIssue>,
    pub recommendations: Vec<String>,
    /// Executor operations issued, in order
    pub commands_run: Vec<String>,
}

impl AutomatedQualityScore {
    fn new() -> Self {
        Self {
            overall_score: 0,
            breakdown: ScoreBreakdown::default(),
            syntax_checks: Vec::new(),
            flake_check: None,
            package_checks: Vec::new(),
            option_checks: Vec::new(),
            command_checks: Vec::new(),
            issues: Vec::new(),
            recommendations: Vec::new(),
            commands_run: Vec::new(),
        }
    }

    pub fn package_outcome(&self, name: &str) -> Option<&CheckOutcome> {
        self.package_checks.iter().find(|c| c.subject == name).map(|c| &c.outcome)
    }

    pub fn option_outcome(&self, path: &str) -> Option<&CheckOutcome> {
        self.option_checks.iter().find(|c| c.subject == path).map(|c| &c.outcome)
    }

    pub fn command_outcome(&self, binary: &str) -> Option<&CheckOutcome> {
        self.command_checks
            .iter()
            .find(|c| extract::command_binary(&c.subject) == binary)
            .map(|c| &c.outcome)
    }

    pub fn has_critical_issue(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Critical)
    }

    /// Successful/failed check labels in `kind:subject` form
    pub fn tool_summary(&self) -> ToolValidationSummary {
        let mut summary = ToolValidationSummary::default();
        let mut file = |label: String, outcome: &CheckOutcome| match outcome {
            CheckOutcome::Verified => summary.successful_checks.push(label),
            CheckOutcome::Refuted => summary.failed_checks.push(label),
            CheckOutcome::Unverified(_) => summary.unverified_checks.push(label),
        };

        for check in &self.syntax_checks {
            let label = if check.outcome.is_refuted() { "syntax:invalid" } else { "syntax:valid" };
            file(label.to_string(), &check.outcome);
        }
        if let Some(check) = &self.flake_check {
            file("flake:structure".to_string(), &check.outcome);
        }
        for check in &self.package_checks {
            file(format!("package:{}", check.subject), &check.outcome);
        }
        for check in &self.option_checks {
            file(format!("option:{}", check.subject), &check.outcome);
        }
        for check in &self.command_checks {
            file(format!("command:{}", check.subject), &check.outcome);
        }

        let decisive = summary.decisive_checks();
        summary.confidence = if decisive == 0 {
            None
        } else {
            Some(summary.successful_checks.len() as f64 / decisive as f64)
        };
        summary
    }
}

// ============================================================================
// Scorer
// ============================================================================

fn ratio_points(checks: &[ItemCheck], cap: u32) -> u32 {
    if checks.is_empty() {
        return 0;
    }
    let verified = checks.iter().filter(|c| c.outcome.is_verified()).count();
    ((cap as f64) * verified as f64 / checks.len() as f64).round() as u32
}

fn issue(issue_type: &str, severity: Severity, message: String, suggestion: String) -> ValidationIssue {
    ValidationIssue::new(issue_type, severity, message, suggestion, SCORER_NAME)
}

fn unverified_issue(category: &str, checks: &[ItemCheck]) -> Option<ValidationIssue> {
    let skipped: Vec<&str> = checks
        .iter()
        .filter(|c| !c.outcome.is_decisive())
        .map(|c| c.subject.as_str())
        .collect();
    if skipped.is_empty() {
        return None;
    }
    Some(issue(
        "unverified",
        Severity::Low,
        format!("Could not verify {}: {}", category, skipped.join(", ")),
        "Verify these manually; the checking tool was unavailable or timed out".to_string(),
    ))
}

/// Scores answers using an injected tool executor
pub struct AutomatedQualityScorer {
    tools: Arc<dyn ToolExecutor>,
}

impl AutomatedQualityScorer {
    pub fn new(tools: Arc<dyn ToolExecutor>) -> Self {
        Self { tools }
    }

    pub async fn score(&self, ctx: &CallContext, _question: &str, answer: &str) -> AutomatedQualityScore {
        let mut result = AutomatedQualityScore::new();

        result.breakdown.syntax = self.score_syntax(ctx, answer, &mut result).await;
        result.breakdown.package = self.score_packages(ctx, answer, &mut result).await;
        result.breakdown.option = self.score_options(ctx, answer, &mut result).await;
        result.breakdown.command = self.score_commands(ctx, answer, &mut result).await;
        result.breakdown.structure = score_structure(answer);
        result.overall_score = result.breakdown.total();
        result.recommendations = recommendations(&result.breakdown, result.overall_score);

        debug!(
            overall = result.overall_score,
            syntax = result.breakdown.syntax,
            package = result.breakdown.package,
            option = result.breakdown.option,
            command = result.breakdown.command,
            structure = result.breakdown.structure,
            "automated score"
        );
        result
    }

    async fn score_syntax(&self, ctx: &CallContext, answer: &str, result: &mut AutomatedQualityScore) -> u32 {
        let expressions = extract::nix_expressions(answer);
        if expressions.is_empty() {
            // Descriptive answers are not necessarily wrong
            return if answer.len() > 50 { 15 } else { 5 };
        }

        for expr in &expressions {
            result.commands_run.push("check_syntax".to_string());
            let check = match ctx.run("check_syntax", self.tools.check_syntax(expr)).await {
                Ok(check) if check.valid => ItemCheck::new("expression", CheckOutcome::Verified),
                Ok(check) => {
                    result.issues.push(issue(
                        "syntax",
                        Severity::High,
                        format!("Nix syntax error: {}", check.diagnostics),
                        "Check for missing semicolons, braces, or syntax errors".to_string(),
                    ));
                    ItemCheck::new("expression", CheckOutcome::Refuted).with_detail(Some(check.diagnostics))
                }
                Err(e) => {
                    warn!(error = %e, "syntax check failed");
                    ItemCheck::new("expression", CheckOutcome::from_error(&e))
                }
            };
            result.syntax_checks.push(check);
        }

        let mut points = ratio_points(&result.syntax_checks, SYNTAX_CAP);

        if let Some(flake) = extract::flake_block(answer) {
            result.commands_run.push("check_flake".to_string());
            let check = match ctx.run("check_flake", self.tools.check_flake(&flake)).await {
                Ok(check) if check.valid => ItemCheck::new("flake", CheckOutcome::Verified),
                Ok(check) => {
                    result.issues.push(issue(
                        "syntax",
                        Severity::High,
                        format!("Flake structure check failed: {}", check.diagnostics),
                        "Validate the flake with 'nix flake check'".to_string(),
                    ));
                    ItemCheck::new("flake", CheckOutcome::Refuted).with_detail(Some(check.diagnostics))
                }
                Err(e) => ItemCheck::new("flake", CheckOutcome::from_error(&e)),
            };
            if check.outcome.is_verified() {
                points = (points + FLAKE_BONUS).min(SYNTAX_CAP);
            }
            result.flake_check = Some(check);
        }

        if let Some(unverified) = unverified_issue("Nix expressions", &result.syntax_checks) {
            result.issues.push(unverified);
        }
        points
    }

    async fn score_packages(&self, ctx: &CallContext, answer: &str, result: &mut AutomatedQualityScore) -> u32 {
        let packages = extract::package_names(answer);
        if packages.is_empty() {
            return 15;
        }

        for name in &packages {
            result.commands_run.push(format!("check_package {}", name));
            let lookup = match ctx.run("check_package", self.tools.check_package(name)).await {
                Ok(check) => Ok(check),
                Err(primary) => {
                    debug!(package = %name, error = %primary, "primary package query failed, trying fallback");
                    result.commands_run.push(format!("find_package_fallback {}", name));
                    ctx.run("find_package_fallback", self.tools.find_package_fallback(name))
                        .await
                }
            };

            let check = match lookup {
                Ok(check) if check.exists => {
                    ItemCheck::new(name.clone(), CheckOutcome::Verified).with_detail(check.version)
                }
                Ok(_) => {
                    result.issues.push(issue(
                        "package",
                        Severity::Medium,
                        format!("Package '{}' not found in nixpkgs", name),
                        format!("Verify the package name with 'nix search nixpkgs {}'", name),
                    ));
                    ItemCheck::new(name.clone(), CheckOutcome::Refuted)
                }
                Err(e) => {
                    warn!(package = %name, error = %e, "package could not be verified");
                    ItemCheck::new(name.clone(), CheckOutcome::from_error(&e))
                }
            };
            result.package_checks.push(check);
        }

        if let Some(unverified) = unverified_issue("packages", &result.package_checks) {
            result.issues.push(unverified);
        }
        ratio_points(&result.package_checks, PACKAGE_CAP)
    }

    async fn score_options(&self, ctx: &CallContext, answer: &str, result: &mut AutomatedQualityScore) -> u32 {
        let options = extract::option_paths(answer);
        if options.is_empty() {
            return 15;
        }

        for path in &options {
            result.commands_run.push(format!("check_option {}", path));
            let check = match ctx.run("check_option", self.tools.check_option(path)).await {
                Ok(check) if check.valid => {
                    let detail = match (&check.option_type, &check.default) {
                        (Some(t), Some(d)) => Some(format!("type: {}, default: {}", t, d)),
                        (Some(t), None) => Some(format!("type: {}", t)),
                        (None, Some(d)) => Some(format!("default: {}", d)),
                        (None, None) => None,
                    };
                    ItemCheck::new(path.clone(), CheckOutcome::Verified).with_detail(detail)
                }
                Ok(_) => {
                    result.issues.push(issue(
                        "option",
                        Severity::Medium,
                        format!("NixOS option '{}' does not exist", path),
                        "Check the option name with 'nixos-option' or the NixOS manual".to_string(),
                    ));
                    ItemCheck::new(path.clone(), CheckOutcome::Refuted)
                }
                Err(e) => {
                    warn!(option = %path, error = %e, "option could not be verified");
                    ItemCheck::new(path.clone(), CheckOutcome::from_error(&e))
                }
            };
            result.option_checks.push(check);
        }

        if let Some(unverified) = unverified_issue("options", &result.option_checks) {
            result.issues.push(unverified);
        }
        ratio_points(&result.option_checks, OPTION_CAP)
    }

    async fn score_commands(&self, ctx: &CallContext, answer: &str, result: &mut AutomatedQualityScore) -> u32 {
        let commands = extract::commands(answer);
        if commands.is_empty() {
            return 5;
        }

        // One lookup per binary
        let mut by_binary: HashMap<String, CheckOutcome> = HashMap::new();
        for command in &commands {
            let binary = extract::command_binary(command).to_string();
            let outcome = match by_binary.get(&binary) {
                Some(outcome) => outcome.clone(),
                None => {
                    result.commands_run.push(format!("check_command {}", binary));
                    let outcome = match ctx.run("check_command", self.tools.check_command(&binary)).await {
                        Ok(true) => CheckOutcome::Verified,
                        Ok(false) => {
                            result.issues.push(issue(
                                "command",
                                Severity::Low,
                                format!("Command '{}' is not available", binary),
                                "Ensure the command is installed on the target system".to_string(),
                            ));
                            CheckOutcome::Refuted
                        }
                        Err(e) => CheckOutcome::from_error(&e),
                    };
                    by_binary.insert(binary.clone(), outcome.clone());
                    outcome
                }
            };
            result.command_checks.push(ItemCheck::new(command.clone(), outcome));
        }

        if let Some(unverified) = unverified_issue("commands", &result.command_checks) {
            result.issues.push(unverified);
        }
        ratio_points(&result.command_checks, COMMAND_CAP)
    }
}

/// Fixed increments for well-formed answer idioms
pub fn score_structure(answer: &str) -> u32 {
    let markers = [
        WITH_PKGS_LIST.as_ref().is_some_and(|re| re.is_match(answer)),
        answer.contains("configuration.nix") || answer.contains("home.nix"),
        answer.contains("nixos-rebuild") || answer.contains("home-manager"),
        answer.contains("```"),
        extract::mentions_flake(answer) && answer.contains("inputs") && answer.contains("outputs"),
    ];
    let points = markers.iter().filter(|m| **m).count() as u32 * STRUCTURE_STEP;
    points.min(STRUCTURE_CAP)
}

fn recommendations(breakdown: &ScoreBreakdown, overall: u32) -> Vec<String> {
    let mut recs = Vec::new();
    if breakdown.syntax < 20 {
        recs.push("Improve Nix syntax - check for missing semicolons, braces, or syntax errors".to_string());
    }
    if breakdown.package < 15 {
        recs.push("Verify package names exist in nixpkgs - use 'nix search' to confirm availability".to_string());
    }
    if breakdown.option < 15 {
        recs.push("Check NixOS option names - use 'nixos-option' or NixOS manual for valid options".to_string());
    }
    if breakdown.command < 5 {
        recs.push("Ensure referenced commands are available on target system".to_string());
    }
    if breakdown.structure < 5 {
        recs.push("Improve code structure - use proper formatting and follow NixOS best practices".to_string());
    }
    if overall < 50 {
        recs.push("Consider providing more detailed examples and ensure technical accuracy".to_string());
    }
    recs
}
