//! Fact checking.
//!
//! Pulls atomic claims out of the answer and classifies each one against
//! evidence the pipeline already holds: the scorer's tool checks and the
//! search.nixos.org verification. No collaborator is called from here.
//! A fixed table of outdated idioms and misconceptions is scanned on its
//! own and yields factual errors whatever was extracted.

use crate::collaborators::SourceVerification;
use crate::extract;
use crate::quality_scorer::{AutomatedQualityScore, NIXOS_OPTION_SOURCE, NIX_TOOLS_SOURCE};
use crate::types::{clamp_unit, Severity, ValidationIssue};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::debug;

pub const FACT_CHECKER_NAME: &str = "fact-checker";
pub const SEARCH_NIXOS_SOURCE: &str = "search-nixos-org";

const ERROR_WEIGHT: f64 = 1.5;
const UNVERIFIED_WEIGHT: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactCategory {
    Package,
    Option,
    Command,
    Version,
    Concept,
}

impl FactCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FactCategory::Package => "package",
            FactCategory::Option => "option",
            FactCategory::Command => "command",
            FactCategory::Version => "version",
            FactCategory::Concept => "concept",
        }
    }
}

/// An atomic claim found in the answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    pub statement: String,
    pub category: FactCategory,
    pub confidence: f64,
    /// Text the claim was extracted from
    pub context: String,
    /// Package name, option path, command line or version
    pub subject: String,
}

impl Fact {
    fn new(category: FactCategory, statement: String, subject: String, context: String, confidence: f64) -> Self {
        Self {
            statement,
            category,
            confidence,
            context,
            subject,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedFact {
    pub fact: Fact,
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnverifiedFact {
    pub fact: Fact,
    pub reason: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactualError {
    pub statement: String,
    /// `outdated` or `incorrect`
    pub error_type: String,
    pub correction: String,
    pub severity: Severity,
    pub sources: Vec<String>,
}

impl FactualError {
    pub fn to_issue(&self) -> ValidationIssue {
        ValidationIssue::new(
            format!("factual_{}", self.error_type),
            self.severity,
            self.statement.clone(),
            self.correction.clone(),
            FACT_CHECKER_NAME,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactCheckResult {
    pub facts: Vec<Fact>,
    pub verified_facts: Vec<VerifiedFact>,
    pub unverified_facts: Vec<UnverifiedFact>,
    pub factual_errors: Vec<FactualError>,
    pub overall_accuracy: f64,
    pub source_quality: f64,
    pub consistency_score: f64,
    pub recommendations: Vec<String>,
}

/// Upstream outputs the fact checker reads
#[derive(Debug, Clone, Copy, Default)]
pub struct FactEvidence<'a> {
    pub automated: Option<&'a AutomatedQualityScore>,
    pub source_verification: Option<&'a SourceVerification>,
    /// Steps the pipeline ran before fact checking
    pub consulted: &'a [String],
}

// ============================================================================
// Extraction tables
// ============================================================================

static COMMAND_FACT: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    extract::compile_all(&[
        r"\$\s+(nix\s+[^;\n`]+)",
        r"\$\s+(nixos-rebuild\s+[^;\n`]+)",
        r"\$\s+(systemctl\s+[^;\n`]+)",
        r"sudo\s+(nix[a-zA-Z0-9-]*\s+[^;\n`]+)",
    ])
});

static VERSION_FACT: LazyLock<Vec<Regex>> =
    LazyLock::new(|| extract::compile_all(&[r"(?i)\bversion\s+([0-9]+\.[0-9]+(?:\.[0-9]+)?)"]));

static CONCEPT_FACT: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    extract::compile_all(&[
        r"(?i)\bflakes?\s+(?:enable|allow|provide)s?\s+[^.\n]+",
        r"(?i)\bservice\s+(?:starts|runs|enables)\s+[^.\n]+",
        r"(?i)\boption\s+(?:controls|manages|sets)\s+[^.\n]+",
        r"(?i)\bpackage\s+(?:provides|includes|contains)\s+[^.\n]+",
    ])
});

struct OutdatedIdiom {
    pattern: &'static str,
    /// Matches containing this are the modern form
    unless: Option<&'static str>,
    correction: &'static str,
}

const OUTDATED_IDIOMS: &[OutdatedIdiom] = &[
    OutdatedIdiom {
        pattern: r"nix-env\s+-i",
        unless: None,
        correction: "Use 'nix profile install' or declarative configuration",
    },
    OutdatedIdiom {
        pattern: r"nix-channel\s+--update",
        unless: None,
        correction: "Use 'nix flake update' with flakes",
    },
    OutdatedIdiom {
        pattern: r"\bnixos-version\b[^\n`]*",
        unless: Some("--json"),
        correction: "Use 'nixos-version --json' or check /etc/os-release",
    },
    OutdatedIdiom {
        pattern: r"services\.xserver\.enable",
        unless: None,
        correction: "Consider services.displayManager and services.desktopManager",
    },
];

const MISCONCEPTIONS: &[(&str, &str)] = &[
    ("flakes are experimental", "Flakes are stable as of Nix 2.4+"),
    ("nix is only for nixos", "The Nix package manager works on any Linux or macOS system"),
    (
        "nix store is read-only",
        "The Nix store is immutable but is modified through nix commands",
    ),
];

static OUTDATED: LazyLock<Vec<(Regex, &'static OutdatedIdiom)>> = LazyLock::new(|| {
    OUTDATED_IDIOMS
        .iter()
        .filter_map(|idiom| Regex::new(idiom.pattern).ok().map(|re| (re, idiom)))
        .collect()
});

/// Extract every fact, deduplicated by statement
pub fn extract_facts(answer: &str) -> Vec<Fact> {
    let mut facts = Vec::new();

    for name in extract::package_names(answer) {
        facts.push(Fact::new(
            FactCategory::Package,
            format!("Package '{}' exists", name),
            name,
            "package declaration".to_string(),
            0.8,
        ));
    }

    for path in extract::option_paths(answer) {
        facts.push(Fact::new(
            FactCategory::Option,
            format!("Option '{}' exists", path),
            path,
            "option assignment".to_string(),
            0.7,
        ));
    }

    for re in COMMAND_FACT.iter() {
        for caps in re.captures_iter(answer) {
            if let (Some(all), Some(cmd)) = (caps.get(0), caps.get(1)) {
                let command = cmd.as_str().trim().to_string();
                facts.push(Fact::new(
                    FactCategory::Command,
                    format!("Command '{}' is valid", command),
                    command,
                    all.as_str().trim().to_string(),
                    0.6,
                ));
            }
        }
    }

    for re in VERSION_FACT.iter() {
        for caps in re.captures_iter(answer) {
            if let (Some(all), Some(version)) = (caps.get(0), caps.get(1)) {
                facts.push(Fact::new(
                    FactCategory::Version,
                    format!("Version {} is referenced", version.as_str()),
                    version.as_str().to_string(),
                    all.as_str().to_string(),
                    0.5,
                ));
            }
        }
    }

    for re in CONCEPT_FACT.iter() {
        for m in re.find_iter(answer) {
            let sentence = m.as_str().trim().to_string();
            facts.push(Fact::new(FactCategory::Concept, sentence.clone(), sentence.clone(), sentence, 0.4));
        }
    }

    let mut seen = HashSet::new();
    facts.retain(|fact| seen.insert(fact.statement.clone()));
    facts
}

/// Outdated idioms and misconceptions found in the answer
pub fn common_errors(answer: &str) -> Vec<FactualError> {
    let mut errors = Vec::new();

    for (re, idiom) in OUTDATED.iter() {
        let hit = re
            .find_iter(answer)
            .map(|m| m.as_str().trim())
            .find(|text| match idiom.unless {
                Some(modern) => !text.contains(modern),
                None => true,
            });
        if let Some(text) = hit {
            errors.push(FactualError {
                statement: format!("Uses outdated idiom: {}", text),
                error_type: "outdated".to_string(),
                correction: idiom.correction.to_string(),
                severity: Severity::Medium,
                sources: vec![FACT_CHECKER_NAME.to_string()],
            });
        }
    }

    let lower = answer.to_lowercase();
    for (misconception, correction) in MISCONCEPTIONS {
        if lower.contains(misconception) {
            errors.push(FactualError {
                statement: format!("Contains misconception: {}", misconception),
                error_type: "incorrect".to_string(),
                correction: correction.to_string(),
                severity: Severity::Low,
                sources: vec![FACT_CHECKER_NAME.to_string()],
            });
        }
    }
    errors
}

fn verification_sources(fact: &Fact, evidence: &FactEvidence<'_>) -> Vec<String> {
    let mut sources = Vec::new();
    match fact.category {
        FactCategory::Package => {
            if evidence
                .automated
                .and_then(|a| a.package_outcome(&fact.subject))
                .is_some_and(|o| o.is_verified())
            {
                sources.push(NIX_TOOLS_SOURCE.to_string());
            }
            if evidence
                .source_verification
                .is_some_and(|sv| sv.verifies_package(&fact.subject))
            {
                sources.push(SEARCH_NIXOS_SOURCE.to_string());
            }
        }
        FactCategory::Option => {
            if evidence
                .automated
                .and_then(|a| a.option_outcome(&fact.subject))
                .is_some_and(|o| o.is_verified())
            {
                sources.push(NIXOS_OPTION_SOURCE.to_string());
            }
            if evidence
                .source_verification
                .is_some_and(|sv| sv.verifies_option(&fact.subject))
            {
                sources.push(SEARCH_NIXOS_SOURCE.to_string());
            }
        }
        FactCategory::Command => {
            let binary = extract::command_binary(&fact.subject);
            if evidence
                .automated
                .and_then(|a| a.command_outcome(binary))
                .is_some_and(|o| o.is_verified())
            {
                sources.push(NIX_TOOLS_SOURCE.to_string());
            }
        }
        FactCategory::Version | FactCategory::Concept => {}
    }
    sources
}

fn unverified(fact: Fact) -> UnverifiedFact {
    let (reason, severity) = match fact.category {
        FactCategory::Package => ("Package not found in available sources", Severity::Medium),
        FactCategory::Option => ("Option not found in available sources", Severity::High),
        FactCategory::Command => ("Command not validated", Severity::Medium),
        FactCategory::Version | FactCategory::Concept => ("No verification method available", Severity::Low),
    };
    UnverifiedFact {
        fact,
        reason: reason.to_string(),
        severity,
    }
}

/// 0.5, +0.3 for ≥4 sources or +0.2 for ≥2, +0.2 with an official source
pub fn source_quality(consulted: &[String]) -> f64 {
    let mut score = 0.5;
    if consulted.len() >= 4 {
        score += 0.3;
    } else if consulted.len() >= 2 {
        score += 0.2;
    }
    if consulted
        .iter()
        .any(|s| s.contains("nixos") || s.contains("official"))
    {
        score += 0.2;
    }
    clamp_unit(score)
}

pub fn overall_accuracy(verified: usize, unverified: usize, errors: usize) -> f64 {
    let total = verified + unverified + errors;
    if total == 0 {
        return 1.0;
    }
    let score =
        (verified as f64 - ERROR_WEIGHT * errors as f64 - UNVERIFIED_WEIGHT * unverified as f64) / total as f64;
    clamp_unit(score)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FactChecker;

impl FactChecker {
    pub fn new() -> Self {
        Self
    }

    pub fn check_facts(&self, _question: &str, answer: &str, evidence: &FactEvidence<'_>) -> FactCheckResult {
        let facts = extract_facts(answer);
        let mut verified_facts = Vec::new();
        let mut unverified_facts = Vec::new();

        for fact in facts.iter().cloned() {
            let sources = verification_sources(&fact, evidence);
            if sources.is_empty() {
                unverified_facts.push(unverified(fact));
            } else {
                verified_facts.push(VerifiedFact { fact, sources });
            }
        }

        let factual_errors = common_errors(answer);
        let overall_accuracy = overall_accuracy(verified_facts.len(), unverified_facts.len(), factual_errors.len());
        let source_quality = source_quality(evidence.consulted);
        let consistency_score = clamp_unit(1.0 - 0.2 * factual_errors.len() as f64);

        let mut recommendations = Vec::new();
        if !factual_errors.is_empty() {
            recommendations.push("Review and correct identified factual errors".to_string());
        }
        if !unverified_facts.is_empty() {
            recommendations.push("Verify unconfirmed facts against official documentation".to_string());
        }
        if overall_accuracy < 0.7 {
            recommendations.push("Consider consulting additional authoritative sources".to_string());
        }
        if source_quality < 0.6 {
            recommendations.push("Use more authoritative and recent sources".to_string());
        }

        debug!(
            facts = facts.len(),
            verified = verified_facts.len(),
            unverified = unverified_facts.len(),
            errors = factual_errors.len(),
            accuracy = overall_accuracy,
            "fact check"
        );

        FactCheckResult {
            facts,
            verified_facts,
            unverified_facts,
            factual_errors,
            overall_accuracy,
            source_quality,
            consistency_score,
            recommendations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{FakeToolExecutor, VerifiedPackage};
    use crate::context::CallContext;
    use crate::quality_scorer::AutomatedQualityScorer;
    use approx::assert_relative_eq;
    use std::sync::Arc;

    #[test]
    fn test_extract_facts_by_category() {
        let answer = "Add `environment.systemPackages = with pkgs; [ git ];` then run\n$ nix flake update\nThis needs Nix version 2.18.1. Flakes provide reproducible builds.";
        let facts = extract_facts(answer);
        let categories: Vec<FactCategory> = facts.iter().map(|f| f.category).collect();
        assert_eq!(
            categories,
            vec![
                FactCategory::Package,
                FactCategory::Option,
                FactCategory::Command,
                FactCategory::Version,
                FactCategory::Concept
            ]
        );
        assert_eq!(facts[0].statement, "Package 'git' exists");
        assert_eq!(facts[2].subject, "nix flake update");
        assert_eq!(facts[3].subject, "2.18.1");
    }

    #[test]
    fn test_facts_deduplicated() {
        let facts = extract_facts("Use pkgs.git and pkgs.git again");
        assert_eq!(facts.len(), 1);
    }

    #[test]
    fn test_common_errors() {
        let errors = common_errors("Run nix-env -iA nixos.git. Flakes are experimental.");
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].error_type, "outdated");
        assert_eq!(errors[0].severity, Severity::Medium);
        assert_eq!(errors[1].error_type, "incorrect");
        assert_eq!(errors[1].severity, Severity::Low);

        assert!(common_errors("Check `nixos-version --json`").is_empty());
        assert_eq!(common_errors("Check `nixos-version`").len(), 1);
    }

    #[test]
    fn test_accuracy_formula() {
        assert_eq!(overall_accuracy(0, 0, 0), 1.0);
        assert_relative_eq!(overall_accuracy(3, 1, 0), 2.5 / 4.0);
        assert_eq!(overall_accuracy(0, 1, 1), 0.0);
    }

    #[test]
    fn test_source_quality() {
        assert_relative_eq!(source_quality(&[]), 0.5);
        let consulted: Vec<String> = ["nixos-validator", "automated-quality-scorer"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_relative_eq!(source_quality(&consulted), 0.9);
    }

    #[tokio::test]
    async fn test_verification_from_prior_results() {
        let answer = "Install with `nix-shell -p htop ripgrep`";
        let tools = FakeToolExecutor::new().with_package("htop", true);
        let score = AutomatedQualityScorer::new(Arc::new(tools))
            .score(&CallContext::default(), "q", answer)
            .await;
        let sv = SourceVerification {
            packages_verified: vec![VerifiedPackage {
                name: "htop".to_string(),
                version: "3.3.0".to_string(),
                description: String::new(),
            }],
            ..Default::default()
        }
        .finalize();

        let evidence = FactEvidence {
            automated: Some(&score),
            source_verification: Some(&sv),
            consulted: &[],
        };
        let result = FactChecker::new().check_facts("q", answer, &evidence);

        assert_eq!(result.verified_facts.len(), 1);
        assert_eq!(result.verified_facts[0].sources, vec![NIX_TOOLS_SOURCE, SEARCH_NIXOS_SOURCE]);
        let ripgrep = result
            .unverified_facts
            .iter()
            .find(|u| u.fact.subject == "ripgrep")
            .unwrap();
        assert_eq!(ripgrep.severity, Severity::Medium);
    }
}
