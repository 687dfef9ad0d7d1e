//! Cross-reference validation.
//!
//! Compares what the other components concluded about the same package,
//! option or approach. Disagreements become [`Contradiction`]s, recorded
//! once per (type, unordered source pair, subject). Independent agreement
//! from two or more sources becomes a [`Confirmation`]. Everything here is
//! a pure function of prior results.

use crate::collaborators::SourceVerification;
use crate::community::{CommunityValidationResult, COMMUNITY_NAME};
use crate::fact_checker::{FactCategory, FactCheckResult, SEARCH_NIXOS_SOURCE};
use crate::patterns::{flake, nixos, PatternValidationResult};
use crate::precheck::{PreAnswerValidation, SourceConfidence, PRECHECK_NAME};
use crate::quality_scorer::{AutomatedQualityScore, NIXOS_OPTION_SOURCE, NIX_TOOLS_SOURCE};
use crate::types::{clamp_unit, Severity};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

pub const CROSS_REFERENCE_NAME: &str = "cross-reference";

/// Sources that receive an agreement score, in reporting order
pub const AGREEMENT_SOURCES: &[&str] = &[
    nixos::VALIDATOR_NAME,
    flake::VALIDATOR_NAME,
    NIX_TOOLS_SOURCE,
    NIXOS_OPTION_SOURCE,
    SEARCH_NIXOS_SOURCE,
    PRECHECK_NAME,
    COMMUNITY_NAME,
];

const PACKAGE_MAX_SOURCES: f64 = 3.0;
const OPTION_MAX_SOURCES: f64 = 2.0;
const APPROACH_CONFIDENCE: f64 = 0.9;
const NEUTRAL_AGREEMENT: f64 = 0.5;

/// Everything computed before cross-referencing
#[derive(Debug, Clone, Copy, Default)]
pub struct PriorResults<'a> {
    pub precheck: Option<&'a PreAnswerValidation>,
    pub nixos: Option<&'a PatternValidationResult>,
    pub flake: Option<&'a PatternValidationResult>,
    pub automated: Option<&'a AutomatedQualityScore>,
    pub community: Option<&'a CommunityValidationResult>,
    pub source_verification: Option<&'a SourceVerification>,
    pub facts: Option<&'a FactCheckResult>,
}

impl PriorResults<'_> {
    /// Tool confidence over decisive checks, if any were decided
    pub fn tool_confidence(&self) -> Option<f64> {
        self.automated.and_then(|a| a.tool_summary().confidence)
    }

    pub fn community_consensus(&self) -> Option<f64> {
        self.community.map(|c| c.community_consensus)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contradiction {
    #[serde(rename = "type")]
    pub contradiction_type: String,
    pub subject: String,
    pub description: String,
    pub source1: String,
    pub source2: String,
    pub evidence1: String,
    pub evidence2: String,
    pub severity: Severity,
    pub resolution: String,
}

impl Contradiction {
    pub fn involves(&self, source: &str) -> bool {
        base_source(&self.source1) == source || base_source(&self.source2) == source
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Confirmation {
    #[serde(rename = "type")]
    pub confirmation_type: String,
    pub description: String,
    /// Always two or more distinct sources
    pub sources: Vec<String>,
    pub evidence: Vec<String>,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityAssessment {
    pub accuracy: f64,
    pub completeness: f64,
    pub clarity: f64,
    pub practicality: f64,
    pub recency: f64,
    pub overall: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossReferenceResult {
    pub contradictions: Vec<Contradiction>,
    pub confirmations: Vec<Confirmation>,
    pub source_agreement: BTreeMap<String, f64>,
    pub consistency_score: f64,
    pub quality_assessment: QualityAssessment,
    pub recommended_sources: Vec<String>,
}

/// `nixos-validator#3` counts as `nixos-validator`
fn base_source(source: &str) -> &str {
    source.split('#').next().unwrap_or(source)
}

// ============================================================================
// Contradiction recording
// ============================================================================

#[derive(Default)]
struct ContradictionSet {
    keys: BTreeSet<(String, String, String, String)>,
    items: Vec<Contradiction>,
}

impl ContradictionSet {
    /// Record unless the same type, pair and subject is already present
    fn record(&mut self, contradiction: Contradiction) -> bool {
        if contradiction.source1 == contradiction.source2 {
            return false;
        }
        let (a, b) = if contradiction.source1 <= contradiction.source2 {
            (&contradiction.source1, &contradiction.source2)
        } else {
            (&contradiction.source2, &contradiction.source1)
        };
        let key = (
            contradiction.contradiction_type.clone(),
            a.clone(),
            b.clone(),
            contradiction.subject.clone(),
        );
        if !self.keys.insert(key) {
            return false;
        }
        self.items.push(contradiction);
        true
    }
}

#[allow(clippy::too_many_arguments)]
fn contradiction(
    contradiction_type: &str,
    subject: &str,
    description: String,
    source1: &str,
    source2: &str,
    evidence1: String,
    evidence2: String,
    severity: Severity,
    resolution: String,
) -> Contradiction {
    Contradiction {
        contradiction_type: contradiction_type.to_string(),
        subject: subject.to_string(),
        description,
        source1: source1.to_string(),
        source2: source2.to_string(),
        evidence1,
        evidence2,
        severity,
        resolution,
    }
}

fn find_contradictions(prior: &PriorResults<'_>) -> Vec<Contradiction> {
    let mut set = ContradictionSet::default();

    if let (Some(automated), Some(nixos)) = (prior.automated, prior.nixos) {
        for check in automated.package_checks.iter().filter(|c| c.outcome.is_refuted()) {
            if !nixos.mentions(&check.subject) {
                set.record(contradiction(
                    "package",
                    &check.subject,
                    format!("Package '{}' is missing but no pattern error flags it", check.subject),
                    NIX_TOOLS_SOURCE,
                    nixos::VALIDATOR_NAME,
                    format!("Package '{}' not found by nix search", check.subject),
                    format!("No pattern error mentions '{}'", check.subject),
                    Severity::Medium,
                    format!("Verify the package with 'nix search nixpkgs {}'", check.subject),
                ));
            }
        }
        for check in automated.option_checks.iter().filter(|c| c.outcome.is_refuted()) {
            if !nixos.mentions(&check.subject) {
                set.record(contradiction(
                    "option",
                    &check.subject,
                    format!("Option '{}' is invalid but no pattern error flags it", check.subject),
                    NIXOS_OPTION_SOURCE,
                    nixos::VALIDATOR_NAME,
                    format!("nixos-option rejects '{}'", check.subject),
                    format!("No pattern error mentions '{}'", check.subject),
                    Severity::High,
                    "Check the option name in the NixOS manual".to_string(),
                ));
            }
        }
    }

    if let (Some(precheck), Some(consensus)) = (prior.precheck, prior.community_consensus()) {
        if precheck.confidence == SourceConfidence::High && consensus < 0.5 {
            set.record(contradiction(
                "approach",
                "approach",
                "Documentation supports the question but the community does not support the answer".to_string(),
                PRECHECK_NAME,
                COMMUNITY_NAME,
                "Documentation confidence: high".to_string(),
                format!("Community consensus: {:.2}", consensus),
                Severity::Medium,
                "Compare the answer against the wiki pages found for the question".to_string(),
            ));
        }
    }

    if let (Some(sv), Some(automated)) = (prior.source_verification, prior.automated) {
        for check in automated.package_checks.iter().filter(|c| c.outcome.is_refuted()) {
            if sv.verifies_package(&check.subject) {
                set.record(contradiction(
                    "package",
                    &check.subject,
                    format!("search.nixos.org lists '{}' but local tooling cannot find it", check.subject),
                    SEARCH_NIXOS_SOURCE,
                    NIX_TOOLS_SOURCE,
                    format!("Package '{}' is in the official index", check.subject),
                    format!("Package '{}' not found by nix search", check.subject),
                    Severity::Medium,
                    "Update the local channel or flake inputs and search again".to_string(),
                ));
            }
        }
    }

    if let Some(nixos) = prior.nixos {
        for (i, first) in nixos.errors.iter().enumerate() {
            for (j, second) in nixos.errors.iter().enumerate().skip(i + 1) {
                if are_contradictory(&first.message, &second.message) {
                    let first_source = format!("{}#{}", nixos::VALIDATOR_NAME, i);
                    let second_source = format!("{}#{}", nixos::VALIDATOR_NAME, j);
                    set.record(contradiction(
                        "internal",
                        &format!("{}-{}", i, j),
                        "Contradictory configuration recommendations in the same answer".to_string(),
                        &first_source,
                        &second_source,
                        first.message.clone(),
                        second.message.clone(),
                        Severity::High,
                        "Review the answer for consistency".to_string(),
                    ));
                }
            }
        }
    }

    set.items
}

fn are_contradictory(first: &str, second: &str) -> bool {
    let opposed = |a: &str, b: &str| {
        (a.contains("enable") && b.contains("disable")) || (a.contains("use") && b.contains("avoid"))
    };
    let first = first.to_lowercase();
    let second = second.to_lowercase();
    opposed(&first, &second) || opposed(&second, &first)
}

// ============================================================================
// Confirmations
// ============================================================================

/// (kind, subject) -> confirming source -> evidence
type Ledger = BTreeMap<(FactCategory, String), BTreeMap<String, String>>;

fn note(ledger: &mut Ledger, kind: FactCategory, subject: &str, source: &str, evidence: String) {
    ledger
        .entry((kind, subject.to_string()))
        .or_default()
        .entry(source.to_string())
        .or_insert(evidence);
}

fn find_confirmations(prior: &PriorResults<'_>) -> Vec<Confirmation> {
    let mut ledger = Ledger::new();

    if let Some(automated) = prior.automated {
        for check in automated.package_checks.iter().filter(|c| c.outcome.is_verified()) {
            note(&mut ledger, FactCategory::Package, &check.subject, NIX_TOOLS_SOURCE, "Available via nix search".to_string());
        }
        for check in automated.option_checks.iter().filter(|c| c.outcome.is_verified()) {
            note(&mut ledger, FactCategory::Option, &check.subject, NIXOS_OPTION_SOURCE, "Valid via nixos-option".to_string());
        }
    }

    if let Some(sv) = prior.source_verification {
        for pkg in &sv.packages_verified {
            note(
                &mut ledger,
                FactCategory::Package,
                &pkg.name,
                SEARCH_NIXOS_SOURCE,
                format!("Official repository: {}", pkg.description),
            );
        }
        for opt in &sv.options_verified {
            note(
                &mut ledger,
                FactCategory::Option,
                &opt.name,
                SEARCH_NIXOS_SOURCE,
                format!("Official option: {}", opt.description),
            );
        }
    }

    if let Some(facts) = prior.facts {
        for verified in &facts.verified_facts {
            let kind = verified.fact.category;
            if !matches!(kind, FactCategory::Package | FactCategory::Option) {
                continue;
            }
            for source in &verified.sources {
                note(&mut ledger, kind, &verified.fact.subject, source, verified.fact.statement.clone());
            }
        }
    }

    let mut confirmations: Vec<Confirmation> = ledger
        .into_iter()
        .filter(|(_, sources)| sources.len() >= 2)
        .map(|((kind, subject), sources)| {
            let max_sources = match kind {
                FactCategory::Option => OPTION_MAX_SOURCES,
                _ => PACKAGE_MAX_SOURCES,
            };
            let label = if kind == FactCategory::Option { "Option" } else { "Package" };
            Confirmation {
                confirmation_type: kind.as_str().to_string(),
                description: format!("{} '{}' confirmed by multiple sources", label, subject),
                confidence: clamp_unit(sources.len() as f64 / max_sources),
                evidence: sources.values().cloned().collect(),
                sources: sources.into_keys().collect(),
            }
        })
        .collect();

    if let (Some(precheck), Some(consensus)) = (prior.precheck, prior.community_consensus()) {
        if precheck.confidence == SourceConfidence::High && consensus >= 0.7 {
            confirmations.push(Confirmation {
                confirmation_type: "approach".to_string(),
                description: "Solution approach confirmed by both documentation and community sources".to_string(),
                sources: vec![PRECHECK_NAME.to_string(), COMMUNITY_NAME.to_string()],
                evidence: vec![
                    "Documentation confidence: high".to_string(),
                    format!("Community consensus: {:.2}", consensus),
                ],
                confidence: APPROACH_CONFIDENCE,
            });
        }
    }

    confirmations
}

// ============================================================================
// Scores
// ============================================================================

fn source_agreement(contradictions: &[Contradiction], confirmations: &[Confirmation]) -> BTreeMap<String, Option<f64>> {
    AGREEMENT_SOURCES
        .iter()
        .map(|source| {
            let confirmed = confirmations
                .iter()
                .filter(|c| c.sources.iter().any(|s| s == source))
                .count();
            let contradicted = contradictions.iter().filter(|c| c.involves(source)).count();
            let total = confirmed + contradicted;
            let score = if total == 0 {
                None
            } else {
                Some(confirmed as f64 / total as f64)
            };
            (source.to_string(), score)
        })
        .collect()
}

/// confirmations / (confirmations + severity-weighted contradictions)
pub fn consistency_score(contradictions: &[Contradiction], confirmations: &[Confirmation]) -> f64 {
    let confirmed = confirmations.len() as f64;
    let penalty: f64 = contradictions
        .iter()
        .map(|c| c.severity.contradiction_penalty())
        .sum();
    if confirmed + penalty == 0.0 {
        return 1.0;
    }
    clamp_unit(confirmed / (confirmed + penalty))
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

pub fn assess_quality(answer: &str, prior: &PriorResults<'_>) -> QualityAssessment {
    let patterns_invalid = [prior.nixos, prior.flake]
        .iter()
        .flatten()
        .any(|result| !result.is_valid);
    let accuracy = if patterns_invalid {
        0.2
    } else {
        prior.facts.map(|f| f.overall_accuracy).unwrap_or(0.7)
    };

    let words = word_count(answer);

    let mut completeness: f64 = 0.5;
    if words > 50 {
        completeness += 0.2;
    }
    if answer.contains("```") {
        completeness += 0.2;
    }
    if answer.contains("configuration.nix") || answer.contains("flake.nix") {
        completeness += 0.1;
    }

    let mut clarity: f64 = 0.5;
    if answer.contains("##") {
        clarity += 0.2;
    }
    if answer.contains("1.") || answer.contains("- ") {
        clarity += 0.2;
    }
    if words < 20 {
        clarity -= 0.3;
    } else if words > 500 {
        clarity -= 0.1;
    }

    let mut practicality: f64 = 0.5;
    if answer.contains("nixos-rebuild") {
        practicality += 0.2;
    }
    if answer.contains("enable = true") || answer.contains("enable = false") {
        practicality += 0.2;
    }
    if prior.tool_confidence().is_some_and(|c| c > 0.7) {
        practicality += 0.2;
    }

    let deprecated = prior
        .nixos
        .map(|n| n.errors_of_type("deprecated_command"))
        .unwrap_or(0);
    let recency = 0.7 - 0.2 * deprecated as f64;

    let accuracy = clamp_unit(accuracy);
    let completeness = clamp_unit(completeness);
    let clarity = clamp_unit(clarity);
    let practicality = clamp_unit(practicality);
    let recency = clamp_unit(recency);
    let overall =
        clamp_unit(0.3 * accuracy + 0.2 * completeness + 0.2 * clarity + 0.2 * practicality + 0.1 * recency);

    QualityAssessment {
        accuracy,
        completeness,
        clarity,
        practicality,
        recency,
        overall,
    }
}

fn recommended_sources(agreement: &BTreeMap<String, Option<f64>>, prior: &PriorResults<'_>) -> Vec<String> {
    let mut recs = Vec::new();
    for (source, score) in agreement {
        match score {
            Some(score) if *score >= 0.8 => {
                recs.push(format!("High confidence in {} ({:.0}% agreement)", source, score * 100.0));
            }
            Some(score) if *score <= 0.3 => {
                recs.push(format!("Low confidence in {} - verify independently", source));
            }
            _ => {}
        }
    }
    if prior.tool_confidence().is_some_and(|c| c >= 0.8) {
        recs.push("Local tool validation shows high confidence - solution likely works in current environment".to_string());
    }
    if prior.community_consensus().is_some_and(|c| c >= 0.8) {
        recs.push("Strong community consensus - solution follows established best practices".to_string());
    }
    recs
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CrossReferenceValidator;

impl CrossReferenceValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate_consistency(&self, _question: &str, answer: &str, prior: &PriorResults<'_>) -> CrossReferenceResult {
        let contradictions = find_contradictions(prior);
        let confirmations = find_confirmations(prior);
        let agreement = source_agreement(&contradictions, &confirmations);
        let consistency_score = consistency_score(&contradictions, &confirmations);
        let quality_assessment = assess_quality(answer, prior);
        let recommended_sources = recommended_sources(&agreement, prior);

        debug!(
            contradictions = contradictions.len(),
            confirmations = confirmations.len(),
            consistency = consistency_score,
            "cross-reference"
        );

        CrossReferenceResult {
            contradictions,
            confirmations,
            source_agreement: agreement
                .into_iter()
                .map(|(source, score)| (source, score.unwrap_or(NEUTRAL_AGREEMENT)))
                .collect(),
            consistency_score,
            quality_assessment,
            recommended_sources,
        }
    }
}
