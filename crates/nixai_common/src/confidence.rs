//! Confidence scoring.
//!
//! Folds upstream results into five `[0, 1]` dimensions and a fixed
//! weighted `overall`. [`AnswerConfidence::new`] is the only constructor,
//! so every dimension is clamped on the way in and `overall` always
//! matches the weights.

use crate::cross_reference::PriorResults;
use crate::precheck::SourceConfidence;
use crate::types::{clamp_unit, Severity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const CONFIDENCE_SCORER_NAME: &str = "confidence-scorer";

pub const SOURCE_VERIFICATION_WEIGHT: f64 = 0.25;
pub const RECENCY_WEIGHT: f64 = 0.10;
pub const COMMUNITY_CONSENSUS_WEIGHT: f64 = 0.20;
pub const TOOL_VERIFICATION_WEIGHT: f64 = 0.25;
pub const SYNTAX_VALIDITY_WEIGHT: f64 = 0.20;

const NEUTRAL: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnswerConfidence {
    source_verification: f64,
    recency: f64,
    community_consensus: f64,
    tool_verification: f64,
    syntax_validity: f64,
    overall: f64,
}

impl AnswerConfidence {
    pub fn new(
        source_verification: f64,
        recency: f64,
        community_consensus: f64,
        tool_verification: f64,
        syntax_validity: f64,
    ) -> Self {
        let source_verification = clamp_unit(source_verification);
        let recency = clamp_unit(recency);
        let community_consensus = clamp_unit(community_consensus);
        let tool_verification = clamp_unit(tool_verification);
        let syntax_validity = clamp_unit(syntax_validity);
        let overall = clamp_unit(
            source_verification * SOURCE_VERIFICATION_WEIGHT
                + recency * RECENCY_WEIGHT
                + community_consensus * COMMUNITY_CONSENSUS_WEIGHT
                + tool_verification * TOOL_VERIFICATION_WEIGHT
                + syntax_validity * SYNTAX_VALIDITY_WEIGHT,
        );
        Self {
            source_verification,
            recency,
            community_consensus,
            tool_verification,
            syntax_validity,
            overall,
        }
    }

    /// Every dimension at 0.5
    pub fn neutral() -> Self {
        Self::new(NEUTRAL, NEUTRAL, NEUTRAL, NEUTRAL, NEUTRAL)
    }

    pub fn source_verification(&self) -> f64 {
        self.source_verification
    }

    pub fn recency(&self) -> f64 {
        self.recency
    }

    pub fn community_consensus(&self) -> f64 {
        self.community_consensus
    }

    pub fn tool_verification(&self) -> f64 {
        self.tool_verification
    }

    pub fn syntax_validity(&self) -> f64 {
        self.syntax_validity
    }

    pub fn overall(&self) -> f64 {
        self.overall
    }

    /// Named dimensions in display order
    pub fn dimensions(&self) -> [(&'static str, f64); 5] {
        [
            ("Source Verification", self.source_verification),
            ("Tool Verification", self.tool_verification),
            ("Syntax Validity", self.syntax_validity),
            ("Community Consensus", self.community_consensus),
            ("Recency", self.recency),
        ]
    }

    pub fn level(&self) -> ConfidenceLevel {
        ConfidenceLevel::from_score(self.overall)
    }

    pub fn factors(&self) -> ConfidenceFactors {
        let dims = self.dimensions();
        // First of equals wins, in display order
        let mut strongest = dims[0];
        let mut weakest = dims[0];
        for dim in &dims[1..] {
            if dim.1 > strongest.1 {
                strongest = *dim;
            }
            if dim.1 < weakest.1 {
                weakest = *dim;
            }
        }

        let pattern = if self.tool_verification >= 0.8 && self.syntax_validity >= 0.8 {
            ConfidencePattern::TechnicallyVerified
        } else if self.community_consensus >= 0.8 {
            ConfidencePattern::CommunityEndorsed
        } else if self.source_verification >= 0.8 {
            ConfidencePattern::DocumentationBacked
        } else {
            ConfidencePattern::MixedSignals
        };

        ConfidenceFactors {
            strongest: strongest.0.to_string(),
            strongest_score: strongest.1,
            weakest: weakest.0.to_string(),
            weakest_score: weakest.1,
            pattern,
        }
    }

    /// Per-dimension difference from an earlier score
    pub fn change_from(&self, previous: &AnswerConfidence) -> BTreeMap<&'static str, f64> {
        BTreeMap::from([
            ("source_verification", self.source_verification - previous.source_verification),
            ("recency", self.recency - previous.recency),
            ("community_consensus", self.community_consensus - previous.community_consensus),
            ("tool_verification", self.tool_verification - previous.tool_verification),
            ("syntax_validity", self.syntax_validity - previous.syntax_validity),
            ("overall", self.overall - previous.overall),
        ])
    }

    pub fn explain(&self) -> String {
        let level = self.level();
        let factors = self.factors();
        let mut lines = vec![
            format!("{} ({:.0}%)", level.description(), self.overall * 100.0),
            format!("Strongest validation: {} ({:.0}%)", factors.strongest, factors.strongest_score * 100.0),
        ];
        if factors.weakest_score < NEUTRAL {
            lines.push(format!(
                "Area for improvement: {} ({:.0}%)",
                factors.weakest,
                factors.weakest_score * 100.0
            ));
        }
        lines.push(format!("Pattern: {}", factors.pattern));
        lines.join("\n")
    }
}

impl Default for AnswerConfidence {
    fn default() -> Self {
        Self::neutral()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfidenceLevel {
    VeryLow,
    Low,
    Medium,
    High,
    Excellent,
}

impl ConfidenceLevel {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 0.9 => ConfidenceLevel::Excellent,
            s if s >= 0.8 => ConfidenceLevel::High,
            s if s >= 0.6 => ConfidenceLevel::Medium,
            s if s >= 0.4 => ConfidenceLevel::Low,
            _ => ConfidenceLevel::VeryLow,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::VeryLow => "very-low",
            ConfidenceLevel::Low => "low",
            ConfidenceLevel::Medium => "medium",
            ConfidenceLevel::High => "high",
            ConfidenceLevel::Excellent => "excellent",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ConfidenceLevel::Excellent => {
                "Exceptional confidence: well verified across multiple sources with strong technical validation."
            }
            ConfidenceLevel::High => "High confidence: supported by reliable sources and passes most checks.",
            ConfidenceLevel::Medium => "Moderate confidence: a good foundation that may need additional verification.",
            ConfidenceLevel::Low => "Low confidence: some issues or limited verification. Consider other sources.",
            ConfidenceLevel::VeryLow => "Very low confidence: significant issues, use with caution.",
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfidencePattern {
    TechnicallyVerified,
    CommunityEndorsed,
    DocumentationBacked,
    MixedSignals,
}

impl fmt::Display for ConfidencePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConfidencePattern::TechnicallyVerified => "technically-verified",
            ConfidencePattern::CommunityEndorsed => "community-endorsed",
            ConfidencePattern::DocumentationBacked => "documentation-backed",
            ConfidencePattern::MixedSignals => "mixed-signals",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceFactors {
    pub strongest: String,
    pub strongest_score: f64,
    pub weakest: String,
    pub weakest_score: f64,
    pub pattern: ConfidencePattern,
}

// ============================================================================
// Scorer
// ============================================================================

fn source_verification_score(prior: &PriorResults<'_>) -> f64 {
    let mut score = NEUTRAL;
    if let Some(precheck) = prior.precheck {
        score += match precheck.confidence {
            SourceConfidence::High => 0.3,
            SourceConfidence::Medium => 0.1,
            SourceConfidence::Low => -0.1,
        };
        score += (0.05 * precheck.verified_sources.len() as f64).min(0.2);
    }
    if let Some(sv) = prior.source_verification {
        score += 0.3 * sv.confidence;
        if sv.package_verification_failed {
            score -= 0.1;
        }
        if sv.option_verification_failed {
            score -= 0.15;
        }
        score += 0.02 * sv.verified_count() as f64;
    }
    clamp_unit(score)
}

fn recency_score(prior: &PriorResults<'_>) -> f64 {
    let mut score = 0.7;
    if let Some(nixos) = prior.nixos {
        let deprecated = nixos.errors_of_type("deprecated_command") + nixos.errors_of_type("deprecated_option");
        score -= 0.2 * deprecated as f64;
    }
    if prior.precheck.is_some() {
        score += 0.1;
    }
    if prior.tool_confidence().is_some_and(|c| c > 0.7) {
        score += 0.2;
    }
    clamp_unit(score)
}

fn community_consensus_score(prior: &PriorResults<'_>) -> f64 {
    match prior.community {
        None => NEUTRAL,
        Some(community) => {
            clamp_unit(community.community_consensus - 0.1 * community.page_contradictions.len() as f64)
        }
    }
}

fn tool_verification_score(prior: &PriorResults<'_>) -> f64 {
    let Some(automated) = prior.automated else {
        return NEUTRAL;
    };
    let summary = automated.tool_summary();
    let Some(tool_confidence) = summary.confidence else {
        return NEUTRAL;
    };

    let successful = summary.successful_checks.len();
    let success_rate = successful as f64 / summary.decisive_checks() as f64;
    let mut score = (tool_confidence + success_rate) / 2.0;
    if successful >= 3 {
        score += 0.1;
    }
    let refuted_options = automated
        .option_checks
        .iter()
        .filter(|c| c.outcome.is_refuted())
        .count();
    score -= 0.15 * refuted_options as f64;
    if !automated.syntax_checks.is_empty() && automated.syntax_checks.iter().all(|c| c.outcome.is_verified()) {
        score += 0.1;
    }
    clamp_unit(score)
}

fn syntax_validity_score(prior: &PriorResults<'_>) -> f64 {
    let mut score = 0.8;
    if let Some(nixos) = prior.nixos {
        if !nixos.is_valid {
            let syntax_errors = nixos.errors_of_type("incorrect_option_name") + nixos.errors_of_type("syntax_error");
            score -= 0.2 * syntax_errors as f64;
        }
        score -= match nixos.severity {
            Some(Severity::Critical) => 0.4,
            Some(Severity::High) => 0.3,
            Some(Severity::Medium) => 0.1,
            Some(Severity::Low) | None => 0.0,
        };
    }
    if let Some(flake) = prior.flake {
        if !flake.is_valid {
            let structural = flake
                .errors
                .iter()
                .filter(|e| e.error_type.contains("structure") || e.error_type.contains("syntax"))
                .count();
            score -= 0.25 * structural as f64;
        }
    }
    if let Some(automated) = prior.automated {
        let refuted = automated
            .syntax_checks
            .iter()
            .filter(|c| c.outcome.is_refuted())
            .count();
        score -= 0.2 * refuted as f64;
    }
    clamp_unit(score)
}

/// Pure function of upstream results; no I/O
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfidenceScorer;

impl ConfidenceScorer {
    pub fn new() -> Self {
        Self
    }

    pub fn calculate_confidence(&self, prior: &PriorResults<'_>) -> AnswerConfidence {
        AnswerConfidence::new(
            source_verification_score(prior),
            recency_score(prior),
            community_consensus_score(prior),
            tool_verification_score(prior),
            syntax_validity_score(prior),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::FakeToolExecutor;
    use crate::context::CallContext;
    use crate::patterns::NixOSValidator;
    use crate::quality_scorer::AutomatedQualityScorer;
    use approx::assert_relative_eq;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_new_clamps_and_weights() {
        let c = AnswerConfidence::new(2.0, -1.0, f64::NAN, 0.5, 1.0);
        assert_eq!(c.source_verification(), 1.0);
        assert_eq!(c.recency(), 0.0);
        assert_eq!(c.community_consensus(), 0.0);
        assert_relative_eq!(c.overall(), 0.25 + 0.125 + 0.2);
    }

    #[test]
    fn test_neutral_overall() {
        assert_relative_eq!(AnswerConfidence::neutral().overall(), 0.5);
    }

    #[test]
    fn test_levels() {
        assert_eq!(ConfidenceLevel::from_score(0.95), ConfidenceLevel::Excellent);
        assert_eq!(ConfidenceLevel::from_score(0.8), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_score(0.6), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_score(0.45), ConfidenceLevel::Low);
        assert_eq!(ConfidenceLevel::from_score(0.1), ConfidenceLevel::VeryLow);
    }

    #[test]
    fn test_factors_and_explain() {
        let c = AnswerConfidence::new(0.4, 0.7, 0.5, 0.9, 0.9);
        let factors = c.factors();
        assert_eq!(factors.strongest, "Tool Verification");
        assert_eq!(factors.weakest, "Source Verification");
        assert_eq!(factors.pattern, ConfidencePattern::TechnicallyVerified);
        let text = c.explain();
        assert!(text.contains("Area for improvement: Source Verification"));
        assert!(text.contains("technically-verified"));
    }

    #[test]
    fn test_empty_prior_is_baseline() {
        let c = ConfidenceScorer::new().calculate_confidence(&PriorResults::default());
        assert_relative_eq!(c.source_verification(), 0.5);
        assert_relative_eq!(c.recency(), 0.7);
        assert_relative_eq!(c.community_consensus(), 0.5);
        assert_relative_eq!(c.tool_verification(), 0.5);
        assert_relative_eq!(c.syntax_validity(), 0.8);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_tools_stay_neutral() {
        let answer = "```nix\n{ environment.systemPackages = with pkgs; [ git ]; }\n```";
        let ctx = CallContext::new(Duration::from_secs(10), Duration::from_millis(50));
        let automated = AutomatedQualityScorer::new(Arc::new(FakeToolExecutor::hanging()))
            .score(&ctx, "q", answer)
            .await;
        let prior = PriorResults {
            automated: Some(&automated),
            ..Default::default()
        };
        let c = ConfidenceScorer::new().calculate_confidence(&prior);
        assert_eq!(c.tool_verification(), 0.5);
    }

    #[test]
    fn test_syntax_validity_penalties() {
        let nixos = NixOSValidator::new().validate("services.bluetooth.enable = true;");
        let prior = PriorResults {
            nixos: Some(&nixos),
            ..Default::default()
        };
        let c = ConfidenceScorer::new().calculate_confidence(&prior);
        // one incorrect option (-0.2) and high severity (-0.3)
        assert_relative_eq!(c.syntax_validity(), 0.3, epsilon = 1e-9);
    }
}
