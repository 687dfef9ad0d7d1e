//! Enhanced validator - runs every check over one (question, answer) pair.
//!
//! Collaborator-backed steps (pre-check, tool scoring, community search,
//! source verification) run concurrently under one [`CallContext`]. Fact
//! checking, cross-referencing and confidence scoring wait for all of them.
//! A failing collaborator only drops its step from `sources_consulted`;
//! the run itself never fails.

use crate::collaborators::{SearchCollaborator, SourceVerification, SourceVerifier, ToolExecutor};
use crate::community::{CommunityValidationResult, CommunityValidator};
use crate::confidence::{AnswerConfidence, ConfidenceScorer, CONFIDENCE_SCORER_NAME};
use crate::config::{ThresholdConfig, TimeoutConfig, ValidatorConfig};
use crate::context::CallContext;
use crate::cross_reference::{CrossReferenceResult, CrossReferenceValidator, PriorResults, CROSS_REFERENCE_NAME};
use crate::error::CollaboratorError;
use crate::fact_checker::{FactCheckResult, FactChecker, FactEvidence, FACT_CHECKER_NAME, SEARCH_NIXOS_SOURCE};
use crate::patterns::{flake, is_flake_content, is_nixos_content, nixos, FlakeValidator, NixOSValidator};
use crate::patterns::PatternValidationResult;
use crate::precheck::{PreAnswerValidation, PreAnswerValidator, PRECHECK_NAME};
use crate::quality_scorer::{AutomatedQualityScore, AutomatedQualityScorer, SCORER_NAME};
use crate::types::{dedup_preserving_order, QualityLevel, Severity, ValidationIssue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument, Span};

/// Label recorded when the community validator ran
pub const COMMUNITY_SOURCES: &str = "community-sources";

const DEFAULT_CONFIDENCE: f64 = 0.5;
const DEFAULT_AUTOMATED_SCORE: f64 = 50.0;

/// Which collaborators were wired in at build time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub tools: bool,
    pub search: bool,
    pub source_verification: bool,
}

impl Capabilities {
    pub fn is_offline(&self) -> bool {
        !self.tools && !self.search && !self.source_verification
    }
}

/// Everything one run found out about an answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancedValidationResult {
    pub question: String,
    pub is_accurate: bool,
    pub confidence_score: AnswerConfidence,
    pub quality_level: QualityLevel,
    pub sources_consulted: Vec<String>,
    pub quality_issues: Vec<ValidationIssue>,
    pub recommendations: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_answer_validation: Option<PreAnswerValidation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nixos_validation: Option<PatternValidationResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flake_validation: Option<PatternValidationResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub automated_score: Option<AutomatedQualityScore>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub community_validation: Option<CommunityValidationResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_verification: Option<SourceVerification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fact_check: Option<FactCheckResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cross_reference: Option<CrossReferenceResult>,

    pub validated_at: DateTime<Utc>,
    pub validation_time_ms: u64,
}

impl EnhancedValidationResult {
    pub fn issues_with_severity(&self, severity: Severity) -> impl Iterator<Item = &ValidationIssue> {
        self.quality_issues.iter().filter(move |i| i.severity == severity)
    }

    pub fn has_critical_issue(&self) -> bool {
        self.issues_with_severity(Severity::Critical).next().is_some()
    }
}

// ============================================================================
// Quality decision
// ============================================================================

/// Inputs to the quality-level decision
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualitySignals {
    pub critical_issues: usize,
    pub high_issues: usize,
    /// Overall confidence in `[0, 1]`
    pub confidence: f64,
    /// Automated score in `[0, 100]`
    pub automated_score: f64,
}

impl QualitySignals {
    pub fn from_issues(issues: &[ValidationIssue], confidence: f64, automated_score: f64) -> Self {
        Self {
            critical_issues: issues.iter().filter(|i| i.severity == Severity::Critical).count(),
            high_issues: issues.iter().filter(|i| i.severity == Severity::High).count(),
            confidence,
            automated_score,
        }
    }

    pub fn combined_score(&self) -> f64 {
        (self.confidence * 100.0 + self.automated_score) / 2.0
    }
}

/// Decision table, first matching row wins
pub fn decide_quality_level(signals: &QualitySignals, t: &ThresholdConfig) -> QualityLevel {
    if signals.critical_issues > 0 {
        return QualityLevel::Poor;
    }
    let combined = signals.combined_score();
    let automated = signals.automated_score;

    if signals.high_issues > t.high_issues_poor || combined < t.combined_poor || automated < t.automated_poor {
        return QualityLevel::Poor;
    }
    if signals.high_issues > t.high_issues_fair || combined < t.combined_fair || automated < t.automated_fair {
        return QualityLevel::Fair;
    }
    if combined >= t.combined_excellent && automated >= t.automated_excellent && signals.high_issues == 0 {
        return QualityLevel::Excellent;
    }
    QualityLevel::Good
}

// ============================================================================
// Builder
// ============================================================================

#[derive(Default)]
pub struct EnhancedValidatorBuilder {
    tools: Option<Arc<dyn ToolExecutor>>,
    search: Option<Arc<dyn SearchCollaborator>>,
    source_verifier: Option<Arc<dyn SourceVerifier>>,
    config: ValidatorConfig,
    instance: Option<String>,
}

impl EnhancedValidatorBuilder {
    pub fn tools(mut self, tools: Arc<dyn ToolExecutor>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn search(mut self, search: Arc<dyn SearchCollaborator>) -> Self {
        self.search = Some(search);
        self
    }

    pub fn source_verifier(mut self, verifier: Arc<dyn SourceVerifier>) -> Self {
        self.source_verifier = Some(verifier);
        self
    }

    pub fn config(mut self, config: ValidatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Label carried on the validator's tracing span
    pub fn instance(mut self, name: impl Into<String>) -> Self {
        self.instance = Some(name.into());
        self
    }

    pub fn build(self) -> EnhancedValidator {
        let capabilities = Capabilities {
            tools: self.tools.is_some(),
            search: self.search.is_some(),
            source_verification: self.source_verifier.is_some(),
        };
        let instance = self.instance.unwrap_or_else(|| "default".to_string());
        let span = info_span!("nixai.validator", instance = %instance);
        let thresholds = self.config.thresholds.clone();

        EnhancedValidator {
            precheck: self.search.clone().map(PreAnswerValidator::new),
            nixos: NixOSValidator::new(),
            flake: FlakeValidator::new(),
            scorer: self.tools.map(AutomatedQualityScorer::new),
            community: self.search.map(|s| CommunityValidator::new(s, &thresholds)),
            source_verifier: self.source_verifier,
            fact_checker: FactChecker::new(),
            cross_reference: CrossReferenceValidator::new(),
            confidence: ConfidenceScorer::new(),
            thresholds,
            timeouts: self.config.timeouts,
            capabilities,
            span,
        }
    }
}

// ============================================================================
// Validator
// ============================================================================

pub struct EnhancedValidator {
    precheck: Option<PreAnswerValidator>,
    nixos: NixOSValidator,
    flake: FlakeValidator,
    scorer: Option<AutomatedQualityScorer>,
    community: Option<CommunityValidator>,
    source_verifier: Option<Arc<dyn SourceVerifier>>,
    fact_checker: FactChecker,
    cross_reference: CrossReferenceValidator,
    confidence: ConfidenceScorer,
    thresholds: ThresholdConfig,
    timeouts: TimeoutConfig,
    capabilities: Capabilities,
    span: Span,
}

/// Collaborator-backed step outputs, gathered before fan-in
struct ConcurrentSteps {
    precheck: Option<PreAnswerValidation>,
    automated: Option<AutomatedQualityScore>,
    community: Option<CommunityValidationResult>,
    source_verification: Option<SourceVerification>,
}

fn keep_ok<T>(step: &str, result: Result<T, CollaboratorError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(step, code = e.code(), error = %e, "validation step skipped");
            None
        }
    }
}

fn pattern_issues(result: &PatternValidationResult, issue_type: &str, source: &str) -> Vec<ValidationIssue> {
    result
        .errors
        .iter()
        .map(|e| {
            ValidationIssue::new(
                issue_type,
                e.severity,
                format!("{}: {}", e.error_type, e.message),
                e.suggestion.clone(),
                source,
            )
        })
        .collect()
}

impl EnhancedValidator {
    pub fn builder() -> EnhancedValidatorBuilder {
        EnhancedValidatorBuilder::default()
    }

    /// Pattern checks, fact checking and scoring only
    pub fn offline(config: ValidatorConfig) -> Self {
        Self::builder().config(config).build()
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn thresholds(&self) -> &ThresholdConfig {
        &self.thresholds
    }

    /// A fresh context from the configured timeouts
    pub fn call_context(&self) -> CallContext {
        CallContext::new(self.timeouts.total(), self.timeouts.per_call())
    }

    /// Validate with a context built from the configured timeouts
    pub async fn validate(&self, question: &str, answer: &str) -> EnhancedValidationResult {
        let ctx = self.call_context();
        self.validate_answer(&ctx, question, answer).await
    }

    pub async fn validate_answer(&self, ctx: &CallContext, question: &str, answer: &str) -> EnhancedValidationResult {
        let run_span = info_span!(parent: &self.span, "validate_answer");
        self.run(ctx, question, answer).instrument(run_span).await
    }

    /// Pre-check alone, or `None` without a search collaborator
    pub async fn validate_question(
        &self,
        ctx: &CallContext,
        question: &str,
    ) -> Result<Option<PreAnswerValidation>, CollaboratorError> {
        match &self.precheck {
            Some(precheck) => precheck.validate_question(ctx, question).await.map(Some),
            None => Ok(None),
        }
    }

    /// Pattern validators only; no collaborators involved
    pub fn check_patterns(&self, answer: &str) -> (Option<PatternValidationResult>, Option<PatternValidationResult>) {
        let nixos = is_nixos_content(answer).then(|| self.nixos.validate(answer));
        let flake = is_flake_content(answer).then(|| self.flake.validate(answer));
        (nixos, flake)
    }

    async fn run(&self, ctx: &CallContext, question: &str, answer: &str) -> EnhancedValidationResult {
        let started = std::time::Instant::now();
        let validated_at = Utc::now();

        if answer.trim().is_empty() {
            return self.empty_answer_result(question, validated_at, started);
        }

        let (nixos_validation, flake_validation) = self.check_patterns(answer);
        let steps = self.run_concurrent_steps(ctx, question, answer).await;

        let mut sources = Vec::new();
        if steps.precheck.is_some() {
            sources.push(PRECHECK_NAME.to_string());
        }
        if nixos_validation.is_some() {
            sources.push(nixos::VALIDATOR_NAME.to_string());
        }
        if flake_validation.is_some() {
            sources.push(flake::VALIDATOR_NAME.to_string());
        }
        if steps.automated.is_some() {
            sources.push(SCORER_NAME.to_string());
        }
        if steps.community.is_some() {
            sources.push(COMMUNITY_SOURCES.to_string());
        }
        if steps.source_verification.is_some() {
            sources.push(SEARCH_NIXOS_SOURCE.to_string());
        }

        let evidence = FactEvidence {
            automated: steps.automated.as_ref(),
            source_verification: steps.source_verification.as_ref(),
            consulted: &sources,
        };
        let fact_check = self.fact_checker.check_facts(question, answer, &evidence);
        sources.push(FACT_CHECKER_NAME.to_string());

        let prior = PriorResults {
            precheck: steps.precheck.as_ref(),
            nixos: nixos_validation.as_ref(),
            flake: flake_validation.as_ref(),
            automated: steps.automated.as_ref(),
            community: steps.community.as_ref(),
            source_verification: steps.source_verification.as_ref(),
            facts: Some(&fact_check),
        };
        let cross_reference = self.cross_reference.validate_consistency(question, answer, &prior);
        sources.push(CROSS_REFERENCE_NAME.to_string());

        let confidence = self.confidence.calculate_confidence(&prior);
        sources.push(CONFIDENCE_SCORER_NAME.to_string());

        let mut issues = Vec::new();
        if let Some(result) = &nixos_validation {
            issues.extend(pattern_issues(result, "nixos-config", nixos::VALIDATOR_NAME));
        }
        if let Some(result) = &flake_validation {
            issues.extend(pattern_issues(result, "flake-syntax", flake::VALIDATOR_NAME));
        }
        if let Some(automated) = &steps.automated {
            issues.extend(automated.issues.iter().cloned());
        }
        issues.extend(fact_check.factual_errors.iter().map(|e| e.to_issue()));

        let patterns_valid = nixos_validation.as_ref().map_or(true, |r| r.is_valid)
            && flake_validation.as_ref().map_or(true, |r| r.is_valid);
        let is_accurate = patterns_valid && !issues.iter().any(|i| i.severity == Severity::Critical);

        let automated_score = steps
            .automated
            .as_ref()
            .map_or(DEFAULT_AUTOMATED_SCORE, |a| a.overall_score as f64);
        let signals = QualitySignals::from_issues(&issues, confidence.overall(), automated_score);
        let quality_level = decide_quality_level(&signals, &self.thresholds);

        let mut result = EnhancedValidationResult {
            question: question.to_string(),
            is_accurate,
            confidence_score: confidence,
            quality_level,
            sources_consulted: sources,
            quality_issues: issues,
            recommendations: Vec::new(),
            pre_answer_validation: steps.precheck,
            nixos_validation,
            flake_validation,
            automated_score: steps.automated,
            community_validation: steps.community,
            source_verification: steps.source_verification,
            fact_check: Some(fact_check),
            cross_reference: Some(cross_reference),
            validated_at,
            validation_time_ms: 0,
        };
        result.recommendations = recommendations(&result);
        result.validation_time_ms = started.elapsed().as_millis() as u64;

        info!(
            quality = %result.quality_level,
            confidence = result.confidence_score.overall(),
            sources = result.sources_consulted.len(),
            issues = result.quality_issues.len(),
            elapsed_ms = result.validation_time_ms,
            "Enhanced validation completed"
        );
        result
    }

    async fn run_concurrent_steps(&self, ctx: &CallContext, question: &str, answer: &str) -> ConcurrentSteps {
        let precheck = async {
            match &self.precheck {
                Some(p) => keep_ok(PRECHECK_NAME, p.validate_question(ctx, question).await),
                None => None,
            }
        };
        let automated = async {
            match &self.scorer {
                Some(s) => Some(s.score(ctx, question, answer).await),
                None => None,
            }
        };
        let community = async {
            match &self.community {
                Some(c) => keep_ok(COMMUNITY_SOURCES, c.validate(ctx, question, answer).await),
                None => None,
            }
        };
        let source_verification = async {
            match &self.source_verifier {
                Some(v) => keep_ok(
                    SEARCH_NIXOS_SOURCE,
                    ctx.run("verify_answer", v.verify_answer(answer)).await,
                ),
                None => None,
            }
        };

        let (precheck, automated, community, source_verification) =
            tokio::join!(precheck, automated, community, source_verification);
        ConcurrentSteps {
            precheck,
            automated,
            community,
            source_verification,
        }
    }

    fn empty_answer_result(
        &self,
        question: &str,
        validated_at: DateTime<Utc>,
        started: std::time::Instant,
    ) -> EnhancedValidationResult {
        warn!("empty answer, skipping validation");
        let issues = vec![ValidationIssue::new(
            "empty_answer",
            Severity::Medium,
            "The answer is empty",
            "Provide an answer to validate",
            "orchestrator",
        )];
        let confidence = AnswerConfidence::neutral();
        let signals = QualitySignals::from_issues(&issues, confidence.overall(), DEFAULT_AUTOMATED_SCORE);
        let mut result = EnhancedValidationResult {
            question: question.to_string(),
            is_accurate: false,
            confidence_score: confidence,
            quality_level: decide_quality_level(&signals, &self.thresholds),
            sources_consulted: Vec::new(),
            quality_issues: issues,
            recommendations: Vec::new(),
            pre_answer_validation: None,
            nixos_validation: None,
            flake_validation: None,
            automated_score: None,
            community_validation: None,
            source_verification: None,
            fact_check: None,
            cross_reference: None,
            validated_at,
            validation_time_ms: 0,
        };
        result.recommendations = recommendations(&result);
        result.validation_time_ms = started.elapsed().as_millis() as u64;
        result
    }
}

fn recommendations(result: &EnhancedValidationResult) -> Vec<String> {
    let mut recs = Vec::new();

    if result.confidence_score.overall() < 0.7 {
        recs.push("Consider seeking additional verification from official NixOS documentation".to_string());
    }
    if !result.quality_issues.is_empty() {
        recs.push("Review and address the identified quality issues before implementing".to_string());
    }
    if let Some(automated) = &result.automated_score {
        if !automated.tool_summary().failed_checks.is_empty() {
            recs.push("Verify the suggested commands work in your specific NixOS environment".to_string());
        }
    }
    if result
        .source_verification
        .as_ref()
        .is_some_and(|sv| sv.package_verification_failed)
    {
        recs.push("Double-check package names and availability in your NixOS channel".to_string());
    }

    if let Some(automated) = &result.automated_score {
        let b = &automated.breakdown;
        if automated.overall_score < 70 {
            recs.push("The automated validation suggests several improvements are needed".to_string());
        }
        if b.syntax < 20 {
            recs.push("Syntax validation failed - check Nix expression syntax and formatting".to_string());
        }
        if b.package < 15 {
            recs.push(
                "Package verification failed - ensure all referenced packages exist and are spelled correctly"
                    .to_string(),
            );
        }
        if b.option < 15 {
            recs.push(
                "Option validation failed - verify NixOS configuration options are valid and properly formatted"
                    .to_string(),
            );
        }
        if b.command < 7 {
            recs.push(
                "Command availability check failed - ensure all referenced commands are available on the system"
                    .to_string(),
            );
        }
        recs.extend(automated.recommendations.iter().cloned());
    }

    if let Some(community) = &result.community_validation {
        recs.extend(community.recommendations.iter().cloned());
    }
    if let Some(facts) = &result.fact_check {
        recs.extend(facts.recommendations.iter().cloned());
    }
    if let Some(cross) = &result.cross_reference {
        recs.extend(cross.recommended_sources.iter().cloned());
    }

    dedup_preserving_order(recs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{FakeBehavior, FakeSearch, FakeSourceVerifier, FakeToolExecutor};
    use std::time::Duration;

    fn thresholds() -> ThresholdConfig {
        ThresholdConfig::default()
    }

    fn signals(critical: usize, high: usize, confidence: f64, automated: f64) -> QualitySignals {
        QualitySignals {
            critical_issues: critical,
            high_issues: high,
            confidence,
            automated_score: automated,
        }
    }

    #[test]
    fn test_decision_table_rows() {
        let t = thresholds();
        assert_eq!(decide_quality_level(&signals(1, 0, 1.0, 100.0), &t), QualityLevel::Poor);
        assert_eq!(decide_quality_level(&signals(0, 3, 1.0, 100.0), &t), QualityLevel::Poor);
        assert_eq!(decide_quality_level(&signals(0, 0, 0.9, 39.0), &t), QualityLevel::Poor);
        assert_eq!(decide_quality_level(&signals(0, 2, 1.0, 100.0), &t), QualityLevel::Fair);
        assert_eq!(decide_quality_level(&signals(0, 0, 0.5, 50.0), &t), QualityLevel::Fair);
        assert_eq!(decide_quality_level(&signals(0, 0, 0.9, 90.0), &t), QualityLevel::Excellent);
        assert_eq!(decide_quality_level(&signals(0, 1, 0.9, 90.0), &t), QualityLevel::Good);
        assert_eq!(decide_quality_level(&signals(0, 0, 0.8, 70.0), &t), QualityLevel::Good);
    }

    #[test]
    fn test_thresholds_come_from_config() {
        let t = ThresholdConfig {
            combined_fair: 40.0,
            automated_fair: 45.0,
            ..ThresholdConfig::default()
        };
        assert_eq!(decide_quality_level(&signals(0, 0, 0.5, 50.0), &t), QualityLevel::Good);
    }

    #[tokio::test]
    async fn test_empty_answer_short_circuits() {
        let tools = FakeToolExecutor::new();
        let validator = EnhancedValidator::builder().tools(Arc::new(tools.clone())).build();
        let result = validator.validate("How do I enable ssh?", "   \n").await;

        assert!(!result.is_accurate);
        assert_eq!(result.quality_level, QualityLevel::Fair);
        assert_eq!(result.confidence_score, AnswerConfidence::neutral());
        assert!(result.sources_consulted.is_empty());
        assert_eq!(result.quality_issues.len(), 1);
        assert_eq!(result.quality_issues[0].issue_type, "empty_answer");
        assert_eq!(tools.call_count("check_syntax"), 0);
    }

    #[tokio::test]
    async fn test_offline_run_lists_pure_steps() {
        let validator = EnhancedValidator::offline(ValidatorConfig::default());
        assert!(validator.capabilities().is_offline());

        let result = validator
            .validate("bluetooth?", "Add `services.bluetooth.enable = true;` to configuration.nix")
            .await;
        assert_eq!(
            result.sources_consulted,
            vec![nixos::VALIDATOR_NAME, FACT_CHECKER_NAME, CROSS_REFERENCE_NAME, CONFIDENCE_SCORER_NAME]
        );
        assert!(!result.is_accurate);
        assert!(result
            .quality_issues
            .iter()
            .any(|i| i.issue_type == "nixos-config" && i.severity == Severity::High));
    }

    #[tokio::test]
    async fn test_failed_collaborators_are_left_out() {
        let validator = EnhancedValidator::builder()
            .search(Arc::new(FakeSearch::new().with_behavior(FakeBehavior::Unavailable)))
            .source_verifier(Arc::new(
                FakeSourceVerifier::new(SourceVerification::default()).with_behavior(FakeBehavior::Unavailable),
            ))
            .build();
        let result = validator
            .validate("How do I enable ssh?", "Set services.openssh.enable = true; and rebuild.")
            .await;

        assert!(!result.sources_consulted.iter().any(|s| s == PRECHECK_NAME));
        assert!(!result.sources_consulted.iter().any(|s| s == COMMUNITY_SOURCES));
        assert!(!result.sources_consulted.iter().any(|s| s == SEARCH_NIXOS_SOURCE));
        assert!(result.sources_consulted.iter().any(|s| s == CONFIDENCE_SCORER_NAME));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_tools_do_not_block_the_run() {
        let validator = EnhancedValidator::builder()
            .tools(Arc::new(FakeToolExecutor::hanging()))
            .build();
        let ctx = CallContext::new(Duration::from_secs(5), Duration::from_millis(100));
        let answer = "```nix\n{ environment.systemPackages = with pkgs; [ git ]; }\n```";
        let result = validator.validate_answer(&ctx, "git?", answer).await;

        assert!(result.automated_score.is_some());
        assert_eq!(result.confidence_score.tool_verification(), 0.5);
    }

    #[tokio::test]
    async fn test_recommendations_are_deduplicated() {
        let validator = EnhancedValidator::builder()
            .tools(Arc::new(FakeToolExecutor::new()))
            .build();
        let result = validator.validate("q", "Just read the manual.").await;
        let mut seen = std::collections::HashSet::new();
        assert!(result.recommendations.iter().all(|r| seen.insert(r.clone())));
    }

    #[tokio::test]
    async fn test_validate_question_without_search() {
        let validator = EnhancedValidator::offline(ValidatorConfig::default());
        let ctx = CallContext::default();
        assert!(validator.validate_question(&ctx, "ssh?").await.unwrap().is_none());
    }
}
