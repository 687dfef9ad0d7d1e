//! Pre-answer check: what does the wiki know about this question?
//!
//! Runs against the question alone, before any answer is judged. It pulls
//! NixOS terms out of the question, looks the top ones up through the
//! search collaborator, flags deprecated idioms the user already typed,
//! and suggests the options that usually answer such a question.

use crate::collaborators::SearchCollaborator;
use crate::context::CallContext;
use crate::error::CollaboratorError;
use crate::extract;
use crate::types::{dedup_preserving_order, Severity, ValidationIssue};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, LazyLock};
use tracing::{debug, warn};

pub const PRECHECK_NAME: &str = "pre-answer-validation";
pub const WIKI_SOURCE_KIND: &str = "nixos-wiki";

const MAX_SEARCH_TERMS: usize = 3;
const RELEVANT_SOURCE: f64 = 0.5;
const HIGH_CONFIDENCE_SOURCES: usize = 3;

/// Terms the pre-check recognises, in priority order
pub const NIXOS_TERMS: &[&str] = &[
    "bluetooth",
    "audio",
    "sound",
    "wifi",
    "wireless",
    "network",
    "ssh",
    "openssh",
    "firewall",
    "graphics",
    "opengl",
    "nvidia",
    "docker",
    "virtualisation",
    "services",
    "hardware",
    "networking",
    "environment",
    "flake",
    "configuration",
    "nixpkgs",
    "systempackages",
    "enable",
];

/// Options that usually answer a question about a term
const OPTION_SUGGESTIONS: &[(&str, &[&str])] = &[
    ("bluetooth", &["hardware.bluetooth.enable", "services.blueman.enable"]),
    (
        "audio",
        &["sound.enable", "hardware.pulseaudio.enable", "services.pipewire.enable"],
    ),
    (
        "sound",
        &["sound.enable", "hardware.pulseaudio.enable", "services.pipewire.enable"],
    ),
    ("wifi", &["networking.wireless.enable", "networking.networkmanager.enable"]),
    ("ssh", &["services.openssh.enable"]),
    ("firewall", &["networking.firewall.enable"]),
    ("graphics", &["hardware.opengl.enable", "services.xserver.videoDrivers"]),
    ("docker", &["virtualisation.docker.enable"]),
];

struct DeprecatedIdiom {
    pattern: &'static str,
    issue_type: &'static str,
    message: &'static str,
    suggestion: &'static str,
    severity: Severity,
}

const DEPRECATED_IDIOMS: &[DeprecatedIdiom] = &[
    DeprecatedIdiom {
        pattern: r"services\.bluetooth\.enable",
        issue_type: "deprecated_option",
        message: "services.bluetooth.enable is not a NixOS option",
        suggestion: "Use hardware.bluetooth.enable instead",
        severity: Severity::Critical,
    },
    DeprecatedIdiom {
        pattern: r"nix-env\s+-[iuq]",
        issue_type: "deprecated_command",
        message: "nix-env is an imperative package manager",
        suggestion: "Declare packages in environment.systemPackages instead",
        severity: Severity::High,
    },
    DeprecatedIdiom {
        pattern: r"services\.audio\.enable",
        issue_type: "deprecated_option",
        message: "services.audio.enable is not a NixOS option",
        suggestion: "Use sound.enable with hardware.pulseaudio or services.pipewire",
        severity: Severity::Critical,
    },
];

static DEPRECATED: LazyLock<Vec<(Regex, &'static DeprecatedIdiom)>> = LazyLock::new(|| {
    DEPRECATED_IDIOMS
        .iter()
        .filter_map(|idiom| Regex::new(idiom.pattern).ok().map(|re| (re, idiom)))
        .collect()
});

/// How much documentation backs the question
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceConfidence {
    Low,
    Medium,
    High,
}

impl SourceConfidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceConfidence::Low => "low",
            SourceConfidence::Medium => "medium",
            SourceConfidence::High => "high",
        }
    }
}

/// A document that speaks to the question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedSource {
    pub kind: String,
    pub url: String,
    pub title: String,
    pub relevance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreAnswerValidation {
    pub question: String,
    pub extracted_terms: Vec<String>,
    pub verified_sources: Vec<VerifiedSource>,
    pub suggested_options: Vec<String>,
    pub warnings: Vec<ValidationIssue>,
    pub confidence: SourceConfidence,
}

impl PreAnswerValidation {
    pub fn relevant_source_count(&self) -> usize {
        self.verified_sources
            .iter()
            .filter(|s| s.relevance > RELEVANT_SOURCE)
            .count()
    }

    pub fn has_critical_warning(&self) -> bool {
        self.warnings.iter().any(|w| w.severity == Severity::Critical)
    }
}

/// Recognised terms in table order
pub fn extract_terms(question: &str) -> Vec<String> {
    let lower = question.to_lowercase();
    NIXOS_TERMS
        .iter()
        .filter(|term| lower.contains(*term))
        .map(|term| term.to_string())
        .collect()
}

/// Option suggestions for the extracted terms, deduplicated
pub fn suggested_options(terms: &[String]) -> Vec<String> {
    let suggestions = terms
        .iter()
        .flat_map(|term| {
            OPTION_SUGGESTIONS
                .iter()
                .filter(move |(key, _)| *key == term.as_str())
                .flat_map(|(_, options)| options.iter().map(|o| o.to_string()))
        })
        .collect();
    dedup_preserving_order(suggestions)
}

/// Share of the question's significant words found in a hit
fn question_relevance(question_words: &[String], title: &str, snippet: &str) -> f64 {
    if question_words.is_empty() {
        return 0.0;
    }
    let haystack = format!("{} {}", title, snippet).to_lowercase();
    let found = question_words
        .iter()
        .filter(|w| haystack.contains(w.as_str()))
        .count();
    found as f64 / question_words.len() as f64
}

fn deprecated_warnings(question: &str) -> Vec<ValidationIssue> {
    DEPRECATED
        .iter()
        .filter(|(re, _)| re.is_match(question))
        .map(|(_, idiom)| {
            ValidationIssue::new(
                idiom.issue_type,
                idiom.severity,
                idiom.message,
                idiom.suggestion,
                PRECHECK_NAME,
            )
        })
        .collect()
}

fn confidence_level(warnings: &[ValidationIssue], relevant_sources: usize) -> SourceConfidence {
    if warnings.iter().any(|w| w.severity == Severity::Critical) {
        SourceConfidence::Low
    } else if relevant_sources >= HIGH_CONFIDENCE_SOURCES {
        SourceConfidence::High
    } else if relevant_sources >= 1 {
        SourceConfidence::Medium
    } else {
        SourceConfidence::Low
    }
}

pub struct PreAnswerValidator {
    search: Arc<dyn SearchCollaborator>,
}

impl PreAnswerValidator {
    pub fn new(search: Arc<dyn SearchCollaborator>) -> Self {
        Self { search }
    }

    /// Fails only when every search call failed
    pub async fn validate_question(
        &self,
        ctx: &CallContext,
        question: &str,
    ) -> Result<PreAnswerValidation, CollaboratorError> {
        let terms = extract_terms(question);
        let question_words = extract::significant_words(question);
        let mut verified_sources = Vec::new();
        let mut failures = 0usize;
        let mut last_error = None;

        let searched: Vec<&String> = terms.iter().take(MAX_SEARCH_TERMS).collect();
        for term in &searched {
            match ctx.run("search", self.search.search(term)).await {
                Ok(hits) => {
                    debug!(term = %term, hits = hits.len(), "pre-check search");
                    verified_sources.extend(hits.into_iter().map(|hit| VerifiedSource {
                        kind: WIKI_SOURCE_KIND.to_string(),
                        relevance: question_relevance(&question_words, &hit.title, &hit.snippet),
                        url: hit.url,
                        title: hit.title,
                    }));
                }
                Err(e) => {
                    warn!(term = %term, error = %e, "pre-check search failed");
                    failures += 1;
                    last_error = Some(e);
                }
            }
        }

        if !searched.is_empty() && failures == searched.len() {
            if let Some(e) = last_error {
                return Err(e);
            }
        }

        let mut warnings = deprecated_warnings(question);
        if terms.is_empty() {
            warnings.push(ValidationIssue::new(
                "insufficient_context",
                Severity::Medium,
                "Question mentions no recognisable NixOS terms",
                "Name the service, hardware or package the question is about",
                PRECHECK_NAME,
            ));
        }

        let relevant = verified_sources
            .iter()
            .filter(|s| s.relevance > RELEVANT_SOURCE)
            .count();
        let confidence = confidence_level(&warnings, relevant);

        Ok(PreAnswerValidation {
            question: question.to_string(),
            suggested_options: suggested_options(&terms),
            extracted_terms: terms,
            verified_sources,
            warnings,
            confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{FakeBehavior, FakeSearch};
    use approx::assert_relative_eq;

    #[test]
    fn test_extract_terms_in_table_order() {
        let terms = extract_terms("How do I enable Bluetooth and SSH on NixOS?");
        assert_eq!(terms, vec!["bluetooth", "ssh", "enable"]);
        assert!(extract_terms("What is the meaning of life?").is_empty());
    }

    #[test]
    fn test_suggested_options_dedup() {
        let terms = vec!["audio".to_string(), "sound".to_string(), "ssh".to_string()];
        assert_eq!(
            suggested_options(&terms),
            vec![
                "sound.enable",
                "hardware.pulseaudio.enable",
                "services.pipewire.enable",
                "services.openssh.enable"
            ]
        );
    }

    #[test]
    fn test_question_relevance() {
        let words = extract::significant_words("enable bluetooth headset");
        assert_relative_eq!(question_relevance(&words, "Bluetooth", "enable it"), 2.0 / 3.0);
        assert_eq!(question_relevance(&[], "Bluetooth", ""), 0.0);
    }

    #[tokio::test]
    async fn test_high_confidence_with_three_relevant_sources() {
        let hits = vec![
            FakeSearch::hit("Bluetooth", "how to enable bluetooth", 0.9),
            FakeSearch::hit("Bluetooth headsets", "enable bluetooth audio", 0.8),
            FakeSearch::hit("Blueman", "bluetooth manager you can enable", 0.7),
        ];
        let search = FakeSearch::new().with_default_hits(hits);
        let validator = PreAnswerValidator::new(Arc::new(search));
        let result = validator
            .validate_question(&CallContext::default(), "How to enable bluetooth?")
            .await
            .unwrap();

        assert_eq!(result.extracted_terms, vec!["bluetooth", "enable"]);
        // two terms searched, three hits each
        assert_eq!(result.verified_sources.len(), 6);
        assert_eq!(result.confidence, SourceConfidence::High);
        assert!(result.suggested_options.contains(&"hardware.bluetooth.enable".to_string()));
    }

    #[tokio::test]
    async fn test_critical_idiom_forces_low() {
        let search = FakeSearch::new().with_default_hits(vec![FakeSearch::hit(
            "Bluetooth",
            "services bluetooth enable",
            0.9,
        )]);
        let validator = PreAnswerValidator::new(Arc::new(search));
        let result = validator
            .validate_question(&CallContext::default(), "Why does services.bluetooth.enable fail?")
            .await
            .unwrap();
        assert!(result.has_critical_warning());
        assert_eq!(result.confidence, SourceConfidence::Low);
    }

    #[tokio::test]
    async fn test_no_terms_is_insufficient_context() {
        let search = FakeSearch::new();
        let validator = PreAnswerValidator::new(Arc::new(search.clone()));
        let result = validator
            .validate_question(&CallContext::default(), "What is the meaning of life?")
            .await
            .unwrap();
        assert_eq!(result.warnings[0].issue_type, "insufficient_context");
        assert_eq!(result.confidence, SourceConfidence::Low);
        assert_eq!(search.call_count("search"), 0);
    }

    #[tokio::test]
    async fn test_all_searches_failing_is_error() {
        let search = FakeSearch::new().with_behavior(FakeBehavior::Unavailable);
        let validator = PreAnswerValidator::new(Arc::new(search));
        let err = validator
            .validate_question(&CallContext::default(), "Set up the firewall")
            .await
            .unwrap_err();
        assert!(matches!(err, CollaboratorError::Unavailable(_)));
    }
}
