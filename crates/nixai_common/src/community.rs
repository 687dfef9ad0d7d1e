//! Community validation against wiki search results.
//!
//! Confidence starts at 0.5. Every hit whose snippet overlaps the answer
//! enough nudges it up by a tenth of the hit's relevance; every phrase pair
//! where a highly relevant page says the opposite of the answer pulls it
//! down by 0.1.

use crate::collaborators::{SearchCollaborator, SearchHit};
use crate::config::ThresholdConfig;
use crate::context::CallContext;
use crate::error::CollaboratorError;
use crate::extract;
use crate::types::{clamp_unit, Severity, ValidationIssue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

pub const COMMUNITY_NAME: &str = "community-validation";

const BASE_CONFIDENCE: f64 = 0.5;
const MAX_TERMS: usize = 3;
const FALLBACK_WORDS: usize = 5;
const MAX_PAGES: usize = 3;
const PAGE_RELEVANCE: f64 = 0.6;
const ALIGNED_HIT_WEIGHT: f64 = 0.1;
const CONTRADICTION_PENALTY: f64 = 0.1;

/// Known domain terms, searched when present in the answer
pub const COMMUNITY_TERMS: &[&str] = &[
    "configuration.nix",
    "home-manager",
    "flake.nix",
    "nixpkgs",
    "systemd",
    "services",
    "packages",
    "overlay",
    "derivation",
];

/// (negative, positive) phrase pairs that contradict each other
const CONTRADICTORY_PHRASES: &[(&str, &str)] = &[
    ("deprecated", "recommended"),
    ("not supported", "supported"),
    ("doesn't work", "works"),
    ("impossible", "possible"),
    ("never", "always"),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedSource {
    pub title: String,
    pub url: String,
    pub relevance: f64,
    pub alignment: f64,
}

/// A page that states the opposite of the answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageContradiction {
    pub title: String,
    pub answer_phrase: String,
    pub page_phrase: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityValidationResult {
    pub is_valid: bool,
    pub confidence: f64,
    pub community_consensus: f64,
    pub search_terms: Vec<String>,
    pub aligned_sources: Vec<AlignedSource>,
    pub page_contradictions: Vec<PageContradiction>,
    pub issues: Vec<ValidationIssue>,
    pub recommendations: Vec<String>,
}

/// Known terms present, else quoted strings, else leading words
pub fn search_terms(answer: &str) -> Vec<String> {
    let lower = answer.to_lowercase();
    let known: Vec<String> = COMMUNITY_TERMS
        .iter()
        .filter(|term| lower.contains(*term))
        .map(|term| term.to_string())
        .collect();

    let terms = if !known.is_empty() {
        known
    } else {
        let quoted = extract::quoted_strings(answer);
        if !quoted.is_empty() {
            quoted
        } else {
            extract::significant_words(answer)
                .into_iter()
                .take(FALLBACK_WORDS)
                .collect()
        }
    };
    terms.into_iter().take(MAX_TERMS).collect()
}

/// Share of the answer's significant words found in a snippet
pub fn alignment(answer_words: &[String], snippet: &str) -> f64 {
    if answer_words.is_empty() {
        return 0.0;
    }
    let snippet = snippet.to_lowercase();
    let found = answer_words
        .iter()
        .filter(|w| snippet.contains(w.as_str()))
        .count();
    found as f64 / answer_words.len() as f64
}

/// Whether `positive` appears outside occurrences of `negative`
fn uses_positive(text: &str, negative: &str, positive: &str) -> bool {
    let total = text.matches(positive).count();
    if negative.contains(positive) {
        total > text.matches(negative).count()
    } else {
        total > 0
    }
}

/// Phrase pairs where the answer and the page take opposite sides
pub fn contradictory_phrases(answer: &str, page: &str) -> Vec<(String, String)> {
    let answer = answer.to_lowercase();
    let page = page.to_lowercase();
    let mut found = Vec::new();
    for (negative, positive) in CONTRADICTORY_PHRASES {
        if answer.contains(negative) && uses_positive(&page, negative, positive) {
            found.push((negative.to_string(), positive.to_string()));
        } else if uses_positive(&answer, negative, positive) && page.contains(negative) {
            found.push((positive.to_string(), negative.to_string()));
        }
    }
    found
}

pub struct CommunityValidator {
    search: Arc<dyn SearchCollaborator>,
    min_confidence: f64,
    alignment_threshold: f64,
}

impl CommunityValidator {
    pub fn new(search: Arc<dyn SearchCollaborator>, thresholds: &ThresholdConfig) -> Self {
        Self {
            search,
            min_confidence: thresholds.community_min_confidence,
            alignment_threshold: thresholds.alignment_threshold,
        }
    }

    /// Fails only when every search call failed
    pub async fn validate(
        &self,
        ctx: &CallContext,
        _question: &str,
        answer: &str,
    ) -> Result<CommunityValidationResult, CollaboratorError> {
        let terms = search_terms(answer);
        let answer_words = extract::significant_words(answer);
        let mut confidence = BASE_CONFIDENCE;
        let mut aligned: Vec<(AlignedSource, SearchHit)> = Vec::new();
        let mut failures = 0usize;
        let mut last_error = None;

        for term in &terms {
            match ctx.run("search", self.search.search(term)).await {
                Ok(hits) => {
                    for hit in hits {
                        let score = alignment(&answer_words, &hit.snippet);
                        if score > self.alignment_threshold {
                            confidence = clamp_unit(confidence + ALIGNED_HIT_WEIGHT * hit.relevance);
                            let source = AlignedSource {
                                title: hit.title.clone(),
                                url: hit.url.clone(),
                                relevance: hit.relevance,
                                alignment: score,
                            };
                            aligned.push((source, hit));
                        }
                    }
                }
                Err(e) => {
                    warn!(term = %term, error = %e, "community search failed");
                    failures += 1;
                    last_error = Some(e);
                }
            }
        }

        if !terms.is_empty() && failures == terms.len() {
            if let Some(e) = last_error {
                return Err(e);
            }
        }

        let page_contradictions = self.check_pages(ctx, answer, &aligned).await;
        confidence = clamp_unit(confidence - CONTRADICTION_PENALTY * page_contradictions.len() as f64);

        let is_valid = confidence >= self.min_confidence;
        let mut issues = Vec::new();
        let mut recommendations = Vec::new();
        if !is_valid {
            issues.push(ValidationIssue::new(
                "low_community_confidence",
                Severity::Medium,
                format!("Community sources offer little support for this answer ({:.0}%)", confidence * 100.0),
                "Cross-check the answer against the NixOS wiki and manual",
                COMMUNITY_NAME,
            ));
            recommendations.push("Consider cross-referencing with official documentation".to_string());
        }

        debug!(
            terms = terms.len(),
            aligned = aligned.len(),
            contradictions = page_contradictions.len(),
            confidence,
            "community validation"
        );

        Ok(CommunityValidationResult {
            is_valid,
            confidence,
            community_consensus: confidence,
            search_terms: terms,
            aligned_sources: aligned.into_iter().map(|(source, _)| source).collect(),
            page_contradictions,
            issues,
            recommendations,
        })
    }

    async fn check_pages(
        &self,
        ctx: &CallContext,
        answer: &str,
        aligned: &[(AlignedSource, SearchHit)],
    ) -> Vec<PageContradiction> {
        let mut seen = BTreeSet::new();
        let titles: Vec<&str> = aligned
            .iter()
            .filter(|(source, _)| source.relevance > PAGE_RELEVANCE)
            .map(|(_, hit)| hit.title.as_str())
            .filter(|title| seen.insert(*title))
            .take(MAX_PAGES)
            .collect();

        let mut contradictions = Vec::new();
        for title in titles {
            let page = match ctx.run("get_page", self.search.get_page(title)).await {
                Ok(page) => page,
                Err(e) => {
                    debug!(title, error = %e, "page fetch skipped");
                    continue;
                }
            };
            for (answer_phrase, page_phrase) in contradictory_phrases(answer, &page.content) {
                contradictions.push(PageContradiction {
                    title: page.title.clone(),
                    answer_phrase,
                    page_phrase,
                });
            }
        }
        contradictions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{FakeBehavior, FakeSearch};
    use approx::assert_relative_eq;

    fn validator(search: FakeSearch) -> CommunityValidator {
        CommunityValidator::new(Arc::new(search), &ThresholdConfig::default())
    }

    #[test]
    fn test_search_terms_fallbacks() {
        assert_eq!(
            search_terms("Edit configuration.nix and add to environment packages via nixpkgs"),
            vec!["configuration.nix", "nixpkgs", "packages"]
        );
        assert_eq!(search_terms(r#"Set "hardware.bluetooth.enable" to true"#), vec!["hardware.bluetooth.enable"]);
        assert_eq!(search_terms("Reboot your machine after the upgrade"), vec!["reboot", "your", "machine"]);
    }

    #[test]
    fn test_alignment() {
        let words = extract::significant_words("enable bluetooth with hardware option");
        assert_relative_eq!(alignment(&words, "Set hardware.bluetooth.enable"), 0.6);
        assert_eq!(alignment(&[], "anything"), 0.0);
    }

    #[test]
    fn test_contradictory_phrases() {
        assert_eq!(
            contradictory_phrases("This is not supported on ARM", "Fully supported on ARM"),
            vec![("not supported".to_string(), "supported".to_string())]
        );
        // "supported" only inside "not supported" on both sides
        assert!(contradictory_phrases("not supported", "not supported").is_empty());
        assert_eq!(
            contradictory_phrases("It is possible to do this", "This is impossible"),
            vec![("possible".to_string(), "impossible".to_string())]
        );
    }

    #[tokio::test]
    async fn test_aligned_hits_raise_confidence() {
        let answer = "Enable the OpenSSH daemon in configuration.nix with services.openssh.enable";
        let search = FakeSearch::new().with_default_hits(vec![
            FakeSearch::hit("SSH", "enable the openssh daemon in configuration.nix", 1.0),
            FakeSearch::hit("Unrelated", "gnome themes", 0.9),
        ]);
        let result = validator(search).validate(&CallContext::default(), "q", answer).await.unwrap();

        // two known terms, one aligned hit each
        assert_eq!(result.search_terms, vec!["configuration.nix", "services"]);
        assert_eq!(result.aligned_sources.len(), 2);
        assert_relative_eq!(result.confidence, 0.7);
        assert!(result.is_valid);
        assert!(result.issues.is_empty());
    }

    #[tokio::test]
    async fn test_page_contradiction_lowers_confidence() {
        let answer = "Using services.xserver is deprecated in configuration.nix, do not enable it";
        let search = FakeSearch::new()
            .with_default_hits(vec![FakeSearch::hit(
                "Xserver",
                "services xserver deprecated configuration.nix enable",
                0.9,
            )])
            .with_page("Xserver", "services.xserver is the recommended way to get a desktop");
        let result = validator(search.clone())
            .validate(&CallContext::default(), "q", answer)
            .await
            .unwrap();

        assert_eq!(result.page_contradictions.len(), 1);
        assert_eq!(search.call_count("get_page"), 1);
        assert!(result.confidence < 0.6);
        assert!(!result.is_valid);
        assert_eq!(result.issues[0].issue_type, "low_community_confidence");
    }

    #[tokio::test]
    async fn test_all_searches_failing_is_error() {
        let search = FakeSearch::new().with_behavior(FakeBehavior::Unavailable);
        let result = validator(search)
            .validate(&CallContext::default(), "q", "Use nixpkgs overlays")
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_no_hits_is_low_confidence() {
        let result = validator(FakeSearch::new())
            .validate(&CallContext::default(), "q", "Use nixpkgs overlays")
            .await
            .unwrap();
        assert_relative_eq!(result.confidence, 0.5);
        assert!(!result.is_valid);
        assert_eq!(result.recommendations.len(), 1);
    }
}
