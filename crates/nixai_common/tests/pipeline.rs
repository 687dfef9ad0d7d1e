//! End-to-end pipeline behavior: golden quality levels, determinism,
//! contradiction bookkeeping and source ordering.

use nixai_common::collaborators::{
    FakeSearch, FakeSourceVerifier, FakeToolExecutor, SourceVerification, VerifiedPackage,
};
use nixai_common::orchestrator::COMMUNITY_SOURCES;
use nixai_common::{EnhancedValidationResult, EnhancedValidator, QualityLevel, ValidatorConfig};
use std::collections::HashSet;
use std::sync::Arc;

const CONFIG_ANSWER: &str = "Add this to configuration.nix:\n\
    ```nix\n{ config, pkgs, ... }:\n{\n  services.openssh.enable = true;\n  environment.systemPackages = with pkgs; [ git htop ];\n}\n```\n\
    Then apply it with `sudo nixos-rebuild switch`.";

fn full_validator() -> EnhancedValidator {
    let tools = FakeToolExecutor::new()
        .with_package("git", true)
        .with_package("htop", true)
        .with_option("services.openssh.enable", true)
        .with_option("environment.systemPackages", true)
        .with_command("nixos-rebuild", true);
    let search = FakeSearch::new().with_default_hits(vec![
        FakeSearch::hit("SSH", "Enable services.openssh in configuration.nix and rebuild", 0.9),
        FakeSearch::hit("Packages", "List packages in environment.systemPackages with pkgs", 0.8),
    ]);
    let verification = SourceVerification {
        packages_verified: ["git", "htop"]
            .iter()
            .map(|n| VerifiedPackage {
                name: n.to_string(),
                version: "1.0".to_string(),
                description: format!("{} package", n),
            })
            .collect(),
        ..Default::default()
    }
    .finalize();

    EnhancedValidator::builder()
        .tools(Arc::new(tools))
        .search(Arc::new(search))
        .source_verifier(Arc::new(FakeSourceVerifier::new(verification)))
        .instance("pipeline-test")
        .build()
}

fn without_timing(result: &EnhancedValidationResult) -> serde_json::Value {
    let mut value = serde_json::to_value(result).unwrap();
    let map = value.as_object_mut().unwrap();
    map.remove("validated_at");
    map.remove("validation_time_ms");
    value
}

#[tokio::test]
async fn test_same_input_same_result() {
    let validator = full_validator();
    let first = validator.validate("How do I enable ssh?", CONFIG_ANSWER).await;
    let second = validator.validate("How do I enable ssh?", CONFIG_ANSWER).await;

    assert_eq!(
        serde_json::to_string(&without_timing(&first)).unwrap(),
        serde_json::to_string(&without_timing(&second)).unwrap()
    );
}

#[tokio::test]
async fn test_sources_follow_canonical_order() {
    let result = full_validator().validate("How do I enable ssh?", CONFIG_ANSWER).await;
    let canonical = [
        "pre-answer-validation",
        "nixos-validator",
        "flake-validator",
        "automated-quality-scorer",
        COMMUNITY_SOURCES,
        "search-nixos-org",
        "fact-checker",
        "cross-reference",
        "confidence-scorer",
    ];
    let positions: Vec<usize> = result
        .sources_consulted
        .iter()
        .map(|s| canonical.iter().position(|c| c == s).expect("unknown source label"))
        .collect();

    assert!(positions.windows(2).all(|w| w[0] < w[1]), "{:?}", result.sources_consulted);
    assert!(result.sources_consulted.iter().any(|s| s == "automated-quality-scorer"));
    assert!(result.sources_consulted.iter().any(|s| s == "search-nixos-org"));
}

#[tokio::test]
async fn test_contradictions_recorded_once_per_pair() {
    let answer = "Put `environment.systemPackages = with pkgs; [ notapkg ];` into configuration.nix.";
    let verification = SourceVerification {
        packages_verified: vec![VerifiedPackage {
            name: "notapkg".to_string(),
            version: String::new(),
            description: "listed upstream".to_string(),
        }],
        ..Default::default()
    }
    .finalize();
    let validator = EnhancedValidator::builder()
        .tools(Arc::new(FakeToolExecutor::new().with_package("notapkg", false)))
        .source_verifier(Arc::new(FakeSourceVerifier::new(verification)))
        .build();

    let result = validator.validate("q", answer).await;
    let cross = result.cross_reference.unwrap();
    assert!(!cross.contradictions.is_empty());

    let mut keys = HashSet::new();
    for c in &cross.contradictions {
        assert_ne!(c.source1, c.source2);
        let (a, b) = if c.source1 <= c.source2 {
            (c.source1.clone(), c.source2.clone())
        } else {
            (c.source2.clone(), c.source1.clone())
        };
        assert!(
            keys.insert((c.contradiction_type.clone(), a, b, c.subject.clone())),
            "duplicate contradiction: {:?}",
            c
        );
    }
}

#[tokio::test]
async fn test_golden_critical_issue_is_poor() {
    let validator = full_validator();
    let result = validator
        .validate("How do I install git?", "Skip configuration.nix and just run sudo apt install git.")
        .await;

    assert!(result.has_critical_issue());
    assert!(!result.is_accurate);
    assert_eq!(result.quality_level, QualityLevel::Poor);
}

#[tokio::test]
async fn test_golden_offline_wrong_option_is_poor() {
    let validator = EnhancedValidator::offline(ValidatorConfig::default());
    let result = validator
        .validate("bluetooth?", "Add `services.bluetooth.enable = true;` to configuration.nix")
        .await;

    assert!(!result.is_accurate);
    assert_eq!(result.quality_level, QualityLevel::Poor);
}

#[tokio::test]
async fn test_golden_offline_clean_answer_is_fair() {
    let validator = EnhancedValidator::offline(ValidatorConfig::default());
    let result = validator
        .validate(
            "ssh?",
            "Set `services.openssh.enable = true;` in configuration.nix and run nixos-rebuild switch.",
        )
        .await;

    assert!(result.is_accurate);
    assert_eq!(result.quality_level, QualityLevel::Fair);
}

#[tokio::test]
async fn test_golden_empty_answer_is_fair() {
    let result = full_validator().validate("ssh?", "").await;
    assert_eq!(result.quality_level, QualityLevel::Fair);
    assert!(!result.is_accurate);
}

#[tokio::test]
async fn test_verified_answer_beats_offline() {
    let online = full_validator().validate("How do I enable ssh?", CONFIG_ANSWER).await;
    let offline = EnhancedValidator::offline(ValidatorConfig::default())
        .validate("How do I enable ssh?", CONFIG_ANSWER)
        .await;

    assert!(online.confidence_score.overall() > offline.confidence_score.overall());
    assert!(online.quality_level >= offline.quality_level);
}
