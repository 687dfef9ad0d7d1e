//! Reference scenarios for the validation pipeline
//!
//! Each test pins one documented behavior end to end with deterministic
//! fakes standing in for Nix tooling and HTTP services.

use nixai_common::collaborators::{FakeSourceVerifier, FakeToolExecutor, SourceVerification, VerifiedPackage};
use nixai_common::fact_checker::SEARCH_NIXOS_SOURCE;
use nixai_common::patterns::NixOSValidator;
use nixai_common::quality_scorer::{AutomatedQualityScorer, NIX_TOOLS_SOURCE};
use nixai_common::types::Severity;
use nixai_common::{CallContext, EnhancedValidator};
use std::sync::Arc;
use std::time::Duration;

fn verified_packages(names: &[&str]) -> SourceVerification {
    SourceVerification {
        packages_verified: names
            .iter()
            .map(|n| VerifiedPackage {
                name: n.to_string(),
                version: "1.0".to_string(),
                description: format!("{} from nixpkgs", n),
            })
            .collect(),
        ..Default::default()
    }
    .finalize()
}

#[test]
fn scenario_wrong_bluetooth_option() {
    let result = NixOSValidator::new().validate("services.bluetooth.enable = true;");

    assert!(!result.is_valid);
    assert_eq!(result.errors.len(), 1, "Exactly one error expected");
    let error = &result.errors[0];
    assert_eq!(error.severity, Severity::High);
    assert!(error.suggestion.contains("hardware.bluetooth.enable"));
}

#[tokio::test]
async fn scenario_descriptive_answer_gets_partial_credit() {
    let answer = "Restart the machine after you change the settings so that everything is picked up again.";
    let score = AutomatedQualityScorer::new(Arc::new(FakeToolExecutor::new()))
        .score(&CallContext::default(), "What now?", answer)
        .await;

    assert_eq!(score.breakdown.syntax, 15);
    assert_eq!(score.breakdown.package, 15);
    assert_eq!(score.breakdown.option, 15);
    assert_eq!(score.breakdown.command, 5);
    assert_eq!(score.breakdown.structure, 0);
    assert_eq!(score.overall_score, 50);
    assert_eq!(score.overall_score, score.breakdown.total());
}

#[tokio::test]
async fn scenario_two_sources_confirm_one_package() {
    let answer = "Try it without installing: `nix-shell -p htop`";
    let validator = EnhancedValidator::builder()
        .tools(Arc::new(FakeToolExecutor::new().with_package("htop", true)))
        .source_verifier(Arc::new(FakeSourceVerifier::new(verified_packages(&["htop"]))))
        .build();

    let result = validator.validate("How can I try htop?", answer).await;
    let cross = result.cross_reference.expect("cross-reference always runs");
    let htop: Vec<_> = cross
        .confirmations
        .iter()
        .filter(|c| c.description.contains("'htop'"))
        .collect();

    assert_eq!(htop.len(), 1);
    assert_eq!(htop[0].sources.len(), 2);
    assert!(htop[0].sources.iter().any(|s| s == NIX_TOOLS_SOURCE));
    assert!(htop[0].sources.iter().any(|s| s == SEARCH_NIXOS_SOURCE));
}

#[tokio::test(start_paused = true)]
async fn scenario_tool_timeouts_leave_tool_confidence_neutral() {
    let answer = "Add this to configuration.nix:\n\
                  ```nix\n{ environment.systemPackages = with pkgs; [ git vim ]; services.openssh.enable = true; }\n```\n\
                  then run `sudo nixos-rebuild switch`.";
    let tools = FakeToolExecutor::hanging();
    let validator = EnhancedValidator::builder().tools(Arc::new(tools.clone())).build();
    let ctx = CallContext::new(Duration::from_secs(30), Duration::from_millis(250));

    let result = validator.validate_answer(&ctx, "How do I install git?", answer).await;

    assert!(tools.call_count("check_syntax") > 0);
    assert_eq!(result.confidence_score.tool_verification(), 0.5);
    let automated = result.automated_score.expect("scorer still reports");
    assert!(automated.tool_summary().confidence.is_none());
}
