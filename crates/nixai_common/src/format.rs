//! Plain-text rendering of validation results.
//!
//! Output is uncolored so it stays stable in tests and pipes; the CLI
//! adds color to the quality line only.

use crate::orchestrator::EnhancedValidationResult;
use crate::patterns::PatternValidationResult;
use crate::precheck::PreAnswerValidation;
use crate::types::{Severity, ValidationIssue};
use std::fmt::Write;

pub mod symbols {
    pub const OK: &str = "✓";
    pub const ERR: &str = "✗";
    pub const ARROW: &str = "›";
    pub const PROGRESS_FULL: &str = "█";
    pub const PROGRESS_EMPTY: &str = "░";
}

pub const HR: &str = "────────────────────────────────────────────────────────────";

const BAR_WIDTH: usize = 10;

/// `[█████░░░░░]` for a value in `[0, 1]`
pub fn progress_bar(value: f64, width: usize) -> String {
    let value = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
    let filled = ((value * width as f64).round() as usize).min(width);
    format!(
        "[{}{}]",
        symbols::PROGRESS_FULL.repeat(filled),
        symbols::PROGRESS_EMPTY.repeat(width - filled)
    )
}

fn percent(value: f64) -> String {
    format!("{:.0}%", value * 100.0)
}

fn write_issue(out: &mut String, issue: &ValidationIssue) {
    let _ = writeln!(out, "    {} {} [{}]", symbols::ERR, issue.message, issue.source);
    if !issue.suggestion.is_empty() {
        let _ = writeln!(out, "      {} {}", symbols::ARROW, issue.suggestion);
    }
}

/// The quality line on its own, for callers that style it
pub fn quality_line(result: &EnhancedValidationResult) -> String {
    format!(
        "{} Quality: {}  {}",
        result.quality_level.emoji(),
        result.quality_level.as_str().to_uppercase(),
        if result.is_accurate { "accurate" } else { "inaccurate" }
    )
}

pub fn render(result: &EnhancedValidationResult) -> String {
    let mut out = String::new();
    let confidence = &result.confidence_score;

    let _ = writeln!(out, "{}", quality_line(result));
    let _ = writeln!(out, "{}", HR);
    let _ = writeln!(
        out,
        "Confidence  {} {} ({})",
        progress_bar(confidence.overall(), BAR_WIDTH),
        percent(confidence.overall()),
        confidence.level()
    );
    for (name, value) in confidence.dimensions() {
        let _ = writeln!(out, "  {:<20} {} {}", name, progress_bar(value, BAR_WIDTH), percent(value));
    }

    if let Some(automated) = &result.automated_score {
        let b = &automated.breakdown;
        let _ = writeln!(out);
        let _ = writeln!(out, "Automated score: {}/100", automated.overall_score);
        let _ = writeln!(
            out,
            "  syntax {}/30  packages {}/25  options {}/25  commands {}/10  structure {}/10",
            b.syntax, b.package, b.option, b.command, b.structure
        );
    }

    if !result.quality_issues.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Issues ({})", result.quality_issues.len());
        for severity in [Severity::Critical, Severity::High, Severity::Medium, Severity::Low] {
            let group: Vec<&ValidationIssue> = result.issues_with_severity(severity).collect();
            if group.is_empty() {
                continue;
            }
            let _ = writeln!(out, "  {}:", severity.as_str());
            for issue in group {
                write_issue(&mut out, issue);
            }
        }
    }

    if let Some(cross) = &result.cross_reference {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "Cross-reference: {} contradiction(s), {} confirmation(s), consistency {}",
            cross.contradictions.len(),
            cross.confirmations.len(),
            percent(cross.consistency_score)
        );
    }

    if !result.sources_consulted.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Sources: {}", result.sources_consulted.join(", "));
    }

    if !result.recommendations.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Recommendations");
        for (i, rec) in result.recommendations.iter().enumerate() {
            let _ = writeln!(out, "  {}. {}", i + 1, rec);
        }
    }

    let _ = writeln!(out, "{}", HR);
    let _ = writeln!(out, "Validated in {} ms", result.validation_time_ms);
    out
}

pub fn render_pattern_result(result: &PatternValidationResult) -> String {
    let mut out = String::new();
    let mark = if result.is_valid { symbols::OK } else { symbols::ERR };
    let _ = writeln!(out, "{} {}", mark, result.summary());
    for finding in result.errors.iter().chain(result.warnings.iter()) {
        let _ = writeln!(
            out,
            "  [{}] {}: {}",
            finding.severity, finding.error_type, finding.message
        );
        if !finding.matched.is_empty() {
            let _ = writeln!(out, "    matched: {}", finding.matched);
        }
        let _ = writeln!(out, "    {} {}", symbols::ARROW, finding.suggestion);
    }
    out
}

pub fn render_precheck(result: &PreAnswerValidation) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Pre-check confidence: {}", result.confidence.as_str());
    if !result.extracted_terms.is_empty() {
        let _ = writeln!(out, "Terms: {}", result.extracted_terms.join(", "));
    }
    if !result.suggested_options.is_empty() {
        let _ = writeln!(out, "Suggested options:");
        for option in &result.suggested_options {
            let _ = writeln!(out, "  {} {}", symbols::ARROW, option);
        }
    }
    if !result.verified_sources.is_empty() {
        let _ = writeln!(out, "Sources ({} relevant):", result.relevant_source_count());
        for source in &result.verified_sources {
            let _ = writeln!(out, "  {} {} ({})", percent(source.relevance), source.title, source.url);
        }
    }
    for warning in &result.warnings {
        write_issue(&mut out, warning);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidatorConfig;
    use crate::orchestrator::EnhancedValidator;
    use crate::patterns::NixOSValidator;

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(0.5, 10), "[█████░░░░░]");
        assert_eq!(progress_bar(1.0, 10), "[██████████]");
        assert_eq!(progress_bar(0.0, 10), "[░░░░░░░░░░]");
        assert_eq!(progress_bar(7.0, 4), "[████]");
    }

    #[tokio::test]
    async fn test_render_groups_issues_critical_first() {
        let validator = EnhancedValidator::offline(ValidatorConfig::default());
        let result = validator
            .validate(
                "audio?",
                "Use services.audio.enable = true; or run sudo apt install pulseaudio",
            )
            .await;
        let text = render(&result);

        assert!(text.contains("Quality: POOR"));
        assert!(text.contains("Confidence  ["));
        assert!(text.contains("Source Verification"));
        assert!(text.contains("Sources: nixos-validator"));
        assert!(text.contains("Recommendations\n  1. "));
        let critical = text.find("  critical:").unwrap();
        let high = text.find("  high:").unwrap();
        assert!(critical < high);
    }

    #[test]
    fn test_render_pattern_result() {
        let result = NixOSValidator::new().validate("services.bluetooth.enable = true;");
        let text = render_pattern_result(&result);
        assert!(text.starts_with(symbols::ERR));
        assert!(text.contains("incorrect_option_name"));
        assert!(text.contains("hardware.bluetooth.enable"));
    }
}
