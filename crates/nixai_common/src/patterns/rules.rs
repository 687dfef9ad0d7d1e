//! Data-only rule tables and the engine that evaluates them.
//!
//! A rule is `pattern -> message -> suggestion -> severity`. Tables are
//! compiled once and evaluated per call. Every match is reported, so a
//! bad idiom repeated three times yields three findings.

use crate::types::Severity;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Declarative pattern rule
#[derive(Debug, Clone, Copy)]
pub struct PatternRuleSpec {
    pub pattern: &'static str,
    pub error_type: &'static str,
    pub message: &'static str,
    pub suggestion: &'static str,
    pub severity: Severity,
}

/// Wrong option name and its replacement
#[derive(Debug, Clone, Copy)]
pub struct OptionCorrection {
    pub wrong: &'static str,
    pub correct: &'static str,
}

/// A rule that must match somewhere for the content to be complete
#[derive(Debug, Clone, Copy)]
pub struct RequiredPatternSpec {
    pub pattern: &'static str,
    pub error_type: &'static str,
    pub description: &'static str,
    pub required: bool,
}

/// One match of a rule against the text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternFinding {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
    pub suggestion: String,
    pub severity: Severity,
    /// Text that triggered the finding
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub matched: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_option: Option<String>,
}

/// Outcome of running one pattern validator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternValidationResult {
    pub validator: String,
    pub is_valid: bool,
    pub errors: Vec<PatternFinding>,
    pub warnings: Vec<PatternFinding>,
    /// Highest severity over errors and warnings
    pub severity: Option<Severity>,
}

impl PatternValidationResult {
    pub fn new(validator: &str) -> Self {
        Self {
            validator: validator.to_string(),
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            severity: None,
        }
    }

    /// Route a finding by severity: high and above is an error
    pub fn record(&mut self, finding: PatternFinding) {
        self.severity = Some(match self.severity {
            Some(current) => current.max(finding.severity),
            None => finding.severity,
        });
        if finding.severity.is_error() {
            self.is_valid = false;
            self.errors.push(finding);
        } else {
            self.warnings.push(finding);
        }
    }

    pub fn errors_of_type(&self, error_type: &str) -> usize {
        self.errors.iter().filter(|e| e.error_type == error_type).count()
    }

    /// Whether any error mentions the given name
    pub fn mentions(&self, name: &str) -> bool {
        self.errors.iter().any(|e| {
            e.message.contains(name)
                || e.matched.contains(name)
                || e.option_name.as_deref() == Some(name)
        })
    }

    pub fn summary(&self) -> String {
        if self.errors.is_empty() && self.warnings.is_empty() {
            return format!("{}: no problems found", self.validator);
        }
        format!(
            "{}: {} ({} error(s), {} warning(s), max severity {})",
            self.validator,
            if self.is_valid { "valid" } else { "invalid" },
            self.errors.len(),
            self.warnings.len(),
            self.severity.map(|s| s.as_str()).unwrap_or("none"),
        )
    }
}

struct CompiledRule {
    regex: Regex,
    spec: PatternRuleSpec,
}

struct CompiledCorrection {
    regex: Regex,
    correction: OptionCorrection,
}

/// Compiled form of a validator's rule tables
pub struct RuleSet {
    corrections: Vec<CompiledCorrection>,
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    pub fn compile(corrections: &[OptionCorrection], rules: &[PatternRuleSpec]) -> Self {
        let corrections = corrections
            .iter()
            .filter_map(|c| {
                // The wrong name must not be the tail of a longer dotted path
                let pattern = format!(r"(?:^|[^\w.]){}\s*=", regex::escape(c.wrong));
                compile_logged(&pattern).map(|regex| CompiledCorrection {
                    regex,
                    correction: *c,
                })
            })
            .collect();
        let rules = rules
            .iter()
            .filter_map(|spec| compile_logged(spec.pattern).map(|regex| CompiledRule { regex, spec: *spec }))
            .collect();
        Self { corrections, rules }
    }

    /// Evaluate every table entry against the text
    pub fn evaluate(&self, text: &str, result: &mut PatternValidationResult) {
        for entry in &self.corrections {
            for m in entry.regex.find_iter(text) {
                let c = entry.correction;
                result.record(PatternFinding {
                    error_type: "incorrect_option_name".to_string(),
                    message: format!("Incorrect NixOS option: '{}' does not exist", c.wrong),
                    suggestion: format!("Use '{}' instead", c.correct),
                    severity: Severity::High,
                    matched: m.as_str().trim().to_string(),
                    option_name: Some(c.wrong.to_string()),
                    correct_option: Some(c.correct.to_string()),
                });
            }
        }

        for rule in &self.rules {
            for m in rule.regex.find_iter(text) {
                result.record(PatternFinding {
                    error_type: rule.spec.error_type.to_string(),
                    message: rule.spec.message.to_string(),
                    suggestion: rule.spec.suggestion.to_string(),
                    severity: rule.spec.severity,
                    matched: m.as_str().trim().to_string(),
                    option_name: None,
                    correct_option: None,
                });
            }
        }
    }
}

/// Compile a required-pattern table
pub fn compile_required(specs: &[RequiredPatternSpec]) -> Vec<(Regex, RequiredPatternSpec)> {
    specs
        .iter()
        .filter_map(|spec| compile_logged(spec.pattern).map(|re| (re, *spec)))
        .collect()
}

fn compile_logged(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!(pattern, error = %e, "dropping rule that failed to compile");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RULES: &[PatternRuleSpec] = &[
        PatternRuleSpec {
            pattern: r"apt\s+install",
            error_type: "wrong_package_manager",
            message: "apt is not available on NixOS",
            suggestion: "Use environment.systemPackages",
            severity: Severity::Critical,
        },
        PatternRuleSpec {
            pattern: r"systemctl\s+enable",
            error_type: "imperative_service_management",
            message: "Imperative service management",
            suggestion: "Use services.<name>.enable",
            severity: Severity::Medium,
        },
    ];

    const CORRECTIONS: &[OptionCorrection] = &[OptionCorrection {
        wrong: "ssh.enable",
        correct: "services.openssh.enable",
    }];

    #[test]
    fn test_every_match_is_reported() {
        let set = RuleSet::compile(&[], RULES);
        let mut result = PatternValidationResult::new("test");
        set.evaluate("apt install vim\napt install git", &mut result);
        assert_eq!(result.errors.len(), 2);
        assert!(!result.is_valid);
        assert_eq!(result.severity, Some(Severity::Critical));
    }

    #[test]
    fn test_medium_rule_is_warning() {
        let set = RuleSet::compile(&[], RULES);
        let mut result = PatternValidationResult::new("test");
        set.evaluate("systemctl enable foo", &mut result);
        assert!(result.is_valid);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.severity, Some(Severity::Medium));
    }

    #[test]
    fn test_correction_ignores_longer_path() {
        let set = RuleSet::compile(CORRECTIONS, &[]);
        let mut result = PatternValidationResult::new("test");
        set.evaluate("services.ssh.enable = true;", &mut result);
        assert!(result.errors.is_empty());

        set.evaluate("ssh.enable = true;", &mut result);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(
            result.errors[0].correct_option.as_deref(),
            Some("services.openssh.enable")
        );
    }

    #[test]
    fn test_summary_for_clean_result() {
        let result = PatternValidationResult::new("nixos-validator");
        assert_eq!(result.summary(), "nixos-validator: no problems found");
        assert_eq!(result.severity, None);
    }
}
