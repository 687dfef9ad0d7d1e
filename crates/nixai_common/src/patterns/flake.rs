//! Flake structure checker.

use super::rules::{
    compile_required, PatternFinding, PatternRuleSpec, PatternValidationResult, RequiredPatternSpec, RuleSet,
};
use crate::types::Severity;
use regex::Regex;
use std::sync::LazyLock;

pub const VALIDATOR_NAME: &str = "flake-validator";

pub const PATTERN_RULES: &[PatternRuleSpec] = &[
    PatternRuleSpec {
        pattern: r#"nixpkgs\.nix\s*=\s*\{[^}]*type\s*=\s*"github""#,
        error_type: "incorrect_input_syntax",
        message: "Incorrect input syntax: using 'nixpkgs.nix = { type = \"github\" }' format",
        suggestion: "Use 'nixpkgs.url = \"github:NixOS/nixpkgs/...\"' instead",
        severity: Severity::Critical,
    },
    PatternRuleSpec {
        pattern: r"devShell\s*=\s*\{\s*package\s*=",
        error_type: "incorrect_devshell_structure",
        message: "Incorrect devShell structure: using 'devShell = { package = ... }'",
        suggestion: "Use 'devShells.default = pkgs.mkShell { ... }' or 'devShells.${system}.default = ...'",
        severity: Severity::Critical,
    },
    PatternRuleSpec {
        pattern: r"outputs\s*=\s*\{\s*self\s*=\s*\{",
        error_type: "incorrect_outputs_structure",
        message: "Incorrect outputs structure: using 'outputs = { self = { ... } }'",
        suggestion: "Use 'outputs = { self, nixpkgs }: { ... }' function syntax",
        severity: Severity::Critical,
    },
    PatternRuleSpec {
        pattern: r"\.nix\s*=\s*\{[^}]*type\s*=",
        error_type: "incorrect_input_format",
        message: "Incorrect input format: using '.nix = { type = ... }' syntax",
        suggestion: "Use '.url = \"...\"' format for inputs",
        severity: Severity::High,
    },
    PatternRuleSpec {
        pattern: r"release\s*=\s*\{[^}]*Build artifacts",
        error_type: "placeholder_content",
        message: "Contains placeholder/example content that should be customized",
        suggestion: "Replace example content with actual implementation",
        severity: Severity::Medium,
    },
    PatternRuleSpec {
        pattern: r"pkgs\.mkShell\s*\{[^}]*buildInputs.*pkgs\.python3.*pkgs\.nodejs",
        error_type: "generic_dependencies",
        message: "Using generic example dependencies (python3, nodejs)",
        suggestion: "Replace with dependencies specific to your project",
        severity: Severity::Low,
    },
    PatternRuleSpec {
        pattern: r"services\.bluetooth\.enable\s*=\s*true",
        error_type: "nixos_option_in_flake",
        message: "Incorrect NixOS option: 'services.bluetooth.enable' does not exist",
        suggestion: "Use 'hardware.bluetooth.enable = true;' instead",
        severity: Severity::High,
    },
    PatternRuleSpec {
        pattern: r"services\.audio\.enable\s*=\s*true",
        error_type: "nixos_option_in_flake",
        message: "Incorrect NixOS option: 'services.audio.enable' does not exist",
        suggestion: "Use 'sound.enable = true;' or 'security.rtkit.enable = true; services.pipewire.enable = true;' for modern audio",
        severity: Severity::High,
    },
    PatternRuleSpec {
        pattern: r"services\.wifi\.enable\s*=\s*true",
        error_type: "nixos_option_in_flake",
        message: "Incorrect NixOS option: 'services.wifi.enable' does not exist",
        suggestion: "Use 'networking.wireless.enable = true;' or 'networking.networkmanager.enable = true;' instead",
        severity: Severity::High,
    },
    PatternRuleSpec {
        pattern: r"services\.graphics\.enable\s*=\s*true",
        error_type: "nixos_option_in_flake",
        message: "Incorrect NixOS option: 'services.graphics.enable' does not exist",
        suggestion: "Use 'hardware.opengl.enable = true;' or 'services.xserver.enable = true;' instead",
        severity: Severity::High,
    },
    PatternRuleSpec {
        pattern: r"environment\.packages\s*=",
        error_type: "nixos_option_in_flake",
        message: "Incorrect NixOS option: 'environment.packages' does not exist",
        suggestion: "Use 'environment.systemPackages = with pkgs; [ ... ];' instead",
        severity: Severity::High,
    },
];

pub const REQUIRED_PATTERNS: &[RequiredPatternSpec] = &[
    RequiredPatternSpec {
        pattern: r"outputs\s*=\s*\{[^}]*\}\s*:\s*\{",
        error_type: "missing_outputs_function",
        description: "Function-style outputs definition",
        required: true,
    },
    RequiredPatternSpec {
        pattern: r"description\s*=",
        error_type: "missing_description",
        description: "Flake description",
        required: true,
    },
    RequiredPatternSpec {
        pattern: r"inputs\s*=\s*\{",
        error_type: "missing_inputs",
        description: "Inputs section",
        required: false,
    },
];

const FLAKE_KEYWORDS: &[&str] = &[
    "flake.nix",
    "outputs =",
    "inputs =",
    "nixpkgs",
    "devshell",
    "devshells",
    "nix flake",
    "flake init",
    "flake check",
];

static RULES: LazyLock<RuleSet> = LazyLock::new(|| RuleSet::compile(&[], PATTERN_RULES));

static REQUIRED: LazyLock<Vec<(Regex, RequiredPatternSpec)>> =
    LazyLock::new(|| compile_required(REQUIRED_PATTERNS));

/// Stateless flake validator
#[derive(Debug, Default, Clone, Copy)]
pub struct FlakeValidator;

impl FlakeValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, content: &str) -> PatternValidationResult {
        let mut result = PatternValidationResult::new(VALIDATOR_NAME);
        RULES.evaluate(content, &mut result);

        for (regex, spec) in REQUIRED.iter() {
            if spec.required && !regex.is_match(content) {
                result.record(PatternFinding {
                    error_type: spec.error_type.to_string(),
                    message: format!("Missing required pattern: {}", spec.description),
                    suggestion: format!("Ensure your flake includes {}", spec.description),
                    severity: Severity::Low,
                    matched: String::new(),
                    option_name: None,
                    correct_option: None,
                });
            }
        }

        result
    }
}

/// Three or more flake keywords, case-insensitive
pub fn is_flake_content(content: &str) -> bool {
    let lower = content.to_lowercase();
    FLAKE_KEYWORDS.iter().filter(|kw| lower.contains(*kw)).count() >= 3
}
