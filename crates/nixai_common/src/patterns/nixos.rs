//! NixOS configuration checker.
//!
//! Flags option names that do not exist and imperative idioms that do not
//! belong in NixOS advice.

use super::rules::{OptionCorrection, PatternFinding, PatternRuleSpec, PatternValidationResult, RuleSet};
use crate::extract::compile_all;
use crate::types::Severity;
use regex::Regex;
use std::sync::LazyLock;

pub const VALIDATOR_NAME: &str = "nixos-validator";

pub const OPTION_CORRECTIONS: &[OptionCorrection] = &[
    OptionCorrection { wrong: "services.bluetooth.enable", correct: "hardware.bluetooth.enable" },
    OptionCorrection { wrong: "services.audio.enable", correct: "sound.enable" },
    OptionCorrection { wrong: "services.sound.enable", correct: "sound.enable" },
    OptionCorrection { wrong: "hardware.audio.enable", correct: "sound.enable" },
    OptionCorrection { wrong: "services.wifi.enable", correct: "networking.wireless.enable" },
    OptionCorrection { wrong: "services.graphics.enable", correct: "hardware.opengl.enable" },
    OptionCorrection { wrong: "services.network.enable", correct: "networking.networkmanager.enable" },
    OptionCorrection { wrong: "services.networkmanager.enable", correct: "networking.networkmanager.enable" },
    OptionCorrection { wrong: "network.enable", correct: "networking.networkmanager.enable" },
    OptionCorrection { wrong: "environment.packages", correct: "environment.systemPackages" },
    OptionCorrection { wrong: "system.packages", correct: "environment.systemPackages" },
    OptionCorrection { wrong: "packages", correct: "environment.systemPackages" },
    OptionCorrection { wrong: "services.ssh.enable", correct: "services.openssh.enable" },
    OptionCorrection { wrong: "services.sshd.enable", correct: "services.openssh.enable" },
    OptionCorrection { wrong: "ssh.enable", correct: "services.openssh.enable" },
    OptionCorrection { wrong: "services.display.enable", correct: "services.xserver.enable" },
    OptionCorrection { wrong: "gui.enable", correct: "services.xserver.enable" },
    OptionCorrection { wrong: "desktop.enable", correct: "services.xserver.enable" },
    OptionCorrection { wrong: "users.user", correct: "users.users" },
    OptionCorrection { wrong: "user.users", correct: "users.users" },
    OptionCorrection { wrong: "boot.grub.enable", correct: "boot.loader.grub.enable" },
    OptionCorrection { wrong: "grub.enable", correct: "boot.loader.grub.enable" },
    OptionCorrection { wrong: "systemd-boot.enable", correct: "boot.loader.systemd-boot.enable" },
    OptionCorrection { wrong: "firewall.enable", correct: "networking.firewall.enable" },
    OptionCorrection { wrong: "services.firewall.enable", correct: "networking.firewall.enable" },
];

pub const PATTERN_RULES: &[PatternRuleSpec] = &[
    PatternRuleSpec {
        pattern: r"services\.blueman.*=.*true",
        error_type: "incomplete_bluetooth_config",
        message: "Using blueman without enabling Bluetooth hardware first",
        suggestion: "Enable Bluetooth with 'hardware.bluetooth.enable = true;' before configuring blueman",
        severity: Severity::Medium,
    },
    PatternRuleSpec {
        pattern: r"nix-env\s+-[iuq]",
        error_type: "deprecated_command",
        message: "Using deprecated 'nix-env' command in NixOS configuration advice",
        suggestion: "Use declarative configuration in configuration.nix or flake.nix instead of imperative nix-env commands",
        severity: Severity::High,
    },
    PatternRuleSpec {
        pattern: r"sudo\s+nix-env",
        error_type: "deprecated_command",
        message: "Using deprecated 'sudo nix-env' command",
        suggestion: "Use 'environment.systemPackages' in configuration.nix for system packages",
        severity: Severity::High,
    },
    PatternRuleSpec {
        pattern: r"apt\s+install|yum\s+install|pacman\s+-S",
        error_type: "wrong_package_manager",
        message: "Using non-NixOS package manager commands",
        suggestion: "Use NixOS declarative configuration instead of traditional package managers",
        severity: Severity::Critical,
    },
    PatternRuleSpec {
        pattern: r"systemctl\s+enable.*\.service",
        error_type: "imperative_service_management",
        message: "Using imperative systemctl commands instead of declarative configuration",
        suggestion: "Use 'services.<service>.enable = true;' in configuration.nix instead",
        severity: Severity::Medium,
    },
    PatternRuleSpec {
        pattern: r"/etc/\w+/.*\.conf",
        error_type: "direct_config_file_editing",
        message: "Suggesting direct editing of configuration files in /etc",
        suggestion: "Use NixOS configuration options instead of directly editing files in /etc",
        severity: Severity::Medium,
    },
];

static RULES: LazyLock<RuleSet> = LazyLock::new(|| RuleSet::compile(OPTION_CORRECTIONS, PATTERN_RULES));

static NIXOS_MARKERS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_all(&[
        r"services\.",
        r"hardware\.",
        r"networking\.",
        r"environment\.systemPackages",
        r"boot\.loader",
        r"users\.users",
        r"nixos-rebuild",
        r"configuration\.nix",
        r"flake\.nix",
    ])
});

/// Stateless NixOS content validator
#[derive(Debug, Default, Clone, Copy)]
pub struct NixOSValidator;

impl NixOSValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, content: &str) -> PatternValidationResult {
        let mut result = PatternValidationResult::new(VALIDATOR_NAME);

        if content.contains("services.blueman.enable") && !content.contains("hardware.bluetooth.enable") {
            result.record(PatternFinding {
                error_type: "missing_bluetooth_hardware".to_string(),
                message: "Blueman service enabled without Bluetooth hardware support".to_string(),
                suggestion: "Add 'hardware.bluetooth.enable = true;' to enable Bluetooth hardware support"
                    .to_string(),
                severity: Severity::Medium,
                matched: "services.blueman.enable".to_string(),
                option_name: None,
                correct_option: None,
            });
        }

        RULES.evaluate(content, &mut result);
        result
    }
}

/// Whether the text looks like NixOS configuration at all
pub fn is_nixos_content(content: &str) -> bool {
    NIXOS_MARKERS.iter().any(|re| re.is_match(content))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bluetooth_option_is_corrected() {
        let result = NixOSValidator::new().validate("services.bluetooth.enable = true;");
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 1);
        assert!(result.warnings.is_empty());
        let err = &result.errors[0];
        assert_eq!(err.severity, Severity::High);
        assert_eq!(err.error_type, "incorrect_option_name");
        assert_eq!(err.correct_option.as_deref(), Some("hardware.bluetooth.enable"));
        assert_eq!(err.suggestion, "Use 'hardware.bluetooth.enable' instead");
        assert_eq!(result.severity, Some(Severity::High));
    }

    #[test]
    fn test_correct_config_passes() {
        let config = r#"{
  hardware.bluetooth.enable = true;
  services.openssh.enable = true;
  environment.systemPackages = with pkgs; [ git ];
}"#;
        let result = NixOSValidator::new().validate(config);
        assert!(result.is_valid);
        assert!(result.errors.is_empty());
        assert!(result.warnings.is_empty());
        assert_eq!(result.severity, None);
    }

    #[test]
    fn test_wrong_package_manager_is_critical() {
        let result = NixOSValidator::new().validate("sudo apt install firefox");
        assert!(!result.is_valid);
        assert_eq!(result.severity, Some(Severity::Critical));
        assert_eq!(result.errors_of_type("wrong_package_manager"), 1);
    }

    #[test]
    fn test_repeated_idiom_reported_per_occurrence() {
        let text = "nix-env -i vim\nthen nix-env -i git\nand nix-env -u";
        let result = NixOSValidator::new().validate(text);
        assert_eq!(result.errors_of_type("deprecated_command"), 3);
    }

    #[test]
    fn test_blueman_without_hardware_warns() {
        let result = NixOSValidator::new().validate("services.blueman.enable = true;");
        assert!(result.is_valid);
        assert_eq!(result.warnings.len(), 2);
        assert!(result
            .warnings
            .iter()
            .any(|w| w.error_type == "missing_bluetooth_hardware"));
        assert_eq!(result.severity, Some(Severity::Medium));
    }

    #[test]
    fn test_imperative_systemctl_is_warning() {
        let result = NixOSValidator::new().validate("systemctl enable sshd.service");
        assert!(result.is_valid);
        assert_eq!(result.warnings[0].error_type, "imperative_service_management");
    }

    #[test]
    fn test_is_nixos_content() {
        assert!(is_nixos_content("services.openssh.enable = true;"));
        assert!(is_nixos_content("run nixos-rebuild switch"));
        assert!(!is_nixos_content("just reboot the machine"));
    }
}
