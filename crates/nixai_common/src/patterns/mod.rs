//! Static pattern validators for NixOS and flake content.

pub mod flake;
pub mod nixos;
pub mod rules;

pub use flake::{is_flake_content, FlakeValidator};
pub use nixos::{is_nixos_content, NixOSValidator};
pub use rules::{OptionCorrection, PatternFinding, PatternRuleSpec, PatternValidationResult, RuleSet};
