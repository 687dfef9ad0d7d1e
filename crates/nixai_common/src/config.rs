//! Validator configuration.
//!
//! Loads settings from `$XDG_CONFIG_HOME/nixai/validator.toml`, then
//! `/etc/nixai/validator.toml`, or uses defaults. Every section is optional.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// System-wide config file path
pub const SYSTEM_CONFIG_PATH: &str = "/etc/nixai/validator.toml";

/// Quality-level decision thresholds and score cut-offs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// combinedScore below this is poor
    #[serde(default = "default_combined_poor")]
    pub combined_poor: f64,

    /// combinedScore below this is fair
    #[serde(default = "default_combined_fair")]
    pub combined_fair: f64,

    /// combinedScore at or above this can be excellent
    #[serde(default = "default_combined_excellent")]
    pub combined_excellent: f64,

    #[serde(default = "default_automated_poor")]
    pub automated_poor: f64,

    #[serde(default = "default_automated_fair")]
    pub automated_fair: f64,

    #[serde(default = "default_automated_excellent")]
    pub automated_excellent: f64,

    /// More high issues than this is poor
    #[serde(default = "default_high_issues_poor")]
    pub high_issues_poor: usize,

    /// More high issues than this is at best fair
    #[serde(default = "default_high_issues_fair")]
    pub high_issues_fair: usize,

    /// Community results below this confidence are marked invalid
    #[serde(default = "default_community_min_confidence")]
    pub community_min_confidence: f64,

    /// Minimum lexical overlap for a search hit to count as aligned
    #[serde(default = "default_alignment_threshold")]
    pub alignment_threshold: f64,
}

fn default_combined_poor() -> f64 {
    50.0
}

fn default_combined_fair() -> f64 {
    70.0
}

fn default_combined_excellent() -> f64 {
    90.0
}

fn default_automated_poor() -> f64 {
    40.0
}

fn default_automated_fair() -> f64 {
    60.0
}

fn default_automated_excellent() -> f64 {
    85.0
}

fn default_high_issues_poor() -> usize {
    2
}

fn default_high_issues_fair() -> usize {
    1
}

fn default_community_min_confidence() -> f64 {
    0.6
}

fn default_alignment_threshold() -> f64 {
    0.2
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            combined_poor: default_combined_poor(),
            combined_fair: default_combined_fair(),
            combined_excellent: default_combined_excellent(),
            automated_poor: default_automated_poor(),
            automated_fair: default_automated_fair(),
            automated_excellent: default_automated_excellent(),
            high_issues_poor: default_high_issues_poor(),
            high_issues_fair: default_high_issues_fair(),
            community_min_confidence: default_community_min_confidence(),
            alignment_threshold: default_alignment_threshold(),
        }
    }
}

/// Deadlines for collaborator calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Whole-run deadline in seconds
    #[serde(default = "default_total_timeout")]
    pub total_secs: u64,

    /// Single collaborator call timeout in seconds
    #[serde(default = "default_call_timeout")]
    pub per_call_secs: u64,
}

fn default_total_timeout() -> u64 {
    60
}

fn default_call_timeout() -> u64 {
    15
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            total_secs: default_total_timeout(),
            per_call_secs: default_call_timeout(),
        }
    }
}

impl TimeoutConfig {
    pub fn total(&self) -> Duration {
        Duration::from_secs(self.total_secs)
    }

    pub fn per_call(&self) -> Duration {
        Duration::from_secs(self.per_call_secs)
    }
}

/// Binaries used by the process-backed tool executor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_nix_bin")]
    pub nix: String,

    #[serde(default = "default_nix_instantiate_bin")]
    pub nix_instantiate: String,

    #[serde(default = "default_nix_env_bin")]
    pub nix_env: String,

    #[serde(default = "default_nixos_option_bin")]
    pub nixos_option: String,

    #[serde(default = "default_which_bin")]
    pub which: String,
}

fn default_nix_bin() -> String {
    "nix".to_string()
}

fn default_nix_instantiate_bin() -> String {
    "nix-instantiate".to_string()
}

fn default_nix_env_bin() -> String {
    "nix-env".to_string()
}

fn default_nixos_option_bin() -> String {
    "nixos-option".to_string()
}

fn default_which_bin() -> String {
    "which".to_string()
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            nix: default_nix_bin(),
            nix_instantiate: default_nix_instantiate_bin(),
            nix_env: default_nix_env_bin(),
            nixos_option: default_nixos_option_bin(),
            which: default_which_bin(),
        }
    }
}

/// NixOS wiki (MediaWiki API) settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WikiConfig {
    #[serde(default = "default_wiki_url")]
    pub base_url: String,

    #[serde(default = "default_wiki_limit")]
    pub result_limit: usize,
}

fn default_wiki_url() -> String {
    "https://wiki.nixos.org".to_string()
}

fn default_wiki_limit() -> usize {
    10
}

impl Default for WikiConfig {
    fn default() -> Self {
        Self {
            base_url: default_wiki_url(),
            result_limit: default_wiki_limit(),
        }
    }
}

/// search.nixos.org backend settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_search_url")]
    pub backend_url: String,

    #[serde(default = "default_search_index")]
    pub index: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}

fn default_search_url() -> String {
    "https://search.nixos.org/backend".to_string()
}

fn default_search_index() -> String {
    "latest-44-nixos-unstable".to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            backend_url: default_search_url(),
            index: default_search_index(),
            username: None,
            password: None,
        }
    }
}

/// Full validator configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidatorConfig {
    #[serde(default)]
    pub thresholds: ThresholdConfig,

    #[serde(default)]
    pub timeouts: TimeoutConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub wiki: WikiConfig,

    #[serde(default)]
    pub search: SearchConfig,
}

impl ValidatorConfig {
    /// User config path under the XDG config dir
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("nixai").join("validator.toml"))
    }

    /// Load from the user path, then the system path, or return defaults
    pub fn load_or_default() -> Self {
        let user = Self::user_config_path().and_then(|p| Self::load(&p).ok());
        user.or_else(|| Self::load(Path::new(SYSTEM_CONFIG_PATH)).ok())
            .unwrap_or_else(|| {
                warn!("No validator config found, using defaults");
                ValidatorConfig::default()
            })
    }

    /// Load config from a specific path
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let path_str = path.display().to_string();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path_str.clone(),
            source,
        })?;
        let config: ValidatorConfig =
            toml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path_str.clone(),
                source,
            })?;
        info!("Loaded validator config from {}", path_str);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_thresholds() {
        let config = ValidatorConfig::default();
        assert_eq!(config.thresholds.combined_poor, 50.0);
        assert_eq!(config.thresholds.combined_fair, 70.0);
        assert_eq!(config.thresholds.combined_excellent, 90.0);
        assert_eq!(config.thresholds.high_issues_poor, 2);
        assert_eq!(config.thresholds.high_issues_fair, 1);
        assert_eq!(config.timeouts.per_call(), Duration::from_secs(15));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[thresholds]\nautomated_poor = 35.0\n\n[wiki]\nresult_limit = 5").unwrap();

        let config = ValidatorConfig::load(file.path()).unwrap();
        assert_eq!(config.thresholds.automated_poor, 35.0);
        assert_eq!(config.thresholds.automated_fair, 60.0);
        assert_eq!(config.wiki.result_limit, 5);
        assert_eq!(config.wiki.base_url, "https://wiki.nixos.org");
        assert_eq!(config.tools.nix, "nix");
    }

    #[test]
    fn test_invalid_file_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[thresholds\nbroken").unwrap();
        let err = ValidatorConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = ValidatorConfig::load(Path::new("/nonexistent/nixai.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
