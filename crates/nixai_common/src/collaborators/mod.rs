//! Collaborator Traits
//!
//! The validation core never runs a process or opens a socket itself. It
//! talks to three collaborators through these traits:
//! - `ToolExecutor`: local Nix tooling (parse, package, option, binary, flake checks)
//! - `SearchCollaborator`: wiki-style document search
//! - `SourceVerifier`: search.nixos.org lookups for a whole answer
//!
//! Production code uses `NixToolExecutor`, `NixosWikiClient` and
//! `SearchNixosClient`. Tests use the fakes in [`fake`].

pub mod fake;
pub mod nix_tools;
pub mod search_nixos;
pub mod wiki;

use crate::error::CollaboratorError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

pub use fake::{FakeBehavior, FakeSearch, FakeSourceVerifier, FakeToolExecutor};
pub use nix_tools::NixToolExecutor;
pub use search_nixos::SearchNixosClient;
pub use wiki::NixosWikiClient;

// ============================================================================
// Result Types
// ============================================================================

/// Parse or flake check outcome
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyntaxCheck {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub diagnostics: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
}

impl SyntaxCheck {
    pub fn valid() -> Self {
        Self {
            valid: true,
            ..Default::default()
        }
    }

    /// Invalid result with line/column pulled out of the diagnostics
    pub fn invalid(diagnostics: impl Into<String>) -> Self {
        let diagnostics = diagnostics.into();
        let (line, column) = parse_line_column(&diagnostics);
        Self {
            valid: false,
            diagnostics,
            line,
            column,
        }
    }
}

/// Package existence lookup
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageCheck {
    pub exists: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl PackageCheck {
    pub fn found(attr: impl Into<String>) -> Self {
        Self {
            exists: true,
            attr: Some(attr.into()),
            ..Default::default()
        }
    }

    pub fn missing() -> Self {
        Self::default()
    }
}

/// Option path lookup
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionCheck {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// One search result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
    /// Query relevance in `[0, 1]`
    pub relevance: f64,
}

/// Full page content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WikiPage {
    pub title: String,
    pub content: String,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedPackage {
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedOption {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub option_type: String,
    #[serde(default)]
    pub default: String,
}

/// Whole-answer lookup against official package and option indexes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceVerification {
    pub packages_verified: Vec<VerifiedPackage>,
    pub options_verified: Vec<VerifiedOption>,
    pub unknown_packages: Vec<String>,
    pub unknown_options: Vec<String>,
    pub package_verification_failed: bool,
    pub option_verification_failed: bool,
    pub confidence: f64,
}

impl Default for SourceVerification {
    fn default() -> Self {
        Self {
            packages_verified: Vec::new(),
            options_verified: Vec::new(),
            unknown_packages: Vec::new(),
            unknown_options: Vec::new(),
            package_verification_failed: false,
            option_verification_failed: false,
            confidence: 1.0,
        }
    }
}

impl SourceVerification {
    /// Recompute flags and confidence from the verified/unknown lists
    pub fn finalize(mut self) -> Self {
        self.package_verification_failed = !self.unknown_packages.is_empty();
        self.option_verification_failed = !self.unknown_options.is_empty();
        let verified = self.packages_verified.len() + self.options_verified.len();
        let total = verified + self.unknown_packages.len() + self.unknown_options.len();
        self.confidence = if total == 0 {
            1.0
        } else {
            verified as f64 / total as f64
        };
        self
    }

    pub fn verifies_package(&self, name: &str) -> bool {
        self.packages_verified.iter().any(|p| p.name == name)
    }

    pub fn verifies_option(&self, name: &str) -> bool {
        self.options_verified.iter().any(|o| o.name == name)
    }

    pub fn verified_count(&self) -> usize {
        self.packages_verified.len() + self.options_verified.len()
    }
}

// ============================================================================
// Collaborator Traits
// ============================================================================

/// Local Nix tooling
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Parse-check a Nix expression
    async fn check_syntax(&self, expr: &str) -> Result<SyntaxCheck, CollaboratorError>;

    /// Primary package existence query
    async fn check_package(&self, name: &str) -> Result<PackageCheck, CollaboratorError>;

    /// Secondary package query used when the primary one errors
    async fn find_package_fallback(&self, name: &str) -> Result<PackageCheck, CollaboratorError> {
        Err(CollaboratorError::Unavailable(format!(
            "no fallback package query for '{}'",
            name
        )))
    }

    async fn check_option(&self, path: &str) -> Result<OptionCheck, CollaboratorError>;

    /// Whether a binary is on PATH
    async fn check_command(&self, binary: &str) -> Result<bool, CollaboratorError>;

    /// Structural check of a complete flake
    async fn check_flake(&self, source: &str) -> Result<SyntaxCheck, CollaboratorError>;
}

/// Wiki-style search backend
#[async_trait]
pub trait SearchCollaborator: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, CollaboratorError>;

    async fn get_page(&self, title: &str) -> Result<WikiPage, CollaboratorError>;
}

/// Answer-level verification against official indexes
#[async_trait]
pub trait SourceVerifier: Send + Sync {
    async fn verify_answer(&self, answer: &str) -> Result<SourceVerification, CollaboratorError>;
}

// ============================================================================
// Helpers
// ============================================================================

static LINE_NUMBER: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"line (\d+)").ok());
static COLUMN_NUMBER: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"column (\d+)").ok());

/// Pull "line N" / "column N" out of parser diagnostics
pub fn parse_line_column(diagnostics: &str) -> (Option<u32>, Option<u32>) {
    let grab = |re: &Option<Regex>| {
        re.as_ref()
            .and_then(|re| re.captures(diagnostics))
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    };
    (grab(&LINE_NUMBER), grab(&COLUMN_NUMBER))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line_column() {
        let diag = "error: syntax error, unexpected '}', at (stdin):3:5 line 3 column 5";
        assert_eq!(parse_line_column(diag), (Some(3), Some(5)));
        assert_eq!(parse_line_column("no position"), (None, None));

        let check = SyntaxCheck::invalid("unexpected end of file at line 12");
        assert!(!check.valid);
        assert_eq!(check.line, Some(12));
        assert_eq!(check.column, None);
    }

    #[test]
    fn test_source_verification_finalize() {
        let sv = SourceVerification {
            packages_verified: vec![VerifiedPackage {
                name: "git".into(),
                version: "2.44".into(),
                description: String::new(),
            }],
            unknown_packages: vec!["gitt".into()],
            ..Default::default()
        }
        .finalize();
        assert!(sv.package_verification_failed);
        assert!(!sv.option_verification_failed);
        assert_eq!(sv.confidence, 0.5);
        assert!(sv.verifies_package("git"));

        let empty = SourceVerification::default().finalize();
        assert_eq!(empty.confidence, 1.0);
    }
}
