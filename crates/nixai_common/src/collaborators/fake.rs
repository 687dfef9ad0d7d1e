//! Deterministic collaborators for tests and offline runs.
//!
//! ```rust,ignore
//! let tools = FakeToolExecutor::new()
//!     .with_package("firefox", true)
//!     .with_option("services.openssh.enable", true);
//! let check = tools.check_package("firefox").await?;
//! assert!(check.exists);
//! ```

use super::{
    OptionCheck, PackageCheck, SearchCollaborator, SearchHit, SourceVerification, SourceVerifier, SyntaxCheck,
    ToolExecutor, WikiPage,
};
use crate::error::CollaboratorError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// How a fake answers calls that have no canned response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeBehavior {
    /// Use canned responses, falling back to a negative answer
    Respond,
    /// Never complete; the caller's deadline fires
    Hang,
    /// Fail immediately with `CollaboratorError::Unavailable`
    Unavailable,
}

#[derive(Debug, Default)]
struct CallLog {
    counts: HashMap<String, usize>,
}

impl CallLog {
    fn record(log: &Arc<Mutex<CallLog>>, operation: &str) {
        if let Ok(mut log) = log.lock() {
            *log.counts.entry(operation.to_string()).or_insert(0) += 1;
        }
    }

    fn count(log: &Arc<Mutex<CallLog>>, operation: &str) -> usize {
        log.lock()
            .map(|log| log.counts.get(operation).copied().unwrap_or(0))
            .unwrap_or(0)
    }
}

async fn gate(behavior: FakeBehavior, operation: &str) -> Result<(), CollaboratorError> {
    match behavior {
        FakeBehavior::Respond => Ok(()),
        FakeBehavior::Hang => {
            std::future::pending::<()>().await;
            Ok(())
        }
        FakeBehavior::Unavailable => Err(CollaboratorError::Unavailable(format!(
            "fake collaborator offline during {}",
            operation
        ))),
    }
}

// ============================================================================
// Fake Tool Executor
// ============================================================================

/// Fake tool executor with per-name canned answers
#[derive(Debug, Clone)]
pub struct FakeToolExecutor {
    behavior: FakeBehavior,
    packages: HashMap<String, bool>,
    fallback_packages: HashMap<String, bool>,
    /// Package names whose primary query errors instead of answering
    failing_packages: Vec<String>,
    options: HashMap<String, bool>,
    commands: HashMap<String, bool>,
    /// Substrings that make an expression fail to parse
    syntax_errors: Vec<String>,
    flake_valid: bool,
    calls: Arc<Mutex<CallLog>>,
}

impl FakeToolExecutor {
    pub fn new() -> Self {
        Self {
            behavior: FakeBehavior::Respond,
            packages: HashMap::new(),
            fallback_packages: HashMap::new(),
            failing_packages: Vec::new(),
            options: HashMap::new(),
            commands: HashMap::new(),
            syntax_errors: Vec::new(),
            flake_valid: true,
            calls: Arc::new(Mutex::new(CallLog::default())),
        }
    }

    /// Every call hangs until the deadline
    pub fn hanging() -> Self {
        Self {
            behavior: FakeBehavior::Hang,
            ..Self::new()
        }
    }

    /// Every call fails as unavailable
    pub fn unavailable() -> Self {
        Self {
            behavior: FakeBehavior::Unavailable,
            ..Self::new()
        }
    }

    pub fn with_package(mut self, name: &str, exists: bool) -> Self {
        self.packages.insert(name.to_string(), exists);
        self
    }

    /// Primary query errors for this package; the fallback answers
    pub fn with_fallback_package(mut self, name: &str, exists: bool) -> Self {
        self.failing_packages.push(name.to_string());
        self.fallback_packages.insert(name.to_string(), exists);
        self
    }

    pub fn with_option(mut self, path: &str, valid: bool) -> Self {
        self.options.insert(path.to_string(), valid);
        self
    }

    pub fn with_command(mut self, binary: &str, available: bool) -> Self {
        self.commands.insert(binary.to_string(), available);
        self
    }

    /// Expressions containing `fragment` fail to parse
    pub fn with_syntax_error(mut self, fragment: &str) -> Self {
        self.syntax_errors.push(fragment.to_string());
        self
    }

    pub fn with_flake_valid(mut self, valid: bool) -> Self {
        self.flake_valid = valid;
        self
    }

    pub fn call_count(&self, operation: &str) -> usize {
        CallLog::count(&self.calls, operation)
    }
}

impl Default for FakeToolExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolExecutor for FakeToolExecutor {
    async fn check_syntax(&self, expr: &str) -> Result<SyntaxCheck, CollaboratorError> {
        CallLog::record(&self.calls, "check_syntax");
        gate(self.behavior, "check_syntax").await?;
        match self.syntax_errors.iter().find(|frag| expr.contains(frag.as_str())) {
            Some(frag) => Ok(SyntaxCheck::invalid(format!(
                "error: syntax error, unexpected '{}' at line 1",
                frag
            ))),
            None => Ok(SyntaxCheck::valid()),
        }
    }

    async fn check_package(&self, name: &str) -> Result<PackageCheck, CollaboratorError> {
        CallLog::record(&self.calls, "check_package");
        gate(self.behavior, "check_package").await?;
        if self.failing_packages.iter().any(|p| p == name) {
            return Err(CollaboratorError::Malformed(format!("unreadable search output for {}", name)));
        }
        Ok(match self.packages.get(name) {
            Some(true) => PackageCheck::found(format!("nixpkgs.{}", name)),
            _ => PackageCheck::missing(),
        })
    }

    async fn find_package_fallback(&self, name: &str) -> Result<PackageCheck, CollaboratorError> {
        CallLog::record(&self.calls, "find_package_fallback");
        gate(self.behavior, "find_package_fallback").await?;
        Ok(match self.fallback_packages.get(name) {
            Some(true) => PackageCheck::found(format!("nixos.{}", name)),
            _ => PackageCheck::missing(),
        })
    }

    async fn check_option(&self, path: &str) -> Result<OptionCheck, CollaboratorError> {
        CallLog::record(&self.calls, "check_option");
        gate(self.behavior, "check_option").await?;
        Ok(match self.options.get(path) {
            Some(true) => OptionCheck {
                valid: true,
                option_type: Some("boolean".to_string()),
                default: Some("false".to_string()),
            },
            _ => OptionCheck::default(),
        })
    }

    async fn check_command(&self, binary: &str) -> Result<bool, CollaboratorError> {
        CallLog::record(&self.calls, "check_command");
        gate(self.behavior, "check_command").await?;
        Ok(self.commands.get(binary).copied().unwrap_or(false))
    }

    async fn check_flake(&self, _source: &str) -> Result<SyntaxCheck, CollaboratorError> {
        CallLog::record(&self.calls, "check_flake");
        gate(self.behavior, "check_flake").await?;
        if self.flake_valid {
            Ok(SyntaxCheck::valid())
        } else {
            Ok(SyntaxCheck::invalid("error: flake output attribute is not a function"))
        }
    }
}

// ============================================================================
// Fake Search
// ============================================================================

/// Fake wiki search keyed by exact query
#[derive(Debug, Clone)]
pub struct FakeSearch {
    behavior: FakeBehavior,
    hits: HashMap<String, Vec<SearchHit>>,
    default_hits: Vec<SearchHit>,
    pages: HashMap<String, WikiPage>,
    calls: Arc<Mutex<CallLog>>,
}

impl FakeSearch {
    pub fn new() -> Self {
        Self {
            behavior: FakeBehavior::Respond,
            hits: HashMap::new(),
            default_hits: Vec::new(),
            pages: HashMap::new(),
            calls: Arc::new(Mutex::new(CallLog::default())),
        }
    }

    pub fn with_behavior(mut self, behavior: FakeBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn with_hits(mut self, query: &str, hits: Vec<SearchHit>) -> Self {
        self.hits.insert(query.to_string(), hits);
        self
    }

    /// Hits returned for any query without a specific entry
    pub fn with_default_hits(mut self, hits: Vec<SearchHit>) -> Self {
        self.default_hits = hits;
        self
    }

    pub fn with_page(mut self, title: &str, content: &str) -> Self {
        self.pages.insert(
            title.to_string(),
            WikiPage {
                title: title.to_string(),
                content: content.to_string(),
                last_updated: None,
            },
        );
        self
    }

    pub fn call_count(&self, operation: &str) -> usize {
        CallLog::count(&self.calls, operation)
    }

    /// Build a hit with a wiki-style URL
    pub fn hit(title: &str, snippet: &str, relevance: f64) -> SearchHit {
        SearchHit {
            title: title.to_string(),
            url: format!("https://wiki.nixos.org/wiki/{}", title.replace(' ', "_")),
            snippet: snippet.to_string(),
            relevance,
        }
    }
}

impl Default for FakeSearch {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchCollaborator for FakeSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, CollaboratorError> {
        CallLog::record(&self.calls, "search");
        gate(self.behavior, "search").await?;
        Ok(self
            .hits
            .get(query)
            .cloned()
            .unwrap_or_else(|| self.default_hits.clone()))
    }

    async fn get_page(&self, title: &str) -> Result<WikiPage, CollaboratorError> {
        CallLog::record(&self.calls, "get_page");
        gate(self.behavior, "get_page").await?;
        self.pages
            .get(title)
            .cloned()
            .ok_or_else(|| CollaboratorError::Unavailable(format!("no page titled '{}'", title)))
    }
}

// ============================================================================
// Fake Source Verifier
// ============================================================================

/// Fake verifier returning one canned result
#[derive(Debug, Clone)]
pub struct FakeSourceVerifier {
    behavior: FakeBehavior,
    response: SourceVerification,
    calls: Arc<Mutex<CallLog>>,
}

impl FakeSourceVerifier {
    pub fn new(response: SourceVerification) -> Self {
        Self {
            behavior: FakeBehavior::Respond,
            response,
            calls: Arc::new(Mutex::new(CallLog::default())),
        }
    }

    pub fn with_behavior(mut self, behavior: FakeBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn call_count(&self) -> usize {
        CallLog::count(&self.calls, "verify_answer")
    }
}

#[async_trait]
impl SourceVerifier for FakeSourceVerifier {
    async fn verify_answer(&self, _answer: &str) -> Result<SourceVerification, CollaboratorError> {
        CallLog::record(&self.calls, "verify_answer");
        gate(self.behavior, "verify_answer").await?;
        Ok(self.response.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fake_tools_canned_answers() {
        let tools = FakeToolExecutor::new()
            .with_package("firefox", true)
            .with_command("nixos-rebuild", true)
            .with_syntax_error("{{");

        assert!(tools.check_package("firefox").await.unwrap().exists);
        assert!(!tools.check_package("firefx").await.unwrap().exists);
        assert!(tools.check_command("nixos-rebuild").await.unwrap());
        assert!(!tools.check_syntax("{{ broken").await.unwrap().valid);
        assert!(tools.check_syntax("{ }").await.unwrap().valid);
        assert_eq!(tools.call_count("check_package"), 2);
    }

    #[tokio::test]
    async fn test_fake_tools_fallback() {
        let tools = FakeToolExecutor::new().with_fallback_package("htop", true);
        assert!(tools.check_package("htop").await.is_err());
        assert!(tools.find_package_fallback("htop").await.unwrap().exists);
    }

    #[tokio::test]
    async fn test_unavailable_fake_errors() {
        let tools = FakeToolExecutor::unavailable();
        let err = tools.check_option("services.openssh.enable").await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_fake_search_pages() {
        let search = FakeSearch::new()
            .with_hits("bluetooth", vec![FakeSearch::hit("Bluetooth", "enable bluetooth", 0.9)])
            .with_page("Bluetooth", "hardware.bluetooth.enable = true;");
        assert_eq!(search.search("bluetooth").await.unwrap().len(), 1);
        assert!(search.search("other").await.unwrap().is_empty());
        assert!(search.get_page("Bluetooth").await.is_ok());
        assert!(search.get_page("Missing").await.is_err());
    }
}
