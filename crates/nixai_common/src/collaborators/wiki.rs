//! Wiki Client - NixOS wiki search over the MediaWiki API
//!
//! Queries `api.php` on wiki.nixos.org (or a configured mirror) for search
//! hits and page content. Hits carry a relevance score computed from the
//! overlap between the query and the hit's title and snippet.

use super::{SearchCollaborator, SearchHit, WikiPage};
use crate::config::WikiConfig;
use crate::error::CollaboratorError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("nixai-validator/", env!("CARGO_PKG_VERSION"));

static HTML_TAG: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"<[^>]*>").ok());

/// MediaWiki search client
pub struct NixosWikiClient {
    http: reqwest::Client,
    base_url: String,
    limit: usize,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    query: Option<SearchQuery>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchEntry>,
}

#[derive(Debug, Deserialize)]
struct SearchEntry {
    title: String,
    #[serde(default)]
    snippet: String,
}

#[derive(Debug, Deserialize)]
struct PageResponse {
    #[serde(default)]
    query: Option<PageQuery>,
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    #[serde(default)]
    pages: Vec<PageEntry>,
}

#[derive(Debug, Deserialize)]
struct PageEntry {
    title: String,
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    revisions: Vec<Revision>,
}

#[derive(Debug, Deserialize)]
struct Revision {
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    slots: Option<Slots>,
}

#[derive(Debug, Deserialize)]
struct Slots {
    main: SlotContent,
}

#[derive(Debug, Deserialize)]
struct SlotContent {
    #[serde(default)]
    content: String,
}

impl NixosWikiClient {
    pub fn new(config: &WikiConfig, timeout: Duration) -> Result<Self, CollaboratorError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| CollaboratorError::Unavailable(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            limit: config.result_limit,
        })
    }

    fn api_url(&self) -> String {
        format!("{}/w/api.php", self.base_url)
    }

    fn page_url(&self, title: &str) -> String {
        format!("{}/wiki/{}", self.base_url, title.replace(' ', "_"))
    }
}

#[async_trait]
impl SearchCollaborator for NixosWikiClient {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, CollaboratorError> {
        debug!(query, "wiki search");
        let limit = self.limit.to_string();
        let response: SearchResponse = self
            .http
            .get(self.api_url())
            .query(&[
                ("action", "query"),
                ("format", "json"),
                ("list", "search"),
                ("srsearch", query),
                ("srlimit", limit.as_str()),
                ("srprop", "size|snippet|titlesnippet"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let entries = response
            .query
            .ok_or_else(|| CollaboratorError::Malformed("search response has no query block".to_string()))?
            .search;

        Ok(entries
            .into_iter()
            .map(|entry| {
                let snippet = clean_snippet(&entry.snippet);
                SearchHit {
                    relevance: relevance(query, &entry.title, &snippet),
                    url: self.page_url(&entry.title),
                    title: entry.title,
                    snippet,
                }
            })
            .collect())
    }

    async fn get_page(&self, title: &str) -> Result<WikiPage, CollaboratorError> {
        debug!(title, "wiki page fetch");
        let response: PageResponse = self
            .http
            .get(self.api_url())
            .query(&[
                ("action", "query"),
                ("format", "json"),
                ("formatversion", "2"),
                ("prop", "revisions"),
                ("rvprop", "content|timestamp"),
                ("rvslots", "main"),
                ("titles", title),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let page = response
            .query
            .and_then(|q| q.pages.into_iter().next())
            .ok_or_else(|| CollaboratorError::Malformed("page response has no pages".to_string()))?;
        if page.missing {
            return Err(CollaboratorError::Unavailable(format!("wiki page '{}' not found", title)));
        }

        let revision = page.revisions.into_iter().next();
        let last_updated = revision
            .as_ref()
            .and_then(|r| r.timestamp.as_deref())
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
            .map(|ts| ts.with_timezone(&Utc));
        let content = revision
            .and_then(|r| r.slots)
            .map(|s| s.main.content)
            .unwrap_or_default();

        Ok(WikiPage {
            title: page.title,
            content,
            last_updated,
        })
    }
}

/// Strip markup and common entities from a search snippet
pub fn clean_snippet(snippet: &str) -> String {
    let stripped = match HTML_TAG.as_ref() {
        Some(re) => re.replace_all(snippet, "").into_owned(),
        None => snippet.to_string(),
    };
    stripped
        .replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}

/// 0.6 for title word matches, 0.4 for snippet word matches
pub fn relevance(query: &str, title: &str, snippet: &str) -> f64 {
    let query_words: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
    if query_words.is_empty() {
        return 0.0;
    }
    let title_words: Vec<String> = title.split_whitespace().map(str::to_lowercase).collect();
    let snippet_lower = snippet.to_lowercase();

    let title_matches = query_words
        .iter()
        .filter(|q| {
            title_words
                .iter()
                .any(|t| t.contains(q.as_str()) || q.contains(t.as_str()))
        })
        .count();
    let snippet_matches = query_words
        .iter()
        .filter(|q| snippet_lower.contains(q.as_str()))
        .count();

    let total = query_words.len() as f64;
    (title_matches as f64 / total * 0.6 + snippet_matches as f64 / total * 0.4).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_clean_snippet() {
        let raw = r#"Enable <span class="searchmatch">Bluetooth</span> with &quot;hardware.bluetooth&quot; &amp; reboot"#;
        assert_eq!(
            clean_snippet(raw),
            r#"Enable Bluetooth with "hardware.bluetooth" & reboot"#
        );
    }

    #[test]
    fn test_relevance_weights() {
        assert_relative_eq!(relevance("bluetooth", "Bluetooth", "enable bluetooth"), 1.0);
        assert_relative_eq!(relevance("bluetooth", "Audio", "bluetooth headsets"), 0.4);
        assert_relative_eq!(relevance("bluetooth audio", "Bluetooth", "nothing here"), 0.3);
        assert_eq!(relevance("", "Bluetooth", "x"), 0.0);
    }

    #[test]
    fn test_page_url() {
        let client = NixosWikiClient::new(&WikiConfig::default(), Duration::from_secs(5)).unwrap();
        assert_eq!(client.page_url("Nix package manager"), "https://wiki.nixos.org/wiki/Nix_package_manager");
        assert_eq!(client.api_url(), "https://wiki.nixos.org/w/api.php");
    }

    #[test]
    fn test_search_response_parses() {
        let json = r#"{"batchcomplete":"","query":{"search":[{"ns":0,"title":"Bluetooth","size":100,"snippet":"x"}]}}"#;
        let parsed: SearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.query.unwrap().search[0].title, "Bluetooth");
    }
}
