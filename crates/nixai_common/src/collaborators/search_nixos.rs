//! search.nixos.org verification client.
//!
//! Looks up every package and option an answer mentions in the
//! Elasticsearch backend behind search.nixos.org. An exact name match
//! wins; otherwise a close match (one name containing the other) counts.

use super::{SourceVerification, SourceVerifier, VerifiedOption, VerifiedPackage};
use crate::config::SearchConfig;
use crate::error::CollaboratorError;
use crate::extract;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("nixai-validator/", env!("CARGO_PKG_VERSION"));

pub struct SearchNixosClient {
    http: reqwest::Client,
    config: SearchConfig,
}

#[derive(Debug, Deserialize)]
struct EsResponse {
    hits: EsHits,
}

#[derive(Debug, Deserialize)]
struct EsHits {
    #[serde(default)]
    hits: Vec<EsHit>,
}

#[derive(Debug, Deserialize)]
struct EsHit {
    #[serde(rename = "_source")]
    source: EsSource,
}

#[derive(Debug, Default, Deserialize)]
struct EsSource {
    #[serde(default)]
    package_attr_name: Option<String>,
    #[serde(default)]
    package_pversion: Option<String>,
    #[serde(default)]
    package_description: Option<String>,
    #[serde(default)]
    option_name: Option<String>,
    #[serde(default)]
    option_description: Option<String>,
    #[serde(default)]
    option_type: Option<String>,
    #[serde(default)]
    option_default: Option<String>,
}

/// Exact match first, then a close match in either direction
fn best_match<'a, T>(wanted: &str, candidates: &'a [T], name: impl Fn(&T) -> &str) -> Option<&'a T> {
    candidates
        .iter()
        .find(|c| name(*c) == wanted)
        .or_else(|| {
            candidates.iter().find(|c| {
                let candidate = name(*c);
                !candidate.is_empty() && (candidate.contains(wanted) || wanted.contains(candidate))
            })
        })
}

impl SearchNixosClient {
    pub fn new(config: SearchConfig, timeout: Duration) -> Result<Self, CollaboratorError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| CollaboratorError::Unavailable(format!("HTTP client: {}", e)))?;
        Ok(Self { http, config })
    }

    fn search_url(&self) -> String {
        format!(
            "{}/{}/_search",
            self.config.backend_url.trim_end_matches('/'),
            self.config.index
        )
    }

    async fn query(&self, kind: &str, field: &str, term: &str) -> Result<Vec<EsSource>, CollaboratorError> {
        let mut matcher = serde_json::Map::new();
        matcher.insert(field.to_string(), json!(term));
        let body = json!({
            "size": 10,
            "query": {
                "bool": {
                    "filter": [{ "term": { "type": kind } }],
                    "must": [{ "match": matcher }]
                }
            }
        });

        let mut request = self.http.post(self.search_url()).json(&body);
        if let Some(user) = &self.config.username {
            request = request.basic_auth(user, self.config.password.as_ref());
        }

        let response: EsResponse = request.send().await?.error_for_status()?.json().await?;
        Ok(response.hits.hits.into_iter().map(|h| h.source).collect())
    }

    async fn lookup_package(&self, name: &str) -> Result<Option<VerifiedPackage>, CollaboratorError> {
        let hits = self.query("package", "package_attr_name", name).await?;
        Ok(best_match(name, &hits, |s| s.package_attr_name.as_deref().unwrap_or("")).map(|s| {
            VerifiedPackage {
                name: name.to_string(),
                version: s.package_pversion.clone().unwrap_or_default(),
                description: s.package_description.clone().unwrap_or_default(),
            }
        }))
    }

    async fn lookup_option(&self, path: &str) -> Result<Option<VerifiedOption>, CollaboratorError> {
        let hits = self.query("option", "option_name", path).await?;
        Ok(best_match(path, &hits, |s| s.option_name.as_deref().unwrap_or("")).map(|s| VerifiedOption {
            name: path.to_string(),
            description: s.option_description.clone().unwrap_or_default(),
            option_type: s.option_type.clone().unwrap_or_default(),
            default: s.option_default.clone().unwrap_or_default(),
        }))
    }
}

#[async_trait]
impl SourceVerifier for SearchNixosClient {
    async fn verify_answer(&self, answer: &str) -> Result<SourceVerification, CollaboratorError> {
        let packages = extract::package_names(answer);
        let options = extract::option_paths(answer);
        let mut result = SourceVerification::default();
        let mut attempted = 0usize;
        let mut last_error = None;

        for name in &packages {
            attempted += 1;
            match self.lookup_package(name).await {
                Ok(Some(pkg)) => result.packages_verified.push(pkg),
                Ok(None) => result.unknown_packages.push(name.clone()),
                Err(e) => {
                    warn!(package = %name, error = %e, "package lookup failed");
                    last_error = Some(e);
                }
            }
        }

        for path in &options {
            attempted += 1;
            match self.lookup_option(path).await {
                Ok(Some(opt)) => result.options_verified.push(opt),
                Ok(None) => result.unknown_options.push(path.clone()),
                Err(e) => {
                    warn!(option = %path, error = %e, "option lookup failed");
                    last_error = Some(e);
                }
            }
        }

        let answered = result.verified_count() + result.unknown_packages.len() + result.unknown_options.len();
        if attempted > 0 && answered == 0 {
            if let Some(e) = last_error {
                return Err(e);
            }
        }

        debug!(attempted, answered, "source verification finished");
        Ok(result.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pkg(name: &str) -> EsSource {
        EsSource {
            package_attr_name: Some(name.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_best_match_prefers_exact() {
        let hits = vec![pkg("firefox-esr"), pkg("firefox")];
        let found = best_match("firefox", &hits, |s| s.package_attr_name.as_deref().unwrap_or(""));
        assert_eq!(found.unwrap().package_attr_name.as_deref(), Some("firefox"));
    }

    #[test]
    fn test_best_match_close_and_none() {
        let hits = vec![pkg("python312Packages.requests")];
        assert!(best_match("requests", &hits, |s| s.package_attr_name.as_deref().unwrap_or("")).is_some());
        assert!(best_match("zsh", &hits, |s| s.package_attr_name.as_deref().unwrap_or("")).is_none());
        let empty = vec![EsSource::default()];
        assert!(best_match("zsh", &empty, |s| s.package_attr_name.as_deref().unwrap_or("")).is_none());
    }

    #[test]
    fn test_search_url() {
        let client = SearchNixosClient::new(SearchConfig::default(), Duration::from_secs(5)).unwrap();
        assert_eq!(
            client.search_url(),
            "https://search.nixos.org/backend/latest-44-nixos-unstable/_search"
        );
    }

    #[test]
    fn test_es_response_parses() {
        let json = r#"{"took":3,"hits":{"total":{"value":1},"hits":[{"_id":"x","_source":{"type":"option","option_name":"services.openssh.enable","option_type":"boolean"}}]}}"#;
        let parsed: EsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            parsed.hits.hits[0].source.option_name.as_deref(),
            Some("services.openssh.enable")
        );
    }
}
