use std::sync::RwLock;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use crate::core::github_cards::query_builder::{SEARCH_ISSUES_QUERY, VALIDATE_REPO_QUERY};
use crate::core::github_cards::{GithubCardsError, GraphqlClient, SearchData, SearchEntry};

const GRAPHQL_URL: &str = "https://api.github.com/graphql";

/// GitHub GraphQL v4 client. The token can be swapped at runtime by the bot owner.
pub struct GithubGraphqlClient {
    client: Client,
    endpoint: String,
    token: RwLock<Option<String>>,
}

impl GithubGraphqlClient {
    pub fn new(token: Option<String>) -> Result<Self, GithubCardsError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github.shadow-cat-preview+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static("SentinelBot/1.0"));

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| GithubCardsError::Api(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: GRAPHQL_URL.to_string(),
            token: RwLock::new(token.filter(|t| !t.is_empty())),
        })
    }

    fn current_token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// POST one GraphQL document and return the whole response body.
    async fn post(
        &self,
        operation: &str,
        query: &str,
        variables: Value,
    ) -> Result<Value, GithubCardsError> {
        let token = self
            .current_token()
            .ok_or_else(|| {
                GithubCardsError::Unauthorized("No GitHub token configured".to_string())
            })?;

        let resp = self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, format!("bearer {token}"))
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| GithubCardsError::Api(e.to_string()))?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(GithubCardsError::Unauthorized(format!(
                "GitHub rejected the token ({status})"
            )));
        }

        let header_limit = RateLimit::from_headers(resp.headers());

        if !status.is_success() {
            return Err(GithubCardsError::Api(format!(
                "GitHub GraphQL API returned {status}"
            )));
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| GithubCardsError::Api(e.to_string()))?;

        let payload_limit = body.pointer("/data/rateLimit");
        log_rate_limit(operation, header_limit, payload_limit);

        Ok(body)
    }
}

#[async_trait]
impl GraphqlClient for GithubGraphqlClient {
    fn has_token(&self) -> bool {
        self.current_token().is_some()
    }

    fn set_token(&self, token: &str) -> Result<(), GithubCardsError> {
        let token = token.trim();
        let mut current = self
            .token
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *current = (!token.is_empty()).then(|| token.to_string());
        Ok(())
    }

    async fn validate_repo(&self, owner: &str, repo: &str) -> Result<(), GithubCardsError> {
        let body = self
            .post(
                "validate_repo",
                VALIDATE_REPO_QUERY,
                json!({ "repoOwner": owner, "repoName": repo }),
            )
            .await?;
        check_repository(&body)
    }

    async fn search_issues(
        &self,
        owner: &str,
        repo: &str,
        query: &str,
    ) -> Result<SearchData, GithubCardsError> {
        let query = format!("repo:{owner}/{repo} {query}");
        let body = self
            .post("search_issues", SEARCH_ISSUES_QUERY, json!({ "query": query }))
            .await?;
        parse_search_response(query, &body)
    }

    async fn send_query(&self, query: &str) -> Result<Value, GithubCardsError> {
        self.post("send_query", query, json!({})).await
    }
}

fn graphql_errors(body: &Value) -> Option<String> {
    let errors = body.get("errors")?.as_array()?;
    if errors.is_empty() {
        return None;
    }
    Some(
        errors
            .iter()
            .filter_map(|e| e.get("message").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("; "),
    )
}

fn check_repository(body: &Value) -> Result<(), GithubCardsError> {
    if let Some(message) = graphql_errors(body) {
        return Err(GithubCardsError::Api(message));
    }
    match body.pointer("/data/repository") {
        Some(repo) if !repo.is_null() => Ok(()),
        _ => Err(GithubCardsError::Api("Repository not found".to_string())),
    }
}

fn parse_search_response(query: String, body: &Value) -> Result<SearchData, GithubCardsError> {
    if let Some(message) = graphql_errors(body) {
        return Err(GithubCardsError::Api(message));
    }
    let search = body
        .pointer("/data/search")
        .ok_or_else(|| GithubCardsError::Api("Search response had no data".to_string()))?;

    let total = search
        .get("issueCount")
        .and_then(Value::as_u64)
        .unwrap_or_default();
    let results: Vec<SearchEntry> = match search.get("nodes") {
        Some(nodes) => serde_json::from_value(nodes.clone())
            .map_err(|e| GithubCardsError::Api(e.to_string()))?,
        None => Vec::new(),
    };

    Ok(SearchData {
        total,
        results,
        query,
    })
}

// ============================================================================
// RATE LIMIT TELEMETRY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
struct RateLimit {
    limit: u64,
    remaining: u64,
    cost: Option<u64>,
}

impl RateLimit {
    fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let read = |name: &str| -> Option<u64> { headers.get(name)?.to_str().ok()?.parse().ok() };
        Some(Self {
            limit: read("x-ratelimit-limit")?,
            remaining: read("x-ratelimit-remaining")?,
            cost: None,
        })
    }

    fn from_payload(payload: &Value) -> Option<Self> {
        Some(Self {
            limit: payload.get("limit")?.as_u64()?,
            remaining: payload.get("remaining")?.as_u64()?,
            cost: payload.get("cost").and_then(Value::as_u64),
        })
    }
}

/// Headers win for limit/remaining; the payload is the only source of the query cost.
fn resolve_rate_limit(headers: Option<RateLimit>, payload: Option<&Value>) -> Option<RateLimit> {
    let from_payload = payload.and_then(RateLimit::from_payload);
    match (headers, from_payload) {
        (Some(mut h), Some(p)) => {
            h.cost = p.cost;
            Some(h)
        }
        (Some(h), None) => Some(h),
        (None, p) => p,
    }
}

fn log_rate_limit(operation: &str, headers: Option<RateLimit>, payload: Option<&Value>) {
    match resolve_rate_limit(headers, payload) {
        Some(rl) => tracing::debug!(
            operation,
            cost = rl.cost.map(|c| c.to_string()).unwrap_or_else(|| "not provided".to_string()),
            remaining = rl.remaining,
            limit = rl.limit,
            "GitHub rate limit"
        ),
        None => tracing::debug!(operation, "no RL data"),
    }
}
