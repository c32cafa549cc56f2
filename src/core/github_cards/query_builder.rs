// GraphQL query templating for batched issue lookups, and parsing of the batched response.
//
// Every repository gets an alias `repo<idx>` and every issue an alias `issue<number>`, so one
// round trip fetches every reference in a message.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use super::cards_models::{
    FetchableRepos, FetchedIssue, GithubCardsError, IssueData, IssueKind, IssueState,
};

pub const VALIDATE_REPO_QUERY: &str = r#"
        query ValidateRepo($repoOwner: String!, $repoName: String!) {
            repository(owner: $repoOwner, name: $repoName) {
                id
                name
            }
            rateLimit {
                cost
                remaining
                limit
                resetAt
            }
        }"#;

pub const SEARCH_ISSUES_QUERY: &str = r#"
        query SearchIssues($query: String!) {
            search(type: ISSUE, query: $query, first: 15) {
                issueCount
                nodes {
                    __typename
                    ... on Issue {
                        state
                        number
                        title
                        url
                    }
                    ... on PullRequest {
                        mergeable
                        isDraft
                        state
                        number
                        title
                        url
                    }
                }
            }
            rateLimit {
                cost
                remaining
                limit
                resetAt
            }
        }"#;

const ISSUE_FIELDS: &str = r#"
            number
            title
            body
            url
            createdAt
            state
            milestone {
                title
            }
            author {
                login
                avatarUrl
                url
            }
            repository {
                nameWithOwner
            }
            labels(first:100) {
                nodes {
                    name
                }
            }"#;

const GHOST_LOGIN: &str = "Ghost";
const GHOST_URL: &str = "https://github.com/ghost";
const GHOST_AVATAR: &str = "https://avatars2.githubusercontent.com/u/10137?u=b1951d34a583cf12ec0d3b0781ba19be97726318&v=4";

/// Error type GitHub reports for a missing issue or repository.
const NOT_FOUND: &str = "NOT_FOUND";

fn issue_alias(number: u64) -> String {
    format!("issue{number}")
}

fn repo_alias(index: usize) -> String {
    format!("repo{index}")
}

/// Quote a value for use inside a GraphQL string literal.
fn graphql_string(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

fn issue_selection(number: u64) -> String {
    format!(
        "{alias}: issueOrPullRequest(number: {number}) {{\n        __typename\n        ... on PullRequest {{{ISSUE_FIELDS}\n            mergeable\n            isDraft\n        }}\n        ... on Issue {{{ISSUE_FIELDS}\n        }}\n    }}",
        alias = issue_alias(number),
    )
}

/// Build one `FindIssueOrPr` query covering every repository and issue.
pub fn build_query(fetchable: &FetchableRepos) -> String {
    let repositories = fetchable
        .repos()
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let issues = entry
                .issues
                .iter()
                .map(|number| issue_selection(*number))
                .collect::<Vec<_>>()
                .join("\n");
            format!(
                "{alias}: repository(owner: {owner}, name: {name}) {{\n        {issues}\n    }}",
                alias = repo_alias(index),
                owner = graphql_string(&entry.repo.owner),
                name = graphql_string(&entry.repo.repo),
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!("query FindIssueOrPr {{\n        {repositories}\n    }}")
}

#[derive(Debug, Deserialize)]
struct ApiIssueNode {
    #[serde(rename = "__typename")]
    kind: IssueKind,
    number: u64,
    title: String,
    #[serde(default)]
    body: Option<String>,
    url: String,
    #[serde(rename = "createdAt")]
    created_at: String,
    state: IssueState,
    #[serde(default)]
    mergeable: Option<String>,
    #[serde(default, rename = "isDraft")]
    is_draft: Option<bool>,
    #[serde(default)]
    milestone: Option<ApiMilestone>,
    #[serde(default)]
    author: Option<ApiAuthor>,
    repository: ApiRepository,
    #[serde(default)]
    labels: Option<ApiLabels>,
}

#[derive(Debug, Deserialize)]
struct ApiMilestone {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ApiAuthor {
    login: String,
    #[serde(rename = "avatarUrl")]
    avatar_url: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct ApiRepository {
    #[serde(rename = "nameWithOwner")]
    name_with_owner: String,
}

#[derive(Debug, Deserialize)]
struct ApiLabels {
    #[serde(default)]
    nodes: Vec<ApiLabel>,
}

#[derive(Debug, Deserialize)]
struct ApiLabel {
    name: String,
}

impl ApiIssueNode {
    fn into_issue(self) -> Result<IssueData, GithubCardsError> {
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| GithubCardsError::Api(format!("bad createdAt: {e}")))?
            .with_timezone(&Utc);

        let (author_name, author_url, author_avatar_url) = match self.author {
            Some(author) => (author.login, author.url, author.avatar_url),
            None => (
                GHOST_LOGIN.to_string(),
                GHOST_URL.to_string(),
                GHOST_AVATAR.to_string(),
            ),
        };

        Ok(IssueData {
            name_with_owner: self.repository.name_with_owner,
            author_name,
            author_url,
            author_avatar_url,
            kind: self.kind,
            number: self.number,
            title: self.title,
            url: self.url,
            body_text: self.body.unwrap_or_default(),
            state: self.state,
            labels: self
                .labels
                .map(|l| l.nodes.into_iter().map(|n| n.name).collect())
                .unwrap_or_default(),
            created_at,
            is_draft: self.is_draft,
            mergeable_state: self.mergeable,
            milestone: self.milestone.map(|m| m.title),
        })
    }
}

/// Collect the `errors` list that are not plain NOT_FOUND misses.
fn fatal_errors(response: &Value) -> Vec<String> {
    response
        .get("errors")
        .and_then(Value::as_array)
        .map(|errors| {
            errors
                .iter()
                .filter(|e| e.get("type").and_then(Value::as_str) != Some(NOT_FOUND))
                .map(|e| {
                    e.get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown GraphQL error")
                        .to_string()
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Turn a batched response into issues, in request order. Missing issues are skipped.
pub fn parse_query_response(
    fetchable: &FetchableRepos,
    response: &Value,
) -> Result<Vec<FetchedIssue>, GithubCardsError> {
    let fatal = fatal_errors(response);
    if !fatal.is_empty() {
        return Err(GithubCardsError::Api(fatal.join("; ")));
    }

    let data = response
        .get("data")
        .filter(|d| d.is_object())
        .ok_or_else(|| GithubCardsError::Api("response has no data".to_string()))?;

    let mut issues = Vec::new();
    for (index, entry) in fetchable.repos().iter().enumerate() {
        let Some(repo_data) = data.get(repo_alias(index)).filter(|r| !r.is_null()) else {
            tracing::debug!(repo = %entry.repo.name_with_owner(), "Repository not found, skipping");
            continue;
        };

        for number in &entry.issues {
            let Some(node) = repo_data.get(issue_alias(*number)).filter(|n| !n.is_null()) else {
                continue;
            };
            let node: ApiIssueNode = serde_json::from_value(node.clone())
                .map_err(|e| GithubCardsError::Api(e.to_string()))?;
            issues.push(FetchedIssue {
                prefix: entry.prefix.clone(),
                issue: node.into_issue()?,
            });
        }
    }

    Ok(issues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::github_cards::cards_models::{IssueReference, RepoRef};
    use serde_json::json;

    fn fetchable(entries: &[(&str, &str, &str, u64)]) -> FetchableRepos {
        let mut repos = FetchableRepos::new();
        for (prefix, owner, repo, number) in entries {
            repos.add(IssueReference {
                prefix: prefix.to_string(),
                repo: RepoRef::new(*owner, *repo),
                number: *number,
            });
        }
        repos
    }

    fn issue_node(number: u64, state: &str) -> Value {
        json!({
            "__typename": "Issue",
            "number": number,
            "title": format!("Issue {number}"),
            "body": "Body text",
            "url": format!("https://github.com/owner/repo/issues/{number}"),
            "createdAt": "2021-03-04T05:06:07Z",
            "state": state,
            "milestone": null,
            "author": {
                "login": "octocat",
                "avatarUrl": "https://a/1",
                "url": "https://github.com/octocat"
            },
            "repository": {"nameWithOwner": "owner/repo"},
            "labels": {"nodes": [{"name": "bug"}]}
        })
    }

    #[test]
    fn test_query_aliases_every_issue() {
        let repos = fetchable(&[
            ("gh", "owner", "repo", 1),
            ("gh", "owner", "repo", 2),
            ("d", "owner", "docs", 9),
        ]);
        let query = build_query(&repos);

        assert!(query.starts_with("query FindIssueOrPr {"));
        assert!(query.contains(r#"repo0: repository(owner: "owner", name: "repo")"#));
        assert!(query.contains(r#"repo1: repository(owner: "owner", name: "docs")"#));
        assert!(query.contains("issue1: issueOrPullRequest(number: 1)"));
        assert!(query.contains("issue2: issueOrPullRequest(number: 2)"));
        assert!(query.contains("issue9: issueOrPullRequest(number: 9)"));
        assert!(query.contains("... on PullRequest"));
        assert!(query.contains("isDraft"));
    }

    #[test]
    fn test_query_escapes_string_literals() {
        let repos = fetchable(&[("x", "ow\"ner", "re\\po", 1)]);
        let query = build_query(&repos);
        assert!(query.contains(r#"owner: "ow\"ner", name: "re\\po""#));
    }

    #[test]
    fn test_parse_skips_not_found_issue() {
        let repos = fetchable(&[("gh", "owner", "repo", 1), ("gh", "owner", "repo", 404)]);
        let response = json!({
            "data": {"repo0": {"issue1": issue_node(1, "OPEN"), "issue404": null}},
            "errors": [{
                "type": "NOT_FOUND",
                "path": ["repo0", "issue404"],
                "message": "Could not resolve"
            }]
        });

        let issues = parse_query_response(&repos, &response).unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].prefix, "gh");
        assert_eq!(issues[0].issue.number, 1);
        assert_eq!(issues[0].issue.labels, vec!["bug"]);
        assert_eq!(issues[0].issue.state, IssueState::Open);
    }

    #[test]
    fn test_parse_skips_missing_repository() {
        let repos = fetchable(&[("a", "gone", "repo", 1), ("b", "owner", "repo", 2)]);
        let response = json!({
            "data": {"repo0": null, "repo1": {"issue2": issue_node(2, "CLOSED")}},
            "errors": [{"type": "NOT_FOUND", "path": ["repo0"], "message": "Could not resolve"}]
        });

        let issues = parse_query_response(&repos, &response).unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].prefix, "b");
    }

    #[test]
    fn test_parse_propagates_other_errors() {
        let repos = fetchable(&[("gh", "owner", "repo", 1)]);
        let response = json!({
            "data": null,
            "errors": [{"type": "RATE_LIMITED", "message": "API rate limit exceeded"}]
        });

        let err = parse_query_response(&repos, &response).unwrap_err();
        assert!(matches!(err, GithubCardsError::Api(msg) if msg.contains("rate limit")));
    }

    #[test]
    fn test_deleted_author_becomes_ghost() {
        let repos = fetchable(&[("gh", "owner", "repo", 1)]);
        let mut node = issue_node(1, "OPEN");
        node["author"] = Value::Null;
        let response = json!({"data": {"repo0": {"issue1": node}}});

        let issues = parse_query_response(&repos, &response).unwrap();
        assert_eq!(issues[0].issue.author_name, "Ghost");
        assert_eq!(issues[0].issue.author_url, "https://github.com/ghost");
    }

    #[test]
    fn test_pull_request_fields() {
        let repos = fetchable(&[("gh", "owner", "repo", 5)]);
        let mut node = issue_node(5, "OPEN");
        node["__typename"] = json!("PullRequest");
        node["mergeable"] = json!("CONFLICTING");
        node["isDraft"] = json!(false);
        node["milestone"] = json!({"title": "v1.0"});
        let response = json!({"data": {"repo0": {"issue5": node}}});

        let issue = parse_query_response(&repos, &response).unwrap().remove(0).issue;
        assert_eq!(issue.kind, IssueKind::PullRequest);
        assert_eq!(issue.mergeable_state.as_deref(), Some("CONFLICTING"));
        assert_eq!(issue.is_draft, Some(false));
        assert_eq!(issue.milestone.as_deref(), Some("v1.0"));
    }
}
