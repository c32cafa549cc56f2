use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

/// Errors raised while talking to GitHub or persisting prefixes.
#[derive(Debug, Error)]
pub enum GithubCardsError {
    #[error("GitHub token rejected: {0}")]
    Unauthorized(String),
    #[error("GitHub API error: {0}")]
    Api(String),
    #[error("Failed to persist GitHub cards config: {0}")]
    Store(String),
}

/// Repository a prefix points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    /// Parse an `Owner/Repository` slug.
    pub fn parse_slug(slug: &str) -> Option<Self> {
        let mut parts = slug.split('/');
        let owner = parts.next()?.trim();
        let repo = parts.next()?.trim();
        if parts.next().is_some() || owner.is_empty() || repo.is_empty() {
            return None;
        }
        Some(Self::new(owner, repo))
    }

    pub fn name_with_owner(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

/// One `<prefix>#<number>` hit inside a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueReference {
    pub prefix: String,
    pub repo: RepoRef,
    pub number: u64,
}

/// Issues to fetch for a single repository, in first-mention order.
#[derive(Debug, Clone)]
pub struct FetchableRepo {
    pub repo: RepoRef,
    pub prefix: String,
    pub issues: Vec<u64>,
}

/// Everything one message asks for, grouped by repository.
#[derive(Debug, Clone, Default)]
pub struct FetchableRepos {
    repos: Vec<FetchableRepo>,
}

impl FetchableRepos {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a reference. Returns `false` when the same issue of the same repo was already seen.
    pub fn add(&mut self, reference: IssueReference) -> bool {
        let index = match self.repos.iter().position(|r| r.repo == reference.repo) {
            Some(index) => index,
            None => {
                self.repos.push(FetchableRepo {
                    repo: reference.repo,
                    prefix: reference.prefix,
                    issues: Vec::new(),
                });
                self.repos.len() - 1
            }
        };

        let entry = &mut self.repos[index];
        if entry.issues.contains(&reference.number) {
            return false;
        }
        entry.issues.push(reference.number);
        true
    }

    pub fn is_empty(&self) -> bool {
        self.repos.iter().all(|r| r.issues.is_empty())
    }

    pub fn issue_count(&self) -> usize {
        self.repos.iter().map(|r| r.issues.len()).sum()
    }

    pub fn repos(&self) -> &[FetchableRepo] {
        &self.repos
    }
}

/// Issue or pull request state as reported by GraphQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueState {
    Open,
    Closed,
    Merged,
}

impl IssueState {
    /// Accent colour used on cards.
    pub fn colour(self) -> u32 {
        match self {
            IssueState::Open => 0x6cc644,
            IssueState::Closed => 0xbd2c00,
            IssueState::Merged => 0x6e5494,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum IssueKind {
    Issue,
    PullRequest,
}

impl IssueKind {
    pub fn label(self) -> &'static str {
        match self {
            IssueKind::Issue => "Issue",
            IssueKind::PullRequest => "Pull Request",
        }
    }
}

/// Everything a card needs about one issue or pull request.
#[derive(Debug, Clone)]
pub struct IssueData {
    pub name_with_owner: String,
    pub author_name: String,
    pub author_url: String,
    pub author_avatar_url: String,
    pub kind: IssueKind,
    pub number: u64,
    pub title: String,
    pub url: String,
    pub body_text: String,
    pub state: IssueState,
    pub labels: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub is_draft: Option<bool>,
    pub mergeable_state: Option<String>,
    pub milestone: Option<String>,
}

/// An issue together with the prefix it was requested through.
#[derive(Debug, Clone)]
pub struct FetchedIssue {
    pub prefix: String,
    pub issue: IssueData,
}

/// One search hit (`search.nodes[]`).
#[derive(Debug, Clone, Deserialize)]
pub struct SearchEntry {
    #[serde(rename = "__typename")]
    pub kind: IssueKind,
    pub state: IssueState,
    pub number: u64,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub mergeable: Option<String>,
    #[serde(default, rename = "isDraft")]
    pub is_draft: Option<bool>,
}

/// Result of a repository-scoped issue search.
#[derive(Debug, Clone)]
pub struct SearchData {
    pub total: u64,
    pub results: Vec<SearchEntry>,
    pub query: String,
}

/// Result of `githubcards add`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddPrefixOutcome {
    Added { prefix: String, repo: RepoRef },
    InvalidSlug,
    RepoInaccessible,
    AlreadyExists,
}

impl AddPrefixOutcome {
    pub fn message(&self, slug: &str) -> String {
        match self {
            AddPrefixOutcome::Added { prefix, .. } => {
                format!("A GitHub repository (``{slug}``) added with a prefix ``{prefix}``")
            }
            AddPrefixOutcome::InvalidSlug => {
                "Invalid format. Please use ``Username/Repository``.".to_string()
            }
            AddPrefixOutcome::RepoInaccessible => "The provided GitHub repository doesn't \
                exist, or is unable to be accessed due to permissions."
                .to_string(),
            AddPrefixOutcome::AlreadyExists => {
                "This prefix already exists in this server. Please use something else.".to_string()
            }
        }
    }
}

/// Why `ghsearch` could not resolve its prefix argument.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PrefixLookupError {
    #[error("There are no configured repositories on this server.")]
    NoRepositories,
    #[error("There's no repo with prefix `{0}` configured on this server")]
    UnknownPrefix(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(prefix: &str, owner: &str, repo: &str, number: u64) -> IssueReference {
        IssueReference {
            prefix: prefix.to_string(),
            repo: RepoRef::new(owner, repo),
            number,
        }
    }

    #[test]
    fn test_parse_slug() {
        assert_eq!(
            RepoRef::parse_slug("Cog-Creators/Red-DiscordBot"),
            Some(RepoRef::new("Cog-Creators", "Red-DiscordBot"))
        );
        assert_eq!(RepoRef::parse_slug("no-slash"), None);
        assert_eq!(RepoRef::parse_slug("a/b/c"), None);
        assert_eq!(RepoRef::parse_slug("/repo"), None);
    }

    #[test]
    fn test_fetchable_repos_group_and_dedupe() {
        let mut repos = FetchableRepos::new();
        assert!(repos.add(reference("gh", "owner", "one", 12)));
        assert!(repos.add(reference("other", "owner", "two", 3)));
        assert!(!repos.add(reference("gh", "owner", "one", 12)));
        assert!(repos.add(reference("gh", "owner", "one", 7)));

        assert_eq!(repos.repos().len(), 2);
        assert_eq!(repos.repos()[0].issues, vec![12, 7]);
        assert_eq!(repos.repos()[1].issues, vec![3]);
        assert_eq!(repos.issue_count(), 3);
    }

    #[test]
    fn test_add_prefix_messages() {
        let added = AddPrefixOutcome::Added {
            prefix: "red".to_string(),
            repo: RepoRef::new("Cog-Creators", "Red-DiscordBot"),
        };
        assert_eq!(
            added.message("Cog-Creators/Red-DiscordBot"),
            "A GitHub repository (``Cog-Creators/Red-DiscordBot``) added with a prefix ``red``"
        );
    }
}
