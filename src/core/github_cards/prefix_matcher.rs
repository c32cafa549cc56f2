// Per-guild prefix matcher: a compiled `^(p1|p2|...)#([0-9]+)$` pattern plus the prefix table.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::{Regex, RegexBuilder};

use super::cards_models::{FetchableRepos, IssueReference, RepoRef};

/// Characters that separate references inside a message.
const SPLITTER_PATTERN: &str = r"[!?().,;:+|&/`\s]";

fn splitter() -> &'static Regex {
    static SPLITTER: OnceLock<Regex> = OnceLock::new();
    SPLITTER.get_or_init(|| Regex::new(SPLITTER_PATTERN).expect("splitter pattern is valid"))
}

/// Split message content into candidate reference tokens.
pub fn split_tokens(content: &str) -> impl Iterator<Item = &str> {
    splitter().split(content).filter(|token| !token.is_empty())
}

#[derive(Debug, Clone)]
pub struct PrefixMatcher {
    pattern: Regex,
    repos: HashMap<String, RepoRef>,
}

impl PrefixMatcher {
    /// Compile a matcher for one guild. Returns `None` when the guild has no prefixes.
    pub fn build(repos: HashMap<String, RepoRef>) -> Option<Self> {
        if repos.is_empty() {
            return None;
        }

        let repos: HashMap<String, RepoRef> = repos
            .into_iter()
            .map(|(prefix, repo)| (prefix.to_lowercase(), repo))
            .collect();

        // Longest first so overlapping prefixes resolve deterministically
        let mut prefixes: Vec<&String> = repos.keys().collect();
        prefixes.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        let alternation = prefixes
            .iter()
            .map(|prefix| regex::escape(prefix))
            .collect::<Vec<_>>()
            .join("|");

        let pattern = RegexBuilder::new(&format!(r"^({alternation})#([0-9]+)$"))
            .case_insensitive(true)
            .build()
            .ok()?;

        Some(Self { pattern, repos })
    }

    /// Match one token exactly, e.g. `Gh#12`.
    pub fn match_token(&self, token: &str) -> Option<IssueReference> {
        let captures = self.pattern.captures(token)?;
        let prefix = captures.get(1)?.as_str().to_lowercase();
        let number = captures.get(2)?.as_str().parse::<u64>().ok()?;
        let repo = self.repos.get(&prefix)?.clone();

        Some(IssueReference {
            prefix,
            repo,
            number,
        })
    }

    /// Collect every reference in a message, grouped by repository.
    pub fn collect_references<'a>(
        &self,
        tokens: impl IntoIterator<Item = &'a str>,
    ) -> FetchableRepos {
        let mut fetchable = FetchableRepos::new();
        for token in tokens {
            if let Some(reference) = self.match_token(token) {
                fetchable.add(reference);
            }
        }
        fetchable
    }

    pub fn repo_for(&self, prefix: &str) -> Option<&RepoRef> {
        self.repos.get(&prefix.to_lowercase())
    }

    pub fn prefixes(&self) -> impl Iterator<Item = (&String, &RepoRef)> {
        self.repos.iter()
    }
}
