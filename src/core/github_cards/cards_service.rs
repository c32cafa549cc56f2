use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};

use super::cards_models::{
    AddPrefixOutcome, FetchableRepos, FetchedIssue, GithubCardsError, PrefixLookupError, RepoRef,
    SearchData,
};
use super::prefix_matcher::{split_tokens, PrefixMatcher};
use super::query_builder::{build_query, parse_query_response};
use super::readiness::ReadyGate;

/// Trait describing the GraphQL operations the cards feature needs.
#[async_trait]
pub trait GraphqlClient: Send + Sync {
    /// Whether a non-empty token is configured.
    fn has_token(&self) -> bool;

    /// Swap the token used for subsequent requests.
    fn set_token(&self, token: &str) -> Result<(), GithubCardsError>;

    /// Fails with `Api` when the repository doesn't exist or isn't visible.
    async fn validate_repo(&self, owner: &str, repo: &str) -> Result<(), GithubCardsError>;

    async fn search_issues(
        &self,
        owner: &str,
        repo: &str,
        query: &str,
    ) -> Result<SearchData, GithubCardsError>;

    /// Send a raw query and hand back the full JSON body (`data` and `errors`).
    async fn send_query(&self, query: &str) -> Result<Value, GithubCardsError>;
}

/// Storage layer abstraction for the prefix table.
#[async_trait]
pub trait PrefixStore: Send + Sync {
    async fn all_prefixes(
        &self,
    ) -> Result<HashMap<u64, HashMap<String, RepoRef>>, GithubCardsError>;

    async fn guild_prefixes(
        &self,
        guild_id: u64,
    ) -> Result<HashMap<String, RepoRef>, GithubCardsError>;

    /// Insert a new prefix. Returns `false` without writing when it already exists.
    async fn insert_prefix(
        &self,
        guild_id: u64,
        prefix: &str,
        repo: &RepoRef,
    ) -> Result<bool, GithubCardsError>;

    /// Remove a prefix. Missing prefixes are not an error.
    async fn remove_prefix(&self, guild_id: u64, prefix: &str) -> Result<(), GithubCardsError>;
}

/// GitHub cards: prefix management, reference scanning and batched issue fetching.
///
/// The matcher cache is rebuilt wholesale per guild on every prefix change. Readers wait on the
/// readiness gate so they never observe a half-built cache.
pub struct GithubCardsService<C: GraphqlClient, S: PrefixStore> {
    client: C,
    store: S,
    matchers: RwLock<HashMap<u64, Arc<PrefixMatcher>>>,
    ready: ReadyGate,
    rebuild_lock: Mutex<()>,
}

impl<C, S> GithubCardsService<C, S>
where
    C: GraphqlClient,
    S: PrefixStore,
{
    /// Create the service. It stays not-ready until `initialize` has loaded the cache.
    pub fn new(client: C, store: S) -> Self {
        Self {
            client,
            store,
            matchers: RwLock::new(HashMap::new()),
            ready: ReadyGate::new(),
            rebuild_lock: Mutex::new(()),
        }
    }

    /// Preload every guild's matcher and open the gate.
    pub async fn initialize(&self) -> Result<(), GithubCardsError> {
        if !self.client.has_token() {
            tracing::error!("No valid GitHub token found");
        }
        self.rebuild_cache(&[]).await
    }

    /// Rebuild the matcher cache. An empty `guild_ids` rebuilds every guild.
    pub async fn rebuild_cache(&self, guild_ids: &[u64]) -> Result<(), GithubCardsError> {
        let _writer = self.rebuild_lock.lock().await;
        self.ready.clear();
        let result = self.rebuild_locked(guild_ids).await;
        self.ready.set();
        result
    }

    async fn rebuild_locked(&self, guild_ids: &[u64]) -> Result<(), GithubCardsError> {
        if guild_ids.is_empty() {
            let rebuilt: HashMap<u64, Arc<PrefixMatcher>> = self
                .store
                .all_prefixes()
                .await?
                .into_iter()
                .filter_map(|(guild_id, repos)| {
                    PrefixMatcher::build(repos).map(|m| (guild_id, Arc::new(m)))
                })
                .collect();
            tracing::info!(guilds = rebuilt.len(), "Rebuilt GitHub cards prefix cache");
            *self.matchers.write().await = rebuilt;
            return Ok(());
        }

        for guild_id in guild_ids {
            let repos = self.store.guild_prefixes(*guild_id).await?;
            let mut matchers = self.matchers.write().await;
            match PrefixMatcher::build(repos) {
                Some(matcher) => {
                    matchers.insert(*guild_id, Arc::new(matcher));
                }
                None => {
                    matchers.remove(guild_id);
                }
            }
        }
        Ok(())
    }

    pub async fn wait_until_ready(&self) {
        self.ready.wait().await;
    }

    pub fn is_ready(&self) -> bool {
        self.ready.is_ready()
    }

    pub fn has_token(&self) -> bool {
        self.client.has_token()
    }

    /// Recreate the API session with a new token.
    pub fn update_token(&self, token: &str) -> Result<(), GithubCardsError> {
        if token.is_empty() {
            tracing::error!("No valid GitHub token found");
        }
        self.client.set_token(token)
    }

    pub async fn matcher_for(&self, guild_id: u64) -> Option<Arc<PrefixMatcher>> {
        self.matchers.read().await.get(&guild_id).cloned()
    }

    // ------------------------------------------------------------------------
    // Prefix management
    // ------------------------------------------------------------------------

    pub async fn add_prefix(
        &self,
        guild_id: u64,
        prefix: &str,
        slug: &str,
    ) -> Result<AddPrefixOutcome, GithubCardsError> {
        let prefix = prefix.to_lowercase();
        let Some(repo) = RepoRef::parse_slug(slug) else {
            return Ok(AddPrefixOutcome::InvalidSlug);
        };

        match self.client.validate_repo(&repo.owner, &repo.repo).await {
            Ok(()) => {}
            Err(GithubCardsError::Unauthorized(msg)) => {
                tracing::error!(
                    guild_id,
                    error = %msg,
                    "GitHub token rejected while validating repository"
                );
                return Ok(AddPrefixOutcome::RepoInaccessible);
            }
            Err(GithubCardsError::Api(msg)) => {
                tracing::debug!(
                    guild_id,
                    repo = %repo.name_with_owner(),
                    error = %msg,
                    "Repository validation failed"
                );
                return Ok(AddPrefixOutcome::RepoInaccessible);
            }
            Err(e) => return Err(e),
        }

        if !self.store.insert_prefix(guild_id, &prefix, &repo).await? {
            return Ok(AddPrefixOutcome::AlreadyExists);
        }

        self.rebuild_cache(&[guild_id]).await?;
        tracing::info!(
            guild_id,
            prefix = %prefix,
            repo = %repo.name_with_owner(),
            "Added GitHub cards prefix"
        );
        Ok(AddPrefixOutcome::Added { prefix, repo })
    }

    /// Remove a prefix. Succeeds even if the prefix never existed.
    pub async fn remove_prefix(
        &self,
        guild_id: u64,
        prefix: &str,
    ) -> Result<String, GithubCardsError> {
        let prefix = prefix.to_lowercase();
        self.store.remove_prefix(guild_id, &prefix).await?;
        self.rebuild_cache(&[guild_id]).await?;
        Ok(prefix)
    }

    /// Every prefix configured in a guild, sorted by prefix.
    pub async fn list_prefixes(
        &self,
        guild_id: u64,
    ) -> Result<Vec<(String, RepoRef)>, GithubCardsError> {
        let mut prefixes: Vec<_> = self.store.guild_prefixes(guild_id).await?.into_iter().collect();
        prefixes.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(prefixes)
    }

    /// Resolve the prefix argument of `ghsearch`.
    pub async fn resolve_prefix(
        &self,
        guild_id: u64,
        prefix: &str,
    ) -> Result<RepoRef, PrefixLookupError> {
        let matcher = self
            .matcher_for(guild_id)
            .await
            .ok_or(PrefixLookupError::NoRepositories)?;
        matcher
            .repo_for(prefix)
            .cloned()
            .ok_or_else(|| PrefixLookupError::UnknownPrefix(prefix.to_string()))
    }

    // ------------------------------------------------------------------------
    // Message scanning
    // ------------------------------------------------------------------------

    /// Detect an inline `<prefix>#s <query>` search.
    pub async fn search_trigger(&self, guild_id: u64, content: &str) -> Option<(RepoRef, String)> {
        let matcher = self.matcher_for(guild_id).await?;
        for (prefix, repo) in matcher.prefixes() {
            let trigger = format!("{prefix}#s ");
            if let Some(query) = content.strip_prefix(&trigger) {
                return Some((repo.clone(), query.to_string()));
            }
        }
        None
    }

    /// All issue references in a message, grouped by repository.
    pub async fn references_in(&self, guild_id: u64, content: &str) -> FetchableRepos {
        match self.matcher_for(guild_id).await {
            Some(matcher) => matcher.collect_references(split_tokens(content)),
            None => FetchableRepos::new(),
        }
    }

    /// References chosen from the overflow select menu (`prefix#number` values).
    pub async fn references_from_values(&self, guild_id: u64, values: &[String]) -> FetchableRepos {
        match self.matcher_for(guild_id).await {
            Some(matcher) => matcher.collect_references(values.iter().map(String::as_str)),
            None => FetchableRepos::new(),
        }
    }

    // ------------------------------------------------------------------------
    // GitHub calls
    // ------------------------------------------------------------------------

    pub async fn search(
        &self,
        repo: &RepoRef,
        query: &str,
    ) -> Result<SearchData, GithubCardsError> {
        self.client.search_issues(&repo.owner, &repo.repo, query).await
    }

    /// Fetch every referenced issue in one query.
    ///
    /// An invalid token is logged and yields no issues, so nothing partial gets posted.
    pub async fn fetch_issues(
        &self,
        fetchable: &FetchableRepos,
    ) -> Result<Vec<FetchedIssue>, GithubCardsError> {
        if fetchable.is_empty() {
            return Ok(Vec::new());
        }

        let query = build_query(fetchable);
        let response = match self.client.send_query(&query).await {
            Ok(response) => response,
            Err(GithubCardsError::Unauthorized(_)) => {
                tracing::error!("The current GitHub token is invalid.");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        parse_query_response(fetchable, &response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashmap::DashMap;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex as StdMutex;

    struct MockPrefixStore {
        prefixes: DashMap<u64, HashMap<String, RepoRef>>,
        broken: AtomicBool,
    }

    impl MockPrefixStore {
        fn new() -> Self {
            Self {
                prefixes: DashMap::new(),
                broken: AtomicBool::new(false),
            }
        }

        fn check(&self) -> Result<(), GithubCardsError> {
            if self.broken.load(Ordering::SeqCst) {
                return Err(GithubCardsError::Store("database is locked".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl PrefixStore for MockPrefixStore {
        async fn all_prefixes(
            &self,
        ) -> Result<HashMap<u64, HashMap<String, RepoRef>>, GithubCardsError> {
            self.check()?;
            Ok(self
                .prefixes
                .iter()
                .map(|entry| (*entry.key(), entry.value().clone()))
                .collect())
        }

        async fn guild_prefixes(
            &self,
            guild_id: u64,
        ) -> Result<HashMap<String, RepoRef>, GithubCardsError> {
            self.check()?;
            Ok(self
                .prefixes
                .get(&guild_id)
                .map(|p| p.clone())
                .unwrap_or_default())
        }

        async fn insert_prefix(
            &self,
            guild_id: u64,
            prefix: &str,
            repo: &RepoRef,
        ) -> Result<bool, GithubCardsError> {
            let mut guild = self.prefixes.entry(guild_id).or_default();
            if guild.contains_key(prefix) {
                return Ok(false);
            }
            guild.insert(prefix.to_string(), repo.clone());
            Ok(true)
        }

        async fn remove_prefix(&self, guild_id: u64, prefix: &str) -> Result<(), GithubCardsError> {
            if let Some(mut guild) = self.prefixes.get_mut(&guild_id) {
                guild.remove(prefix);
            }
            Ok(())
        }
    }

    struct MockGraphqlClient {
        unauthorized: AtomicBool,
        missing_repos: DashMap<String, ()>,
        queries: StdMutex<Vec<String>>,
        response: StdMutex<Value>,
    }

    impl MockGraphqlClient {
        fn new() -> Self {
            Self {
                unauthorized: AtomicBool::new(false),
                missing_repos: DashMap::new(),
                queries: StdMutex::new(Vec::new()),
                response: StdMutex::new(json!({"data": {}})),
            }
        }

        fn respond_with(&self, response: Value) {
            *self.response.lock().unwrap() = response;
        }

        fn sent_queries(&self) -> Vec<String> {
            self.queries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GraphqlClient for MockGraphqlClient {
        fn has_token(&self) -> bool {
            true
        }

        fn set_token(&self, _token: &str) -> Result<(), GithubCardsError> {
            Ok(())
        }

        async fn validate_repo(&self, owner: &str, repo: &str) -> Result<(), GithubCardsError> {
            if self.missing_repos.contains_key(&format!("{owner}/{repo}")) {
                return Err(GithubCardsError::Api("Could not resolve to a Repository".to_string()));
            }
            Ok(())
        }

        async fn search_issues(
            &self,
            owner: &str,
            repo: &str,
            query: &str,
        ) -> Result<SearchData, GithubCardsError> {
            Ok(SearchData {
                total: 0,
                results: Vec::new(),
                query: format!("repo:{owner}/{repo} {query}"),
            })
        }

        async fn send_query(&self, query: &str) -> Result<Value, GithubCardsError> {
            self.queries.lock().unwrap().push(query.to_string());
            if self.unauthorized.load(Ordering::SeqCst) {
                return Err(GithubCardsError::Unauthorized("Bad credentials".to_string()));
            }
            Ok(self.response.lock().unwrap().clone())
        }
    }

    fn issue_node(number: u64) -> Value {
        json!({
            "__typename": "Issue",
            "number": number,
            "title": format!("Issue {number}"),
            "body": "",
            "url": format!("https://github.com/owner/repo/issues/{number}"),
            "createdAt": "2021-03-04T05:06:07Z",
            "state": "OPEN",
            "milestone": null,
            "author": null,
            "repository": {"nameWithOwner": "owner/repo"},
            "labels": {"nodes": []}
        })
    }

    async fn service_with_prefix() -> GithubCardsService<MockGraphqlClient, MockPrefixStore> {
        let service = GithubCardsService::new(MockGraphqlClient::new(), MockPrefixStore::new());
        service.initialize().await.unwrap();
        let outcome = service.add_prefix(1, "GH", "owner/repo").await.unwrap();
        assert!(matches!(outcome, AddPrefixOutcome::Added { ref prefix, .. } if prefix == "gh"));
        service
    }

    #[tokio::test]
    async fn test_not_ready_until_initialized() {
        let service = GithubCardsService::new(MockGraphqlClient::new(), MockPrefixStore::new());
        assert!(!service.is_ready());

        service.initialize().await.unwrap();
        assert!(service.is_ready());
    }

    #[tokio::test]
    async fn test_failed_rebuild_still_opens_gate() {
        let service = service_with_prefix().await;
        service.store.broken.store(true, Ordering::SeqCst);

        let full = service.rebuild_cache(&[]).await;
        assert!(matches!(full, Err(GithubCardsError::Store(_))));
        assert!(service.is_ready());

        let single = service.rebuild_cache(&[1]).await;
        assert!(single.is_err());
        assert!(service.is_ready());

        // Readers are not left waiting
        tokio::time::timeout(std::time::Duration::from_millis(100), service.wait_until_ready())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_added_prefix_matches_case_insensitively() {
        let service = service_with_prefix().await;

        let fetchable = service.references_in(1, "Look at Gh#12 please").await;
        assert_eq!(fetchable.issue_count(), 1);
        assert_eq!(fetchable.repos()[0].issues, vec![12]);
        assert!(service.is_ready());
    }

    #[tokio::test]
    async fn test_duplicate_prefix_rejected() {
        let service = service_with_prefix().await;

        let outcome = service.add_prefix(1, "gh", "other/repo").await.unwrap();
        assert_eq!(outcome, AddPrefixOutcome::AlreadyExists);
    }

    #[tokio::test]
    async fn test_invalid_and_inaccessible_repositories() {
        let service = GithubCardsService::new(MockGraphqlClient::new(), MockPrefixStore::new());
        service.client.missing_repos.insert("ghost/repo".to_string(), ());

        assert_eq!(
            service.add_prefix(1, "x", "not-a-slug").await.unwrap(),
            AddPrefixOutcome::InvalidSlug
        );
        assert_eq!(
            service.add_prefix(1, "x", "ghost/repo").await.unwrap(),
            AddPrefixOutcome::RepoInaccessible
        );
        assert!(service.list_prefixes(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_missing_prefix_still_succeeds() {
        let service = service_with_prefix().await;

        let removed = service.remove_prefix(1, "NOPE").await.unwrap();
        assert_eq!(removed, "nope");
        assert_eq!(service.list_prefixes(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_removing_last_prefix_drops_matcher() {
        let service = service_with_prefix().await;

        service.remove_prefix(1, "gh").await.unwrap();
        assert!(service.matcher_for(1).await.is_none());
        assert!(service.references_in(1, "gh#12").await.is_empty());
        assert_eq!(
            service.resolve_prefix(1, "gh").await,
            Err(PrefixLookupError::NoRepositories)
        );
    }

    #[tokio::test]
    async fn test_resolve_prefix() {
        let service = service_with_prefix().await;

        assert_eq!(
            service.resolve_prefix(1, "gh").await,
            Ok(RepoRef::new("owner", "repo"))
        );
        assert_eq!(
            service.resolve_prefix(1, "docs").await,
            Err(PrefixLookupError::UnknownPrefix("docs".to_string()))
        );
    }

    #[tokio::test]
    async fn test_duplicate_reference_fetched_once() {
        let service = service_with_prefix().await;
        service
            .client
            .respond_with(json!({"data": {"repo0": {"issue12": issue_node(12)}}}));

        let fetchable = service.references_in(1, "gh#12 gh#12, GH#12").await;
        let issues = service.fetch_issues(&fetchable).await.unwrap();

        let queries = service.client.sent_queries();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].matches("issue12:").count(), 1);
        assert_eq!(issues.len(), 1);
    }

    #[tokio::test]
    async fn test_unauthorized_aborts_batch() {
        let service = service_with_prefix().await;
        service.client.unauthorized.store(true, Ordering::SeqCst);

        let fetchable = service.references_in(1, "gh#1 gh#2").await;
        let issues = service.fetch_issues(&fetchable).await.unwrap();

        assert!(issues.is_empty());
        assert_eq!(service.client.sent_queries().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_fetchable_sends_nothing() {
        let service = service_with_prefix().await;

        let issues = service.fetch_issues(&FetchableRepos::new()).await.unwrap();
        assert!(issues.is_empty());
        assert!(service.client.sent_queries().is_empty());
    }

    #[tokio::test]
    async fn test_search_trigger() {
        let service = service_with_prefix().await;

        let (repo, query) = service.search_trigger(1, "gh#s crash on start").await.unwrap();
        assert_eq!(repo, RepoRef::new("owner", "repo"));
        assert_eq!(query, "crash on start");

        assert!(service.search_trigger(1, "gh#12").await.is_none());
        assert!(service.search_trigger(2, "gh#s crash").await.is_none());
    }

    #[tokio::test]
    async fn test_references_from_select_values() {
        let service = service_with_prefix().await;

        let values = vec!["gh#3".to_string(), "gh#4".to_string(), "bogus".to_string()];
        let fetchable = service.references_from_values(1, &values).await;
        assert_eq!(fetchable.repos()[0].issues, vec![3, 4]);
    }

    #[tokio::test]
    async fn test_full_rebuild_loads_every_guild() {
        let store = MockPrefixStore::new();
        store
            .insert_prefix(5, "a", &RepoRef::new("o", "a"))
            .await
            .unwrap();
        store
            .insert_prefix(6, "b", &RepoRef::new("o", "b"))
            .await
            .unwrap();

        let service = GithubCardsService::new(MockGraphqlClient::new(), store);
        service.initialize().await.unwrap();

        assert!(service.matcher_for(5).await.is_some());
        assert!(service.matcher_for(6).await.is_some());
        assert!(service.matcher_for(7).await.is_none());
    }
}
