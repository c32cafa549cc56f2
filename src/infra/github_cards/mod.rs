pub mod graphql_client;
pub mod sqlite_prefix_store;

pub use graphql_client::GithubGraphqlClient;
pub use sqlite_prefix_store::SqlitePrefixStore;
