//! Connectors module
//!
//! Upstream access for the data pull job:
//! - `ProjectFetcher`, the seam the scheduler depends on
//! - the GraphQL wire types for ProjectV2 boards
//! - `GitHubProjectClient`, the paginating HTTP implementation

pub mod github;
pub mod graphql;
pub mod trait_;

pub use github::GitHubProjectClient;
pub use graphql::RawProject;
pub use trait_::{FetchError, ProjectFetcher};
