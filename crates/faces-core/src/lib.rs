//! GitHub Faces - a static gallery of popular GitHub users.
//!
//! The library fetches users from the GitHub API, keeps their avatars and a
//! local cache, renders the static site, and provides the two pieces of logic
//! the page runs on: the filter/sort engine over profile cards and the
//! offline cache with per-resource freshness.

pub mod api;
pub mod avatars;
pub mod cache;
pub mod filter;
pub mod models;
pub mod offline;
pub mod pipeline;
pub mod site;
pub mod utils;

pub use api::GitHubClient;
pub use pipeline::{FetchOptions, FetchPipeline, FetchReport};
