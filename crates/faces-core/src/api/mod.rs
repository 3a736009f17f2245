//! REST/GraphQL client module for GitHub.
//!
//! This module provides the `GitHubClient` used to search for popular
//! users and enrich them with profile details, sponsorship counts and
//! repository statistics. A `GITHUB_TOKEN` raises the rate limit and is
//! required for the GraphQL sponsorship query.

pub mod client;
pub mod error;

pub use client::GitHubClient;
pub use error::ApiError;
