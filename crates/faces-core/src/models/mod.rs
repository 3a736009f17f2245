//! Data models for GitHub Faces.
//!
//! - `GitHubUser` and the API response types: what the fetch pipeline
//!   stores in `users.json`
//! - `ProfileRecord`: the parsed card the filter engine works on

pub mod profile;
pub mod user;

pub use profile::{card_attributes, records_from_users, CardAttributes, CardHandle, ProfileRecord};
pub use user::{GitHubUser, RepoStats, RepoSummary, SearchResponse, SponsorshipCounts, UserDetail};
