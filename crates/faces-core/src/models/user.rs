use serde::{Deserialize, Serialize};

/// A GitHub user as stored in the data file.
///
/// Search results only fill `login`, `id`, `avatar_url`, `html_url` and
/// `type`; the rest is added by the enrichment pass. Counts stay `None`
/// when GitHub could not be asked, which is different from zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GitHubUser {
    pub login: String,
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(rename = "type", default)]
    pub user_type: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub followers: Option<u64>,
    #[serde(default)]
    pub following: Option<u64>,
    #[serde(default)]
    pub public_repos: Option<u64>,
    #[serde(default)]
    pub public_gists: Option<u64>,
    #[serde(default)]
    pub forks: Option<u64>,
    #[serde(default)]
    pub sponsors_count: Option<u64>,
    #[serde(default)]
    pub sponsoring_count: Option<u64>,
    #[serde(default)]
    pub languages: Vec<String>,
    /// RFC 3339 timestamp taken from the avatar's `Last-Modified` header
    #[serde(default)]
    pub avatar_updated_at: Option<String>,
}

impl GitHubUser {
    pub fn is_user(&self) -> bool {
        self.user_type == "User"
    }

    /// Display name, falling back to the login when no name is set
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.login)
    }

    /// Merge profile details into this user, keeping search fields intact
    pub fn apply_detail(&mut self, detail: UserDetail) {
        self.name = detail.name;
        self.location = detail.location;
        self.followers = detail.followers;
        self.following = detail.following;
        self.public_repos = detail.public_repos;
        self.public_gists = detail.public_gists;
        if self.html_url.is_empty() {
            if let Some(url) = detail.html_url {
                self.html_url = url;
            }
        }
    }
}

/// Response from `GET /search/users`
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub items: Vec<GitHubUser>,
}

/// Response from `GET /users/{login}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserDetail {
    pub name: Option<String>,
    pub location: Option<String>,
    pub html_url: Option<String>,
    pub followers: Option<u64>,
    pub following: Option<u64>,
    pub public_repos: Option<u64>,
    pub public_gists: Option<u64>,
}

/// One entry from `GET /users/{login}/repos`
#[derive(Debug, Clone, Deserialize)]
pub struct RepoSummary {
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub fork: bool,
}

/// Sponsor counts from the GraphQL API. `None` means unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SponsorshipCounts {
    pub sponsors: Option<u64>,
    pub sponsoring: Option<u64>,
}

/// Aggregated repository statistics for one user
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoStats {
    pub forks: u64,
    pub languages: Vec<String>,
}
