//! API client for the GitHub REST and GraphQL endpoints.
//!
//! This module provides the `GitHubClient` struct used by the fetch
//! pipeline: user search, per-user details, sponsorship counts, repository
//! statistics and avatar metadata.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::{header, Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::models::{GitHubUser, RepoStats, RepoSummary, SearchResponse, SponsorshipCounts, UserDetail};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Base URL for the GitHub REST and GraphQL APIs
pub const API_BASE_URL: &str = "https://api.github.com";

/// GitHub rejects requests without a User-Agent
const USER_AGENT: &str = "github-faces";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Search query selecting every account with at least one follower.
const SEARCH_QUERY: &str = "followers:1..10000000";

/// Results per search page (GitHub maximum).
pub const SEARCH_PAGE_SIZE: usize = 100;

/// Pages fetched beyond `target / SEARCH_PAGE_SIZE` to make up for
/// organizations filtered out of the results.
pub const MAX_EXTRA_PAGES: usize = 2;

/// Attempts for a single user detail request.
const MAX_DETAIL_ATTEMPTS: u32 = 5;

/// Maximum number of retries for rate-limited list requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Shortest wait after hitting the primary rate limit, in seconds.
const MIN_RATE_LIMIT_WAIT_SECS: i64 = 10;

/// Extra seconds added after the rate limit reset time.
const RATE_LIMIT_PADDING_SECS: i64 = 3;

/// Longest rate-limit wait honoured, one full rate-limit window.
const MAX_RATE_LIMIT_WAIT_SECS: u64 = 3600;

/// Assumed reset delay when GitHub omits `X-RateLimit-Reset`.
const DEFAULT_RESET_DELAY_SECS: i64 = 60;

/// Wait used for 429 responses without a `Retry-After` header.
const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

/// Languages kept per user.
const TOP_LANGUAGES: usize = 5;

const SPONSORSHIP_QUERY: &str = r#"
query($login: String!) {
  user(login: $login) {
    sponsors(first: 0) { totalCount }
    sponsoring(first: 0) { totalCount }
  }
}
"#;

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<GraphQlData>,
}

#[derive(Debug, Deserialize)]
struct GraphQlData {
    user: Option<GraphQlUser>,
}

#[derive(Debug, Deserialize)]
struct GraphQlUser {
    sponsors: Option<TotalCount>,
    sponsoring: Option<TotalCount>,
}

#[derive(Debug, Deserialize)]
struct TotalCount {
    #[serde(rename = "totalCount")]
    total_count: u64,
}

/// API client for GitHub.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct GitHubClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    /// One unit of retry wait; every backoff is a multiple of it
    retry_unit: Duration,
}

impl GitHubClient {
    /// Create a new API client
    pub fn new(token: Option<String>) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::USER_AGENT, header::HeaderValue::from_static(USER_AGENT));
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/vnd.github+json"),
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .default_headers(headers)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: API_BASE_URL.to_string(),
            token: token.filter(|t| !t.is_empty()),
            retry_unit: Duration::from_secs(1),
        })
    }

    /// Point the client at another API root (GitHub Enterprise, tests)
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Scale every retry wait
    pub fn with_retry_unit(mut self, unit: Duration) -> Self {
        self.retry_unit = unit;
        self
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn auth_headers(&self) -> Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        if let Some(ref token) = self.token {
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&format!("Bearer {}", token))?,
            );
        }
        Ok(headers)
    }

    /// Check if response is successful, returning an error with body if not.
    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit (should retry),
    /// or Err for other errors.
    async fn check_response_for_retry(
        response: reqwest::Response,
    ) -> Result<Option<reqwest::Response>> {
        if response.status().is_success() {
            return Ok(Some(response));
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        match ApiError::from_status(status, &body) {
            ApiError::RateLimited => Ok(None),
            err => Err(err.into()),
        }
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    async fn get<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T> {
        let mut retries = 0;
        let mut backoff = self.retry_unit;

        loop {
            let response = self
                .client
                .get(url)
                .query(query)
                .headers(self.auth_headers()?)
                .send()
                .await
                .with_context(|| format!("Failed to send GET request to {}", url))?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => {
                    return response
                        .json()
                        .await
                        .with_context(|| format!("Failed to parse JSON response from {}", url));
                }
                None => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited.into());
                    }
                    warn!(url = url, retry = retries, backoff_ms = backoff.as_millis() as u64, "Rate limited, backing off");
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
            }
        }
    }

    // ===== Search =====

    /// Fetch one page of the follower search, keeping only user accounts
    pub async fn fetch_search_page(&self, page: usize) -> Result<Vec<GitHubUser>> {
        let url = format!("{}/search/users", self.base_url);
        let query = [
            ("q", SEARCH_QUERY.to_string()),
            ("per_page", SEARCH_PAGE_SIZE.to_string()),
            ("page", page.to_string()),
        ];
        let response: SearchResponse = self.get(&url, &query).await?;
        Ok(response.items.into_iter().filter(|u| u.is_user()).collect())
    }

    /// Collect up to `target` users across search pages.
    /// A failed page is logged and skipped.
    pub async fn search_users(&self, target: usize) -> Vec<GitHubUser> {
        let max_pages = target / SEARCH_PAGE_SIZE + MAX_EXTRA_PAGES;
        let mut users = Vec::with_capacity(target);

        for page in 1..=max_pages {
            let page_users = match self.fetch_search_page(page).await {
                Ok(users) => users,
                Err(e) => {
                    error!(page, error = %e, "Failed to fetch search page");
                    Vec::new()
                }
            };
            let received = page_users.len();
            users.extend(page_users);
            info!(page, received, total = users.len(), target_users = target, "Fetched search page");

            if users.len() >= target {
                users.truncate(target);
                break;
            }
        }

        users
    }

    // ===== Per-user details =====

    /// Fetch a user's profile, retrying through rate limits and transient
    /// failures. Returns `Ok(None)` for unknown users or when every attempt
    /// failed.
    pub async fn fetch_user_detail(&self, login: &str) -> Result<Option<UserDetail>> {
        let url = format!("{}/users/{}", self.base_url, login);

        for attempt in 0..MAX_DETAIL_ATTEMPTS {
            let response = match self
                .client
                .get(&url)
                .headers(self.auth_headers()?)
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    warn!(login, attempt = attempt + 1, error = %e, "Request failed");
                    tokio::time::sleep(self.backoff(attempt)).await;
                    continue;
                }
            };

            let status = response.status();
            if status == StatusCode::NOT_FOUND {
                warn!(login, "User not found");
                return Ok(None);
            }

            if status.is_success() {
                match response.json::<UserDetail>().await {
                    Ok(detail) => return Ok(Some(detail)),
                    Err(e) => {
                        warn!(login, attempt = attempt + 1, error = %e, "Failed to parse user detail");
                        tokio::time::sleep(self.backoff(attempt)).await;
                        continue;
                    }
                }
            }

            let headers = response.headers().clone();
            let body = response.text().await.unwrap_or_default();
            match ApiError::from_status(status, &body) {
                ApiError::RateLimited => {
                    let wait = rate_limit_wait(status, &headers, Utc::now().timestamp());
                    warn!(login, attempt = attempt + 1, wait_secs = wait, "Rate limited, waiting");
                    tokio::time::sleep(self.retry_wait(wait)).await;
                }
                err => {
                    warn!(login, attempt = attempt + 1, error = %err, "Error fetching user");
                    tokio::time::sleep(self.backoff(attempt)).await;
                }
            }
        }

        warn!(login, attempts = MAX_DETAIL_ATTEMPTS, "Giving up on user");
        Ok(None)
    }

    /// Exponential backoff: 1, 2, 4, ... retry units
    fn backoff(&self, attempt: u32) -> Duration {
        self.retry_unit * 2u32.pow(attempt)
    }

    /// `units` retry units, saturating instead of wrapping
    fn retry_wait(&self, units: u64) -> Duration {
        self.retry_unit
            .saturating_mul(u32::try_from(units).unwrap_or(u32::MAX))
    }

    /// Sponsor and sponsoring counts via GraphQL. Needs a token; any
    /// failure leaves the counts unknown.
    pub async fn fetch_sponsorship(&self, login: &str) -> SponsorshipCounts {
        if !self.has_token() {
            return SponsorshipCounts::default();
        }

        match self.query_sponsorship(login).await {
            Ok(counts) => counts,
            Err(e) => {
                warn!(login, error = %e, "Failed to fetch sponsorship");
                SponsorshipCounts::default()
            }
        }
    }

    async fn query_sponsorship(&self, login: &str) -> Result<SponsorshipCounts> {
        let url = format!("{}/graphql", self.base_url);
        let body = serde_json::json!({
            "query": SPONSORSHIP_QUERY,
            "variables": { "login": login },
        });

        let response = self
            .client
            .post(&url)
            .headers(self.auth_headers()?)
            .json(&body)
            .send()
            .await
            .context("Failed to send GraphQL request")?;

        let response = Self::check_response(response).await?;
        let parsed: GraphQlResponse = response
            .json()
            .await
            .context("Failed to parse GraphQL response")?;

        let user = parsed
            .data
            .and_then(|d| d.user)
            .ok_or_else(|| ApiError::InvalidResponse("GraphQL response has no user".to_string()))?;

        Ok(SponsorshipCounts {
            sponsors: user.sponsors.map(|c| c.total_count),
            sponsoring: user.sponsoring.map(|c| c.total_count),
        })
    }

    /// Forks and top languages over the user's most recently pushed repos
    pub async fn fetch_repo_stats(&self, login: &str) -> Result<RepoStats> {
        let url = format!("{}/users/{}/repos", self.base_url, login);
        let query = [
            ("per_page", SEARCH_PAGE_SIZE.to_string()),
            ("sort", "pushed".to_string()),
            ("type", "owner".to_string()),
        ];
        let repos: Vec<RepoSummary> = self.get(&url, &query).await?;
        debug!(login, repos = repos.len(), "Fetched repositories");
        Ok(summarize_repos(&repos))
    }

    // ===== Avatars =====

    /// `Last-Modified` of a remote file, if the server reports one
    pub async fn last_modified(&self, url: &str) -> Option<DateTime<Utc>> {
        let response = match self.client.head(url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(url, error = %e, "Failed to get timestamp");
                return None;
            }
        };

        response
            .headers()
            .get(header::LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| DateTime::parse_from_rfc2822(v).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Download a file (avatars are public, no auth header)
    pub async fn download(&self, url: &str) -> Result<Bytes> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to download {}", url))?;
        let response = Self::check_response(response).await?;
        response
            .bytes()
            .await
            .with_context(|| format!("Failed to read body of {}", url))
    }
}

/// Seconds to wait after a rate-limited response.
///
/// 429 honours `Retry-After`; 403 waits until `X-RateLimit-Reset` (at least
/// ten seconds) plus a small padding. Never more than an hour.
pub fn rate_limit_wait(status: StatusCode, headers: &header::HeaderMap, now: i64) -> u64 {
    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<i64>().ok())
    };

    let wait = if status == StatusCode::TOO_MANY_REQUESTS {
        header_value("retry-after")
            .map(|s| s.max(0) as u64)
            .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
    } else {
        let reset = header_value("x-ratelimit-reset").unwrap_or(now + DEFAULT_RESET_DELAY_SECS);
        (reset.saturating_sub(now).max(MIN_RATE_LIMIT_WAIT_SECS) + RATE_LIMIT_PADDING_SECS) as u64
    };
    wait.min(MAX_RATE_LIMIT_WAIT_SECS)
}

/// Total forks and most used languages, ignoring forked repositories
pub fn summarize_repos(repos: &[RepoSummary]) -> RepoStats {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut forks = 0;

    for repo in repos.iter().filter(|r| !r.fork) {
        forks += repo.forks_count;
        if let Some(language) = repo.language.as_deref().filter(|l| !l.is_empty()) {
            *counts.entry(language).or_default() += 1;
        }
    }

    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    RepoStats {
        forks,
        languages: ranked
            .into_iter()
            .take(TOP_LANGUAGES)
            .map(|(l, _)| l.to_string())
            .collect(),
    }
}
