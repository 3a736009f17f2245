//! The fetch pipeline: search, enrich, refresh avatars.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use tracing::{info, warn};

use crate::api::GitHubClient;
use crate::avatars::{AvatarStore, AvatarSummary};
use crate::models::GitHubUser;

pub const DEFAULT_TARGET_USERS: usize = 400;

/// Pause between users while enriching
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_millis(150);

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub target_users: usize,
    pub site_dir: PathBuf,
    pub request_delay: Duration,
}

impl FetchOptions {
    pub fn new(site_dir: impl Into<PathBuf>) -> Self {
        Self {
            target_users: DEFAULT_TARGET_USERS,
            site_dir: site_dir.into(),
            request_delay: DEFAULT_REQUEST_DELAY,
        }
    }
}

#[derive(Debug)]
pub struct FetchReport {
    pub users: Vec<GitHubUser>,
    pub enriched: usize,
    pub avatars: AvatarSummary,
    pub removed_avatars: Vec<String>,
}

pub struct FetchPipeline {
    client: GitHubClient,
    avatars: AvatarStore,
    options: FetchOptions,
}

impl FetchPipeline {
    pub fn new(client: GitHubClient, options: FetchOptions) -> Self {
        Self {
            avatars: AvatarStore::new(&options.site_dir),
            client,
            options,
        }
    }

    pub async fn run(&self) -> Result<FetchReport> {
        info!(target_users = self.options.target_users, "Starting GitHub users fetch");
        if !self.client.has_token() {
            warn!("GITHUB_TOKEN not set; sponsorship counts will be unknown");
        }

        let mut users = self.client.search_users(self.options.target_users).await;
        if users.is_empty() {
            bail!("No valid users fetched");
        }
        info!(users = users.len(), "Search complete, fetching details");

        let enriched = self.enrich_all(&mut users).await?;

        let avatars = self.avatars.download_avatars(&self.client, &mut users).await?;

        let logins: Vec<&str> = users.iter().map(|u| u.login.as_str()).collect();
        let removed_avatars = self.avatars.clean_old_avatars(&logins)?;

        info!(users = users.len(), enriched, "Fetch complete");
        Ok(FetchReport {
            users,
            enriched,
            avatars,
            removed_avatars,
        })
    }

    /// Enrich users in place. Returns how many got profile details.
    pub async fn enrich_all(&self, users: &mut [GitHubUser]) -> Result<usize> {
        let total = users.len();
        let mut enriched = 0;

        for (idx, user) in users.iter_mut().enumerate() {
            if self.enrich_user(user).await? {
                enriched += 1;
                info!(
                    login = %user.login,
                    progress = %format!("{}/{}", idx + 1, total),
                    "Fetched details"
                );
            }
            if !self.options.request_delay.is_zero() {
                tokio::time::sleep(self.options.request_delay).await;
            }
        }

        Ok(enriched)
    }

    /// Details, sponsorship and repository stats for one user.
    /// A user without details is left as the search returned it.
    async fn enrich_user(&self, user: &mut GitHubUser) -> Result<bool> {
        let Some(detail) = self.client.fetch_user_detail(&user.login).await? else {
            return Ok(false);
        };
        user.apply_detail(detail);

        let sponsorship = self.client.fetch_sponsorship(&user.login).await;
        user.sponsors_count = sponsorship.sponsors;
        user.sponsoring_count = sponsorship.sponsoring;

        match self.client.fetch_repo_stats(&user.login).await {
            Ok(stats) => {
                user.forks = Some(stats.forks);
                user.languages = stats.languages;
            }
            Err(e) => warn!(login = %user.login, error = %e, "Failed to fetch repositories"),
        }

        Ok(true)
    }
}
