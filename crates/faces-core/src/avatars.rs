//! Avatar images kept next to the rendered site.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::api::GitHubClient;
use crate::models::GitHubUser;

/// Avatar directory relative to the site root
pub const FACES_DIR: &str = "images/faces";

/// Outcome of one avatar pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AvatarSummary {
    pub downloaded: usize,
    pub up_to_date: usize,
    pub failed: usize,
}

pub struct AvatarStore {
    faces_dir: PathBuf,
}

impl AvatarStore {
    pub fn new(site_dir: &Path) -> Self {
        Self {
            faces_dir: site_dir.join(FACES_DIR),
        }
    }

    pub fn faces_dir(&self) -> &Path {
        &self.faces_dir
    }

    pub fn avatar_path(&self, login: &str) -> PathBuf {
        self.faces_dir.join(format!("{}.png", login.to_lowercase()))
    }

    /// Whether the local copy is missing or older than the remote one.
    /// An unknown remote time always downloads.
    pub fn should_download(&self, login: &str, remote: Option<DateTime<Utc>>) -> bool {
        let local = match std::fs::metadata(self.avatar_path(login)).and_then(|m| m.modified()) {
            Ok(modified) => DateTime::<Utc>::from(modified),
            Err(_) => return true,
        };
        match remote {
            Some(remote) => local < remote,
            None => true,
        }
    }

    /// Download or refresh every user's avatar.
    ///
    /// Records the remote `Last-Modified` on each user as
    /// `avatar_updated_at`. A failed download is logged and counted; the
    /// pass carries on with the next user.
    pub async fn download_avatars(
        &self,
        client: &GitHubClient,
        users: &mut [GitHubUser],
    ) -> Result<AvatarSummary> {
        tokio::fs::create_dir_all(&self.faces_dir)
            .await
            .with_context(|| format!("Failed to create {}", self.faces_dir.display()))?;

        let total = users.len();
        let mut summary = AvatarSummary::default();

        for (idx, user) in users.iter_mut().enumerate() {
            let remote = client.last_modified(&user.avatar_url).await;
            if let Some(ts) = remote {
                user.avatar_updated_at = Some(ts.to_rfc3339());
            }

            if !self.should_download(&user.login, remote) {
                summary.up_to_date += 1;
                continue;
            }

            match self.fetch_one(client, user).await {
                Ok(()) => {
                    summary.downloaded += 1;
                    info!(
                        login = %user.login,
                        progress = %format!("{}/{}", idx + 1, total),
                        "Downloaded avatar"
                    );
                }
                Err(e) => {
                    summary.failed += 1;
                    error!(login = %user.login, error = %e, "Failed to download avatar");
                }
            }
        }

        info!(
            downloaded = summary.downloaded,
            up_to_date = summary.up_to_date,
            failed = summary.failed,
            "Avatar pass complete"
        );
        Ok(summary)
    }

    async fn fetch_one(&self, client: &GitHubClient, user: &GitHubUser) -> Result<()> {
        let bytes = client.download(&user.avatar_url).await?;
        let path = self.avatar_path(&user.login);
        tokio::fs::write(&path, &bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Delete avatars whose login is no longer in `current_logins`.
    /// Returns the removed file names.
    pub fn clean_old_avatars<S: AsRef<str>>(&self, current_logins: &[S]) -> Result<Vec<String>> {
        if !self.faces_dir.exists() {
            return Ok(Vec::new());
        }

        let keep: HashSet<String> = current_logins
            .iter()
            .map(|l| l.as_ref().to_lowercase())
            .collect();
        let mut removed = Vec::new();

        for entry in std::fs::read_dir(&self.faces_dir)
            .with_context(|| format!("Failed to list {}", self.faces_dir.display()))?
        {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("png") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if keep.contains(&stem.to_lowercase()) {
                continue;
            }

            match std::fs::remove_file(&path) {
                Ok(()) => {
                    let name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    info!(file = %name, "Removed old avatar");
                    removed.push(name);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove avatar"),
            }
        }

        Ok(removed)
    }
}
