//! Static site output.
//!
//! `render_site` writes the published files into the site directory:
//! `index.html` (the card grid and its filter script), `sw.js` (the offline
//! worker), `users.json`, `feed.xml` and `sitemap.xml`. Every path goes
//! through `safe_path` before it is written.

pub mod feed;
pub mod html;
pub mod minify;
pub mod paths;
pub mod script;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use tracing::info;

use crate::models::GitHubUser;
use feed::{Channel, FeedItem};

pub use html::{read_cards, render_card, render_index};
pub use minify::{minify_css, minify_html, minify_js, minify_xml};
pub use paths::safe_path;
pub use script::{page_script, worker_script, WORKER_FILE};

pub const DEFAULT_TITLE: &str = "John Bampton Faces";
pub const DEFAULT_DESCRIPTION: &str = "GitHub Faces - curated list of GitHub users.";

pub use crate::offline::DATA_FILE;

pub const INDEX_FILE: &str = "index.html";
pub const FEED_FILE: &str = "feed.xml";
pub const SITEMAP_FILE: &str = "sitemap.xml";

#[derive(Debug, Clone)]
pub struct SiteOptions {
    pub site_dir: PathBuf,
    /// Deployed origin, e.g. `https://john-bampton.github.io`
    pub base_url: String,
    pub title: String,
    pub description: String,
}

impl SiteOptions {
    pub fn new(site_dir: impl Into<PathBuf>, base_url: &str) -> Self {
        Self {
            site_dir: site_dir.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            title: DEFAULT_TITLE.to_string(),
            description: DEFAULT_DESCRIPTION.to_string(),
        }
    }

    pub fn home_url(&self) -> String {
        format!("{}/", self.base_url)
    }

    pub fn feed_url(&self) -> String {
        format!("{}/{}", self.base_url, FEED_FILE)
    }
}

fn write_file(options: &SiteOptions, name: &str, contents: &str) -> Result<PathBuf> {
    let path = safe_path(&options.site_dir.join(name), &options.site_dir)?;
    std::fs::write(&path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), bytes = contents.len(), "Wrote site file");
    Ok(path)
}

/// Render every site file for `users`. Returns the written paths.
pub fn render_site(users: &[GitHubUser], options: &SiteOptions, now: DateTime<Utc>) -> Result<Vec<PathBuf>> {
    if users.is_empty() {
        bail!("No users to render; run fetch first");
    }
    ensure_dir(&options.site_dir)?;

    let mut written = Vec::with_capacity(5);

    let index = minify_html(&render_index(users, options, now));
    written.push(write_file(options, INDEX_FILE, &index)?);
    written.push(write_file(options, WORKER_FILE, &minify_js(&worker_script()))?);

    let data = serde_json::to_string_pretty(users).context("Failed to serialize users")?;
    written.push(write_file(options, DATA_FILE, &data)?);

    let home = options.home_url();
    let items = vec![FeedItem {
        title: options.title.clone(),
        link: home.clone(),
        description: options.description.clone(),
        pub_date: now,
        guid: home.clone(),
    }];
    let channel = Channel {
        title: &options.title,
        link: &home,
        description: &options.description,
    };
    written.push(write_file(options, FEED_FILE, &feed::rss_feed(&channel, &items))?);

    let urls = feed::sitemap_urls(&items, &options.feed_url());
    written.push(write_file(options, SITEMAP_FILE, &feed::sitemap(&urls))?);

    info!(users = users.len(), site_dir = %options.site_dir.display(), "Site rendered");
    Ok(written)
}

fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        info!(path = %path.display(), "Created directory");
    }
    Ok(())
}
