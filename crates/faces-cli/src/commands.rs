//! Subcommand implementations.

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use clap::Args;
use faces_core::cache::CacheManager;
use faces_core::filter::{
    AgeBucket, CountRange, FilterCriteria, FilterEngine, SortKey, SponsorCriterion,
};
use faces_core::models::{records_from_users, CardHandle, GitHubUser, ProfileRecord};
use faces_core::offline::{HttpNetwork, MemoryStorage, OfflineCacheManager, ServedFrom, DATA_FILE};
use faces_core::site::{read_cards, render_site, INDEX_FILE};
use faces_core::{FetchPipeline, GitHubClient};
use tracing::{info, warn};
use url::Url;

use crate::config::Config;
use crate::view::TerminalView;

/// Filter flags shared by `list` and `random`.
#[derive(Debug, Clone, Default, Args)]
pub struct FilterArgs {
    /// Substring matched against name, login, location and languages
    #[arg(long, short)]
    pub search: Option<String>,
    #[arg(long)]
    pub min_followers: Option<u64>,
    #[arg(long)]
    pub max_followers: Option<u64>,
    #[arg(long)]
    pub min_repos: Option<u64>,
    #[arg(long)]
    pub max_repos: Option<u64>,
    #[arg(long)]
    pub min_forks: Option<u64>,
    #[arg(long)]
    pub max_forks: Option<u64>,
    /// `any`, `has`, or a minimum count such as `10`
    #[arg(long, default_value = "any")]
    pub sponsors: SponsorCriterion,
    #[arg(long, default_value = "any")]
    pub sponsoring: SponsorCriterion,
    /// `any`, `1w`, `1m`, `6m`, `1y`, `2y`, `5y` or `5y+`
    #[arg(long, default_value = "any")]
    pub avatar_age: AgeBucket,
    /// Read cards from the rendered index.html instead of the cache
    #[arg(long)]
    pub from_site: bool,
}

impl FilterArgs {
    pub fn criteria(&self) -> FilterCriteria {
        let defaults = FilterCriteria::default();
        let range = |min: Option<u64>, max: Option<u64>, default: CountRange| {
            CountRange::new(min.unwrap_or(default.min), max.unwrap_or(default.max))
        };

        FilterCriteria {
            search: self.search.clone().unwrap_or_default(),
            followers: range(self.min_followers, self.max_followers, defaults.followers),
            repos: range(self.min_repos, self.max_repos, defaults.repos),
            forks: range(self.min_forks, self.max_forks, defaults.forks),
            sponsors: self.sponsors,
            sponsoring: self.sponsoring,
            avatar_age: self.avatar_age,
        }
    }
}

fn cache(config: &Config) -> Result<CacheManager> {
    CacheManager::new(config.cache_dir()?)
}

fn cached_users(config: &Config) -> Result<Vec<GitHubUser>> {
    let cached = cache(config)?
        .load_users()?
        .ok_or_else(|| anyhow!("No cached users found; run `github-faces fetch` first"))?;
    info!(users = cached.data.len(), age = %cached.age_display(), "Loaded users from cache");
    Ok(cached.data)
}

/// Profile records from the cache or from the rendered page.
fn load_records(config: &Config, from_site: bool) -> Result<Vec<ProfileRecord>> {
    if !from_site {
        return Ok(records_from_users(&cached_users(config)?));
    }

    let path = config.site_dir.join(INDEX_FILE);
    let html = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(read_cards(&html)
        .iter()
        .enumerate()
        .map(|(i, attrs)| ProfileRecord::from_card(CardHandle(i), attrs))
        .collect())
}

pub async fn fetch(config: &Config, token: Option<String>, force: bool) -> Result<Vec<GitHubUser>> {
    let cache = cache(config)?;
    if !force {
        if let Some(cached) = cache.fresh_users(config.cache_max_age()) {
            info!(
                users = cached.data.len(),
                age = %cached.age_display(),
                "Cache is fresh, skipping fetch (use --force to refetch)"
            );
            return Ok(cached.data);
        }
    }

    let client = GitHubClient::new(token)?.with_base_url(&config.api_base_url);
    let report = FetchPipeline::new(client, config.fetch_options()).run().await?;
    cache.save_users(&report.users)?;

    println!(
        "Fetched {} users ({} enriched), avatars: {} downloaded, {} up to date, {} failed, {} removed",
        report.users.len(),
        report.enriched,
        report.avatars.downloaded,
        report.avatars.up_to_date,
        report.avatars.failed,
        report.removed_avatars.len(),
    );
    Ok(report.users)
}

pub fn render(config: &Config, users: &[GitHubUser]) -> Result<()> {
    let written = render_site(users, &config.site_options(), Utc::now())?;
    for path in written {
        println!("Wrote {}", path.display());
    }
    Ok(())
}

pub fn render_from_cache(config: &Config) -> Result<()> {
    render(config, &cached_users(config)?)
}

pub fn list(config: &Config, filters: &FilterArgs, sort: SortKey, limit: Option<usize>) -> Result<()> {
    let records = load_records(config, filters.from_site)?;
    let mut view = TerminalView::new(&records);
    let mut engine = FilterEngine::new(records);

    engine.update(filters.criteria(), sort, &mut view);

    for row in view.visible_rows().take(limit.unwrap_or(usize::MAX)) {
        println!("{}", row);
    }
    if let Some(line) = view.results_line() {
        println!("{}", line);
    }
    if let Some(summary) = view.summary() {
        println!("{} ({})", summary.compact_label(), sort.label());
    }
    Ok(())
}

pub fn random(config: &Config, filters: &FilterArgs) -> Result<()> {
    let records = load_records(config, filters.from_site)?;
    let mut view = TerminalView::new(&records);
    let mut engine = FilterEngine::new(records);

    engine.apply_filters(filters.criteria());
    let picked = engine
        .pick_random_user(&mut rand::thread_rng(), &mut view)
        .map(|record| record.handle);

    for alert in view.alerts() {
        eprintln!("{}", alert);
    }
    if let Some(row) = picked.and_then(|h| view.row(h)) {
        let marker = if view.highlighted() == picked { "*" } else { " " };
        println!("{} {}", marker, row);
    }
    Ok(())
}

/// Install the offline cache against the deployed site and report how the
/// data file is served.
pub async fn offline_check(config: &Config) -> Result<()> {
    let mut origin = Url::parse(&config.base_url)
        .with_context(|| format!("Invalid base URL {}", config.base_url))?;
    if !origin.path().ends_with('/') {
        let path = format!("{}/", origin.path());
        origin.set_path(&path);
    }

    let manager = OfflineCacheManager::new(origin.clone(), HttpNetwork::new()?, MemoryStorage::new());
    let cached = manager.install().await?;
    manager.activate().await?;
    println!("Installed {} assets into {}", cached, manager.version());

    let data_url = origin.join(DATA_FILE)?;
    for attempt in 1..=2 {
        let intercept = manager.fetch(&data_url).await?;
        let status = intercept.response().map(|r| r.status).unwrap_or_default();
        let source = match intercept.source() {
            Some(ServedFrom::Cache) => "cache",
            Some(ServedFrom::Network) => "network",
            None => "passthrough",
        };
        if status >= 400 {
            warn!(url = %data_url, status, "Data file request failed");
        }
        println!("{} request {}: {} from {}", DATA_FILE, attempt, status, source);
    }
    Ok(())
}
