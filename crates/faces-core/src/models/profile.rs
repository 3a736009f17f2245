use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::GitHubUser;

/// `data-*` attributes carried by one rendered card, keyed without the
/// `data-` prefix.
pub type CardAttributes = BTreeMap<String, String>;

pub const ATTR_NAME: &str = "name";
pub const ATTR_LOGIN: &str = "login";
pub const ATTR_LOCATION: &str = "location";
pub const ATTR_LANGUAGES: &str = "languages";
pub const ATTR_FOLLOWERS: &str = "followers";
pub const ATTR_FOLLOWING: &str = "following";
pub const ATTR_REPOS: &str = "repos";
pub const ATTR_FORKS: &str = "forks";
pub const ATTR_SPONSORS: &str = "sponsors";
pub const ATTR_SPONSORING: &str = "sponsoring";
pub const ATTR_AVATAR_UPDATED: &str = "avatar-updated";

/// Opaque reference to the on-screen card of a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CardHandle(pub usize);

/// Parsed, immutable view of one profile card used for filtering and sorting.
///
/// Text fields are lowercased for substring search; `display_name` keeps the
/// original casing for name ordering and presentation.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileRecord {
    pub handle: CardHandle,
    pub display_name: String,
    pub name: String,
    pub login: String,
    pub location: String,
    pub languages: String,
    pub followers: u64,
    pub following: u64,
    pub repos: u64,
    pub forks: u64,
    pub sponsors: u64,
    pub sponsoring: u64,
    pub avatar_updated_at: Option<DateTime<Utc>>,
}

impl ProfileRecord {
    /// Parse a card's attributes. Never fails: missing or malformed numbers
    /// become zero and an unreadable timestamp is treated as absent.
    pub fn from_card(handle: CardHandle, attrs: &CardAttributes) -> Self {
        let text = |key: &str| attrs.get(key).map(|s| s.trim()).unwrap_or("");
        let count = |key: &str| parse_count(text(key));

        let display_name = match text(ATTR_NAME) {
            "" => text(ATTR_LOGIN).to_string(),
            name => name.to_string(),
        };

        Self {
            handle,
            name: display_name.to_lowercase(),
            display_name,
            login: text(ATTR_LOGIN).to_lowercase(),
            location: text(ATTR_LOCATION).to_lowercase(),
            languages: text(ATTR_LANGUAGES).to_lowercase(),
            followers: count(ATTR_FOLLOWERS),
            following: count(ATTR_FOLLOWING),
            repos: count(ATTR_REPOS),
            forks: count(ATTR_FORKS),
            sponsors: count(ATTR_SPONSORS),
            sponsoring: count(ATTR_SPONSORING),
            avatar_updated_at: parse_timestamp(text(ATTR_AVATAR_UPDATED)),
        }
    }

    /// Followers per followed account. Zero following counts as the raw
    /// follower number.
    pub fn follow_ratio(&self) -> f64 {
        if self.following == 0 {
            self.followers as f64
        } else {
            self.followers as f64 / self.following as f64
        }
    }
}

/// Build the card attributes for a user. Unknown counts are written as
/// empty strings so they parse back as zero.
pub fn card_attributes(user: &GitHubUser) -> CardAttributes {
    let count = |v: Option<u64>| v.map(|n| n.to_string()).unwrap_or_default();

    let mut attrs = CardAttributes::new();
    attrs.insert(ATTR_NAME.into(), user.display_name().to_string());
    attrs.insert(ATTR_LOGIN.into(), user.login.clone());
    attrs.insert(ATTR_LOCATION.into(), user.location.clone().unwrap_or_default());
    attrs.insert(ATTR_LANGUAGES.into(), user.languages.join(" "));
    attrs.insert(ATTR_FOLLOWERS.into(), count(user.followers));
    attrs.insert(ATTR_FOLLOWING.into(), count(user.following));
    attrs.insert(ATTR_REPOS.into(), count(user.public_repos));
    attrs.insert(ATTR_FORKS.into(), count(user.forks));
    attrs.insert(ATTR_SPONSORS.into(), count(user.sponsors_count));
    attrs.insert(ATTR_SPONSORING.into(), count(user.sponsoring_count));
    attrs.insert(
        ATTR_AVATAR_UPDATED.into(),
        user.avatar_updated_at.clone().unwrap_or_default(),
    );
    attrs
}

/// Parse every user into a record, handles numbered in input order
pub fn records_from_users(users: &[GitHubUser]) -> Vec<ProfileRecord> {
    users
        .iter()
        .enumerate()
        .map(|(i, user)| ProfileRecord::from_card(CardHandle(i), &card_attributes(user)))
        .collect()
}

fn parse_count(value: &str) -> u64 {
    value.replace(',', "").parse().unwrap_or(0)
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if value.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_rfc2822(value))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}
