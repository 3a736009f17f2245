use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};

use crate::models::ProfileRecord;
use crate::utils::cmp_ignore_case;

/// Upper bound used when the followers range has no real maximum.
pub const MAX_FOLLOWERS_SENTINEL: u64 = 999_999_999;

/// Upper bound used when the repos or forks range has no real maximum.
pub const MAX_COUNT_SENTINEL: u64 = 999_999;

/// Inclusive `[min, max]` range over a count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountRange {
    pub min: u64,
    pub max: u64,
}

impl CountRange {
    pub const fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: u64) -> bool {
        self.min <= value && value <= self.max
    }

    /// Reset `max` to `sentinel` when the range is inverted.
    /// Returns true when a repair happened.
    fn repair(&mut self, sentinel: u64) -> bool {
        if self.min > self.max {
            self.max = sentinel;
            true
        } else {
            false
        }
    }
}

/// Sponsors / sponsoring filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SponsorCriterion {
    #[default]
    Any,
    AtLeastOne,
    AtLeast(u64),
}

impl SponsorCriterion {
    pub fn matches(&self, count: u64) -> bool {
        match self {
            SponsorCriterion::Any => true,
            SponsorCriterion::AtLeastOne => count >= 1,
            SponsorCriterion::AtLeast(n) => count >= *n,
        }
    }
}

impl fmt::Display for SponsorCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SponsorCriterion::Any => write!(f, "any"),
            SponsorCriterion::AtLeastOne => write!(f, "has"),
            SponsorCriterion::AtLeast(n) => write!(f, "{}", n),
        }
    }
}

/// Accepts `any`, `has` (at least one) or a number N (at least N).
impl FromStr for SponsorCriterion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "any" => Ok(SponsorCriterion::Any),
            "has" | "1+" => Ok(SponsorCriterion::AtLeastOne),
            other => other
                .trim_end_matches('+')
                .parse()
                .map(SponsorCriterion::AtLeast)
                .map_err(|_| format!("invalid sponsor filter: {}", s)),
        }
    }
}

/// How recently the avatar must have changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AgeBucket {
    #[default]
    Any,
    LastWeek,
    LastMonth,
    LastSixMonths,
    LastYear,
    LastTwoYears,
    LastFiveYears,
    OlderThanFiveYears,
}

pub const FIVE_YEARS_DAYS: i64 = 5 * 365;

impl AgeBucket {
    pub const ALL: [AgeBucket; 8] = [
        AgeBucket::Any,
        AgeBucket::LastWeek,
        AgeBucket::LastMonth,
        AgeBucket::LastSixMonths,
        AgeBucket::LastYear,
        AgeBucket::LastTwoYears,
        AgeBucket::LastFiveYears,
        AgeBucket::OlderThanFiveYears,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgeBucket::Any => "any",
            AgeBucket::LastWeek => "1w",
            AgeBucket::LastMonth => "1m",
            AgeBucket::LastSixMonths => "6m",
            AgeBucket::LastYear => "1y",
            AgeBucket::LastTwoYears => "2y",
            AgeBucket::LastFiveYears => "5y",
            AgeBucket::OlderThanFiveYears => "5y+",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AgeBucket::Any => "Any time",
            AgeBucket::LastWeek => "Last week",
            AgeBucket::LastMonth => "Last month",
            AgeBucket::LastSixMonths => "Last 6 months",
            AgeBucket::LastYear => "Last year",
            AgeBucket::LastTwoYears => "Last 2 years",
            AgeBucket::LastFiveYears => "Last 5 years",
            AgeBucket::OlderThanFiveYears => "Older than 5 years",
        }
    }

    /// Oldest avatar age, in days, the bucket accepts (inclusive)
    pub fn max_age_days(&self) -> Option<i64> {
        match self {
            AgeBucket::Any | AgeBucket::OlderThanFiveYears => None,
            AgeBucket::LastWeek => Some(7),
            AgeBucket::LastMonth => Some(30),
            AgeBucket::LastSixMonths => Some(182),
            AgeBucket::LastYear => Some(365),
            AgeBucket::LastTwoYears => Some(2 * 365),
            AgeBucket::LastFiveYears => Some(FIVE_YEARS_DAYS),
        }
    }

    /// Age, in days, the avatar must exceed (exclusive)
    pub fn min_age_days(&self) -> Option<i64> {
        match self {
            AgeBucket::OlderThanFiveYears => Some(FIVE_YEARS_DAYS),
            _ => None,
        }
    }

    /// A missing timestamp passes every bucket.
    pub fn matches(&self, updated_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        let Some(updated_at) = updated_at else {
            return true;
        };
        let age = now - updated_at;
        let within_max = self.max_age_days().map_or(true, |days| age <= Duration::days(days));
        let beyond_min = self.min_age_days().map_or(true, |days| age > Duration::days(days));
        within_max && beyond_min
    }
}

impl FromStr for AgeBucket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(AgeBucket::Any);
        }
        AgeBucket::ALL
            .into_iter()
            .find(|b| b.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("invalid avatar age: {}", s))
    }
}

/// Ordering applied to the visible cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    FollowersDesc,
    FollowersAsc,
    FollowingDesc,
    FollowingAsc,
    ReposDesc,
    ReposAsc,
    ForksDesc,
    ForksAsc,
    SponsorsDesc,
    SponsorsAsc,
    SponsoringDesc,
    SponsoringAsc,
    NameAsc,
    NameDesc,
    RatioDesc,
}

impl SortKey {
    pub const ALL: [SortKey; 15] = [
        SortKey::FollowersDesc,
        SortKey::FollowersAsc,
        SortKey::FollowingDesc,
        SortKey::FollowingAsc,
        SortKey::ReposDesc,
        SortKey::ReposAsc,
        SortKey::ForksDesc,
        SortKey::ForksAsc,
        SortKey::SponsorsDesc,
        SortKey::SponsorsAsc,
        SortKey::SponsoringDesc,
        SortKey::SponsoringAsc,
        SortKey::NameAsc,
        SortKey::NameDesc,
        SortKey::RatioDesc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::FollowersDesc => "followers-desc",
            SortKey::FollowersAsc => "followers-asc",
            SortKey::FollowingDesc => "following-desc",
            SortKey::FollowingAsc => "following-asc",
            SortKey::ReposDesc => "repos-desc",
            SortKey::ReposAsc => "repos-asc",
            SortKey::ForksDesc => "forks-desc",
            SortKey::ForksAsc => "forks-asc",
            SortKey::SponsorsDesc => "sponsors-desc",
            SortKey::SponsorsAsc => "sponsors-asc",
            SortKey::SponsoringDesc => "sponsoring-desc",
            SortKey::SponsoringAsc => "sponsoring-asc",
            SortKey::NameAsc => "name-asc",
            SortKey::NameDesc => "name-desc",
            SortKey::RatioDesc => "ratio-desc",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortKey::FollowersDesc => "Most followers",
            SortKey::FollowersAsc => "Fewest followers",
            SortKey::FollowingDesc => "Most following",
            SortKey::FollowingAsc => "Fewest following",
            SortKey::ReposDesc => "Most repos",
            SortKey::ReposAsc => "Fewest repos",
            SortKey::ForksDesc => "Most forks",
            SortKey::ForksAsc => "Fewest forks",
            SortKey::SponsorsDesc => "Most sponsors",
            SortKey::SponsorsAsc => "Fewest sponsors",
            SortKey::SponsoringDesc => "Most sponsoring",
            SortKey::SponsoringAsc => "Fewest sponsoring",
            SortKey::NameAsc => "Name (A-Z)",
            SortKey::NameDesc => "Name (Z-A)",
            SortKey::RatioDesc => "Followers/following ratio",
        }
    }

    /// Compare two records under this key. Ties keep their current order
    /// because callers use a stable sort.
    pub fn compare(&self, a: &ProfileRecord, b: &ProfileRecord) -> Ordering {
        let by_name = || {
            cmp_ignore_case(&a.display_name, &b.display_name)
                .then_with(|| a.display_name.cmp(&b.display_name))
        };

        match self {
            SortKey::FollowersDesc => b.followers.cmp(&a.followers),
            SortKey::FollowersAsc => a.followers.cmp(&b.followers),
            SortKey::FollowingDesc => b.following.cmp(&a.following),
            SortKey::FollowingAsc => a.following.cmp(&b.following),
            SortKey::ReposDesc => b.repos.cmp(&a.repos),
            SortKey::ReposAsc => a.repos.cmp(&b.repos),
            SortKey::ForksDesc => b.forks.cmp(&a.forks),
            SortKey::ForksAsc => a.forks.cmp(&b.forks),
            SortKey::SponsorsDesc => b.sponsors.cmp(&a.sponsors),
            SortKey::SponsorsAsc => a.sponsors.cmp(&b.sponsors),
            SortKey::SponsoringDesc => b.sponsoring.cmp(&a.sponsoring),
            SortKey::SponsoringAsc => a.sponsoring.cmp(&b.sponsoring),
            SortKey::NameAsc => by_name(),
            SortKey::NameDesc => by_name().reverse(),
            SortKey::RatioDesc => b.follow_ratio().total_cmp(&a.follow_ratio()),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortKey::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("invalid sort key: {}", s))
    }
}

/// Everything the filter controls can express.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCriteria {
    pub search: String,
    pub followers: CountRange,
    pub repos: CountRange,
    pub forks: CountRange,
    pub sponsors: SponsorCriterion,
    pub sponsoring: SponsorCriterion,
    pub avatar_age: AgeBucket,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            search: String::new(),
            followers: CountRange::new(0, MAX_FOLLOWERS_SENTINEL),
            repos: CountRange::new(0, MAX_COUNT_SENTINEL),
            forks: CountRange::new(0, MAX_COUNT_SENTINEL),
            sponsors: SponsorCriterion::Any,
            sponsoring: SponsorCriterion::Any,
            avatar_age: AgeBucket::Any,
        }
    }
}

impl FilterCriteria {
    /// Lowercase the search term and repair inverted ranges.
    /// Returns the names of the ranges whose max was reset.
    pub fn normalize(&mut self) -> Vec<&'static str> {
        self.search = self.search.trim().to_lowercase();

        let mut repaired = Vec::new();
        if self.followers.repair(MAX_FOLLOWERS_SENTINEL) {
            repaired.push("followers");
        }
        if self.repos.repair(MAX_COUNT_SENTINEL) {
            repaired.push("repos");
        }
        if self.forks.repair(MAX_COUNT_SENTINEL) {
            repaired.push("forks");
        }
        repaired
    }

    /// Search term matches when any text field contains it.
    /// Expects a normalized (lowercased) search term.
    pub fn matches_search(&self, record: &ProfileRecord) -> bool {
        let term = self.search.as_str();
        term.is_empty()
            || record.name.contains(term)
            || record.login.contains(term)
            || record.location.contains(term)
            || record.languages.contains(term)
    }

    /// All categories must hold.
    pub fn matches(&self, record: &ProfileRecord, now: DateTime<Utc>) -> bool {
        self.matches_search(record)
            && self.followers.contains(record.followers)
            && self.repos.contains(record.repos)
            && self.forks.contains(record.forks)
            && self.sponsors.matches(record.sponsors)
            && self.sponsoring.matches(record.sponsoring)
            && self.avatar_age.matches(record.avatar_updated_at, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CardAttributes, CardHandle};

    fn record(pairs: &[(&str, &str)]) -> ProfileRecord {
        let attrs: CardAttributes = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ProfileRecord::from_card(CardHandle(0), &attrs)
    }

    #[test]
    fn test_defaults() {
        let criteria = FilterCriteria::default();
        assert_eq!(criteria.followers, CountRange::new(0, 999_999_999));
        assert_eq!(criteria.repos, CountRange::new(0, 999_999));
        assert_eq!(criteria.forks, CountRange::new(0, 999_999));
        assert_eq!(criteria.sponsors, SponsorCriterion::Any);
        assert_eq!(criteria.avatar_age, AgeBucket::Any);
        assert_eq!(SortKey::default(), SortKey::FollowersDesc);
    }

    #[test]
    fn test_normalize_repairs_inverted_ranges() {
        let mut criteria = FilterCriteria {
            search: "  RuSt ".to_string(),
            followers: CountRange::new(500, 10),
            repos: CountRange::new(5, 1),
            forks: CountRange::new(1, 5),
            ..Default::default()
        };
        let repaired = criteria.normalize();
        assert_eq!(repaired, vec!["followers", "repos"]);
        assert_eq!(criteria.search, "rust");
        assert_eq!(criteria.followers, CountRange::new(500, MAX_FOLLOWERS_SENTINEL));
        assert_eq!(criteria.repos, CountRange::new(5, MAX_COUNT_SENTINEL));
        assert_eq!(criteria.forks, CountRange::new(1, 5));
    }

    #[test]
    fn test_search_any_field() {
        let mut criteria = FilterCriteria {
            search: "GERMANY".to_string(),
            ..Default::default()
        };
        criteria.normalize();

        let r = record(&[("login", "someone"), ("location", "Berlin, Germany")]);
        assert!(criteria.matches_search(&r));

        criteria.search = "python".to_string();
        let r = record(&[("login", "someone"), ("languages", "Rust Python")]);
        assert!(criteria.matches_search(&r));

        criteria.search = "nobody".to_string();
        assert!(!criteria.matches_search(&r));
    }

    #[test]
    fn test_sponsor_criterion() {
        assert!(SponsorCriterion::Any.matches(0));
        assert!(!SponsorCriterion::AtLeastOne.matches(0));
        assert!(SponsorCriterion::AtLeastOne.matches(1));
        assert!(!SponsorCriterion::AtLeast(10).matches(9));
        assert!(SponsorCriterion::AtLeast(10).matches(10));
    }

    #[test]
    fn test_sponsor_criterion_from_str() {
        assert_eq!("any".parse::<SponsorCriterion>(), Ok(SponsorCriterion::Any));
        assert_eq!("has".parse::<SponsorCriterion>(), Ok(SponsorCriterion::AtLeastOne));
        assert_eq!("25".parse::<SponsorCriterion>(), Ok(SponsorCriterion::AtLeast(25)));
        assert_eq!("25+".parse::<SponsorCriterion>(), Ok(SponsorCriterion::AtLeast(25)));
        assert!("lots".parse::<SponsorCriterion>().is_err());
    }

    #[test]
    fn test_age_bucket_matches() {
        let now = Utc::now();
        let days_ago = |d: i64| Some(now - Duration::days(d));

        assert!(AgeBucket::LastWeek.matches(days_ago(3), now));
        assert!(!AgeBucket::LastWeek.matches(days_ago(10), now));
        assert!(AgeBucket::LastMonth.matches(days_ago(29), now));
        assert!(AgeBucket::LastYear.matches(days_ago(200), now));
        assert!(!AgeBucket::LastTwoYears.matches(days_ago(800), now));
        assert!(AgeBucket::LastFiveYears.matches(days_ago(1500), now));
        assert!(AgeBucket::OlderThanFiveYears.matches(days_ago(2000), now));
        assert!(!AgeBucket::OlderThanFiveYears.matches(days_ago(30), now));
    }

    #[test]
    fn test_age_bucket_exact_boundaries() {
        let now = Utc::now();
        let days_ago = |d: i64| Some(now - Duration::days(d));

        // "Within" buckets include their boundary day
        assert!(AgeBucket::LastWeek.matches(days_ago(7), now));
        assert!(AgeBucket::LastMonth.matches(days_ago(30), now));
        assert!(AgeBucket::LastFiveYears.matches(days_ago(1825), now));
        assert!(!AgeBucket::LastFiveYears.matches(days_ago(1826), now));

        // "Older than" is strict
        assert!(!AgeBucket::OlderThanFiveYears.matches(days_ago(1825), now));
        assert!(AgeBucket::OlderThanFiveYears.matches(days_ago(1826), now));
    }

    #[test]
    fn test_age_bucket_missing_timestamp_passes() {
        let now = Utc::now();
        for bucket in AgeBucket::ALL {
            assert!(bucket.matches(None, now), "{:?}", bucket);
        }
    }

    #[test]
    fn test_sort_key_round_trips_names() {
        for key in SortKey::ALL {
            assert_eq!(key.as_str().parse::<SortKey>(), Ok(key));
        }
        assert!("popularity".parse::<SortKey>().is_err());
        assert_eq!("5y+".parse::<AgeBucket>(), Ok(AgeBucket::OlderThanFiveYears));
    }

    #[test]
    fn test_ratio_sort_zero_following() {
        let a = record(&[("followers", "50"), ("following", "0")]);
        let b = record(&[("followers", "400"), ("following", "10")]);
        // a sorts as 50, b as 40
        assert_eq!(SortKey::RatioDesc.compare(&a, &b), Ordering::Less);
    }

    #[test]
    fn test_name_sort_ignores_case() {
        let a = record(&[("name", "alice")]);
        let b = record(&[("name", "Bob")]);
        assert_eq!(SortKey::NameAsc.compare(&a, &b), Ordering::Less);
        assert_eq!(SortKey::NameDesc.compare(&a, &b), Ordering::Greater);
    }
}
