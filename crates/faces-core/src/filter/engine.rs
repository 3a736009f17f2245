use chrono::Utc;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use super::criteria::{FilterCriteria, SortKey};
use super::view::{CardView, RenderSummary, HIGHLIGHT_DURATION};
use crate::models::ProfileRecord;

/// Notice shown when a random pick has nothing to choose from.
pub const NOTHING_TO_PICK: &str = "No users available to pick from.";

/// Filter and sort state for one page view.
///
/// The record set is fixed at construction. `filtered` holds indices into
/// `all`, so it is a subset by construction; after `sort_and_render` it is
/// in display order.
pub struct FilterEngine {
    all: Vec<ProfileRecord>,
    filtered: Vec<usize>,
    criteria: FilterCriteria,
    sort_key: SortKey,
}

impl FilterEngine {
    pub fn new(records: Vec<ProfileRecord>) -> Self {
        let filtered = (0..records.len()).collect();
        Self {
            all: records,
            filtered,
            criteria: FilterCriteria::default(),
            sort_key: SortKey::default(),
        }
    }

    pub fn all(&self) -> &[ProfileRecord] {
        &self.all
    }

    /// Records passing the current filters, in display order once sorted
    pub fn filtered(&self) -> impl Iterator<Item = &ProfileRecord> + '_ {
        self.filtered.iter().map(|&i| &self.all[i])
    }

    pub fn filtered_len(&self) -> usize {
        self.filtered.len()
    }

    /// The criteria in effect, after range repair
    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn sort_key(&self) -> SortKey {
        self.sort_key
    }

    /// Recompute the filtered set from `criteria`.
    pub fn apply_filters(&mut self, mut criteria: FilterCriteria) {
        for range in criteria.normalize() {
            debug!(range, "Inverted range, max reset to sentinel");
        }

        let now = Utc::now();
        self.filtered = self
            .all
            .iter()
            .enumerate()
            .filter(|(_, record)| criteria.matches(record, now))
            .map(|(i, _)| i)
            .collect();
        self.criteria = criteria;

        debug!(
            matched = self.filtered.len(),
            total = self.all.len(),
            "Filters applied"
        );
    }

    /// Sort the filtered set and push visibility and order to the view.
    pub fn sort_and_render<V: CardView + ?Sized>(
        &mut self,
        sort_key: SortKey,
        view: &mut V,
    ) -> RenderSummary {
        self.sort_key = sort_key;

        let all = &self.all;
        self.filtered
            .sort_by(|&a, &b| sort_key.compare(&all[a], &all[b]));

        for record in &self.all {
            view.set_visible(record.handle, false);
        }
        for &i in &self.filtered {
            let handle = self.all[i].handle;
            view.set_visible(handle, true);
            view.move_to_end(handle);
        }

        let summary = RenderSummary::new(self.filtered.len(), self.all.len());
        view.publish_summary(&summary);
        summary
    }

    /// Apply filters then sort, the usual reaction to any input change.
    pub fn update<V: CardView + ?Sized>(
        &mut self,
        criteria: FilterCriteria,
        sort_key: SortKey,
        view: &mut V,
    ) -> RenderSummary {
        self.apply_filters(criteria);
        self.sort_and_render(sort_key, view)
    }

    /// Pick a random card from the filtered set, or from every card when
    /// nothing passes the filters.
    pub fn pick_random_user<R, V>(&self, rng: &mut R, view: &mut V) -> Option<&ProfileRecord>
    where
        R: Rng + ?Sized,
        V: CardView + ?Sized,
    {
        let pool: Vec<usize> = if self.filtered.is_empty() {
            (0..self.all.len()).collect()
        } else {
            self.filtered.clone()
        };

        let Some(&index) = pool.choose(rng) else {
            view.alert(NOTHING_TO_PICK);
            return None;
        };

        let record = &self.all[index];
        view.set_visible(record.handle, true);
        view.scroll_into_view(record.handle);
        // Clear first so the animation restarts if it was still running
        view.clear_highlight(record.handle);
        view.highlight(record.handle, HIGHLIGHT_DURATION);

        debug!(login = %record.login, "Picked random user");
        Some(record)
    }

    /// Restore default filters and sort order, then re-render.
    pub fn reset_filters<V: CardView + ?Sized>(&mut self, view: &mut V) -> RenderSummary {
        self.update(FilterCriteria::default(), SortKey::default(), view)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::time::Duration;

    use chrono::Duration as ChronoDuration;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::filter::criteria::{AgeBucket, CountRange, SponsorCriterion, MAX_FOLLOWERS_SENTINEL};
    use crate::filter::view::ResultsMessage;
    use crate::models::{CardAttributes, CardHandle};

    /// View that records what the engine asked for
    #[derive(Default)]
    struct RecordingView {
        visible: HashSet<CardHandle>,
        order: Vec<CardHandle>,
        summary: Option<RenderSummary>,
        alerts: Vec<String>,
        scrolled: Vec<CardHandle>,
        highlight_calls: Vec<(&'static str, CardHandle)>,
    }

    impl CardView for RecordingView {
        fn set_visible(&mut self, handle: CardHandle, visible: bool) {
            if visible {
                self.visible.insert(handle);
            } else {
                self.visible.remove(&handle);
            }
        }

        fn move_to_end(&mut self, handle: CardHandle) {
            self.order.retain(|h| *h != handle);
            self.order.push(handle);
        }

        fn publish_summary(&mut self, summary: &RenderSummary) {
            self.summary = Some(*summary);
        }

        fn alert(&mut self, message: &str) {
            self.alerts.push(message.to_string());
        }

        fn scroll_into_view(&mut self, handle: CardHandle) {
            self.scrolled.push(handle);
        }

        fn clear_highlight(&mut self, handle: CardHandle) {
            self.highlight_calls.push(("clear", handle));
        }

        fn highlight(&mut self, handle: CardHandle, clear_after: Duration) {
            assert_eq!(clear_after, Duration::from_secs(2));
            self.highlight_calls.push(("set", handle));
        }
    }

    fn record(i: usize, pairs: &[(&str, String)]) -> ProfileRecord {
        let attrs: CardAttributes = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        ProfileRecord::from_card(CardHandle(i), &attrs)
    }

    /// Ten users, three of them with more than 100 followers
    fn ten_users() -> Vec<ProfileRecord> {
        let followers = [5, 150, 20, 900, 0, 99, 60, 42, 101, 7];
        followers
            .iter()
            .enumerate()
            .map(|(i, f)| {
                record(
                    i,
                    &[
                        ("login", format!("user{}", i)),
                        ("followers", f.to_string()),
                        ("following", (i as u64).to_string()),
                        ("repos", (i * 3).to_string()),
                    ],
                )
            })
            .collect()
    }

    fn filtered_handles(engine: &FilterEngine) -> Vec<usize> {
        engine.filtered().map(|r| r.handle.0).collect()
    }

    #[test]
    fn test_min_followers_scenario() {
        let mut engine = FilterEngine::new(ten_users());
        engine.apply_filters(FilterCriteria {
            followers: CountRange::new(100, MAX_FOLLOWERS_SENTINEL),
            ..Default::default()
        });
        assert_eq!(engine.filtered_len(), 3);
        assert!(engine.filtered().all(|r| r.followers >= 100));

        // Both bounds are inclusive
        engine.apply_filters(FilterCriteria {
            followers: CountRange::new(101, 150),
            ..Default::default()
        });
        let mut handles = filtered_handles(&engine);
        handles.sort();
        assert_eq!(handles, vec![1, 8]);
    }

    #[test]
    fn test_inverted_range_is_repaired() {
        let mut engine = FilterEngine::new(ten_users());
        engine.apply_filters(FilterCriteria {
            followers: CountRange::new(500, 10),
            ..Default::default()
        });
        assert_eq!(engine.criteria().followers.max, 999_999_999);
        assert_eq!(filtered_handles(&engine), vec![3]);
    }

    #[test]
    fn test_range_invariant_holds() {
        let mut engine = FilterEngine::new(ten_users());
        let criteria = FilterCriteria {
            followers: CountRange::new(5, 150),
            repos: CountRange::new(3, 21),
            ..Default::default()
        };
        engine.apply_filters(criteria.clone());
        assert!(engine.filtered_len() > 0);
        for r in engine.filtered() {
            assert!(criteria.followers.contains(r.followers));
            assert!(criteria.repos.contains(r.repos));
        }
    }

    #[test]
    fn test_apply_filters_is_idempotent_and_a_subset() {
        let mut engine = FilterEngine::new(ten_users());
        let criteria = FilterCriteria {
            search: "USER1".to_string(),
            ..Default::default()
        };
        engine.apply_filters(criteria.clone());
        let first: HashSet<usize> = filtered_handles(&engine).into_iter().collect();
        engine.apply_filters(criteria);
        let second: HashSet<usize> = filtered_handles(&engine).into_iter().collect();

        assert_eq!(first, second);
        assert_eq!(first, HashSet::from([1]));
        let all: HashSet<usize> = engine.all().iter().map(|r| r.handle.0).collect();
        assert!(second.is_subset(&all));
    }

    #[test]
    fn test_sponsor_and_age_filters_combine() {
        let now = Utc::now();
        let recent = (now - ChronoDuration::days(3)).to_rfc3339();
        let old = (now - ChronoDuration::days(400)).to_rfc3339();
        let records = vec![
            record(0, &[("sponsors", "2".into()), ("avatar-updated", recent.clone())]),
            record(1, &[("sponsors", "0".into()), ("avatar-updated", recent)]),
            record(2, &[("sponsors", "5".into()), ("avatar-updated", old)]),
            record(3, &[("sponsors", "9".into())]),
        ];
        let mut engine = FilterEngine::new(records);
        engine.apply_filters(FilterCriteria {
            sponsors: SponsorCriterion::AtLeastOne,
            avatar_age: AgeBucket::LastMonth,
            ..Default::default()
        });
        let mut handles = filtered_handles(&engine);
        handles.sort();
        // 3 has no avatar timestamp, so it is exempt from the age bucket
        assert_eq!(handles, vec![0, 3]);
    }

    #[test]
    fn test_forks_and_sponsoring_filters() {
        let records = vec![
            record(0, &[("forks", "0".into()), ("sponsoring", "0".into())]),
            record(1, &[("forks", "25".into()), ("sponsoring", "1".into())]),
            record(2, &[("forks", "50".into()), ("sponsoring", "12".into())]),
            record(3, &[("forks", "51".into()), ("sponsoring", "30".into())]),
        ];
        let mut engine = FilterEngine::new(records);

        engine.apply_filters(FilterCriteria {
            forks: CountRange::new(25, 50),
            ..Default::default()
        });
        assert_eq!(filtered_handles(&engine), vec![1, 2]);

        engine.apply_filters(FilterCriteria {
            sponsoring: SponsorCriterion::AtLeastOne,
            ..Default::default()
        });
        assert_eq!(filtered_handles(&engine), vec![1, 2, 3]);

        engine.apply_filters(FilterCriteria {
            forks: CountRange::new(0, 50),
            sponsoring: SponsorCriterion::AtLeast(10),
            ..Default::default()
        });
        assert_eq!(filtered_handles(&engine), vec![2]);
    }

    #[test]
    fn test_age_bucket_edges() {
        let now = Utc::now();
        let ago = |days: i64, minutes: i64| {
            (now - ChronoDuration::days(days) + ChronoDuration::minutes(minutes)).to_rfc3339()
        };
        let records = vec![
            record(0, &[("avatar-updated", ago(7, 1))]),
            record(1, &[("avatar-updated", ago(7, -1))]),
            record(2, &[("avatar-updated", ago(1825, 1))]),
            record(3, &[("avatar-updated", ago(1825, -1))]),
        ];
        let mut engine = FilterEngine::new(records);

        engine.apply_filters(FilterCriteria {
            avatar_age: AgeBucket::LastWeek,
            ..Default::default()
        });
        assert_eq!(filtered_handles(&engine), vec![0]);

        engine.apply_filters(FilterCriteria {
            avatar_age: AgeBucket::LastFiveYears,
            ..Default::default()
        });
        assert_eq!(filtered_handles(&engine), vec![0, 1, 2]);

        engine.apply_filters(FilterCriteria {
            avatar_age: AgeBucket::OlderThanFiveYears,
            ..Default::default()
        });
        assert_eq!(filtered_handles(&engine), vec![3]);
    }

    #[test]
    fn test_sort_followers_desc_and_render() {
        let mut engine = FilterEngine::new(ten_users());
        let mut view = RecordingView::default();
        engine.apply_filters(FilterCriteria {
            followers: CountRange::new(20, MAX_FOLLOWERS_SENTINEL),
            ..Default::default()
        });
        let summary = engine.sort_and_render(SortKey::FollowersDesc, &mut view);

        let followers: Vec<u64> = engine.filtered().map(|r| r.followers).collect();
        assert!(followers.windows(2).all(|w| w[0] >= w[1]));

        let expected: Vec<CardHandle> = engine.filtered().map(|r| r.handle).collect();
        assert_eq!(view.order, expected);
        assert_eq!(view.visible.len(), engine.filtered_len());

        assert_eq!(summary, view.summary.unwrap());
        assert_eq!(summary.visible + summary.hidden(), summary.total);
        assert_eq!(summary.message, ResultsMessage::ResultsFound);
    }

    #[test]
    fn test_render_hides_filtered_out_cards() {
        let mut engine = FilterEngine::new(ten_users());
        let mut view = RecordingView::default();
        engine.reset_filters(&mut view);
        assert_eq!(view.visible.len(), 10);
        assert_eq!(view.summary.unwrap().message, ResultsMessage::Hidden);

        let summary = engine.update(
            FilterCriteria {
                search: "nobody-matches-this".to_string(),
                ..Default::default()
            },
            SortKey::NameAsc,
            &mut view,
        );
        assert!(view.visible.is_empty());
        assert_eq!(summary.message, ResultsMessage::NoResults);
        assert_eq!(summary.total, 10);
    }

    #[test]
    fn test_ratio_sort_zero_following() {
        let records = vec![
            record(0, &[("followers", "40".into()), ("following", "2".into())]),
            record(1, &[("followers", "50".into()), ("following", "0".into())]),
            record(2, &[("followers", "60".into()), ("following", "1".into())]),
        ];
        let mut engine = FilterEngine::new(records);
        let mut view = RecordingView::default();
        engine.sort_and_render(SortKey::RatioDesc, &mut view);
        assert_eq!(filtered_handles(&engine), vec![2, 1, 0]);
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut engine = FilterEngine::new(ten_users());
        let mut view = RecordingView::default();
        engine.update(
            FilterCriteria {
                search: "user3".to_string(),
                ..Default::default()
            },
            SortKey::NameDesc,
            &mut view,
        );
        assert_eq!(engine.filtered_len(), 1);

        let summary = engine.reset_filters(&mut view);
        assert_eq!(engine.criteria(), &FilterCriteria::default());
        assert_eq!(engine.sort_key(), SortKey::FollowersDesc);
        assert_eq!(summary.visible, 10);
    }

    #[test]
    fn test_pick_random_from_filtered() {
        let mut engine = FilterEngine::new(ten_users());
        let mut view = RecordingView::default();
        engine.update(
            FilterCriteria {
                followers: CountRange::new(101, MAX_FOLLOWERS_SENTINEL),
                ..Default::default()
            },
            SortKey::FollowersDesc,
            &mut view,
        );

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let picked = engine.pick_random_user(&mut rng, &mut view).unwrap();
            assert!(picked.followers >= 101);
        }
        let last = *view.scrolled.last().unwrap();
        let n = view.highlight_calls.len();
        assert_eq!(view.highlight_calls[n - 2], ("clear", last));
        assert_eq!(view.highlight_calls[n - 1], ("set", last));
        assert!(view.alerts.is_empty());
    }

    #[test]
    fn test_pick_random_falls_back_to_all() {
        let mut engine = FilterEngine::new(ten_users());
        let mut view = RecordingView::default();
        engine.apply_filters(FilterCriteria {
            search: "zzz".to_string(),
            ..Default::default()
        });
        assert_eq!(engine.filtered_len(), 0);

        let mut rng = StdRng::seed_from_u64(1);
        let picked = engine.pick_random_user(&mut rng, &mut view);
        assert!(picked.is_some());
        assert!(view.visible.contains(&picked.unwrap().handle));
    }

    #[test]
    fn test_pick_random_empty_alerts() {
        let engine = FilterEngine::new(Vec::new());
        let mut view = RecordingView::default();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(engine.pick_random_user(&mut rng, &mut view).is_none());
        assert_eq!(view.alerts, vec![NOTHING_TO_PICK.to_string()]);
    }

    #[test]
    fn test_counts_are_non_negative() {
        let engine = FilterEngine::new(ten_users());
        // u64 fields cannot go negative; make sure parsing never panicked
        // and every record kept its handle
        assert_eq!(engine.all().len(), 10);
        assert!(engine.all().iter().enumerate().all(|(i, r)| r.handle.0 == i));
    }
}
