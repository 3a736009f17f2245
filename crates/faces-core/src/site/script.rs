//! Client-side scripts for the generated site.
//!
//! The page script drives the filter controls in the browser with the same
//! rules as `FilterEngine`, and the worker script caches the site offline
//! the way `OfflineCacheManager` does. Every name and threshold is filled
//! in from the Rust definitions so both sides stay in step.

use serde_json::{json, Map, Value};

use crate::filter::{
    AgeBucket, SortKey, SponsorCriterion, HIGHLIGHT_DURATION, MAX_COUNT_SENTINEL,
    MAX_FOLLOWERS_SENTINEL, NOTHING_TO_PICK, NO_RESULTS_MESSAGE,
};
use crate::models::profile::{
    ATTR_AVATAR_UPDATED, ATTR_FOLLOWERS, ATTR_FOLLOWING, ATTR_FORKS, ATTR_LANGUAGES,
    ATTR_LOCATION, ATTR_LOGIN, ATTR_NAME, ATTR_REPOS, ATTR_SPONSORING, ATTR_SPONSORS,
};
use crate::offline::{CACHE_VERSION, DATA_FILE, DATA_FILE_MAX_AGE_DAYS, DEFAULT_MANIFEST};

pub const WORKER_FILE: &str = "sw.js";

/// Sort field for name ordering; every other field is a card count.
const NAME_FIELD: &str = "name";
/// Sort field for followers per following.
const RATIO_FIELD: &str = "ratio";

const PAGE_SCRIPT: &str = r#"
(function () {
    var SORTS = __SORTS__;
    var AGES = __AGES__;
    var LIMITS = __LIMITS__;
    var COUNTS = __COUNTS__;
    var TEXTS = __TEXTS__;
    var ATTR = __ATTR__;
    var SPONSOR_ANY = __SPONSOR_ANY__;
    var SPONSOR_HAS = __SPONSOR_HAS__;
    var DEFAULT_SORT = __DEFAULT_SORT__;
    var NAME_FIELD = __NAME_FIELD__;
    var RATIO_FIELD = __RATIO_FIELD__;
    var HIGHLIGHT_MS = __HIGHLIGHT_MS__;
    var NOTHING_TO_PICK = __NOTHING_TO_PICK__;
    var NO_RESULTS = __NO_RESULTS__;
    var WORKER = __WORKER__;
    var DAY_MS = 86400000;

    var grid = document.getElementById('grid');
    var cards = Array.prototype.slice.call(grid.querySelectorAll('article.card'));

    var records = cards.map(function (card) {
        function text(key) {
            return (card.getAttribute('data-' + key) || '').trim();
        }
        var record = { card: card, counts: {} };
        COUNTS.forEach(function (key) {
            record.counts[key] = parseInt(text(key).split(',').join(''), 10) || 0;
        });
        record.display = text(ATTR.name) || text(ATTR.login);
        record.search = [record.display].concat(TEXTS.map(text)).map(function (s) {
            return s.toLowerCase();
        });
        record.updated = Date.parse(text(ATTR.updated));
        return record;
    });
    var filtered = records.slice();

    function byId(id) {
        return document.getElementById(id);
    }

    function bound(id, fallback) {
        var value = parseInt(byId(id).value, 10);
        return isNaN(value) || value < 0 ? fallback : value;
    }

    function ranges() {
        var out = {};
        Object.keys(LIMITS).forEach(function (key) {
            var min = bound('min-' + key, 0);
            var max = bound('max-' + key, LIMITS[key]);
            if (min > max) {
                max = LIMITS[key];
                byId('max-' + key).value = '';
            }
            out[key] = [min, max];
        });
        return out;
    }

    function atLeast(id) {
        var value = byId(id).value;
        if (value === SPONSOR_ANY) {
            return 0;
        }
        if (value === SPONSOR_HAS) {
            return 1;
        }
        return parseInt(value, 10) || 0;
    }

    function ageMatches(bucket, updated, now) {
        if (!bucket || isNaN(updated)) {
            return true;
        }
        var age = (now - updated) / DAY_MS;
        if (bucket[1] !== null && age > bucket[1]) {
            return false;
        }
        if (bucket[0] !== null && age <= bucket[0]) {
            return false;
        }
        return true;
    }

    function applyFilters() {
        var term = byId('search').value.trim().toLowerCase();
        var limits = ranges();
        var sponsors = atLeast('sponsors');
        var sponsoring = atLeast('sponsoring');
        var bucket = AGES[byId('avatar-age').value];
        var now = Date.now();

        filtered = records.filter(function (r) {
            if (term && !r.search.some(function (s) { return s.indexOf(term) !== -1; })) {
                return false;
            }
            for (var key in limits) {
                var value = r.counts[key];
                if (value < limits[key][0] || value > limits[key][1]) {
                    return false;
                }
            }
            return r.counts[ATTR.sponsors] >= sponsors &&
                r.counts[ATTR.sponsoring] >= sponsoring &&
                ageMatches(bucket, r.updated, now);
        });
    }

    function ratio(r) {
        var following = r.counts[ATTR.following];
        return following === 0 ? r.counts[ATTR.followers] : r.counts[ATTR.followers] / following;
    }

    function comparator(key) {
        var spec = SORTS[key] || SORTS[DEFAULT_SORT];
        var field = spec[0];
        var dir = spec[1];
        return function (a, b) {
            if (field === NAME_FIELD) {
                var x = a.display.toLowerCase();
                var y = b.display.toLowerCase();
                if (x === y) {
                    x = a.display;
                    y = b.display;
                }
                return dir * (x < y ? -1 : x > y ? 1 : 0);
            }
            if (field === RATIO_FIELD) {
                return dir * (ratio(a) - ratio(b));
            }
            return dir * (a.counts[field] - b.counts[field]);
        };
    }

    function sortAndRender() {
        filtered.sort(comparator(byId('sort').value));
        records.forEach(function (r) {
            r.card.hidden = true;
        });
        filtered.forEach(function (r) {
            r.card.hidden = false;
            grid.appendChild(r.card);
        });

        var visible = filtered.length;
        var total = records.length;
        byId('count').textContent = visible + ' / ' + total;
        var message = byId('results-message');
        message.hidden = visible === total;
        if (visible === total) {
            message.textContent = '';
        } else if (visible === 0) {
            message.textContent = NO_RESULTS;
        } else {
            message.textContent = 'Showing ' + visible + ' of ' + total + ' users';
        }
    }

    function update() {
        applyFilters();
        sortAndRender();
    }

    function pickRandomUser() {
        var pool = filtered.length ? filtered : records;
        if (!pool.length) {
            alert(NOTHING_TO_PICK);
            return;
        }
        var card = pool[Math.floor(Math.random() * pool.length)].card;
        card.hidden = false;
        card.scrollIntoView({ behavior: 'smooth', block: 'center' });
        card.classList.remove('highlight');
        void card.offsetWidth;
        card.classList.add('highlight');
        setTimeout(function () {
            card.classList.remove('highlight');
        }, HIGHLIGHT_MS);
    }

    function resetFilters() {
        document.querySelectorAll('.controls input').forEach(function (input) {
            input.value = '';
        });
        document.querySelectorAll('.controls select').forEach(function (select) {
            select.selectedIndex = 0;
        });
        byId('sort').value = DEFAULT_SORT;
        update();
    }

    document.querySelectorAll('.controls input').forEach(function (input) {
        input.addEventListener('input', update);
    });
    document.querySelectorAll('.controls select').forEach(function (select) {
        select.addEventListener('change', update);
    });
    byId('random').addEventListener('click', pickRandomUser);
    byId('reset').addEventListener('click', resetFilters);
    update();

    if ('serviceWorker' in navigator) {
        navigator.serviceWorker.register(WORKER).catch(function () {});
    }
})();
"#;

const WORKER_SCRIPT: &str = r#"
var CACHE = __CACHE__;
var MANIFEST = __MANIFEST__;
var DATA_FILE = __DATA_FILE__;
var DATA_MAX_AGE_MS = __DATA_MAX_AGE_MS__;
var STAMP = 'sw-fetched-on';

self.addEventListener('install', function (event) {
    event.waitUntil(
        caches.open(CACHE).then(function (cache) {
            return cache.addAll(MANIFEST);
        }).then(function () {
            return self.skipWaiting();
        })
    );
});

self.addEventListener('activate', function (event) {
    event.waitUntil(
        caches.keys().then(function (keys) {
            return Promise.all(keys.filter(function (key) {
                return key !== CACHE;
            }).map(function (key) {
                return caches.delete(key);
            }));
        }).then(function () {
            return self.clients.claim();
        })
    );
});

function isFresh(response) {
    var stamp = Number(response.headers.get(STAMP));
    return stamp > 0 && Date.now() - stamp <= DATA_MAX_AGE_MS;
}

function stamped(response) {
    var headers = new Headers(response.headers);
    headers.set(STAMP, String(Date.now()));
    return response.blob().then(function (body) {
        return new Response(body, { status: response.status, statusText: response.statusText, headers: headers });
    });
}

function refetch(request, cache) {
    return fetch(request).then(function (response) {
        if (!response.ok) {
            return response;
        }
        return stamped(response.clone()).then(function (copy) {
            return cache.put(request, copy);
        }).catch(function () {}).then(function () {
            return response;
        });
    });
}

self.addEventListener('fetch', function (event) {
    var request = event.request;
    var url = new URL(request.url);
    if (request.method !== 'GET' || url.origin !== self.location.origin) {
        return;
    }
    if (url.pathname.endsWith(DATA_FILE)) {
        event.respondWith(caches.open(CACHE).then(function (cache) {
            return cache.match(request).then(function (cached) {
                return cached && isFresh(cached) ? cached : refetch(request, cache);
            });
        }));
        return;
    }
    event.respondWith(caches.match(request).then(function (cached) {
        return cached || fetch(request);
    }));
});
"#;

fn fill(template: &str, values: &[(&str, Value)]) -> String {
    values.iter().fold(template.to_string(), |out, (name, value)| {
        out.replace(&format!("__{}__", name), &value.to_string())
    })
}

/// Card field and direction a sort key orders by. Direction is -1 for
/// descending and 1 for ascending.
fn sort_field(key: SortKey) -> (&'static str, i8) {
    match key {
        SortKey::FollowersDesc => (ATTR_FOLLOWERS, -1),
        SortKey::FollowersAsc => (ATTR_FOLLOWERS, 1),
        SortKey::FollowingDesc => (ATTR_FOLLOWING, -1),
        SortKey::FollowingAsc => (ATTR_FOLLOWING, 1),
        SortKey::ReposDesc => (ATTR_REPOS, -1),
        SortKey::ReposAsc => (ATTR_REPOS, 1),
        SortKey::ForksDesc => (ATTR_FORKS, -1),
        SortKey::ForksAsc => (ATTR_FORKS, 1),
        SortKey::SponsorsDesc => (ATTR_SPONSORS, -1),
        SortKey::SponsorsAsc => (ATTR_SPONSORS, 1),
        SortKey::SponsoringDesc => (ATTR_SPONSORING, -1),
        SortKey::SponsoringAsc => (ATTR_SPONSORING, 1),
        SortKey::NameAsc => (NAME_FIELD, 1),
        SortKey::NameDesc => (NAME_FIELD, -1),
        SortKey::RatioDesc => (RATIO_FIELD, -1),
    }
}

/// Inline script for `index.html`, unminified.
pub fn page_script() -> String {
    let sorts: Map<String, Value> = SortKey::ALL
        .into_iter()
        .map(|key| {
            let (field, dir) = sort_field(key);
            (key.as_str().to_string(), json!([field, dir]))
        })
        .collect();

    let ages: Map<String, Value> = AgeBucket::ALL
        .into_iter()
        .map(|bucket| {
            let bounds = json!([bucket.min_age_days(), bucket.max_age_days()]);
            (bucket.as_str().to_string(), bounds)
        })
        .collect();

    fill(
        PAGE_SCRIPT,
        &[
            ("SORTS", Value::Object(sorts)),
            ("AGES", Value::Object(ages)),
            (
                "LIMITS",
                json!({
                    ATTR_FOLLOWERS: MAX_FOLLOWERS_SENTINEL,
                    ATTR_REPOS: MAX_COUNT_SENTINEL,
                    ATTR_FORKS: MAX_COUNT_SENTINEL,
                }),
            ),
            (
                "COUNTS",
                json!([
                    ATTR_FOLLOWERS,
                    ATTR_FOLLOWING,
                    ATTR_REPOS,
                    ATTR_FORKS,
                    ATTR_SPONSORS,
                    ATTR_SPONSORING,
                ]),
            ),
            ("TEXTS", json!([ATTR_LOGIN, ATTR_LOCATION, ATTR_LANGUAGES])),
            (
                "ATTR",
                json!({
                    "name": ATTR_NAME,
                    "login": ATTR_LOGIN,
                    "updated": ATTR_AVATAR_UPDATED,
                    "followers": ATTR_FOLLOWERS,
                    "following": ATTR_FOLLOWING,
                    "sponsors": ATTR_SPONSORS,
                    "sponsoring": ATTR_SPONSORING,
                }),
            ),
            ("SPONSOR_ANY", json!(SponsorCriterion::Any.to_string())),
            ("SPONSOR_HAS", json!(SponsorCriterion::AtLeastOne.to_string())),
            ("DEFAULT_SORT", json!(SortKey::default().as_str())),
            ("NAME_FIELD", json!(NAME_FIELD)),
            ("RATIO_FIELD", json!(RATIO_FIELD)),
            ("HIGHLIGHT_MS", json!(HIGHLIGHT_DURATION.as_millis() as u64)),
            ("NOTHING_TO_PICK", json!(NOTHING_TO_PICK)),
            ("NO_RESULTS", json!(NO_RESULTS_MESSAGE)),
            ("WORKER", json!(WORKER_FILE)),
        ],
    )
}

/// Offline worker, unminified.
pub fn worker_script() -> String {
    fill(
        WORKER_SCRIPT,
        &[
            ("CACHE", json!(CACHE_VERSION)),
            ("MANIFEST", json!(DEFAULT_MANIFEST)),
            ("DATA_FILE", json!(DATA_FILE)),
            ("DATA_MAX_AGE_MS", json!(DATA_FILE_MAX_AGE_DAYS * 86_400_000)),
        ],
    )
}
