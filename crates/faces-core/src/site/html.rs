use std::fmt::Write;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use super::script::page_script;
use super::SiteOptions;
use crate::avatars::FACES_DIR;
use crate::filter::{AgeBucket, RenderSummary, SortKey, SponsorCriterion};
use crate::models::{card_attributes, CardAttributes, GitHubUser};
use crate::utils::{escape_attr, escape_html, format_number, unescape_html};

const STYLE: &str = r#"
/* layout */
body { margin: 0; font-family: system-ui, sans-serif; background: #0d1117; color: #e6edf3; }
header, footer { padding: 1rem 2rem; background: #161b22; }
a { color: #58a6ff; }
.controls { display: flex; flex-wrap: wrap; gap: 0.5rem; align-items: center; }
.controls input, .controls select, .controls button { padding: 0.3rem 0.5rem; }
.results { padding: 0 2rem; }
.grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(180px, 1fr)); gap: 1rem; padding: 1rem 2rem; }
.card { background: #161b22; border-radius: 8px; padding: 0.8rem; text-align: center; }
.card img { border-radius: 50%; }
.card.highlight { outline: 3px solid #f78166; }
.card-stats { list-style: none; padding: 0; font-size: 0.85rem; }
"#;

/// Sponsor filter choices offered on the page
const SPONSOR_CHOICES: [(SponsorCriterion, &str); 4] = [
    (SponsorCriterion::Any, "Any"),
    (SponsorCriterion::AtLeastOne, "At least one"),
    (SponsorCriterion::AtLeast(10), "10 or more"),
    (SponsorCriterion::AtLeast(100), "100 or more"),
];

fn range_inputs(out: &mut String, id: &str, label: &str) {
    let _ = write!(
        out,
        r#"<label>{label} <input type="number" id="min-{id}" min="0" placeholder="min"> - <input type="number" id="max-{id}" min="0" placeholder="max"></label>"#,
    );
}

fn sponsor_select(out: &mut String, id: &str, label: &str) {
    let _ = write!(out, r#"<label>{label} <select id="{id}">"#);
    for (value, text) in SPONSOR_CHOICES {
        let _ = write!(out, r#"<option value="{value}">{text}</option>"#);
    }
    out.push_str("</select></label>");
}

fn controls(out: &mut String) {
    out.push_str(r#"<div class="controls">"#);
    out.push_str(r#"<input type="search" id="search" placeholder="Search name, login, location, language">"#);

    out.push_str(r#"<label>Sort <select id="sort">"#);
    for key in SortKey::ALL {
        let selected = if key == SortKey::default() { " selected" } else { "" };
        let _ = write!(
            out,
            r#"<option value="{}"{}>{}</option>"#,
            key.as_str(),
            selected,
            key.label()
        );
    }
    out.push_str("</select></label>");

    range_inputs(out, "followers", "Followers");
    range_inputs(out, "repos", "Repos");
    range_inputs(out, "forks", "Forks");
    sponsor_select(out, "sponsors", "Sponsors");
    sponsor_select(out, "sponsoring", "Sponsoring");

    out.push_str(r#"<label>Avatar updated <select id="avatar-age">"#);
    for bucket in AgeBucket::ALL {
        let _ = write!(
            out,
            r#"<option value="{}">{}</option>"#,
            bucket.as_str(),
            bucket.label()
        );
    }
    out.push_str("</select></label>");

    out.push_str(r#"<button type="button" id="random">Random user</button>"#);
    out.push_str(r#"<button type="button" id="reset">Reset</button>"#);
    out.push_str("</div>");
}

fn stat(out: &mut String, label: &str, value: Option<u64>) {
    let _ = write!(out, "<li>{} <b>{}</b></li>", label, format_number(value));
}

/// One profile card. The `data-*` attributes carry what the filter
/// engine parses back into a record.
pub fn render_card(user: &GitHubUser) -> String {
    let mut out = String::from(r#"<article class="card""#);
    for (key, value) in card_attributes(user) {
        let _ = write!(out, r#" data-{}="{}""#, key, escape_attr(&value));
    }
    out.push('>');

    let login = escape_html(&user.login);
    let _ = write!(
        out,
        r#"<a href="{}" target="_blank" rel="noopener"><img src="{}/{}.png" alt="{}" loading="lazy" width="120" height="120"></a>"#,
        escape_html(&user.html_url),
        FACES_DIR,
        escape_html(&user.login.to_lowercase()),
        login,
    );
    let _ = write!(
        out,
        r#"<h2 class="card-name">{}</h2><p class="card-login">@{}</p>"#,
        escape_html(user.display_name()),
        login
    );
    if let Some(location) = user.location.as_deref().filter(|l| !l.is_empty()) {
        let _ = write!(out, r#"<p class="card-location">{}</p>"#, escape_html(location));
    }

    out.push_str(r#"<ul class="card-stats">"#);
    stat(&mut out, "Followers", user.followers);
    stat(&mut out, "Following", user.following);
    stat(&mut out, "Repos", user.public_repos);
    stat(&mut out, "Gists", user.public_gists);
    stat(&mut out, "Forks", user.forks);
    stat(&mut out, "Sponsors", user.sponsors_count);
    stat(&mut out, "Sponsoring", user.sponsoring_count);
    out.push_str("</ul>");

    if !user.languages.is_empty() {
        let _ = write!(
            out,
            r#"<p class="card-languages">{}</p>"#,
            escape_html(&user.languages.join(", "))
        );
    }
    out.push_str("</article>");
    out
}

/// Full `index.html`, unminified.
pub fn render_index(users: &[GitHubUser], options: &SiteOptions, now: DateTime<Utc>) -> String {
    let title = escape_html(&options.title);
    let description = escape_html(&options.description);
    let home = escape_html(&options.home_url());
    let summary = RenderSummary::new(users.len(), users.len());

    let mut out = String::with_capacity(1024 + users.len() * 1024);
    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    out.push_str("<meta charset=\"utf-8\">\n");
    out.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    let _ = writeln!(out, "<title>{}</title>", title);
    let _ = writeln!(out, r#"<meta name="description" content="{}">"#, description);
    let _ = writeln!(out, r#"<link rel="canonical" href="{}">"#, home);
    out.push_str("<link rel=\"icon\" href=\"images/favicon.png\">\n");
    let _ = writeln!(
        out,
        r#"<link rel="alternate" type="application/rss+xml" title="{}" href="feed.xml">"#,
        title
    );
    let _ = writeln!(out, "<style>{}</style>", STYLE);
    out.push_str("</head>\n<body>\n");

    let _ = writeln!(out, "<header>\n<h1>{}</h1>\n<p>{}</p>", title, description);
    controls(&mut out);
    out.push_str("\n</header>\n");

    let _ = writeln!(
        out,
        r#"<p class="results"><span id="count">{}</span> <span id="results-message" hidden></span></p>"#,
        summary.compact_label()
    );

    out.push_str("<main id=\"grid\" class=\"grid\">\n");
    for user in users {
        out.push_str(&render_card(user));
        out.push('\n');
    }
    out.push_str("</main>\n");

    let _ = writeln!(
        out,
        r#"<footer><p>{} users, generated {}. <a href="feed.xml">RSS</a></p></footer>"#,
        format_number(Some(users.len() as u64)),
        now.format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(out, "<script>{}</script>", page_script());
    out.push_str("</body>\n</html>\n");
    out
}

fn card_tag() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    CELL.get_or_init(|| Regex::new(r#"<article class="card"([^>]*)>"#).expect("static pattern compiles"))
}

fn data_attr() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    CELL.get_or_init(|| Regex::new(r#"data-([a-z-]+)="([^"]*)""#).expect("static pattern compiles"))
}

/// Read the card attributes back out of a rendered page, in page order.
pub fn read_cards(html: &str) -> Vec<CardAttributes> {
    card_tag()
        .captures_iter(html)
        .map(|card| {
            data_attr()
                .captures_iter(&card[1])
                .map(|attr| (attr[1].to_string(), unescape_html(&attr[2])))
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CardHandle, ProfileRecord};
    use crate::site::minify::minify_html;

    fn user(login: &str, name: Option<&str>, followers: Option<u64>) -> GitHubUser {
        GitHubUser {
            login: login.to_string(),
            html_url: format!("https://github.com/{}", login),
            name: name.map(str::to_string),
            followers,
            following: Some(3),
            public_repos: Some(12),
            languages: vec!["Rust".into(), "C".into()],
            avatar_updated_at: Some("2024-05-01T10:00:00+00:00".into()),
            ..Default::default()
        }
    }

    fn options() -> SiteOptions {
        SiteOptions::new("docs", "https://example.github.io")
    }

    #[test]
    fn test_card_escapes_text() {
        let card = render_card(&user("eve", Some("<Eve & \"co\">"), Some(1500)));
        assert!(card.contains(r#"data-name="&lt;Eve &amp; &quot;co&quot;&gt;""#));
        assert!(card.contains("<h2 class=\"card-name\">&lt;Eve &amp; &quot;co&quot;&gt;</h2>"));
        assert!(card.contains("Followers <b>1,500</b>"));
        assert!(card.contains("Forks <b>N/A</b>"));
        assert!(card.contains(r#"src="images/faces/eve.png""#));
    }

    #[test]
    fn test_index_has_controls_and_cards() {
        let users = vec![user("Alice", None, Some(10)), user("bob", Some("Bob"), None)];
        let html = render_index(&users, &options(), Utc::now());

        assert!(html.contains(r#"<option value="followers-desc" selected>"#));
        assert!(html.contains(r#"<option value="5y+">"#));
        assert!(html.contains(r#"<span id="count">2 / 2</span>"#));
        assert_eq!(html.matches("<article class=\"card\"").count(), 2);
        assert!(html.contains(r#"href="feed.xml""#));
    }

    #[test]
    fn test_page_script_survives_minification() {
        let users = vec![user("Alice", None, Some(10))];
        let html = minify_html(&render_index(&users, &options(), Utc::now()));

        assert_eq!(html.matches("<script>").count(), 1);
        assert!(html.contains("navigator.serviceWorker.register(WORKER)"));
        assert!(html.contains(r#"var WORKER = "sw.js";"#));
        assert!(html.contains("byId('random').addEventListener('click',pickRandomUser);"));
        // The script comes after the grid it reads
        assert!(html.find("<script>").unwrap() > html.find("id=\"grid\"").unwrap());
        assert!(html.trim_end().ends_with("</script></body></html>"));
    }

    #[test]
    fn test_cards_read_back_from_minified_page() {
        let mut spaced = user("carol", Some("Ann  Lee"), Some(3));
        spaced.location = Some("New\tYork".into());
        let users = vec![
            user("Alice", Some("Alice O'Hara"), Some(1200)),
            user("bob", None, None),
            spaced,
        ];
        let html = minify_html(&render_index(&users, &options(), Utc::now()));

        let cards = read_cards(&html);
        assert_eq!(cards.len(), 3);
        assert_eq!(cards[0], card_attributes(&users[0]));

        let record = ProfileRecord::from_card(CardHandle(0), &cards[0]);
        assert_eq!(record.display_name, "Alice O'Hara");
        assert_eq!(record.followers, 1200);
        assert_eq!(record.languages, "rust c");
        assert!(record.avatar_updated_at.is_some());

        let record = ProfileRecord::from_card(CardHandle(1), &cards[1]);
        assert_eq!(record.login, "bob");
        assert_eq!(record.followers, 0);

        // Whitespace inside attribute values is not collapsed
        assert_eq!(cards[2], card_attributes(&users[2]));
        let record = ProfileRecord::from_card(CardHandle(2), &cards[2]);
        assert_eq!(record.display_name, "Ann  Lee");
        assert_eq!(record.location, "new\tyork");
    }
}
