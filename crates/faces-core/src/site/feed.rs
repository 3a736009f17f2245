use std::fmt::Write;

use chrono::{DateTime, Utc};

use super::minify::minify_xml;
use crate::utils::escape_html;

/// RFC 2822 date as RSS readers expect it, always in GMT
pub fn rss_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub description: String,
    pub pub_date: DateTime<Utc>,
    pub guid: String,
}

pub struct Channel<'a> {
    pub title: &'a str,
    pub link: &'a str,
    pub description: &'a str,
}

/// Minified RSS 2.0 document.
pub fn rss_feed(channel: &Channel<'_>, items: &[FeedItem]) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<rss version=\"2.0\">\n<channel>\n");
    let _ = writeln!(out, "<title>{}</title>", escape_html(channel.title));
    let _ = writeln!(out, "<link>{}</link>", escape_html(channel.link));
    let _ = writeln!(out, "<description>{}</description>", escape_html(channel.description));

    for item in items {
        out.push_str("<item>\n");
        let _ = writeln!(out, "  <title>{}</title>", escape_html(&item.title));
        let _ = writeln!(out, "  <link>{}</link>", escape_html(&item.link));
        let _ = writeln!(out, "  <description>{}</description>", escape_html(&item.description));
        let _ = writeln!(out, "  <pubDate>{}</pubDate>", rss_date(item.pub_date));
        let _ = writeln!(out, "  <guid>{}</guid>", escape_html(&item.guid));
        out.push_str("</item>\n");
    }

    out.push_str("</channel>\n</rss>\n");
    minify_xml(&out)
}

/// Unique item URLs (first occurrence wins) followed by the feed itself.
pub fn sitemap_urls(items: &[FeedItem], feed_url: &str) -> Vec<String> {
    let mut urls: Vec<String> = Vec::with_capacity(items.len() + 1);
    for item in items {
        if !urls.contains(&item.guid) {
            urls.push(item.guid.clone());
        }
    }
    urls.push(feed_url.to_string());
    urls
}

/// Minified sitemap with one `<url><loc>` per entry.
pub fn sitemap(urls: &[String]) -> String {
    let mut out = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for url in urls {
        let _ = writeln!(out, "    <url>\n        <loc>{}</loc>\n    </url>", escape_html(url));
    }
    out.push_str("</urlset>\n");
    minify_xml(&out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(guid: &str) -> FeedItem {
        FeedItem {
            title: "Faces".into(),
            link: guid.into(),
            description: "Popular users & friends".into(),
            pub_date: Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap(),
            guid: guid.into(),
        }
    }

    #[test]
    fn test_rss_date() {
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap();
        assert_eq!(rss_date(at), "Tue, 05 Mar 2024 07:08:09 GMT");
    }

    #[test]
    fn test_rss_feed() {
        let channel = Channel {
            title: "Faces",
            link: "https://example.github.io/",
            description: "d",
        };
        let xml = rss_feed(&channel, &[item("https://example.github.io/")]);

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?><rss version=\"2.0\"><channel>"));
        assert!(xml.contains("<description>Popular users &amp; friends</description>"));
        assert!(xml.contains("<pubDate>Tue, 05 Mar 2024 07:08:09 GMT</pubDate>"));
        assert!(xml.contains("<guid>https://example.github.io/</guid>"));
        assert!(xml.ends_with("</channel></rss>"));
    }

    #[test]
    fn test_sitemap_dedupes_and_appends_feed() {
        let items = [item("https://a/"), item("https://a/"), item("https://b/")];
        let urls = sitemap_urls(&items, "https://a/feed.xml");
        assert_eq!(urls, vec!["https://a/", "https://b/", "https://a/feed.xml"]);

        let xml = sitemap(&urls);
        assert_eq!(xml.matches("<url><loc>").count(), 3);
        assert!(xml.ends_with("</urlset>"));
    }
}
