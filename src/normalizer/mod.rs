//! Converts raw RSS/Atom payloads into [`ContentItem`]s.

use chrono::{DateTime, Utc};
use feed_rs::parser;
use html_escape::decode_html_entities;

use crate::app::{EstuaryError, Result};
use crate::domain::{ContentItem, Platform};

#[derive(Clone, Default)]
pub struct Normalizer;

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    /// Parse `body` and normalize its entries.
    ///
    /// Normalization rules:
    /// - missing author falls back to the subscribed user's display name
    /// - missing publish timestamp falls back to `fetched_at`, flagged as
    ///   synthetic so date partitioning downstream can tell
    /// - summary HTML is preserved verbatim; the push adapter owns any
    ///   stripping or length limits
    pub fn normalize(
        &self,
        platform: &Platform,
        user_id: &str,
        user_label: &str,
        body: &[u8],
        fetched_at: DateTime<Utc>,
    ) -> Result<Vec<ContentItem>> {
        let feed = parser::parse(body).map_err(|e| EstuaryError::FeedParse(e.to_string()))?;

        let items = feed
            .entries
            .into_iter()
            .map(|entry| {
                let link = entry
                    .links
                    .first()
                    .map(|l| l.href.clone())
                    .unwrap_or_default();
                let title = entry
                    .title
                    .map(|t| decode_html_entities(&t.content).to_string())
                    .unwrap_or_default();
                let published = entry.published.or(entry.updated);

                // The canonical key deliberately excludes the mirror URL and
                // the mirror-assigned entry id: the link is the one field all
                // mirrors agree on for the same underlying post.
                let canonical_key = if link.is_empty() {
                    format!(
                        "{}_{}",
                        title,
                        published.map(|dt| dt.to_rfc3339()).unwrap_or_default()
                    )
                } else {
                    link.clone()
                };
                let fingerprint = ContentItem::fingerprint_for(platform, user_id, &canonical_key);

                let (published_at, published_synthetic) = match published {
                    Some(dt) => (dt.with_timezone(&Utc), false),
                    None => (fetched_at, true),
                };

                let author = entry
                    .authors
                    .first()
                    .map(|a| a.name.clone())
                    .filter(|name| !name.is_empty())
                    .unwrap_or_else(|| user_label.to_string());

                ContentItem {
                    fingerprint,
                    title,
                    link,
                    author,
                    published_at,
                    published_synthetic,
                    summary_html: entry.summary.map(|s| s.content).unwrap_or_default(),
                    platform: platform.clone(),
                    user_label: user_label.to_string(),
                }
            })
            .collect();

        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const RSS_SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>dotey on Twitter</title>
    <item>
      <title>First post</title>
      <link>https://x.com/dotey/status/1</link>
      <guid>https://mirror-a.example/guid/1</guid>
      <pubDate>Mon, 01 Jan 2024 08:00:00 GMT</pubDate>
      <description>&lt;p&gt;Hello &lt;b&gt;world&lt;/b&gt;&lt;/p&gt;</description>
    </item>
    <item>
      <title>Post without date or author</title>
      <link>https://x.com/dotey/status/2</link>
      <guid>https://mirror-a.example/guid/2</guid>
      <description>plain</description>
    </item>
  </channel>
</rss>"#;

    const ATOM_SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>dotey timeline</title>
  <entry>
    <title>Authored post</title>
    <link href="https://x.com/dotey/status/9"/>
    <id>atom-entry-9</id>
    <author><name>dotey</name></author>
    <published>2024-01-01T08:00:00Z</published>
    <updated>2024-01-01T08:00:00Z</updated>
    <summary>short</summary>
  </entry>
</feed>"#;

    fn fetch_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_normalize_basic_fields() {
        let items = Normalizer::new()
            .normalize(&Platform::Twitter, "dotey", "Bao Yu", RSS_SAMPLE.as_bytes(), fetch_time())
            .unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "First post");
        assert_eq!(items[0].link, "https://x.com/dotey/status/1");
        assert!(!items[0].published_synthetic);
        // Summary HTML is kept verbatim.
        assert_eq!(items[0].summary_html, "<p>Hello <b>world</b></p>");
    }

    #[test]
    fn test_entry_author_wins_over_user_label() {
        let items = Normalizer::new()
            .normalize(&Platform::Twitter, "dotey", "Bao Yu", ATOM_SAMPLE.as_bytes(), fetch_time())
            .unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].author, "dotey");
    }

    #[test]
    fn test_missing_author_defaults_to_user_label() {
        let items = Normalizer::new()
            .normalize(&Platform::Twitter, "dotey", "Bao Yu", RSS_SAMPLE.as_bytes(), fetch_time())
            .unwrap();

        assert_eq!(items[1].author, "Bao Yu");
    }

    #[test]
    fn test_missing_published_is_synthetic_fetch_time() {
        let items = Normalizer::new()
            .normalize(&Platform::Twitter, "dotey", "Bao Yu", RSS_SAMPLE.as_bytes(), fetch_time())
            .unwrap();

        assert!(items[1].published_synthetic);
        assert_eq!(items[1].published_at, fetch_time());
    }

    #[test]
    fn test_fingerprint_stable_across_mirrors() {
        // Same posts served by two mirrors under different guids: the
        // fingerprints must match because only the canonical link is hashed.
        let mirror_b = RSS_SAMPLE.replace("mirror-a.example", "mirror-b.example");

        let normalizer = Normalizer::new();
        let a = normalizer
            .normalize(&Platform::Twitter, "dotey", "Bao Yu", RSS_SAMPLE.as_bytes(), fetch_time())
            .unwrap();
        let b = normalizer
            .normalize(&Platform::Twitter, "dotey", "Bao Yu", mirror_b.as_bytes(), fetch_time())
            .unwrap();

        assert_eq!(a[0].fingerprint, b[0].fingerprint);
        assert_eq!(a[1].fingerprint, b[1].fingerprint);
    }

    #[test]
    fn test_unparseable_body_is_an_error() {
        let result = Normalizer::new().normalize(
            &Platform::Twitter,
            "dotey",
            "Bao Yu",
            b"<html>not a feed</html>",
            fetch_time(),
        );
        assert!(result.is_err());
    }
}
