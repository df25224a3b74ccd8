use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A platform whose feeds are mirrored through RSS aggregators.
///
/// Adding a platform is a configuration change: unknown names map to
/// [`Platform::Other`] and flow through the same template expansion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Platform {
    Twitter,
    Weibo,
    Other(String),
}

impl Platform {
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "twitter" | "x" => Platform::Twitter,
            "weibo" => Platform::Weibo,
            other => Platform::Other(other.to_string()),
        }
    }

    /// Canonical lowercase name, as used in configuration and fingerprints.
    pub fn as_str(&self) -> &str {
        match self {
            Platform::Twitter => "twitter",
            Platform::Weibo => "weibo",
            Platform::Other(name) => name,
        }
    }
}

impl From<String> for Platform {
    fn from(s: String) -> Self {
        Platform::parse(&s)
    }
}

impl From<Platform> for String {
    fn from(p: Platform) -> Self {
        p.as_str().to_string()
    }
}

impl fmt::Display for Platform {
    /// Uppercase display name, e.g. `TWITTER`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str().to_uppercase())
    }
}

/// A normalized unit of fetched content. Immutable after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    pub fingerprint: String,
    pub title: String,
    pub link: String,
    pub author: String,
    pub published_at: DateTime<Utc>,
    /// True when the source carried no publish timestamp and `published_at`
    /// was synthesized from the fetch time.
    pub published_synthetic: bool,
    pub summary_html: String,
    pub platform: Platform,
    pub user_label: String,
}

impl ContentItem {
    /// Compute the stable dedup fingerprint for an entry.
    ///
    /// Derived from platform + user + the entry's canonical key (its link, or
    /// title+timestamp when no link exists). The mirror URL is deliberately
    /// excluded so the same post fetched through different mirrors hashes
    /// identically.
    pub fn fingerprint_for(platform: &Platform, user_id: &str, canonical_key: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(platform.as_str().as_bytes());
        hasher.update(b"\x1f");
        hasher.update(user_id.as_bytes());
        hasher.update(b"\x1f");
        hasher.update(canonical_key.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            "(untitled)"
        } else {
            &self.title
        }
    }
}
