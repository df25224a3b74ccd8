//! Configuration loading for the sync engine.
//!
//! The core consumes an already-validated structure; anything a job cannot
//! make progress without (no users, no push target) is rejected here, before
//! any job runs. Malformed mirror templates are *not* rejected here — the
//! resolver skips them per-template with a warning.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::app::{EstuaryError, Result};
use crate::domain::Platform;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path of the persisted fingerprint cache.
    pub cache_file: String,

    /// Cache entries older than this are evicted once per invocation.
    pub retention_days: i64,

    /// Per-endpoint fetch timeout in seconds.
    pub fetch_timeout_secs: u64,

    /// Maximum number of sync jobs running concurrently.
    pub workers: usize,

    pub push: PushConfig,

    /// Platform name -> mirrors and subscribed users. BTreeMap keeps job
    /// order stable across runs.
    pub platforms: BTreeMap<String, PlatformConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_file: "feed_cache.json".to_string(),
            retention_days: 30,
            fetch_timeout_secs: 60,
            workers: crate::sync::DEFAULT_WORKERS,
            push: PushConfig::default(),
            platforms: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    pub notion: NotionConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotionConfig {
    /// Page or database id the synced items land under.
    pub parent_id: String,

    /// Where the resolved database id is remembered between runs.
    pub state_file: String,
}

impl Default for NotionConfig {
    fn default() -> Self {
        Self {
            parent_id: String::new(),
            state_file: "notion_state.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// When true, total mirror exhaustion marks the job failed instead of
    /// finishing with an empty report.
    pub fail_fast: bool,

    /// Mirror URL templates in preference order; each must contain exactly
    /// one `{username}` placeholder.
    pub mirror_templates: Vec<String>,

    pub users: Vec<UserConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserConfig {
    /// Identity substituted into mirror templates.
    pub id: String,
    /// Display name; falls back to the id when absent.
    #[serde(default)]
    pub name: String,
}

impl UserConfig {
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            EstuaryError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Config = toml::from_str(&content).map_err(|e| {
            EstuaryError::Config(format!("cannot parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.platforms.is_empty() {
            return Err(EstuaryError::Config("no platforms configured".into()));
        }
        if self.jobs().is_empty() {
            return Err(EstuaryError::Config("no users configured".into()));
        }
        for (name, platform) in &self.platforms {
            for user in &platform.users {
                if user.id.trim().is_empty() {
                    return Err(EstuaryError::Config(format!(
                        "platform {} has a user with an empty id",
                        name
                    )));
                }
            }
        }
        if self.push.notion.parent_id.trim().is_empty() {
            return Err(EstuaryError::Config(
                "push.notion.parent_id is not set".into(),
            ));
        }
        Ok(())
    }

    /// All configured (platform, user) jobs in configuration order.
    pub fn jobs(&self) -> Vec<(Platform, &PlatformConfig, &UserConfig)> {
        self.platforms
            .iter()
            .flat_map(|(name, platform)| {
                let tag = Platform::parse(name);
                platform
                    .users
                    .iter()
                    .map(move |user| (tag.clone(), platform, user))
            })
            .collect()
    }

    /// Look up a single user by id, case-insensitively.
    pub fn find_user(&self, id: &str) -> Option<(Platform, &PlatformConfig, &UserConfig)> {
        self.jobs()
            .into_iter()
            .find(|(_, _, user)| user.id.eq_ignore_ascii_case(id))
    }

    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::days(self.retention_days)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
cache_file = "cache.json"
retention_days = 14
fetch_timeout_secs = 30
workers = 2

[push.notion]
parent_id = "abc123"

[platforms.twitter]
fail_fast = true
mirror_templates = [
    "https://mirror-a.example/twitter/user/{username}",
    "https://mirror-b.example/twitter/user/{username}",
]
users = [
    { id = "dotey", name = "Bao Yu" },
    { id = "github_daily" },
]

[platforms.weibo]
mirror_templates = ["https://mirror-a.example/weibo/user/{username}"]
users = [{ id = "5722964389", name = "Some Weibo User" }]
"#;

    #[test]
    fn test_parse_full_config() {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        config.validate().unwrap();

        assert_eq!(config.retention_days, 14);
        assert_eq!(config.workers, 2);
        assert_eq!(config.fetch_timeout(), Duration::from_secs(30));

        let twitter = &config.platforms["twitter"];
        assert!(twitter.fail_fast);
        assert_eq!(twitter.mirror_templates.len(), 2);
        assert_eq!(twitter.users[0].display_name(), "Bao Yu");
        assert_eq!(twitter.users[1].display_name(), "github_daily");
    }

    #[test]
    fn test_jobs_enumerates_all_users() {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        let jobs = config.jobs();
        assert_eq!(jobs.len(), 3);
        // BTreeMap iteration: twitter before weibo
        assert_eq!(jobs[0].0, Platform::Twitter);
        assert_eq!(jobs[2].0, Platform::Weibo);
    }

    #[test]
    fn test_find_user_case_insensitive() {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        let (platform, _, user) = config.find_user("DOTEY").unwrap();
        assert_eq!(platform, Platform::Twitter);
        assert_eq!(user.id, "dotey");
        assert!(config.find_user("nobody").is_none());
    }

    #[test]
    fn test_no_users_is_fatal() {
        let config: Config = toml::from_str(
            r#"
[push.notion]
parent_id = "abc"

[platforms.twitter]
mirror_templates = ["https://m.example/{username}"]
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_parent_id_is_fatal() {
        let config: Config = toml::from_str(
            r#"
[platforms.twitter]
mirror_templates = ["https://m.example/{username}"]
users = [{ id = "dotey" }]
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.cache_file, "feed_cache.json");
        assert_eq!(config.retention_days, 30);
        assert_eq!(config.fetch_timeout_secs, 60);
        assert_eq!(config.push.notion.state_file, "notion_state.json");
    }
}
