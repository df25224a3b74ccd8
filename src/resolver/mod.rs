//! Expands a platform + user identity into an ordered list of candidate
//! mirror URLs. Pure string expansion, no network access.

use tracing::warn;
use url::Url;

use crate::config::UserConfig;
use crate::domain::Platform;

/// Placeholder substituted with the user's id.
pub const USER_PLACEHOLDER: &str = "{username}";

/// A fully-substituted candidate URL. Ephemeral, regenerated per resolution.
#[derive(Debug, Clone)]
pub struct EndpointCandidate {
    pub platform: Platform,
    pub user_label: String,
    pub url: String,
}

/// Expand `templates` for one user, preserving configuration order so
/// operators can rank mirrors by reliability (first-listed = first-tried).
///
/// Templates without exactly one placeholder, or that expand to an invalid
/// URL, are skipped with a warning rather than failing the job.
pub fn resolve(platform: &Platform, user: &UserConfig, templates: &[String]) -> Vec<EndpointCandidate> {
    let mut candidates = Vec::with_capacity(templates.len());

    for template in templates {
        if template.matches(USER_PLACEHOLDER).count() != 1 {
            warn!(template = %template, "mirror template must contain exactly one {{username}} placeholder, skipping");
            continue;
        }

        let url = template.replace(USER_PLACEHOLDER, &user.id);
        if Url::parse(&url).is_err() {
            warn!(url = %url, "mirror template expands to an invalid URL, skipping");
            continue;
        }

        candidates.push(EndpointCandidate {
            platform: platform.clone(),
            user_label: user.display_name().to_string(),
            url,
        });
    }

    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> UserConfig {
        UserConfig {
            id: id.to_string(),
            name: String::new(),
        }
    }

    #[test]
    fn test_resolve_preserves_order() {
        let templates = vec![
            "https://mirror-a.example/twitter/user/{username}".to_string(),
            "https://mirror-b.example/twitter/user/{username}".to_string(),
            "https://mirror-c.example/twitter/user/{username}".to_string(),
        ];
        let candidates = resolve(&Platform::Twitter, &user("dotey"), &templates);

        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].url, "https://mirror-a.example/twitter/user/dotey");
        assert_eq!(candidates[1].url, "https://mirror-b.example/twitter/user/dotey");
        assert_eq!(candidates[2].url, "https://mirror-c.example/twitter/user/dotey");
    }

    #[test]
    fn test_malformed_templates_skipped() {
        let templates = vec![
            "https://no-placeholder.example/feed".to_string(),
            "https://twice.example/{username}/{username}".to_string(),
            "https://good.example/user/{username}".to_string(),
            "not a url {username}".to_string(),
        ];
        let candidates = resolve(&Platform::Twitter, &user("dotey"), &templates);

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].url, "https://good.example/user/dotey");
    }

    #[test]
    fn test_resolve_carries_identity() {
        let templates = vec!["https://m.example/weibo/{username}".to_string()];
        let u = UserConfig {
            id: "5722964389".to_string(),
            name: "Some Weibo User".to_string(),
        };
        let candidates = resolve(&Platform::Weibo, &u, &templates);

        assert_eq!(candidates[0].platform, Platform::Weibo);
        assert_eq!(candidates[0].user_label, "Some Weibo User");
    }

    #[test]
    fn test_empty_templates_yield_nothing() {
        assert!(resolve(&Platform::Twitter, &user("dotey"), &[]).is_empty());
    }
}
