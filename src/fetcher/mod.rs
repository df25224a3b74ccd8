//! Mirror fetching with ordered fallback.
//!
//! Candidates are tried in configuration order; the first mirror that yields
//! a parseable feed wins and no further mirrors are contacted. Results from
//! different mirrors are never merged.

pub mod http_source;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, warn};

use crate::domain::ContentItem;
use crate::normalizer::Normalizer;
use crate::resolver::EndpointCandidate;

pub use http_source::HttpFeedSource;

/// Why a single endpoint attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchFailure {
    #[error("timed out")]
    Timeout,

    #[error("connection error: {0}")]
    Connect(String),

    #[error("HTTP status {0}")]
    HttpStatus(u16),

    #[error("unparseable feed: {0}")]
    Parse(String),
}

#[derive(Debug)]
pub enum AttemptOutcome {
    Success { entries: usize },
    Failed(FetchFailure),
}

/// Per-endpoint diagnostic, one per contacted mirror.
#[derive(Debug)]
pub struct EndpointAttempt {
    pub url: String,
    pub outcome: AttemptOutcome,
}

#[derive(Debug)]
pub struct FetchOutcome {
    pub items: Vec<ContentItem>,
    pub attempts: Vec<EndpointAttempt>,
}

impl FetchOutcome {
    /// True when some mirror produced a parseable feed (even an empty one).
    pub fn succeeded(&self) -> bool {
        self.attempts
            .iter()
            .any(|a| matches!(a.outcome, AttemptOutcome::Success { .. }))
    }
}

/// Retrieves one endpoint's raw payload. The HTTP implementation carries the
/// configured timeout; tests substitute canned responses.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn get(&self, url: &str) -> Result<Vec<u8>, FetchFailure>;
}

/// Try `candidates` in order, returning the first mirror's normalized items.
///
/// Every failure (timeout, connection error, HTTP error, unparseable body)
/// is recorded per endpoint and iteration continues. Total exhaustion
/// returns empty items plus one diagnostic per candidate — a retryable
/// condition for the orchestrator, not a fatal error.
pub async fn fetch_with_fallback(
    source: &dyn FeedSource,
    candidates: &[EndpointCandidate],
    normalizer: &Normalizer,
    user_id: &str,
) -> FetchOutcome {
    let mut attempts = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        debug!(url = %candidate.url, "trying mirror");

        let body = match source.get(&candidate.url).await {
            Ok(body) => body,
            Err(failure) => {
                warn!(url = %candidate.url, reason = %failure, "mirror failed");
                attempts.push(EndpointAttempt {
                    url: candidate.url.clone(),
                    outcome: AttemptOutcome::Failed(failure),
                });
                continue;
            }
        };

        match normalizer.normalize(
            &candidate.platform,
            user_id,
            &candidate.user_label,
            &body,
            Utc::now(),
        ) {
            Ok(items) => {
                debug!(url = %candidate.url, entries = items.len(), "mirror succeeded");
                attempts.push(EndpointAttempt {
                    url: candidate.url.clone(),
                    outcome: AttemptOutcome::Success {
                        entries: items.len(),
                    },
                });
                // First success wins.
                return FetchOutcome { items, attempts };
            }
            Err(e) => {
                warn!(url = %candidate.url, error = %e, "mirror returned an unparseable body");
                attempts.push(EndpointAttempt {
                    url: candidate.url.clone(),
                    outcome: AttemptOutcome::Failed(FetchFailure::Parse(e.to_string())),
                });
            }
        }
    }

    FetchOutcome {
        items: Vec::new(),
        attempts,
    }
}
