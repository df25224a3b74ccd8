use crate::domain::Platform;

/// Outcome of one (platform, user) sync job.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub platform: Platform,
    pub user_label: String,
    /// Items returned by the winning mirror.
    pub total_fetched: usize,
    /// Items whose fingerprint was not yet cached.
    pub new_count: usize,
    /// Items already delivered on a previous run.
    pub cached_count: usize,
    /// Items confirmed delivered (and cached) during this run.
    pub pushed: usize,
    pub push_failures: Vec<PushFailure>,
    /// True only when every mirror failed and the job is fail-fast.
    pub failed: bool,
}

impl SyncReport {
    pub fn empty(platform: Platform, user_label: String, failed: bool) -> Self {
        Self {
            platform,
            user_label,
            total_fetched: 0,
            new_count: 0,
            cached_count: 0,
            pushed: 0,
            push_failures: Vec::new(),
            failed,
        }
    }
}

/// A push the external store rejected; the item stays uncached so the next
/// run retries it.
#[derive(Debug, Clone)]
pub struct PushFailure {
    pub fingerprint: String,
    pub title: String,
    pub reason: String,
}
