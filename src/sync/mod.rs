//! Drives Resolver → Fetcher → diff → push for each (platform, user) job.
//!
//! The orchestrator is the only component with cross-cutting state; the
//! fingerprint cache is the sole mutable resource shared between jobs and
//! the only durable memory across invocations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::cache::FingerprintCache;
use crate::config::{PlatformConfig, UserConfig};
use crate::domain::{ContentItem, Platform, PushFailure, SyncReport};
use crate::fetcher::{fetch_with_fallback, FeedSource};
use crate::normalizer::Normalizer;
use crate::push::Pusher;
use crate::resolver;

pub const DEFAULT_WORKERS: usize = 4;

/// Phases of one sync job. `Failed` is reachable from `Fetching` only, on
/// total mirror exhaustion with fail-fast configured; exhaustion otherwise
/// degrades to `Done` with zero new items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobPhase {
    Resolving,
    Fetching,
    Diffing,
    Pushing,
    Done,
    Failed,
}

pub struct Orchestrator {
    source: Arc<dyn FeedSource>,
    pusher: Arc<dyn Pusher>,
    cache: Arc<Mutex<FingerprintCache>>,
    normalizer: Normalizer,
    workers: usize,
    shutdown: Arc<AtomicBool>,
}

impl Orchestrator {
    pub fn new(
        source: Arc<dyn FeedSource>,
        pusher: Arc<dyn Pusher>,
        cache: Arc<Mutex<FingerprintCache>>,
        workers: usize,
    ) -> Self {
        Self {
            source,
            pusher,
            cache,
            normalizer: Normalizer::new(),
            workers,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Handle for a signal listener. Once set, jobs finish their in-flight
    /// push-then-cache-insert pair and stop; no partial insert without a
    /// confirmed push.
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    /// Run one (platform, user) job to completion.
    pub async fn sync_user(
        &self,
        platform: &Platform,
        config: &PlatformConfig,
        user: &UserConfig,
    ) -> SyncReport {
        let mut phase = JobPhase::Resolving;
        debug!(user = %user.id, ?phase, "job started");

        let candidates = resolver::resolve(platform, user, &config.mirror_templates);
        if candidates.is_empty() {
            warn!(user = %user.id, "no usable mirror templates");
            return self.exhausted_report(platform, user, config, &mut phase);
        }

        phase = JobPhase::Fetching;
        debug!(user = %user.id, mirrors = candidates.len(), ?phase, "trying mirrors in order");
        let outcome =
            fetch_with_fallback(self.source.as_ref(), &candidates, &self.normalizer, &user.id)
                .await;

        if !outcome.succeeded() {
            warn!(
                user = %user.id,
                attempts = outcome.attempts.len(),
                "every mirror failed"
            );
            return self.exhausted_report(platform, user, config, &mut phase);
        }

        let total_fetched = outcome.items.len();
        if total_fetched == 0 {
            debug!(user = %user.id, "feed is empty, nothing to do");
        }

        phase = JobPhase::Diffing;
        debug!(user = %user.id, ?phase, "partitioning against the cache");
        // Feed-native order is preserved for the push loop.
        let new_items: Vec<ContentItem> = {
            let cache = self.lock_cache();
            outcome
                .items
                .into_iter()
                .filter(|item| !cache.contains(&item.fingerprint))
                .collect()
        };
        let new_count = new_items.len();
        let cached_count = total_fetched - new_count;

        phase = JobPhase::Pushing;
        debug!(user = %user.id, new = new_count, cached = cached_count, ?phase, "pushing new items");

        let mut pushed = 0;
        let mut push_failures = Vec::new();
        for item in &new_items {
            if self.shutdown.load(Ordering::SeqCst) {
                warn!(user = %user.id, "shutdown requested, remaining items retry next run");
                break;
            }

            match self.pusher.push(item).await {
                Ok(()) => {
                    pushed += 1;
                    // Insert immediately after the confirmed delivery, not
                    // batched at the end: a crash mid-run leaves pushed items
                    // marked as seen and only un-pushed items retry.
                    let mut cache = self.lock_cache();
                    if cache.insert(&item.fingerprint, Utc::now()) {
                        if let Err(e) = cache.save() {
                            error!(error = %e, "failed to persist the fingerprint cache");
                        }
                    }
                    info!(user = %user.id, title = %item.display_title(), "pushed");
                }
                Err(e) => {
                    // Not cached, so the next run retries it. One failure
                    // never aborts the batch.
                    warn!(user = %user.id, title = %item.display_title(), reason = %e, "push failed");
                    push_failures.push(PushFailure {
                        fingerprint: item.fingerprint.clone(),
                        title: item.title.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        phase = JobPhase::Done;
        debug!(user = %user.id, ?phase, pushed, "job finished");

        SyncReport {
            platform: platform.clone(),
            user_label: user.display_name().to_string(),
            total_fetched,
            new_count,
            cached_count,
            pushed,
            push_failures,
            failed: false,
        }
    }

    /// Run every job, bounded by the worker semaphore. Jobs only share the
    /// cache (behind its lock), so they are safe to run concurrently.
    pub async fn sync_all(
        self: Arc<Self>,
        jobs: Vec<(Platform, PlatformConfig, UserConfig)>,
    ) -> Vec<SyncReport> {
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut handles = Vec::with_capacity(jobs.len());

        for (platform, config, user) in jobs {
            let this = self.clone();
            let semaphore = semaphore.clone();

            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire().await.expect("Semaphore closed");
                this.sync_user(&platform, &config, &user).await
            }));
        }

        let mut reports = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(report) => reports.push(report),
                Err(e) => error!("Task join error: {}", e),
            }
        }

        reports
    }

    fn exhausted_report(
        &self,
        platform: &Platform,
        user: &UserConfig,
        config: &PlatformConfig,
        phase: &mut JobPhase,
    ) -> SyncReport {
        *phase = if config.fail_fast {
            JobPhase::Failed
        } else {
            JobPhase::Done
        };
        debug!(user = %user.id, ?phase, "job finished without data");
        SyncReport::empty(
            platform.clone(),
            user.display_name().to_string(),
            config.fail_fast,
        )
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, FingerprintCache> {
        // A poisoned lock still holds consistent cache data; keep going.
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
