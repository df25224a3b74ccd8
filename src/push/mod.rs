//! Push adapters persisting new items into the external structured store.

pub mod notion;

use async_trait::async_trait;

use crate::domain::ContentItem;

pub use notion::NotionPusher;

/// Why a single item could not be delivered. Push failures never abort the
/// batch; the orchestrator records them and moves on.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PushError {
    #[error("request error: {0}")]
    Http(String),

    #[error("store rejected item: {0}")]
    Rejected(String),
}

/// Delivers one item to the external store, partitioned by publish date.
/// The core already deduplicates; adapters may add their own guard.
#[async_trait]
pub trait Pusher: Send + Sync {
    async fn push(&self, item: &ContentItem) -> Result<(), PushError>;
}
