use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::app::{EstuaryError, Result};
use crate::cache::FingerprintCache;
use crate::config::Config;
use crate::fetcher::{FeedSource, HttpFeedSource};
use crate::push::{NotionPusher, Pusher};
use crate::sync::Orchestrator;

pub struct AppContext {
    pub config: Config,
    pub cache: Arc<Mutex<FingerprintCache>>,
    pub orchestrator: Arc<Orchestrator>,
}

impl AppContext {
    /// Wire together cache, fetcher, push adapter, and orchestrator.
    ///
    /// A missing credential or an unreachable push target fails here, before
    /// any job runs: no job can make progress without them.
    pub async fn new(config_path: &Path) -> Result<Self> {
        let config = Config::load(config_path)?;

        let token = std::env::var("NOTION_TOKEN")
            .map_err(|_| EstuaryError::Config("NOTION_TOKEN is not set".into()))?;

        let cache = Arc::new(Mutex::new(FingerprintCache::load(&config.cache_file)));

        let source: Arc<dyn FeedSource> = Arc::new(HttpFeedSource::new(config.fetch_timeout())?);
        let pusher: Arc<dyn Pusher> = Arc::new(
            NotionPusher::connect(
                token,
                &config.push.notion.parent_id,
                Path::new(&config.push.notion.state_file),
            )
            .await?,
        );

        let orchestrator = Arc::new(Orchestrator::new(
            source,
            pusher,
            cache.clone(),
            config.workers,
        ));

        Ok(Self {
            config,
            cache,
            orchestrator,
        })
    }
}
