use std::sync::Arc;
use std::time::Duration;

use crate::{
    config::Config,
    services::{
        build_http_client,
        catalog::{BiblioCommonsAvailability, BiblioCommonsSearch},
        summary::SummaryPolicy,
        AnthropicRanker, GoodreadsShelf, LibraryChecker, Ranker, RecommendationService,
        RANKER_TIMEOUT_SECS,
    },
    store::{create_redis_client, FileStore, KeyValueStore, MemoryStore, RedisStore, StoreWriterHandle},
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub checker: Arc<LibraryChecker>,
    pub recommender: Arc<RecommendationService>,
    /// Short-lived recommendation cache
    pub cache: Arc<dyn KeyValueStore>,
    /// Durable home of the saved book list
    pub saved_lists: Arc<dyn KeyValueStore>,
}

impl AppState {
    pub fn new(
        config: Config,
        checker: LibraryChecker,
        recommender: RecommendationService,
        cache: Arc<dyn KeyValueStore>,
        saved_lists: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            checker: Arc::new(checker),
            recommender: Arc::new(recommender),
            cache,
            saved_lists,
        }
    }

    /// Wires the live catalog, Goodreads and ranking clients from configuration
    ///
    /// Returns the Redis writer handle when a Redis cache is configured, so the
    /// caller can flush it on shutdown. Must be called inside a tokio runtime.
    pub fn from_config(config: Config) -> anyhow::Result<(Self, Option<StoreWriterHandle>)> {
        let http_client = build_http_client(config.request_timeout_secs)?;

        let checker = LibraryChecker::new(
            Arc::new(BiblioCommonsSearch::new(
                http_client.clone(),
                config.catalog_search_url.clone(),
                config.catalog_origin.clone(),
            )),
            Arc::new(BiblioCommonsAvailability::new(
                http_client.clone(),
                config.availability_api_url.clone(),
            )),
            SummaryPolicy::new(config.preferred_branch.clone(), config.library_name.clone()),
            Duration::from_millis(config.batch_delay_ms),
        );

        let ranker: Option<Arc<dyn Ranker>> = match config.usable_anthropic_key() {
            Some(key) => Some(Arc::new(AnthropicRanker::new(
                build_http_client(RANKER_TIMEOUT_SECS)?,
                key.to_string(),
                config.anthropic_api_url.clone(),
                config.anthropic_model.clone(),
            ))),
            None => {
                tracing::warn!("No Anthropic API key configured, recommendations keep shelf order");
                None
            }
        };

        let recommender = RecommendationService::new(
            Arc::new(GoodreadsShelf::new(http_client, config.goodreads_user_id.clone())),
            ranker,
            config.goodreads_pages,
        );

        let (cache, writer): (Arc<dyn KeyValueStore>, Option<StoreWriterHandle>) =
            match &config.redis_url {
                Some(url) => {
                    let (store, handle) = RedisStore::new(create_redis_client(url)?);
                    tracing::info!("Using Redis recommendation cache");
                    (Arc::new(store), Some(handle))
                }
                None => {
                    tracing::info!("Using in-memory recommendation cache");
                    (Arc::new(MemoryStore::new()), None)
                }
            };

        let saved_lists = Arc::new(FileStore::new(config.saved_list_dir.clone()));

        let state = Self::new(config, checker, recommender, cache, saved_lists);
        Ok((state, writer))
    }
}
