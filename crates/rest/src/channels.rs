use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use rocket_core::domain::channel::normalize_channel_name;
use rocket_core::errors::ResolutionError;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::api::ChatApi;

/// Name → channel id memo consulted before any remote lookup.
///
/// Implementations must keep at most one entry per name; the first insert wins.
#[async_trait]
pub trait ChannelIdCache: Send + Sync {
    async fn get(&self, name: &str) -> Option<String>;
    async fn insert(&self, name: &str, id: &str);
    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Never evicts. Fine for short-lived processes; long-running services that
/// must notice renamed or deleted channels should supply a bounded cache.
#[derive(Default)]
pub struct UnboundedChannelIdCache {
    entries: RwLock<HashMap<String, String>>,
}

#[async_trait]
impl ChannelIdCache for UnboundedChannelIdCache {
    async fn get(&self, name: &str) -> Option<String> {
        self.entries.read().await.get(name).cloned()
    }

    async fn insert(&self, name: &str, id: &str) {
        self.entries.write().await.entry(name.to_owned()).or_insert_with(|| id.to_owned());
    }

    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

pub struct ChannelResolver {
    api: Arc<dyn ChatApi>,
    cache: Arc<dyn ChannelIdCache>,
}

impl ChannelResolver {
    pub fn new(api: Arc<dyn ChatApi>) -> Self {
        Self::with_cache(api, Arc::new(UnboundedChannelIdCache::default()))
    }

    pub fn with_cache(api: Arc<dyn ChatApi>, cache: Arc<dyn ChannelIdCache>) -> Self {
        Self { api, cache }
    }

    /// Maps a channel name (with or without `#`) to its id, cache first.
    ///
    /// Failures are never cached: the next call for the same name goes remote again.
    pub async fn resolve(&self, name: &str) -> Result<String, ResolutionError> {
        let name = normalize_channel_name(name);
        if name.is_empty() {
            return Err(ResolutionError::EmptyName);
        }

        if let Some(id) = self.cache.get(name).await {
            debug!(event_name = "rest.channel.cache_hit", channel_name = name, channel_id = %id);
            return Ok(id);
        }

        let lookup = self.api.lookup_channel_by_name(name).await;
        let id = match lookup {
            Ok(Some(id)) if !id.trim().is_empty() => id,
            Ok(Some(_)) => {
                warn!(
                    event_name = "rest.channel.empty_id",
                    channel_name = name,
                    "lookup returned an empty channel id; not caching"
                );
                return Err(ResolutionError::EmptyIdentifier { name: name.to_owned() });
            }
            Ok(None) => {
                return Err(ResolutionError::NotFound { name: name.to_owned() });
            }
            Err(source) => {
                warn!(
                    event_name = "rest.channel.lookup_failed",
                    channel_name = name,
                    error = %source,
                    "channel lookup failed"
                );
                return Err(ResolutionError::Transport { name: name.to_owned(), source });
            }
        };

        self.cache.insert(name, &id).await;
        info!(
            event_name = "rest.channel.resolved",
            channel_name = name,
            channel_id = %id,
            "channel id resolved and cached"
        );
        Ok(id)
    }

    pub async fn cached(&self, name: &str) -> Option<String> {
        self.cache.get(normalize_channel_name(name)).await
    }

    pub async fn cache_len(&self) -> usize {
        self.cache.len().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rocket_core::errors::{ResolutionError, TransportError};

    use super::{ChannelIdCache, ChannelResolver, UnboundedChannelIdCache};
    use crate::testing::ScriptedApi;

    #[tokio::test]
    async fn second_resolve_is_served_from_cache() {
        let api = Arc::new(ScriptedApi::with_channels(&[("ops", "C-OPS")]));
        let resolver = ChannelResolver::new(api.clone());

        let first = resolver.resolve("ops").await.expect("first resolve");
        let second = resolver.resolve("ops").await.expect("second resolve");

        assert_eq!(first, "C-OPS");
        assert_eq!(second, first);
        assert_eq!(api.lookup_calls().await, vec!["ops"]);
    }

    #[tokio::test]
    async fn hash_prefix_shares_the_cache_entry() {
        let api = Arc::new(ScriptedApi::with_channels(&[("ops", "C-OPS")]));
        let resolver = ChannelResolver::new(api.clone());

        resolver.resolve("#ops").await.expect("resolve with hash");
        resolver.resolve("ops").await.expect("resolve bare");

        assert_eq!(api.lookup_calls().await, vec!["ops"]);
        assert_eq!(resolver.cached("#ops").await.as_deref(), Some("C-OPS"));
        assert_eq!(resolver.cache_len().await, 1);
    }

    #[tokio::test]
    async fn failed_lookup_is_not_cached_and_is_retried() {
        let api = Arc::new(ScriptedApi::with_channels(&[("ops", "C-OPS")]));
        api.fail_next_lookup(TransportError::Request("connection reset".to_owned())).await;
        let resolver = ChannelResolver::new(api.clone());

        let first = resolver.resolve("ops").await;
        assert!(matches!(first, Err(ResolutionError::Transport { ref name, .. }) if name == "ops"));
        assert_eq!(resolver.cache_len().await, 0);

        let second = resolver.resolve("ops").await.expect("retry goes remote");
        assert_eq!(second, "C-OPS");
        assert_eq!(api.lookup_calls().await, vec!["ops", "ops"]);
    }

    #[tokio::test]
    async fn unknown_name_is_not_cached() {
        let api = Arc::new(ScriptedApi::default());
        let resolver = ChannelResolver::new(api.clone());

        assert_eq!(
            resolver.resolve("ghost").await,
            Err(ResolutionError::NotFound { name: "ghost".to_owned() })
        );
        assert_eq!(
            resolver.resolve("ghost").await,
            Err(ResolutionError::NotFound { name: "ghost".to_owned() })
        );
        assert_eq!(api.lookup_calls().await.len(), 2);
        assert_eq!(resolver.cached("ghost").await, None);
    }

    #[tokio::test]
    async fn empty_identifier_is_rejected_and_not_cached() {
        let api = Arc::new(ScriptedApi::with_channels(&[("blank", "  ")]));
        let resolver = ChannelResolver::new(api.clone());

        assert_eq!(
            resolver.resolve("blank").await,
            Err(ResolutionError::EmptyIdentifier { name: "blank".to_owned() })
        );
        assert_eq!(resolver.cache_len().await, 0);
    }

    #[tokio::test]
    async fn empty_name_never_goes_remote() {
        let api = Arc::new(ScriptedApi::default());
        let resolver = ChannelResolver::new(api.clone());

        assert_eq!(resolver.resolve(" # ").await, Err(ResolutionError::EmptyName));
        assert_eq!(resolver.resolve("").await, Err(ResolutionError::EmptyName));
        assert!(api.lookup_calls().await.is_empty());
    }

    #[tokio::test]
    async fn resolver_instances_do_not_share_caches() {
        let api = Arc::new(ScriptedApi::with_channels(&[("ops", "C-OPS")]));
        let first = ChannelResolver::new(api.clone());
        let second = ChannelResolver::new(api.clone());

        first.resolve("ops").await.expect("first resolver");
        second.resolve("ops").await.expect("second resolver");

        assert_eq!(api.lookup_calls().await.len(), 2);
    }

    #[tokio::test]
    async fn injected_cache_short_circuits_lookup() {
        let api = Arc::new(ScriptedApi::default());
        let cache = Arc::new(UnboundedChannelIdCache::default());
        cache.insert("ops", "C-WARM").await;
        let resolver = ChannelResolver::with_cache(api.clone(), cache);

        assert_eq!(resolver.resolve("#ops").await.as_deref(), Ok("C-WARM"));
        assert!(api.lookup_calls().await.is_empty());
    }

    #[tokio::test]
    async fn unbounded_cache_keeps_first_entry_per_name() {
        let cache = UnboundedChannelIdCache::default();
        cache.insert("ops", "C-1").await;
        cache.insert("ops", "C-2").await;

        assert_eq!(cache.get("ops").await.as_deref(), Some("C-1"));
        assert_eq!(cache.len().await, 1);
    }
}
