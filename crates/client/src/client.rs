use std::sync::Arc;

use rocket_core::config::RocketConfig;
use rocket_core::domain::{
    channel::{normalize_channel_name, Channel},
    message::{Message, Page, PostedMessage},
    thread::Thread,
};
use rocket_core::errors::ClientError;
use rocket_realtime::{
    EngineOptions, EventFeed, FeedTermination, MessageStream, SubscriptionEngine,
};
use rocket_rest::{ChannelResolver, ChatApi, ThreadResolver};
use tracing::info;

use crate::traced::TracedChatApi;

/// One participant's session: REST calls, channel resolution, threaded replies
/// and realtime subscriptions sharing a single channel-id cache.
pub struct RocketClient {
    api: Arc<dyn ChatApi>,
    channels: Arc<ChannelResolver>,
    threads: ThreadResolver,
    realtime: SubscriptionEngine,
}

impl RocketClient {
    pub fn new(api: Arc<dyn ChatApi>, feed: Arc<dyn EventFeed>, options: EngineOptions) -> Self {
        let channels = Arc::new(ChannelResolver::new(api.clone()));
        let threads = ThreadResolver::new(api.clone(), channels.clone());
        let realtime = SubscriptionEngine::start(feed, options);
        Self { api, channels, threads, realtime }
    }

    /// Wires a client from loaded configuration. With `logging.debug_wire` set,
    /// every REST call and its outcome is logged at debug level.
    pub fn from_config(
        config: &RocketConfig,
        api: Arc<dyn ChatApi>,
        feed: Arc<dyn EventFeed>,
    ) -> Self {
        let api: Arc<dyn ChatApi> = if config.logging.debug_wire {
            Arc::new(TracedChatApi::new(api))
        } else {
            api
        };
        info!(
            event_name = "client.session.started",
            server = %config.server.base_url(),
            login = %config.credentials.login,
            handshake_timeout_ms = config.realtime.handshake_timeout_ms,
            "rocket client ready"
        );
        Self::new(api, feed, EngineOptions::from(&config.realtime))
    }

    pub async fn send(&self, channel: &Channel, text: &str) -> Result<PostedMessage, ClientError> {
        let name = channel.lookup_name();
        if name.is_empty() {
            return Err(ClientError::InvalidChannel("channel name is required to send".to_owned()));
        }
        Ok(self.api.post_message(name, text).await?)
    }

    /// Most recent messages first, limited to `page.count` when given.
    pub async fn history(
        &self,
        channel: &Channel,
        page: Option<Page>,
    ) -> Result<Vec<Message>, ClientError> {
        let channel_id = self.channel_id(channel).await?;
        Ok(self.api.history(&channel_id, page.map(|page| page.count)).await?)
    }

    pub async fn resolve_channel(&self, name: &str) -> Result<Channel, ClientError> {
        let id = self.channels.resolve(name).await?;
        Ok(Channel::new(id, normalize_channel_name(name)))
    }

    pub async fn reply_to_original(
        &self,
        channel_name: &str,
        original_text: &str,
        reply_text: &str,
    ) -> Result<Thread, ClientError> {
        Ok(self.threads.reply_to_original(channel_name, original_text, reply_text).await?)
    }

    pub async fn reply_in_thread(
        &self,
        channel_name: &str,
        thread_id: &str,
        reply_text: &str,
    ) -> Result<(), ClientError> {
        Ok(self.threads.reply_in_thread(channel_name, thread_id, reply_text).await?)
    }

    /// Subscribes by id, resolving the name first when only a name is known.
    pub async fn subscribe(&self, channel: &Channel) -> Result<MessageStream, ClientError> {
        let channel_id = self.channel_id(channel).await?;
        let channel = Channel::new(channel_id, channel.lookup_name());
        Ok(self.realtime.subscribe(&channel).await?)
    }

    pub async fn unsubscribe(&self, channel: &Channel) -> Result<(), ClientError> {
        let channel_id = self.channel_id(channel).await?;
        Ok(self.realtime.unsubscribe(&Channel::with_id(channel_id)).await?)
    }

    pub async fn termination(&self) -> Option<FeedTermination> {
        self.realtime.termination().await
    }

    pub async fn shutdown(&self) {
        self.realtime.shutdown().await;
    }

    pub fn channels(&self) -> &ChannelResolver {
        &self.channels
    }

    async fn channel_id(&self, channel: &Channel) -> Result<String, ClientError> {
        if !channel.id.trim().is_empty() {
            return Ok(channel.id.clone());
        }
        if channel.lookup_name().is_empty() {
            return Err(ClientError::InvalidChannel("channel has neither id nor name".to_owned()));
        }
        Ok(self.channels.resolve(&channel.name).await?)
    }
}
