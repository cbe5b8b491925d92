use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use rocket_core::domain::{
    channel::{normalize_channel_name, Channel},
    message::{Message, PostedMessage, User},
    thread::Thread,
};
use rocket_core::errors::TransportError;
use rocket_realtime::{memory_feed, FeedHandle, MemoryFeed};
use rocket_rest::ChatApi;
use tokio::sync::Mutex;
use uuid::Uuid;

/// In-process chat server.
///
/// Implements [`ChatApi`] over in-memory rooms and publishes every stored
/// message on its [`MemoryFeed`], so sends come back on subscriptions the way
/// they would from a real server.
pub struct LoopbackServer {
    identity: User,
    state: Mutex<LoopbackState>,
    feed: FeedHandle,
}

#[derive(Default)]
struct LoopbackState {
    channels: Vec<Channel>,
    /// Oldest first, per channel id.
    messages: HashMap<String, Vec<Message>>,
    lookups: usize,
}

fn invalid_channel() -> TransportError {
    TransportError::Status { status: 400, message: "error-invalid-channel".to_owned() }
}

impl LoopbackServer {
    /// Returns the server and the feed its subscriptions read from.
    pub fn start(identity: User) -> (Arc<Self>, Arc<MemoryFeed>) {
        let (feed, handle) = memory_feed(Vec::<String>::new());
        let server =
            Arc::new(Self { identity, state: Mutex::new(LoopbackState::default()), feed: handle });
        (server, feed)
    }

    pub async fn create_channel(&self, id: &str, name: &str) -> Channel {
        let channel = Channel::new(id, normalize_channel_name(name));
        self.state.lock().await.channels.push(channel.clone());
        self.feed.add_room(id).await;
        channel
    }

    /// Number of `lookup_channel_by_name` calls served so far.
    pub async fn lookup_count(&self) -> usize {
        self.state.lock().await.lookups
    }

    /// Ends the event feed as a dropped connection would.
    pub fn disconnect(&self, error: TransportError) -> Result<(), TransportError> {
        self.feed.fail(error)
    }

    async fn store(
        &self,
        channel_id: &str,
        text: &str,
        thread_id: Option<String>,
    ) -> Result<Message, TransportError> {
        let mut state = self.state.lock().await;
        let messages = state.messages.entry(channel_id.to_owned()).or_default();
        let message = Message {
            id: Uuid::new_v4().simple().to_string(),
            channel_id: channel_id.to_owned(),
            timestamp: Utc::now(),
            text: text.to_owned(),
            user: self.identity.clone(),
            thread_id,
        };
        messages.push(message.clone());
        self.feed.publish_message(&message)?;
        Ok(message)
    }

    async fn channel_id(&self, predicate: impl Fn(&Channel) -> bool) -> Option<String> {
        let state = self.state.lock().await;
        state.channels.iter().find(|channel| predicate(channel)).map(|channel| channel.id.clone())
    }
}

#[async_trait]
impl ChatApi for LoopbackServer {
    async fn post_message(
        &self,
        channel_name: &str,
        text: &str,
    ) -> Result<PostedMessage, TransportError> {
        let name = normalize_channel_name(channel_name);
        let channel_id =
            self.channel_id(|channel| channel.name == name).await.ok_or_else(invalid_channel)?;
        let message = self.store(&channel_id, text, None).await?;
        Ok(PostedMessage { message_id: message.id, channel_id })
    }

    async fn history(
        &self,
        channel_id: &str,
        count: Option<u32>,
    ) -> Result<Vec<Message>, TransportError> {
        self.channel_id(|channel| channel.id == channel_id).await.ok_or_else(invalid_channel)?;
        let state = self.state.lock().await;
        let newest_first = state.messages.get(channel_id).into_iter().flatten().rev().cloned();
        Ok(match count {
            Some(count) => newest_first.take(count as usize).collect(),
            None => newest_first.collect(),
        })
    }

    async fn lookup_channel_by_name(&self, name: &str) -> Result<Option<String>, TransportError> {
        self.state.lock().await.lookups += 1;
        Ok(self.channel_id(|channel| channel.name == name).await)
    }

    async fn list_threads(&self, channel_id: &str) -> Result<Vec<Thread>, TransportError> {
        self.channel_id(|channel| channel.id == channel_id).await.ok_or_else(invalid_channel)?;
        let state = self.state.lock().await;
        let messages = state.messages.get(channel_id).map(Vec::as_slice).unwrap_or_default();

        let threads = messages
            .iter()
            .rev()
            .filter(|root| {
                root.thread_id.is_none()
                    && messages.iter().any(|reply| reply.thread_id.as_deref() == Some(&root.id))
            })
            .map(|root| Thread::new(root.id.clone(), root.text.clone()))
            .collect();
        Ok(threads)
    }

    async fn send_threaded_reply(
        &self,
        channel_id: &str,
        thread_id: &str,
        text: &str,
        _show_in_channel: bool,
    ) -> Result<(), TransportError> {
        self.channel_id(|channel| channel.id == channel_id).await.ok_or_else(invalid_channel)?;
        let root_exists = self
            .state
            .lock()
            .await
            .messages
            .get(channel_id)
            .is_some_and(|messages| messages.iter().any(|message| message.id == thread_id));
        if !root_exists {
            return Err(TransportError::Status {
                status: 400,
                message: "error-invalid-message".to_owned(),
            });
        }

        self.store(channel_id, text, Some(thread_id.to_owned())).await?;
        Ok(())
    }
}
