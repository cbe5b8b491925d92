use std::{collections::HashMap, sync::Arc, time::Duration};

use rocket_core::{
    config::RealtimeConfig,
    domain::{channel::Channel, message::Message},
    errors::SubscriptionError,
};
use tokio::{
    sync::{mpsc, Mutex},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::feed::{EventFeed, FeedError, FeedFrame};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineOptions {
    pub handshake_timeout_ms: u64,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self { handshake_timeout_ms: 10_000 }
    }
}

impl From<&RealtimeConfig> for EngineOptions {
    fn from(config: &RealtimeConfig) -> Self {
        Self { handshake_timeout_ms: config.handshake_timeout_ms }
    }
}

impl EngineOptions {
    fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }
}

/// Why the feed reader stopped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FeedTermination {
    Closed,
    Failed(FeedError),
    Shutdown,
}

/// Caller-owned handle to one channel's messages, in arrival order.
///
/// Yields `None` once the channel is unsubscribed or the feed stops, after
/// anything already queued has been drained.
#[derive(Debug)]
pub struct MessageStream {
    channel_id: String,
    receiver: mpsc::UnboundedReceiver<Message>,
}

impl MessageStream {
    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub async fn recv(&mut self) -> Option<Message> {
        self.receiver.recv().await
    }

    /// Returns a queued message without waiting.
    pub fn try_recv(&mut self) -> Option<Message> {
        self.receiver.try_recv().ok()
    }
}

#[derive(Default)]
struct DispatchTable {
    routes: HashMap<String, mpsc::UnboundedSender<Message>>,
    terminated: Option<FeedTermination>,
}

impl DispatchTable {
    /// Fails when the feed has ended or a live stream already owns the channel.
    /// A route whose stream handle was dropped is discarded here.
    fn check_open(&mut self, channel_id: &str) -> Result<(), SubscriptionError> {
        if self.terminated.is_some() {
            return Err(SubscriptionError::FeedClosed);
        }
        match self.routes.get(channel_id) {
            Some(sender) if sender.is_closed() => {
                self.routes.remove(channel_id);
                debug!(
                    event_name = "realtime.subscribe.stale_route",
                    channel_id, "previous stream handle was dropped; route replaced"
                );
                Ok(())
            }
            Some(_) => {
                Err(SubscriptionError::AlreadySubscribed { channel_id: channel_id.to_owned() })
            }
            None => Ok(()),
        }
    }
}

/// A room that has been (or is being) joined on the feed without a registered
/// route yet. Unless disarmed, dropping it leaves the room in the background.
struct PendingRoom {
    feed: Arc<dyn EventFeed>,
    channel_id: String,
    armed: bool,
}

impl PendingRoom {
    fn new(feed: Arc<dyn EventFeed>, channel_id: &str) -> Self {
        Self { feed, channel_id: channel_id.to_owned(), armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }

    async fn release(mut self) {
        self.armed = false;
        leave_room(self.feed.as_ref(), &self.channel_id).await;
    }
}

impl Drop for PendingRoom {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let feed = self.feed.clone();
        let channel_id = std::mem::take(&mut self.channel_id);
        debug!(
            event_name = "realtime.subscribe.cancelled",
            channel_id = %channel_id,
            "subscribe abandoned mid-handshake; leaving room"
        );
        runtime.spawn(async move { leave_room(feed.as_ref(), &channel_id).await });
    }
}

async fn leave_room(feed: &dyn EventFeed, channel_id: &str) {
    if let Err(error) = feed.unsubscribe_room(channel_id).await {
        debug!(
            event_name = "realtime.subscribe.cleanup_failed",
            channel_id,
            error = %error,
            "leaving room after a failed subscribe did not succeed"
        );
    }
}

/// Demultiplexes one shared event feed into per-channel [`MessageStream`]s.
///
/// Must be started inside a tokio runtime; the reader runs as a spawned task
/// until the feed closes, fails, or the engine is shut down or dropped.
pub struct SubscriptionEngine {
    feed: Arc<dyn EventFeed>,
    table: Arc<Mutex<DispatchTable>>,
    options: EngineOptions,
    reader: JoinHandle<()>,
}

impl SubscriptionEngine {
    pub fn start(feed: Arc<dyn EventFeed>, options: EngineOptions) -> Self {
        let table = Arc::new(Mutex::new(DispatchTable::default()));
        let reader = tokio::spawn(pump(feed.clone(), table.clone()));
        info!(
            event_name = "realtime.engine.started",
            handshake_timeout_ms = options.handshake_timeout_ms,
            "subscription engine reader started"
        );

        Self { feed, table, options, reader }
    }

    pub async fn subscribe(&self, channel: &Channel) -> Result<MessageStream, SubscriptionError> {
        let channel_id = channel.id.trim();
        if channel_id.is_empty() {
            return Err(SubscriptionError::EmptyChannelId);
        }

        self.table.lock().await.check_open(channel_id)?;

        let mut pending = PendingRoom::new(self.feed.clone(), channel_id);
        let handshake = self.feed.subscribe_room(channel_id);
        match tokio::time::timeout(self.options.handshake_timeout(), handshake).await {
            Ok(Ok(())) => {}
            Ok(Err(error)) => {
                pending.disarm();
                warn!(
                    event_name = "realtime.subscribe.rejected",
                    channel_id,
                    error = %error,
                    "room handshake failed; no stream registered"
                );
                return Err(error.into());
            }
            Err(_) => {
                warn!(
                    event_name = "realtime.subscribe.timeout",
                    channel_id,
                    timeout_ms = self.options.handshake_timeout_ms,
                    "room handshake timed out; no stream registered"
                );
                pending.release().await;
                return Err(SubscriptionError::HandshakeTimeout {
                    channel_id: channel_id.to_owned(),
                    timeout_ms: self.options.handshake_timeout_ms,
                });
            }
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        let mut table = self.table.lock().await;
        match table.check_open(channel_id) {
            Ok(()) => {}
            // A concurrent subscribe won the race and still needs the room.
            Err(error @ SubscriptionError::AlreadySubscribed { .. }) => {
                pending.disarm();
                return Err(error);
            }
            Err(error) => {
                drop(table);
                pending.release().await;
                return Err(error);
            }
        }
        table.routes.insert(channel_id.to_owned(), sender);
        pending.disarm();
        drop(table);

        info!(event_name = "realtime.subscribe.accepted", channel_id, "channel stream registered");
        Ok(MessageStream { channel_id: channel_id.to_owned(), receiver })
    }

    /// Removes the channel's route. Nothing is delivered for it once this returns,
    /// even if the feed call that follows fails.
    pub async fn unsubscribe(&self, channel: &Channel) -> Result<(), SubscriptionError> {
        let channel_id = channel.id.trim();
        let removed = self.table.lock().await.routes.remove(channel_id);
        if removed.is_none() {
            debug!(
                event_name = "realtime.unsubscribe.noop",
                channel_id, "channel had no registered stream"
            );
            return Ok(());
        }
        drop(removed);

        info!(event_name = "realtime.unsubscribe.removed", channel_id, "channel stream removed");
        self.feed.unsubscribe_room(channel_id).await.map_err(SubscriptionError::from)
    }

    pub async fn is_subscribed(&self, channel_id: &str) -> bool {
        self.table.lock().await.routes.contains_key(channel_id)
    }

    pub async fn subscription_count(&self) -> usize {
        self.table.lock().await.routes.len()
    }

    /// `None` while the reader is running.
    pub async fn termination(&self) -> Option<FeedTermination> {
        self.table.lock().await.terminated.clone()
    }

    /// Stops the reader and ends every open stream.
    pub async fn shutdown(&self) {
        self.reader.abort();
        terminate(&self.table, FeedTermination::Shutdown).await;
    }
}

impl Drop for SubscriptionEngine {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

async fn pump(feed: Arc<dyn EventFeed>, table: Arc<Mutex<DispatchTable>>) {
    let termination = loop {
        match feed.next_frame().await {
            Ok(Some(frame)) => route_frame(&table, frame).await,
            Ok(None) => {
                info!(event_name = "realtime.feed.closed", "event feed closed; ending all streams");
                break FeedTermination::Closed;
            }
            Err(error) => {
                warn!(
                    event_name = "realtime.feed.failed",
                    error = %error,
                    "event feed failed; ending all streams"
                );
                break FeedTermination::Failed(error);
            }
        }
    };

    terminate(&table, termination).await;
}

async fn terminate(table: &Mutex<DispatchTable>, termination: FeedTermination) {
    let mut table = table.lock().await;
    if table.terminated.is_none() {
        table.terminated = Some(termination);
    }
    table.routes.clear();
}

async fn route_frame(table: &Mutex<DispatchTable>, frame: FeedFrame) {
    let FeedFrame { channel_id, payload } = frame;
    let message = match serde_json::from_value::<Message>(payload) {
        Ok(message) => message,
        Err(error) => {
            warn!(
                event_name = "realtime.frame.undecodable",
                channel_id = %channel_id,
                error = %error,
                "dropping frame with undecodable message payload"
            );
            return;
        }
    };

    if message.channel_id != channel_id {
        warn!(
            event_name = "realtime.frame.channel_mismatch",
            channel_id = %channel_id,
            message_channel_id = %message.channel_id,
            message_id = %message.id,
            "dropping frame whose message belongs to another channel"
        );
        return;
    }

    let mut table = table.lock().await;
    let Some(sender) = table.routes.get(&channel_id) else {
        debug!(
            event_name = "realtime.frame.unrouted",
            channel_id = %channel_id,
            message_id = %message.id,
            "no stream registered for channel; frame dropped"
        );
        return;
    };

    let message_id = message.id.clone();
    if sender.send(message).is_err() {
        table.routes.remove(&channel_id);
        debug!(
            event_name = "realtime.frame.receiver_dropped",
            channel_id = %channel_id,
            message_id = %message_id,
            "stream handle was dropped; route pruned"
        );
    }
}
