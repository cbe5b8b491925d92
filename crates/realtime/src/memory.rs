use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use rocket_core::domain::message::Message;
use rocket_core::errors::TransportError;
use tokio::sync::{mpsc, Mutex, RwLock};

use crate::feed::{EventFeed, FeedError, FeedFrame};

/// In-process [`EventFeed`]. Rooms must be registered before they can be subscribed.
///
/// Every published frame is handed to the reader whether or not the room is
/// currently subscribed, the way a lagging server can still flush events for a
/// room it was just told to drop.
pub struct MemoryFeed {
    rooms: RwLock<HashSet<String>>,
    active: Mutex<HashSet<String>>,
    frames: Mutex<mpsc::UnboundedReceiver<Result<FeedFrame, FeedError>>>,
}

/// Publishing side of a [`MemoryFeed`]. The feed reports closed once every handle is dropped.
#[derive(Clone)]
pub struct FeedHandle {
    feed: Arc<MemoryFeed>,
    sender: mpsc::UnboundedSender<Result<FeedFrame, FeedError>>,
}

pub fn memory_feed<I, S>(rooms: I) -> (Arc<MemoryFeed>, FeedHandle)
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let (sender, receiver) = mpsc::unbounded_channel();
    let feed = Arc::new(MemoryFeed {
        rooms: RwLock::new(rooms.into_iter().map(Into::into).collect()),
        active: Mutex::new(HashSet::new()),
        frames: Mutex::new(receiver),
    });
    let handle = FeedHandle { feed: feed.clone(), sender };
    (feed, handle)
}

impl MemoryFeed {
    pub async fn active_rooms(&self) -> Vec<String> {
        let mut rooms: Vec<String> = self.active.lock().await.iter().cloned().collect();
        rooms.sort();
        rooms
    }
}

impl FeedHandle {
    pub async fn add_room(&self, channel_id: impl Into<String>) {
        self.feed.rooms.write().await.insert(channel_id.into());
    }

    pub fn publish(&self, frame: FeedFrame) -> Result<(), TransportError> {
        self.sender.send(Ok(frame)).map_err(|_| TransportError::Closed)
    }

    pub fn publish_message(&self, message: &Message) -> Result<(), TransportError> {
        let payload = serde_json::to_value(message)
            .map_err(|error| TransportError::Decode(error.to_string()))?;
        self.publish(FeedFrame::new(message.channel_id.clone(), payload))
    }

    /// Makes the reader observe a connection failure.
    pub fn fail(&self, error: TransportError) -> Result<(), TransportError> {
        self.sender.send(Err(FeedError::Transport(error))).map_err(|_| TransportError::Closed)
    }
}

#[async_trait]
impl EventFeed for MemoryFeed {
    async fn subscribe_room(&self, channel_id: &str) -> Result<(), FeedError> {
        if !self.rooms.read().await.contains(channel_id) {
            return Err(FeedError::Rejected {
                channel_id: channel_id.to_owned(),
                reason: "room not found".to_owned(),
            });
        }
        self.active.lock().await.insert(channel_id.to_owned());
        Ok(())
    }

    async fn unsubscribe_room(&self, channel_id: &str) -> Result<(), FeedError> {
        self.active.lock().await.remove(channel_id);
        Ok(())
    }

    async fn next_frame(&self) -> Result<Option<FeedFrame>, FeedError> {
        match self.frames.lock().await.recv().await {
            Some(Ok(frame)) => Ok(Some(frame)),
            Some(Err(error)) => Err(error),
            None => Ok(None),
        }
    }
}
