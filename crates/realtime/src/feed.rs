use async_trait::async_trait;
use rocket_core::errors::{SubscriptionError, TransportError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One raw message-added event from the shared feed.
///
/// `channel_id` is the room key the server attached to the event; `payload`
/// is the message body still in server form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeedFrame {
    pub channel_id: String,
    pub payload: serde_json::Value,
}

impl FeedFrame {
    pub fn new(channel_id: impl Into<String>, payload: serde_json::Value) -> Self {
        Self { channel_id: channel_id.into(), payload }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FeedError {
    #[error("server rejected room `{channel_id}`: {reason}")]
    Rejected { channel_id: String, reason: String },
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl From<FeedError> for SubscriptionError {
    fn from(value: FeedError) -> Self {
        match value {
            FeedError::Rejected { channel_id, reason } => {
                Self::UnknownChannel { channel_id, reason }
            }
            FeedError::Transport(error) => Self::Transport(error),
        }
    }
}

/// The persistent event connection. Connection setup and teardown belong to the implementor.
#[async_trait]
pub trait EventFeed: Send + Sync {
    /// Room handshake. Must fail with [`FeedError::Rejected`] for unknown or unreadable rooms.
    async fn subscribe_room(&self, channel_id: &str) -> Result<(), FeedError>;
    async fn unsubscribe_room(&self, channel_id: &str) -> Result<(), FeedError>;
    /// Next frame from the connection; `Ok(None)` once the connection has closed.
    async fn next_frame(&self) -> Result<Option<FeedFrame>, FeedError>;
}

#[derive(Default)]
pub struct NoopEventFeed;

#[async_trait]
impl EventFeed for NoopEventFeed {
    async fn subscribe_room(&self, channel_id: &str) -> Result<(), FeedError> {
        Err(FeedError::Rejected {
            channel_id: channel_id.to_owned(),
            reason: "no event feed configured".to_owned(),
        })
    }

    async fn unsubscribe_room(&self, _channel_id: &str) -> Result<(), FeedError> {
        Ok(())
    }

    async fn next_frame(&self) -> Result<Option<FeedFrame>, FeedError> {
        Ok(None)
    }
}
