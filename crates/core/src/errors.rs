use thiserror::Error;

/// Failure reported by a collaborator call (REST or event feed), passed through unchanged.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("server responded with status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("response decoding failed: {0}")]
    Decode(String),
    #[error("connection closed")]
    Closed,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("channel name is empty")]
    EmptyName,
    #[error("channel `{name}` was not found")]
    NotFound { name: String },
    #[error("lookup for channel `{name}` returned an empty identifier")]
    EmptyIdentifier { name: String },
    #[error("lookup for channel `{name}` failed: {source}")]
    Transport {
        name: String,
        #[source]
        source: TransportError,
    },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SubscriptionError {
    #[error("channel id is empty")]
    EmptyChannelId,
    #[error("channel `{channel_id}` is unknown or not readable: {reason}")]
    UnknownChannel { channel_id: String, reason: String },
    #[error("channel `{channel_id}` already has an active subscription")]
    AlreadySubscribed { channel_id: String },
    #[error("subscription handshake for `{channel_id}` timed out after {timeout_ms}ms")]
    HandshakeTimeout { channel_id: String, timeout_ms: u64 },
    #[error("event feed is closed")]
    FeedClosed,
    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ReplyError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error("original message not found in any thread of channel `{channel_id}`")]
    ThreadNotFound { channel_id: String, original_text: String },
    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ClientError {
    #[error("invalid channel: {0}")]
    InvalidChannel(String),
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error(transparent)]
    Subscription(#[from] SubscriptionError),
    #[error(transparent)]
    Reply(#[from] ReplyError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ClientError {
    /// True when the failure came from the network path and the same call may succeed later.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_)
            | Self::Resolution(ResolutionError::Transport { .. })
            | Self::Subscription(SubscriptionError::Transport(_))
            | Self::Subscription(SubscriptionError::HandshakeTimeout { .. })
            | Self::Reply(ReplyError::Transport(_))
            | Self::Reply(ReplyError::Resolution(ResolutionError::Transport { .. })) => true,
            Self::InvalidChannel(_)
            | Self::Resolution(_)
            | Self::Subscription(_)
            | Self::Reply(_) => false,
        }
    }
}
