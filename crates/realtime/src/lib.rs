//! Realtime subscriptions over one shared event feed.
//!
//! - **Feed** (`feed`) - the `EventFeed` connection contract and raw frames
//! - **Engine** (`engine`) - demultiplexes frames into per-channel `MessageStream`s
//! - **Memory** (`memory`) - in-process feed for offline use and tests
//!
//! # Architecture
//!
//! ```text
//! EventFeed ──frames──▶ reader task ──▶ dispatch table ──▶ MessageStream (per channel)
//!                                            ▲
//!                         subscribe / unsubscribe
//! ```

pub mod engine;
pub mod feed;
pub mod memory;

pub use engine::{EngineOptions, FeedTermination, MessageStream, SubscriptionEngine};
pub use feed::{EventFeed, FeedError, FeedFrame, NoopEventFeed};
pub use memory::{memory_feed, FeedHandle, MemoryFeed};
