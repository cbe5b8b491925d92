//! Channel resolution and threaded replies over the chat server's REST surface.
//!
//! - **Api** (`api`) - the `ChatApi` request/response contract
//! - **Channels** (`channels`) - name → id resolution with an owned cache
//! - **Threads** (`threads`) - locate a thread by its root text and reply inside it

pub mod api;
pub mod channels;
pub mod threads;

#[cfg(test)]
mod testing;

pub use api::ChatApi;
pub use channels::{ChannelIdCache, ChannelResolver, UnboundedChannelIdCache};
pub use threads::ThreadResolver;
