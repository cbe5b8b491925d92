//! Chat participant client for a Rocket-style server.
//!
//! - **Client** (`client`) - `RocketClient`, one session over REST and the realtime feed
//! - **Loopback** (`loopback`) - in-process server for demos and offline tests
//! - **Traced** (`traced`) - debug-level request logging around any `ChatApi`

pub mod client;
pub mod loopback;
pub mod traced;

pub use client::RocketClient;
pub use loopback::LoopbackServer;
pub use traced::TracedChatApi;
