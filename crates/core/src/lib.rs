//! Shared model for the Rocket chat client workspace.
//!
//! - **Domain** (`domain`) - channels, messages, threads as the server reports them
//! - **Errors** (`errors`) - resolution, subscription, reply and transport failures
//! - **Config** (`config`) - layered `rocket.toml` / `ROCKET_*` configuration
//! - **Logging** (`logging`) - tracing subscriber bootstrap

pub mod config;
pub mod domain;
pub mod errors;
pub mod logging;

pub use domain::channel::{normalize_channel_name, Channel};
pub use domain::message::{Message, Page, PostedMessage, User};
pub use domain::thread::{match_thread, Thread};
pub use errors::{ClientError, ReplyError, ResolutionError, SubscriptionError, TransportError};
