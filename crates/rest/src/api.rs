use async_trait::async_trait;
use rocket_core::domain::{
    message::{Message, PostedMessage},
    thread::Thread,
};
use rocket_core::errors::TransportError;

/// Request/response calls against the chat server.
///
/// Implementations own the HTTP encoding and attach session headers to every call.
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn post_message(
        &self,
        channel_name: &str,
        text: &str,
    ) -> Result<PostedMessage, TransportError>;

    async fn history(
        &self,
        channel_id: &str,
        count: Option<u32>,
    ) -> Result<Vec<Message>, TransportError>;

    /// `Ok(None)` when the server has no channel with that name.
    async fn lookup_channel_by_name(&self, name: &str) -> Result<Option<String>, TransportError>;

    async fn list_threads(&self, channel_id: &str) -> Result<Vec<Thread>, TransportError>;

    async fn send_threaded_reply(
        &self,
        channel_id: &str,
        thread_id: &str,
        text: &str,
        show_in_channel: bool,
    ) -> Result<(), TransportError>;
}
