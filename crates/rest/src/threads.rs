use std::sync::Arc;

use rocket_core::domain::thread::{match_thread, Thread};
use rocket_core::errors::ReplyError;
use tracing::{info, warn};

use crate::api::ChatApi;
use crate::channels::ChannelResolver;

/// Finds a thread by the literal text of its root message and replies inside it.
///
/// Resolution and matching are read-only and always finish before the single
/// mutating send, so any error before the send means nothing was posted.
pub struct ThreadResolver {
    api: Arc<dyn ChatApi>,
    channels: Arc<ChannelResolver>,
}

impl ThreadResolver {
    pub fn new(api: Arc<dyn ChatApi>, channels: Arc<ChannelResolver>) -> Self {
        Self { api, channels }
    }

    pub async fn reply_to_original(
        &self,
        channel_name: &str,
        original_text: &str,
        reply_text: &str,
    ) -> Result<Thread, ReplyError> {
        let channel_id = self.channels.resolve(channel_name).await?;
        let thread = self.find_thread(&channel_id, original_text).await?;

        self.send_reply(&channel_id, &thread.id, reply_text).await?;
        Ok(thread)
    }

    /// First thread in server order whose root text equals `original_text` exactly.
    pub async fn find_thread(
        &self,
        channel_id: &str,
        original_text: &str,
    ) -> Result<Thread, ReplyError> {
        let threads = self.api.list_threads(channel_id).await?;

        match match_thread(&threads, original_text) {
            Some(thread) => Ok(thread.clone()),
            None => {
                warn!(
                    event_name = "rest.thread.not_found",
                    channel_id,
                    threads_scanned = threads.len(),
                    "no thread root matched the original text"
                );
                Err(ReplyError::ThreadNotFound {
                    channel_id: channel_id.to_owned(),
                    original_text: original_text.to_owned(),
                })
            }
        }
    }

    /// Replies to a thread whose id is already known.
    pub async fn reply_in_thread(
        &self,
        channel_name: &str,
        thread_id: &str,
        reply_text: &str,
    ) -> Result<(), ReplyError> {
        let channel_id = self.channels.resolve(channel_name).await?;
        self.send_reply(&channel_id, thread_id, reply_text).await
    }

    async fn send_reply(
        &self,
        channel_id: &str,
        thread_id: &str,
        reply_text: &str,
    ) -> Result<(), ReplyError> {
        self.api.send_threaded_reply(channel_id, thread_id, reply_text, true).await?;
        info!(event_name = "rest.thread.replied", channel_id, thread_id, "threaded reply sent");
        Ok(())
    }
}
