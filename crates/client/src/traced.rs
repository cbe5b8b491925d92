use std::{fmt::Debug, sync::Arc};

use async_trait::async_trait;
use rocket_core::domain::{
    message::{Message, PostedMessage},
    thread::Thread,
};
use rocket_core::errors::TransportError;
use rocket_rest::ChatApi;
use tracing::debug;

/// Logs every request and its outcome at debug level before handing it back unchanged.
pub struct TracedChatApi {
    inner: Arc<dyn ChatApi>,
}

impl TracedChatApi {
    pub fn new(inner: Arc<dyn ChatApi>) -> Self {
        Self { inner }
    }
}

fn trace_outcome<T: Debug>(call: &'static str, outcome: &Result<T, TransportError>) {
    match outcome {
        Ok(response) => debug!(event_name = "rest.wire.response", call, response = ?response),
        Err(error) => debug!(event_name = "rest.wire.error", call, error = %error),
    }
}

#[async_trait]
impl ChatApi for TracedChatApi {
    async fn post_message(
        &self,
        channel_name: &str,
        text: &str,
    ) -> Result<PostedMessage, TransportError> {
        debug!(event_name = "rest.wire.request", call = "post_message", channel_name, text);
        let outcome = self.inner.post_message(channel_name, text).await;
        trace_outcome("post_message", &outcome);
        outcome
    }

    async fn history(
        &self,
        channel_id: &str,
        count: Option<u32>,
    ) -> Result<Vec<Message>, TransportError> {
        debug!(event_name = "rest.wire.request", call = "history", channel_id, count = ?count);
        let outcome = self.inner.history(channel_id, count).await;
        match &outcome {
            Ok(messages) => debug!(
                event_name = "rest.wire.response",
                call = "history",
                message_count = messages.len()
            ),
            Err(_) => trace_outcome("history", &outcome),
        }
        outcome
    }

    async fn lookup_channel_by_name(&self, name: &str) -> Result<Option<String>, TransportError> {
        debug!(
            event_name = "rest.wire.request",
            call = "lookup_channel_by_name",
            channel_name = name
        );
        let outcome = self.inner.lookup_channel_by_name(name).await;
        trace_outcome("lookup_channel_by_name", &outcome);
        outcome
    }

    async fn list_threads(&self, channel_id: &str) -> Result<Vec<Thread>, TransportError> {
        debug!(event_name = "rest.wire.request", call = "list_threads", channel_id);
        let outcome = self.inner.list_threads(channel_id).await;
        trace_outcome("list_threads", &outcome);
        outcome
    }

    async fn send_threaded_reply(
        &self,
        channel_id: &str,
        thread_id: &str,
        text: &str,
        show_in_channel: bool,
    ) -> Result<(), TransportError> {
        debug!(
            event_name = "rest.wire.request",
            call = "send_threaded_reply",
            channel_id,
            thread_id,
            text,
            show_in_channel
        );
        let outcome =
            self.inner.send_threaded_reply(channel_id, thread_id, text, show_in_channel).await;
        trace_outcome("send_threaded_reply", &outcome);
        outcome
    }
}
