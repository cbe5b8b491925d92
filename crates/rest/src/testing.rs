use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use rocket_core::domain::{
    message::{Message, PostedMessage},
    thread::Thread,
};
use rocket_core::errors::TransportError;
use tokio::sync::Mutex;

use crate::api::ChatApi;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentReply {
    pub channel_id: String,
    pub thread_id: String,
    pub text: String,
    pub show_in_channel: bool,
}

/// Scripted server: channel names map to ids, threads are listed per channel id.
#[derive(Default)]
pub struct ScriptedApi {
    state: Mutex<ScriptedState>,
}

#[derive(Default)]
struct ScriptedState {
    channels: HashMap<String, String>,
    threads: HashMap<String, Vec<Thread>>,
    lookup_failures: VecDeque<TransportError>,
    list_failure: Option<TransportError>,
    reply_failure: Option<TransportError>,
    lookup_calls: Vec<String>,
    list_calls: Vec<String>,
    replies: Vec<SentReply>,
}

impl ScriptedApi {
    pub fn with_channels(channels: &[(&str, &str)]) -> Self {
        Self {
            state: Mutex::new(ScriptedState {
                channels: channels
                    .iter()
                    .map(|(name, id)| ((*name).to_owned(), (*id).to_owned()))
                    .collect(),
                ..ScriptedState::default()
            }),
        }
    }

    pub async fn set_threads(&self, channel_id: &str, threads: Vec<Thread>) {
        self.state.lock().await.threads.insert(channel_id.to_owned(), threads);
    }

    pub async fn fail_next_lookup(&self, error: TransportError) {
        self.state.lock().await.lookup_failures.push_back(error);
    }

    pub async fn fail_thread_listing(&self, error: TransportError) {
        self.state.lock().await.list_failure = Some(error);
    }

    pub async fn fail_replies(&self, error: TransportError) {
        self.state.lock().await.reply_failure = Some(error);
    }

    pub async fn lookup_calls(&self) -> Vec<String> {
        self.state.lock().await.lookup_calls.clone()
    }

    pub async fn list_calls(&self) -> Vec<String> {
        self.state.lock().await.list_calls.clone()
    }

    pub async fn replies(&self) -> Vec<SentReply> {
        self.state.lock().await.replies.clone()
    }
}

#[async_trait]
impl ChatApi for ScriptedApi {
    async fn post_message(
        &self,
        channel_name: &str,
        _text: &str,
    ) -> Result<PostedMessage, TransportError> {
        let state = self.state.lock().await;
        let channel_id = state.channels.get(channel_name).cloned().ok_or_else(|| {
            TransportError::Status { status: 400, message: "error-invalid-channel".to_owned() }
        })?;
        Ok(PostedMessage { message_id: "posted-1".to_owned(), channel_id })
    }

    async fn history(
        &self,
        _channel_id: &str,
        _count: Option<u32>,
    ) -> Result<Vec<Message>, TransportError> {
        Ok(Vec::new())
    }

    async fn lookup_channel_by_name(&self, name: &str) -> Result<Option<String>, TransportError> {
        let mut state = self.state.lock().await;
        state.lookup_calls.push(name.to_owned());
        if let Some(error) = state.lookup_failures.pop_front() {
            return Err(error);
        }
        Ok(state.channels.get(name).cloned())
    }

    async fn list_threads(&self, channel_id: &str) -> Result<Vec<Thread>, TransportError> {
        let mut state = self.state.lock().await;
        state.list_calls.push(channel_id.to_owned());
        if let Some(error) = state.list_failure.clone() {
            return Err(error);
        }
        Ok(state.threads.get(channel_id).cloned().unwrap_or_default())
    }

    async fn send_threaded_reply(
        &self,
        channel_id: &str,
        thread_id: &str,
        text: &str,
        show_in_channel: bool,
    ) -> Result<(), TransportError> {
        let mut state = self.state.lock().await;
        if let Some(error) = state.reply_failure.clone() {
            return Err(error);
        }
        state.replies.push(SentReply {
            channel_id: channel_id.to_owned(),
            thread_id: thread_id.to_owned(),
            text: text.to_owned(),
            show_in_channel,
        });
        Ok(())
    }
}
