use serde::{Deserialize, Serialize};

/// A sub-conversation rooted at one message; `id` is the root message id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "msg", default)]
    pub root_text: String,
}

impl Thread {
    pub fn new(id: impl Into<String>, root_text: impl Into<String>) -> Self {
        Self { id: id.into(), root_text: root_text.into() }
    }
}

/// Returns the first thread, in server order, whose root text is exactly `original_text`.
pub fn match_thread<'a>(threads: &'a [Thread], original_text: &str) -> Option<&'a Thread> {
    threads.iter().find(|thread| thread.root_text == original_text)
}
