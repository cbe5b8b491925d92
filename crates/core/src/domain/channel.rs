use serde::{Deserialize, Serialize};

/// A named conversation space on the server.
///
/// `id` is assigned by the server and never changes once known. `name` is the
/// human-facing label and may be written with a leading `#`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Channel {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl Channel {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into() }
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self { id: id.into(), name: String::new() }
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Self { id: String::new(), name: name.into() }
    }

    pub fn lookup_name(&self) -> &str {
        normalize_channel_name(&self.name)
    }
}

/// Strips the display `#` and surrounding whitespace from a channel name.
pub fn normalize_channel_name(name: &str) -> &str {
    let trimmed = name.trim();
    trimmed.strip_prefix('#').unwrap_or(trimmed)
}
