use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub username: String,
}

/// A message as produced by the server. Read-only on the client side.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "rid")]
    pub channel_id: String,
    #[serde(rename = "ts", with = "server_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "msg", default)]
    pub text: String,
    #[serde(rename = "u")]
    pub user: User,
    #[serde(rename = "tmid", default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
}

impl Message {
    pub fn is_thread_reply(&self) -> bool {
        self.thread_id.is_some()
    }
}

/// Result of posting a message to a channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostedMessage {
    pub message_id: String,
    pub channel_id: String,
}

/// Optional history window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    pub count: u32,
}

impl Page {
    pub fn new(count: u32) -> Self {
        Self { count }
    }
}

/// `ts` arrives as RFC 3339 text from REST and as `{"$date": millis}` on the event feed.
mod server_timestamp {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Wire {
        Text(DateTime<Utc>),
        Extended {
            #[serde(rename = "$date")]
            millis: i64,
        },
    }

    #[derive(Serialize)]
    struct Extended {
        #[serde(rename = "$date")]
        millis: i64,
    }

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        Extended { millis: value.timestamp_millis() }.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Wire::deserialize(deserializer)? {
            Wire::Text(value) => Ok(value),
            Wire::Extended { millis } => Utc.timestamp_millis_opt(millis).single().ok_or_else(
                || serde::de::Error::custom(format!("timestamp out of range: {millis}")),
            ),
        }
    }
}
