//! Event and wire record types, plus the pure transformation between them.

use chrono::{DateTime, SecondsFormat};
use serde::{Deserialize, Serialize};

/// A raw post event as delivered by the stream provider.
///
/// Owned transiently by the per-event callback; not retained after
/// transformation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PostEvent {
    /// Provider-assigned post id
    pub id: i64,

    /// Provider-assigned author id
    pub author_id: i64,

    /// Post body; absent in some provider payloads
    #[serde(default)]
    pub text: String,

    /// Creation time as seconds since the Unix epoch
    pub created_at: i64,
}

/// The wire record published to Kafka.
///
/// `author_id` doubles as the partition key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    /// Post id
    pub id: i64,

    /// Author id, also the partition key
    pub author_id: i64,

    /// Post body
    pub text: String,

    /// Creation time as an ISO-8601 UTC timestamp
    pub created_at: String,
}

/// Map a raw event to its wire record.
///
/// Pure: no I/O, no input mutation, total over any deserializable event. A
/// creation time outside chrono's representable range falls back to the
/// Unix epoch rather than failing the record.
pub fn to_post_record(event: &PostEvent) -> PostRecord {
    let created_at = DateTime::from_timestamp(event.created_at, 0)
        .unwrap_or(DateTime::UNIX_EPOCH)
        .to_rfc3339_opts(SecondsFormat::Secs, true);

    PostRecord {
        id: event.id,
        author_id: event.author_id,
        text: event.text.clone(),
        created_at,
    }
}
