//! Identity types for COURIER entities

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Message identifier: the hyphenated string form of a UUIDv7.
/// UUIDv7 embeds a Unix timestamp, so ids sort roughly by creation time.
pub type MessageId = String;

/// Agent identifier chosen by the registering agent.
pub type AgentId = String;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Time-to-live in whole seconds.
pub type TtlSeconds = u64;

/// Reserved recipient meaning "visible to every agent".
pub const BROADCAST_RECIPIENT: &str = "broadcast";

/// Generate a new message id (UUIDv7, never reused).
pub fn new_message_id() -> MessageId {
    Uuid::now_v7().to_string()
}

/// Check whether a recipient id is the broadcast marker.
pub fn is_broadcast(recipient_id: &str) -> bool {
    recipient_id == BROADCAST_RECIPIENT
}
