//! COURIER Core - Message and Agent Types
//!
//! Data model shared by every other crate: message and agent types, the
//! closed enums they use, errors, and broker configuration. No storage or
//! locking lives here.

mod agent;
mod config;
mod enums;
mod error;
mod identity;
mod message;

pub use agent::AgentInfo;
pub use config::{
    BrokerConfig, DEFAULT_MAX_RETRIES, DEFAULT_SWEEP_INTERVAL_SECS, MAX_RETRIES_LIMIT,
};
pub use enums::{
    AgentStatus, Capability, CapabilityParseError, LifecycleKind, MessageCategory,
    MessagePriority, MessageStatus, MessageType, MessageTypeParseError, PriorityParseError,
    StatusParseError, SystemKind, TaskKind, WorkflowKind,
};
pub use error::{
    AgentError, ConfigError, CourierError, CourierResult, EntityType, StorageError,
    ValidationError,
};
pub use identity::{
    is_broadcast, new_message_id, AgentId, MessageId, Timestamp, TtlSeconds, BROADCAST_RECIPIENT,
};
pub use message::{Message, MessageDraft, Payload, Receipt, ONBOARDING_FLAG_KEY};
