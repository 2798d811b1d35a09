//! Message model
//!
//! A [`Message`] has an immutable identity (id, type, addressing, content)
//! and a small set of lifecycle fields that only the broker's lifecycle
//! operations mutate. Messages are built through [`MessageDraft`], which
//! validates addressing and assigns the id and creation time.

use crate::{
    is_broadcast, new_message_id, AgentId, CourierResult, EntityType, MessageId, MessagePriority,
    MessageStatus, MessageType, StorageError, Timestamp, TtlSeconds, ValidationError,
    DEFAULT_MAX_RETRIES,
};
use chrono::{Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Opaque key/value payload carried by a message.
pub type Payload = Map<String, Value>;

/// Key added to the canonical form; derived from the message type.
pub const ONBOARDING_FLAG_KEY: &str = "is_onboarding_message";

// ============================================================================
// MESSAGE
// ============================================================================

/// A message between agents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Message {
    /// Unique identifier, assigned once at creation
    pub id: MessageId,
    /// Type of message
    #[cfg_attr(feature = "openapi", schema(value_type = String))]
    pub message_type: MessageType,
    /// Priority 1..=5, higher is more urgent
    #[cfg_attr(feature = "openapi", schema(value_type = u8))]
    pub priority: MessagePriority,

    /// Agent sending the message
    pub sender_id: AgentId,
    /// Receiving agent, or the broadcast marker
    pub recipient_id: AgentId,

    pub subject: String,
    pub content: String,
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub payload: Payload,

    /// Current lifecycle status
    pub status: MessageStatus,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date-time"))]
    pub delivered_at: Option<Timestamp>,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date-time"))]
    pub acknowledged_at: Option<Timestamp>,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date-time"))]
    pub read_at: Option<Timestamp>,

    /// Seconds after `created_at` at which the message expires
    pub ttl: Option<TtlSeconds>,
    pub retry_count: u32,
    pub max_retries: u32,

    /// Tie-breaker among messages of equal priority
    pub sequence_number: Option<i64>,
    #[cfg_attr(feature = "openapi", schema(value_type = Vec<String>))]
    pub dependencies: BTreeSet<MessageId>,
    #[cfg_attr(feature = "openapi", schema(value_type = Vec<String>))]
    pub tags: BTreeSet<String>,

    pub workflow_id: Option<String>,
    pub task_id: Option<String>,
    pub phase_number: Option<u32>,

    pub requires_acknowledgment: bool,
}

impl Message {
    /// Whether the recipient is the broadcast marker.
    pub fn is_broadcast(&self) -> bool {
        is_broadcast(&self.recipient_id)
    }

    /// Whether `agent_id` is an eligible recipient (exact match or broadcast).
    pub fn is_addressed_to(&self, agent_id: &str) -> bool {
        self.is_broadcast() || self.recipient_id == agent_id
    }

    /// Whether the message type is part of agent onboarding.
    pub fn is_onboarding_message(&self) -> bool {
        self.message_type.is_onboarding()
    }

    /// Instant at which the TTL elapses, if a TTL is set.
    pub fn expires_at(&self) -> Option<Timestamp> {
        self.ttl.map(|secs| {
            i64::try_from(secs)
                .ok()
                .and_then(ChronoDuration::try_seconds)
                .and_then(|ttl| self.created_at.checked_add_signed(ttl))
                .unwrap_or(chrono::DateTime::<Utc>::MAX_UTC)
        })
    }

    /// TTL is set and `now - created_at >= ttl`. Pure.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at().is_some_and(|deadline| now >= deadline)
    }

    /// False once expired or once the retry budget is spent.
    pub fn can_retry(&self, now: Timestamp) -> bool {
        !self.is_expired(now) && self.retry_count < self.max_retries
    }

    /// Count one retry. Reaching `max_retries` moves the message to Failed.
    ///
    /// Returns false (and changes nothing) when the budget is already spent
    /// or the message is terminal, so `retry_count <= max_retries` always holds.
    pub fn increment_retry(&mut self) -> bool {
        if self.retry_count >= self.max_retries || self.status.is_terminal() {
            return false;
        }
        self.retry_count += 1;
        if self.retry_count >= self.max_retries {
            self.status = MessageStatus::Failed;
        }
        true
    }

    /// Lifecycle fields as a receipt.
    pub fn receipt(&self) -> Receipt {
        Receipt {
            status: self.status,
            delivered_at: self.delivered_at,
            acknowledged_at: self.acknowledged_at,
            read_at: self.read_at,
        }
    }

    /// Overwrite lifecycle fields from a receipt.
    pub fn apply_receipt(&mut self, receipt: &Receipt) {
        self.status = receipt.status;
        self.delivered_at = receipt.delivered_at;
        self.acknowledged_at = receipt.acknowledged_at;
        self.read_at = receipt.read_at;
    }

    // ------------------------------------------------------------------------
    // Canonical serialization
    // ------------------------------------------------------------------------

    /// Canonical map form used by every external collaborator.
    pub fn to_canonical(&self) -> CourierResult<Map<String, Value>> {
        let value = serde_json::to_value(self).map_err(|e| StorageError::Serialization {
            entity_type: EntityType::Message,
            reason: e.to_string(),
        })?;
        match value {
            Value::Object(mut map) => {
                map.insert(
                    ONBOARDING_FLAG_KEY.to_string(),
                    Value::Bool(self.is_onboarding_message()),
                );
                Ok(map)
            }
            other => Err(StorageError::Serialization {
                entity_type: EntityType::Message,
                reason: format!("expected an object, got {}", other),
            }
            .into()),
        }
    }

    /// Rebuild a message from its canonical map. The derived onboarding flag
    /// is ignored.
    pub fn from_canonical(mut map: Map<String, Value>) -> CourierResult<Self> {
        map.remove(ONBOARDING_FLAG_KEY);
        let message: Message =
            serde_json::from_value(Value::Object(map)).map_err(|e| StorageError::Serialization {
                entity_type: EntityType::Message,
                reason: e.to_string(),
            })?;
        if message.retry_count > message.max_retries {
            return Err(ValidationError::InvalidValue {
                field: "retry_count".to_string(),
                reason: format!(
                    "retry_count {} exceeds max_retries {}",
                    message.retry_count, message.max_retries
                ),
            }
            .into());
        }
        Ok(message)
    }
}

// ============================================================================
// RECEIPT
// ============================================================================

/// Lifecycle state of a message as seen by one recipient.
///
/// Direct messages keep this state on the message itself; broadcast
/// messages keep one receipt per acknowledging agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Receipt {
    pub status: MessageStatus,
    pub delivered_at: Option<Timestamp>,
    pub acknowledged_at: Option<Timestamp>,
    pub read_at: Option<Timestamp>,
}

impl Receipt {
    /// Fresh receipt in Pending state.
    pub fn pending() -> Self {
        Self::default()
    }
}

// ============================================================================
// MESSAGE DRAFT
// ============================================================================

/// Unvalidated send parameters. Call [`build`](MessageDraft::build) to
/// validate and assign identity.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageDraft {
    pub sender_id: AgentId,
    pub recipient_id: AgentId,
    pub message_type: MessageType,
    pub subject: String,
    pub content: String,
    /// `None` takes the broker default.
    pub priority: Option<MessagePriority>,
    pub payload: Payload,
    pub requires_acknowledgment: bool,
    pub ttl: Option<TtlSeconds>,
    /// `None` takes the broker default.
    pub max_retries: Option<u32>,
    pub dependencies: BTreeSet<MessageId>,
    pub tags: BTreeSet<String>,
    pub workflow_id: Option<String>,
    pub task_id: Option<String>,
    pub phase_number: Option<u32>,
    pub sequence_number: Option<i64>,
}

impl MessageDraft {
    /// Start a draft with the mandatory addressing and type.
    pub fn new(
        sender_id: impl Into<AgentId>,
        recipient_id: impl Into<AgentId>,
        message_type: MessageType,
    ) -> Self {
        Self {
            sender_id: sender_id.into(),
            recipient_id: recipient_id.into(),
            message_type,
            subject: String::new(),
            content: String::new(),
            priority: None,
            payload: Payload::new(),
            requires_acknowledgment: false,
            ttl: None,
            max_retries: None,
            dependencies: BTreeSet::new(),
            tags: BTreeSet::new(),
            workflow_id: None,
            task_id: None,
            phase_number: None,
            sequence_number: None,
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_priority(mut self, priority: MessagePriority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    /// Insert one payload entry.
    pub fn with_payload_entry(mut self, key: impl Into<String>, value: Value) -> Self {
        self.payload.insert(key.into(), value);
        self
    }

    pub fn requiring_ack(mut self, requires_acknowledgment: bool) -> Self {
        self.requires_acknowledgment = requires_acknowledgment;
        self
    }

    pub fn with_ttl(mut self, ttl: TtlSeconds) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<MessageId>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_workflow(mut self, workflow_id: impl Into<String>) -> Self {
        self.workflow_id = Some(workflow_id.into());
        self
    }

    pub fn with_task(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn with_phase(mut self, phase_number: u32) -> Self {
        self.phase_number = Some(phase_number);
        self
    }

    pub fn with_sequence(mut self, sequence_number: i64) -> Self {
        self.sequence_number = Some(sequence_number);
        self
    }

    /// Validate and build with the built-in defaults.
    pub fn build(self) -> CourierResult<Message> {
        self.build_with_defaults(MessagePriority::default(), DEFAULT_MAX_RETRIES)
    }

    /// Validate and build, filling unset priority and retry budget from the
    /// given defaults. Assigns a fresh id and `created_at`; status is Pending.
    pub fn build_with_defaults(
        self,
        default_priority: MessagePriority,
        default_max_retries: u32,
    ) -> CourierResult<Message> {
        if self.sender_id.trim().is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "sender_id".to_string(),
            }
            .into());
        }
        if self.recipient_id.trim().is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "recipient_id".to_string(),
            }
            .into());
        }

        Ok(Message {
            id: new_message_id(),
            message_type: self.message_type,
            priority: self.priority.unwrap_or(default_priority),
            sender_id: self.sender_id,
            recipient_id: self.recipient_id,
            subject: self.subject,
            content: self.content,
            payload: self.payload,
            status: MessageStatus::Pending,
            created_at: Utc::now(),
            delivered_at: None,
            acknowledged_at: None,
            read_at: None,
            ttl: self.ttl,
            retry_count: 0,
            max_retries: self.max_retries.unwrap_or(default_max_retries),
            sequence_number: self.sequence_number,
            dependencies: self.dependencies,
            tags: self.tags,
            workflow_id: self.workflow_id,
            task_id: self.task_id,
            phase_number: self.phase_number,
            requires_acknowledgment: self.requires_acknowledgment,
        })
    }
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_message_type() -> impl Strategy<Value = MessageType> {
        let all: Vec<MessageType> = MessageType::all().collect();
        prop::sample::select(all)
    }

    fn arb_priority() -> impl Strategy<Value = MessagePriority> {
        prop::sample::select(MessagePriority::ALL.to_vec())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Canonical form round-trips field for field.
        #[test]
        fn prop_canonical_round_trip(
            message_type in arb_message_type(),
            priority in arb_priority(),
            subject in ".{0,20}",
            content in ".{0,40}",
            ttl in proptest::option::of(0u64..100_000),
            max_retries in 0u32..10,
            sequence in proptest::option::of(any::<i64>()),
            tags in prop::collection::btree_set("[a-z]{1,8}", 0..4),
            phase in proptest::option::of(0u32..20),
            requires_ack in any::<bool>(),
        ) {
            let mut draft = MessageDraft::new("sender", "recipient", message_type)
                .with_priority(priority)
                .with_subject(subject)
                .with_content(content)
                .with_max_retries(max_retries)
                .with_tags(tags)
                .requiring_ack(requires_ack);
            if let Some(ttl) = ttl {
                draft = draft.with_ttl(ttl);
            }
            if let Some(seq) = sequence {
                draft = draft.with_sequence(seq);
            }
            if let Some(phase) = phase {
                draft = draft.with_phase(phase);
            }
            let msg = draft.build().unwrap();
            let map = msg.to_canonical().unwrap();
            prop_assert_eq!(
                map.get(ONBOARDING_FLAG_KEY),
                Some(&Value::Bool(message_type.is_onboarding()))
            );
            let restored = Message::from_canonical(map).unwrap();
            prop_assert_eq!(restored, msg);
        }

        /// Retry count never exceeds the budget, however often retries are counted.
        #[test]
        fn prop_retry_count_bounded(max_retries in 0u32..8, attempts in 0usize..20) {
            let mut msg = MessageDraft::new("a", "b", MessageType::HEARTBEAT)
                .with_max_retries(max_retries)
                .build()
                .unwrap();
            for _ in 0..attempts {
                msg.increment_retry();
            }
            prop_assert!(msg.retry_count <= msg.max_retries);
            if attempts as u32 >= max_retries && max_retries > 0 {
                prop_assert_eq!(msg.status, MessageStatus::Failed);
            }
        }
    }
}
