//! COURIER Test Utilities
//!
//! Shared test infrastructure for the COURIER workspace:
//! - Proptest generators for messages, agents and configuration
//! - Fixtures for common registries, stores and send requests
//! - Assertions for broker-specific invariants

// Re-export core types for convenience
pub use courier_agents::AgentRegistry;
pub use courier_core::*;
pub use courier_storage::{InMemoryMessageStore, MessageEntry, MessageStore};

use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating COURIER types.

    use super::*;
    use proptest::prelude::*;

    // === Identity Generators ===

    /// Generate an agent id such as `Agent-17`.
    pub fn arb_agent_id() -> impl Strategy<Value = AgentId> {
        (0u32..64).prop_map(|n| format!("Agent-{}", n))
    }

    /// Generate a Timestamp (DateTime<Utc>).
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        // 2020-2030
        (1577836800i64..1893456000i64).prop_map(|secs| {
            chrono::DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now)
        })
    }

    // === Enum Generators ===

    pub fn arb_message_type() -> impl Strategy<Value = MessageType> {
        prop::sample::select(MessageType::all().collect::<Vec<_>>())
    }

    pub fn arb_priority() -> impl Strategy<Value = MessagePriority> {
        prop::sample::select(MessagePriority::ALL.to_vec())
    }

    pub fn arb_message_status() -> impl Strategy<Value = MessageStatus> {
        prop::sample::select(MessageStatus::ALL.to_vec())
    }

    pub fn arb_agent_status() -> impl Strategy<Value = AgentStatus> {
        prop::sample::select(AgentStatus::ALL.to_vec())
    }

    pub fn arb_capability() -> impl Strategy<Value = Capability> {
        prop::sample::select(Capability::ALL.to_vec())
    }

    pub fn arb_capabilities() -> impl Strategy<Value = BTreeSet<Capability>> {
        prop::collection::btree_set(arb_capability(), 0..5)
    }

    // === Value Generators ===

    /// Generate a small flat JSON payload.
    pub fn arb_payload() -> impl Strategy<Value = Payload> {
        prop::collection::btree_map(
            "[a-z]{1,8}",
            prop_oneof![
                any::<bool>().prop_map(Value::Bool),
                any::<i64>().prop_map(Value::from),
                "[a-zA-Z0-9 ]{0,16}".prop_map(Value::String),
                Just(Value::Null),
            ],
            0..4,
        )
        .prop_map(|entries| entries.into_iter().collect::<Map<String, Value>>())
    }

    /// Generate a TTL in seconds, or none.
    pub fn arb_ttl() -> impl Strategy<Value = Option<TtlSeconds>> {
        prop::option::of(1u64..86_400)
    }

    // === Composite Generators ===

    /// Generate a valid direct send request between two agents.
    pub fn arb_draft() -> impl Strategy<Value = MessageDraft> {
        (
            arb_agent_id(),
            arb_agent_id(),
            arb_message_type(),
            arb_priority(),
            "[a-zA-Z ]{0,24}",
            arb_payload(),
            any::<bool>(),
            arb_ttl(),
            0u32..6,
            prop::option::of(-5i64..5),
        )
            .prop_map(
                |(sender, recipient, message_type, priority, subject, payload, ack, ttl, retries, seq)| {
                    let mut draft = MessageDraft::new(sender, recipient, message_type)
                        .with_priority(priority)
                        .with_subject(subject)
                        .with_payload(payload)
                        .requiring_ack(ack)
                        .with_max_retries(retries);
                    if let Some(ttl) = ttl {
                        draft = draft.with_ttl(ttl);
                    }
                    if let Some(seq) = seq {
                        draft = draft.with_sequence(seq);
                    }
                    draft
                },
            )
    }

    /// Generate a message with arbitrary lifecycle fields.
    /// `retry_count <= max_retries` always holds.
    pub fn arb_message() -> impl Strategy<Value = Message> {
        (
            arb_draft(),
            arb_message_status(),
            arb_timestamp(),
            prop::option::of(arb_timestamp()),
            0u32..6,
            prop::collection::btree_set("[a-z]{1,6}", 0..3),
            prop::option::of("wf-[0-9]{1,3}"),
            prop::option::of(0u32..10),
        )
            .prop_filter_map(
                "draft must build",
                |(draft, status, created_at, acknowledged_at, retries, tags, workflow_id, phase)| {
                    let mut message = draft.with_tags(tags).build().ok()?;
                    message.status = status;
                    message.created_at = created_at;
                    message.acknowledged_at = acknowledged_at;
                    message.retry_count = retries.min(message.max_retries);
                    message.workflow_id = workflow_id;
                    message.phase_number = phase;
                    Some(message)
                },
            )
    }

    /// Generate a configuration that passes validation.
    pub fn arb_valid_config() -> impl Strategy<Value = BrokerConfig> {
        (
            0u32..=MAX_RETRIES_LIMIT,
            arb_priority(),
            any::<bool>(),
            any::<bool>(),
            1u64..3600,
        )
            .prop_map(|(retries, priority, warn, sweep, interval)| BrokerConfig {
                default_max_retries: retries,
                default_priority: priority,
                warn_on_unknown_recipient: warn,
                sweep_enabled: sweep,
                sweep_interval: std::time::Duration::from_secs(interval),
            })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built values for common test scenarios.

    use super::*;

    /// Sender used by the request fixtures.
    pub const ORCHESTRATOR: &str = "orchestrator";

    /// Default configuration with the unknown-recipient warning off.
    pub fn quiet_config() -> BrokerConfig {
        BrokerConfig {
            warn_on_unknown_recipient: false,
            ..BrokerConfig::default()
        }
    }

    /// Registry holding one agent per `(id, capabilities)` pair.
    pub fn registry_with_agents(agents: &[(&str, &[Capability])]) -> AgentRegistry {
        let registry = AgentRegistry::new();
        for (agent_id, capabilities) in agents {
            registry
                .register(
                    agent_id,
                    agent_id,
                    capabilities.iter().copied().collect(),
                    None,
                    None,
                )
                .expect("fixture agent ids are valid");
        }
        registry
    }

    /// Registry with three agents covering execution, testing and coordination.
    pub fn team_registry() -> AgentRegistry {
        let agents: [(&str, &[Capability]); 3] = [
            ("Agent-1", &[Capability::TaskExecution]),
            ("Agent-2", &[Capability::TaskExecution, Capability::Testing]),
            ("Agent-3", &[Capability::Coordination, Capability::Planning]),
        ];
        registry_with_agents(&agents)
    }

    /// Store pre-loaded with `messages`, in order.
    pub fn store_with_messages(messages: Vec<Message>) -> InMemoryMessageStore {
        let store = InMemoryMessageStore::new();
        for message in messages {
            store
                .append(message)
                .expect("fixture messages have unique ids");
        }
        store
    }

    /// Onboarding phase request: CRITICAL, acknowledgment required.
    pub fn onboarding_request(recipient_id: &str, phase_number: u32) -> MessageDraft {
        MessageDraft::new(ORCHESTRATOR, recipient_id, MessageType::ONBOARDING_PHASE)
            .with_priority(MessagePriority::Critical)
            .requiring_ack(true)
            .with_phase(phase_number)
            .with_subject(format!("Onboarding phase {}", phase_number))
    }

    /// Plain coordination request at `priority`.
    pub fn direct_request(recipient_id: &str, priority: MessagePriority) -> MessageDraft {
        MessageDraft::new(ORCHESTRATOR, recipient_id, MessageType::COORDINATION)
            .with_priority(priority)
            .with_subject(format!("{} update", priority))
    }

    /// Broadcast announcement.
    pub fn broadcast_request(requires_ack: bool) -> MessageDraft {
        MessageDraft::new(ORCHESTRATOR, BROADCAST_RECIPIENT, MessageType::BROADCAST)
            .requiring_ack(requires_ack)
            .with_subject("Announcement")
    }

    /// Message built from [`direct_request`] with a TTL.
    pub fn expiring_message(recipient_id: &str, ttl: TtlSeconds) -> Message {
        direct_request(recipient_id, MessagePriority::Normal)
            .with_ttl(ttl)
            .build()
            .expect("fixture request is valid")
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertion helpers for COURIER-specific validation.

    use super::*;
    use std::cmp::Ordering;

    /// Assert that a CourierResult is Ok.
    #[track_caller]
    pub fn assert_ok<T: std::fmt::Debug>(result: &CourierResult<T>) {
        assert!(result.is_ok(), "Expected Ok, got Err: {:?}", result);
    }

    /// Assert that a CourierResult is Err.
    #[track_caller]
    pub fn assert_err<T: std::fmt::Debug>(result: &CourierResult<T>) {
        assert!(result.is_err(), "Expected Err, got Ok: {:?}", result);
    }

    #[track_caller]
    pub fn assert_validation_error<T: std::fmt::Debug>(result: &CourierResult<T>) {
        match result {
            Err(CourierError::Validation(_)) => {}
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_storage_error<T: std::fmt::Debug>(result: &CourierResult<T>) {
        match result {
            Err(CourierError::Storage(_)) => {}
            other => panic!("Expected Storage error, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_config_error<T: std::fmt::Debug>(result: &CourierResult<T>) {
        match result {
            Err(CourierError::Config(_)) => {}
            other => panic!("Expected Config error, got: {:?}", other),
        }
    }

    /// Assert that a CourierResult is a NotRegistered agent error for `agent_id`.
    #[track_caller]
    pub fn assert_not_registered<T: std::fmt::Debug>(result: &CourierResult<T>, agent_id: &str) {
        match result {
            Err(CourierError::Agent(AgentError::NotRegistered { agent_id: id })) => {
                assert_eq!(id, agent_id, "Wrong agent id in NotRegistered error");
            }
            other => panic!("Expected NotRegistered for {}, got: {:?}", agent_id, other),
        }
    }

    /// Assert a message has the given status.
    #[track_caller]
    pub fn assert_status(message: &Message, status: MessageStatus) {
        assert_eq!(
            message.status, status,
            "Message {} has status {}, expected {}",
            message.id, message.status, status
        );
    }

    /// Assert a retrieval result respects delivery order: priority never
    /// increases, and within one priority sequenced messages come first in
    /// ascending order.
    #[track_caller]
    pub fn assert_delivery_ordered(messages: &[Message]) {
        for pair in messages.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            match a.priority.cmp(&b.priority) {
                Ordering::Less => panic!(
                    "Priority increased from {} to {} ({} then {})",
                    a.priority, b.priority, a.id, b.id
                ),
                Ordering::Greater => {}
                Ordering::Equal => match (a.sequence_number, b.sequence_number) {
                    (Some(x), Some(y)) => assert!(
                        x <= y,
                        "Sequence decreased from {} to {} ({} then {})",
                        x,
                        y,
                        a.id,
                        b.id
                    ),
                    (None, Some(_)) => panic!(
                        "Unsequenced message {} placed before sequenced {}",
                        a.id, b.id
                    ),
                    _ => {}
                },
            }
        }
    }

    /// Assert a canonical map carries exactly the documented keys.
    #[track_caller]
    pub fn assert_canonical_keys(map: &Map<String, Value>) {
        const KEYS: [&str; 24] = [
            "id",
            "message_type",
            "priority",
            "sender_id",
            "recipient_id",
            "subject",
            "content",
            "payload",
            "status",
            "created_at",
            "delivered_at",
            "acknowledged_at",
            "read_at",
            "ttl",
            "retry_count",
            "max_retries",
            "sequence_number",
            "dependencies",
            "tags",
            "workflow_id",
            "task_id",
            "phase_number",
            "requires_acknowledgment",
            ONBOARDING_FLAG_KEY,
        ];
        let actual: BTreeSet<&str> = map.keys().map(String::as_str).collect();
        let expected: BTreeSet<&str> = KEYS.into_iter().collect();
        assert_eq!(actual, expected, "Canonical keys differ");
    }
}

// ============================================================================
// TESTS
// ============================================================================
