//! Property-Based Tests for Retrieval Order and Acknowledgment
//!
//! For any batch of sends to one agent, retrieval returns every message
//! exactly once, ordered by priority then sequence, and never mutates them.

use courier_test_utils::{assertions, generators, MessageDraft, MessageStatus, MessageType};
use proptest::prelude::*;

#[path = "support/broker.rs"]
mod test_broker_support;
use test_broker_support::empty_broker;

fn arb_batch() -> impl Strategy<Value = Vec<(courier_test_utils::MessagePriority, Option<i64>)>> {
    prop::collection::vec(
        (generators::arb_priority(), prop::option::of(-3i64..3)),
        1..20,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_retrieval_is_delivery_ordered(batch in arb_batch()) {
        let broker = empty_broker();
        for (priority, seq) in &batch {
            let mut draft = MessageDraft::new("sender", "Agent-1", MessageType::COORDINATION)
                .with_priority(*priority);
            if let Some(seq) = seq {
                draft = draft.with_sequence(*seq);
            }
            broker.send(draft).unwrap();
        }

        let inbox = broker.get_messages_for_agent("Agent-1", None, None).unwrap();
        prop_assert_eq!(inbox.len(), batch.len());
        assertions::assert_delivery_ordered(&inbox);

        let again = broker.get_messages_for_agent("Agent-1", None, None).unwrap();
        prop_assert_eq!(&inbox, &again);
        prop_assert!(again.iter().all(|m| m.status == MessageStatus::Pending));
    }

    #[test]
    fn prop_acknowledge_is_idempotent(draft in generators::arb_draft()) {
        let broker = empty_broker();
        let recipient = draft.recipient_id.clone();
        let requires_ack = draft.requires_acknowledgment;
        let id = broker.send(draft).unwrap();

        let first = broker.acknowledge(&id, &recipient).unwrap();
        let second = broker.acknowledge(&id, &recipient).unwrap();
        prop_assert_eq!(first, requires_ack);
        prop_assert!(!second);
    }

    #[test]
    fn prop_export_import_round_trip(drafts in prop::collection::vec(generators::arb_draft(), 0..8)) {
        let broker = empty_broker();
        for draft in drafts {
            broker.send(draft).unwrap();
        }
        let restored = empty_broker();
        let count = restored.import_messages(broker.export_messages().unwrap()).unwrap();
        prop_assert_eq!(count, broker.store().len().unwrap());
        prop_assert_eq!(restored.store().all().unwrap(), broker.store().all().unwrap());
    }
}
