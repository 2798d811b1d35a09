//! Delivery and retrieval
//!
//! Pull-based reads. Broadcast fan-out is resolved here: a broadcast is
//! visible to whichever agent id asks, including agents registered after
//! the send. Nothing in this module mutates a message.

use crate::Broker;
use chrono::Utc;
use courier_core::{CourierResult, Message, MessageStatus, MessageType, Timestamp};
use courier_storage::MessageEntry;
use std::cmp::Ordering;

/// Delivery order between two stored messages.
///
/// Higher priority first. Within a priority, sequenced messages come first
/// in ascending sequence number, then unsequenced ones. Remaining ties fall
/// back to insertion order.
pub fn delivery_order(a: &MessageEntry, b: &MessageEntry) -> Ordering {
    b.message
        .priority
        .cmp(&a.message.priority)
        .then_with(|| match (a.message.sequence_number, b.message.sequence_number) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.ordinal.cmp(&b.ordinal))
}

fn in_delivery_order(mut entries: Vec<MessageEntry>) -> Vec<MessageEntry> {
    entries.sort_by(delivery_order);
    entries
}

impl Broker {
    /// Messages addressed to `agent_id` (directly or by broadcast), as that
    /// agent sees them, filtered and in delivery order.
    pub fn get_messages_for_agent(
        &self,
        agent_id: &str,
        type_filter: Option<MessageType>,
        status_filter: Option<MessageStatus>,
    ) -> CourierResult<Vec<Message>> {
        let entries = self
            .store
            .scan(&|entry: &MessageEntry| entry.message.is_addressed_to(agent_id))?;

        let messages: Vec<Message> = in_delivery_order(entries)
            .into_iter()
            .map(|entry| entry.view_for(agent_id))
            .filter(|message| type_filter.map_or(true, |t| message.message_type == t))
            .filter(|message| status_filter.map_or(true, |s| message.status == s))
            .collect();

        tracing::trace!(
            agent_id = %agent_id,
            count = messages.len(),
            "Messages retrieved"
        );
        Ok(messages)
    }

    /// Messages `agent_id` can still act on at `now`: Pending or Delivered
    /// in its view and not past their TTL.
    pub fn pending_for_agent(&self, agent_id: &str, now: Timestamp) -> CourierResult<Vec<Message>> {
        Ok(self
            .get_messages_for_agent(agent_id, None, None)?
            .into_iter()
            .filter(|message| message.status.is_active() && !message.is_expired(now))
            .collect())
    }

    /// [`pending_for_agent`](Self::pending_for_agent) at the current time.
    pub fn inbox(&self, agent_id: &str) -> CourierResult<Vec<Message>> {
        self.pending_for_agent(agent_id, Utc::now())
    }

    /// Get a message by id, with its broadcast-level lifecycle fields.
    pub fn get_message(&self, message_id: &str) -> CourierResult<Option<Message>> {
        self.store.get(message_id)
    }

    /// Messages correlated to a workflow, in delivery order.
    pub fn messages_for_workflow(&self, workflow_id: &str) -> CourierResult<Vec<Message>> {
        self.correlated(&|entry: &MessageEntry| {
            entry.message.workflow_id.as_deref() == Some(workflow_id)
        })
    }

    /// Messages correlated to a task, in delivery order.
    pub fn messages_for_task(&self, task_id: &str) -> CourierResult<Vec<Message>> {
        self.correlated(&|entry: &MessageEntry| entry.message.task_id.as_deref() == Some(task_id))
    }

    fn correlated(&self, predicate: &dyn Fn(&MessageEntry) -> bool) -> CourierResult<Vec<Message>> {
        let entries = self.store.scan(predicate)?;
        Ok(in_delivery_order(entries)
            .into_iter()
            .map(|entry| entry.message)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use courier_core::{BrokerConfig, MessageDraft, MessagePriority, BROADCAST_RECIPIENT};

    fn broker() -> Broker {
        Broker::new(BrokerConfig::default()).unwrap()
    }

    fn send(broker: &Broker, to: &str, priority: MessagePriority, seq: Option<i64>) -> String {
        let mut draft = MessageDraft::new("sender", to, MessageType::COORDINATION)
            .with_priority(priority);
        if let Some(seq) = seq {
            draft = draft.with_sequence(seq);
        }
        broker.send(draft).unwrap()
    }

    #[test]
    fn test_only_addressed_messages_returned() {
        let broker = broker();
        let mine = send(&broker, "a", MessagePriority::Normal, None);
        send(&broker, "b", MessagePriority::Normal, None);
        let everyone = send(&broker, BROADCAST_RECIPIENT, MessagePriority::Normal, None);

        let ids: Vec<String> = broker
            .get_messages_for_agent("a", None, None)
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec![mine, everyone]);
    }

    #[test]
    fn test_sequence_numbers_order_within_priority() {
        let broker = broker();
        let unsequenced = send(&broker, "a", MessagePriority::Normal, None);
        let second = send(&broker, "a", MessagePriority::Normal, Some(2));
        let first = send(&broker, "a", MessagePriority::Normal, Some(1));
        let urgent = send(&broker, "a", MessagePriority::Urgent, None);

        let ids: Vec<String> = broker
            .get_messages_for_agent("a", None, None)
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec![urgent, first, second, unsequenced]);
    }

    #[test]
    fn test_filters_are_equality_predicates() {
        let broker = broker();
        send(&broker, "a", MessagePriority::Normal, None);
        broker
            .send(MessageDraft::new("s", "a", MessageType::TASK_ASSIGNMENT))
            .unwrap();

        let tasks = broker
            .get_messages_for_agent("a", Some(MessageType::TASK_ASSIGNMENT), None)
            .unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].message_type, MessageType::TASK_ASSIGNMENT);

        let read = broker
            .get_messages_for_agent("a", None, Some(MessageStatus::Read))
            .unwrap();
        assert!(read.is_empty());
    }

    #[test]
    fn test_retrieval_does_not_mutate() {
        let broker = broker();
        let id = send(&broker, "a", MessagePriority::Normal, None);
        broker.get_messages_for_agent("a", None, None).unwrap();
        broker.get_messages_for_agent("a", None, None).unwrap();
        assert_eq!(
            broker.get_message(&id).unwrap().unwrap().status,
            MessageStatus::Pending
        );
    }

    #[test]
    fn test_pending_for_agent_skips_expired() {
        let broker = broker();
        let live = send(&broker, "a", MessagePriority::Normal, None);
        broker
            .send(MessageDraft::new("s", "a", MessageType::COORDINATION).with_ttl(5))
            .unwrap();

        let later = Utc::now() + ChronoDuration::seconds(10);
        let pending = broker.pending_for_agent("a", later).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, live);
        assert_eq!(broker.inbox("a").unwrap().len(), 2);
    }

    #[test]
    fn test_messages_for_workflow_and_task() {
        let broker = broker();
        broker
            .send(MessageDraft::new("s", "a", MessageType::COORDINATION).with_workflow("wf-1"))
            .unwrap();
        broker
            .send(
                MessageDraft::new("s", "b", MessageType::TASK_ASSIGNMENT)
                    .with_workflow("wf-1")
                    .with_task("t-1"),
            )
            .unwrap();
        broker
            .send(MessageDraft::new("s", "b", MessageType::COORDINATION).with_workflow("wf-2"))
            .unwrap();

        assert_eq!(broker.messages_for_workflow("wf-1").unwrap().len(), 2);
        assert_eq!(broker.messages_for_task("t-1").unwrap().len(), 1);
        assert!(broker.messages_for_task("t-2").unwrap().is_empty());
        assert!(broker.get_message("missing").unwrap().is_none());
    }
}
