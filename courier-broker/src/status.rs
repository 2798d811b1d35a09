//! System status snapshot

use crate::Broker;
use chrono::Utc;
use courier_core::{AgentStatus, CourierResult, MessagePriority, MessageStatus, Timestamp};
use serde::Serialize;
use std::collections::BTreeMap;

/// Point-in-time summary of the broker, recomputed on every call.
///
/// Counts use each message's own status. A broadcast counts once and stays
/// Pending until cancelled, expired or failed; per-agent receipts do not
/// change it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SystemStatus {
    pub total_messages: usize,
    /// Keyed by message type wire name
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub messages_by_type: BTreeMap<String, usize>,
    /// Keyed by priority name; every priority is present
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub messages_by_priority: BTreeMap<String, usize>,
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub messages_by_sender: BTreeMap<String, usize>,
    /// Keyed by status name; every status is present
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub messages_by_status: BTreeMap<String, usize>,
    /// Pending plus Delivered
    pub queue_depth: usize,
    pub registered_agents: usize,
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub agent_statuses: BTreeMap<String, AgentStatus>,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub generated_at: Timestamp,
}

impl Broker {
    /// Summarize messages and agents. Read-only.
    pub fn get_system_status(&self) -> CourierResult<SystemStatus> {
        let messages = self.store.all()?;
        let agents = self.registry.list()?;

        let mut messages_by_type = BTreeMap::new();
        let mut messages_by_sender = BTreeMap::new();
        let mut messages_by_priority: BTreeMap<String, usize> = MessagePriority::ALL
            .iter()
            .map(|p| (p.as_str().to_string(), 0))
            .collect();
        let mut messages_by_status: BTreeMap<String, usize> = MessageStatus::ALL
            .iter()
            .map(|s| (s.as_str().to_string(), 0))
            .collect();
        let mut queue_depth = 0;

        for message in &messages {
            *messages_by_type
                .entry(message.message_type.as_str().to_string())
                .or_insert(0) += 1;
            *messages_by_sender
                .entry(message.sender_id.clone())
                .or_insert(0) += 1;
            *messages_by_priority
                .entry(message.priority.as_str().to_string())
                .or_insert(0) += 1;
            *messages_by_status
                .entry(message.status.as_str().to_string())
                .or_insert(0) += 1;
            if message.status.is_active() {
                queue_depth += 1;
            }
        }

        Ok(SystemStatus {
            total_messages: messages.len(),
            messages_by_type,
            messages_by_priority,
            messages_by_sender,
            messages_by_status,
            queue_depth,
            registered_agents: agents.len(),
            agent_statuses: agents
                .into_iter()
                .map(|agent| (agent.agent_id, agent.status))
                .collect(),
            generated_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::{BrokerConfig, MessageDraft, MessageType};
    use std::collections::BTreeSet;

    #[test]
    fn test_empty_broker_status() {
        let broker = Broker::new(BrokerConfig::default()).unwrap();
        let status = broker.get_system_status().unwrap();
        assert_eq!(status.total_messages, 0);
        assert_eq!(status.queue_depth, 0);
        assert_eq!(status.messages_by_status.len(), MessageStatus::ALL.len());
        assert!(status.messages_by_status.values().all(|&n| n == 0));
        assert_eq!(status.messages_by_priority["normal"], 0);
    }

    #[test]
    fn test_status_counts() {
        let broker = Broker::new(BrokerConfig::default()).unwrap();
        broker
            .register("a", "A", BTreeSet::new(), None, None)
            .unwrap();
        broker.update_agent_status("a", AgentStatus::Busy).unwrap();

        let read = broker
            .send(MessageDraft::new("s1", "a", MessageType::COORDINATION))
            .unwrap();
        broker
            .send(
                MessageDraft::new("s1", "a", MessageType::TASK_ASSIGNMENT)
                    .with_priority(MessagePriority::High),
            )
            .unwrap();
        broker
            .send(MessageDraft::new("s2", "a", MessageType::COORDINATION))
            .unwrap();
        assert!(broker.mark_delivered(&read, "a").unwrap());
        assert!(broker.mark_read(&read, "a").unwrap());

        let status = broker.get_system_status().unwrap();
        assert_eq!(status.total_messages, 3);
        assert_eq!(status.messages_by_type["coordination"], 2);
        assert_eq!(status.messages_by_type["task_assignment"], 1);
        assert_eq!(status.messages_by_priority["high"], 1);
        assert_eq!(status.messages_by_priority["normal"], 2);
        assert_eq!(status.messages_by_sender["s1"], 2);
        assert_eq!(status.messages_by_status["read"], 1);
        assert_eq!(status.messages_by_status["pending"], 2);
        assert_eq!(status.queue_depth, 2);
        assert_eq!(status.registered_agents, 1);
        assert_eq!(status.agent_statuses["a"], AgentStatus::Busy);
    }

    #[test]
    fn test_status_serializes_for_dashboards() {
        let broker = Broker::new(BrokerConfig::default()).unwrap();
        broker
            .send(MessageDraft::new("s", "a", MessageType::HEARTBEAT))
            .unwrap();
        let value = serde_json::to_value(broker.get_system_status().unwrap()).unwrap();
        assert_eq!(value["total_messages"], 1);
        assert_eq!(value["messages_by_type"]["heartbeat"], 1);
        assert!(value["generated_at"].is_string());
    }
}
