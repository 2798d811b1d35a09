//! Broker facade
//!
//! [`Broker`] owns a message store, an agent registry and the broker
//! configuration. It is cheap to clone; clones share all state.

use courier_agents::AgentRegistry;
use courier_core::{
    AgentInfo, AgentStatus, BrokerConfig, Capability, CourierResult, Message, MessageDraft,
    MessageId,
};
use courier_storage::{InMemoryMessageStore, MessageStore};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Handle to an in-process message broker.
#[derive(Clone)]
pub struct Broker {
    pub(crate) store: Arc<dyn MessageStore>,
    pub(crate) registry: AgentRegistry,
    pub(crate) config: Arc<BrokerConfig>,
}

impl Broker {
    /// Create a broker backed by an in-memory store.
    pub fn new(config: BrokerConfig) -> CourierResult<Self> {
        Self::with_parts(config, Arc::new(InMemoryMessageStore::new()), AgentRegistry::new())
    }

    /// Create a broker over an existing store and registry.
    pub fn with_parts(
        config: BrokerConfig,
        store: Arc<dyn MessageStore>,
        registry: AgentRegistry,
    ) -> CourierResult<Self> {
        config.validate()?;
        Ok(Self {
            store,
            registry,
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn MessageStore> {
        &self.store
    }

    // ------------------------------------------------------------------------
    // Sending
    // ------------------------------------------------------------------------

    /// Validate and store a message, returning its id.
    ///
    /// Unset priority and retry budget come from the configuration. A direct
    /// message to an unregistered agent is accepted with a warning.
    pub fn send(&self, draft: MessageDraft) -> CourierResult<MessageId> {
        let message =
            draft.build_with_defaults(self.config.default_priority, self.config.default_max_retries)?;

        if self.config.warn_on_unknown_recipient && !message.is_broadcast() {
            warn_if_unregistered(&message, self.registry.contains(&message.recipient_id));
        }

        let message_type = message.message_type;
        let priority = message.priority;
        let sender_id = message.sender_id.clone();
        let recipient_id = message.recipient_id.clone();
        let id = self.store.append(message)?;

        tracing::debug!(
            message_id = %id,
            message_type = %message_type,
            priority = priority.value(),
            sender_id = %sender_id,
            recipient_id = %recipient_id,
            "Message sent"
        );

        Ok(id)
    }

    // ------------------------------------------------------------------------
    // Agents
    // ------------------------------------------------------------------------

    /// Register or refresh an agent. See [`AgentRegistry::register`].
    pub fn register(
        &self,
        agent_id: &str,
        name: &str,
        capabilities: BTreeSet<Capability>,
        endpoint: Option<String>,
        metadata: Option<Map<String, Value>>,
    ) -> CourierResult<bool> {
        let registered = self
            .registry
            .register(agent_id, name, capabilities, endpoint, metadata)?;
        tracing::debug!(agent_id = %agent_id, name = %name, "Agent registered");
        Ok(registered)
    }

    pub fn get_by_capability(&self, capability: Capability) -> CourierResult<BTreeSet<String>> {
        self.registry.get_by_capability(capability)
    }

    pub fn update_agent_status(&self, agent_id: &str, status: AgentStatus) -> CourierResult<bool> {
        let updated = self.registry.update_status(agent_id, status)?;
        if updated {
            tracing::debug!(agent_id = %agent_id, status = %status, "Agent status updated");
        }
        Ok(updated)
    }

    pub fn get_agent(&self, agent_id: &str) -> CourierResult<Option<AgentInfo>> {
        self.registry.get(agent_id)
    }

    /// All registered agents, sorted by id.
    pub fn agents(&self) -> CourierResult<Vec<AgentInfo>> {
        self.registry.list()
    }

    // ------------------------------------------------------------------------
    // Persistence hooks
    // ------------------------------------------------------------------------

    /// Every stored message in canonical form, in insertion order.
    pub fn export_messages(&self) -> CourierResult<Vec<Map<String, Value>>> {
        self.store
            .all()?
            .iter()
            .map(Message::to_canonical)
            .collect()
    }

    /// Load messages from their canonical form, keeping their ids and
    /// lifecycle fields. Stops at the first malformed map or duplicate id.
    pub fn import_messages(&self, messages: Vec<Map<String, Value>>) -> CourierResult<usize> {
        let mut imported = 0;
        for map in messages {
            let message = Message::from_canonical(map)?;
            self.store.append(message)?;
            imported += 1;
        }
        tracing::info!(imported, "Messages imported");
        Ok(imported)
    }
}

/// Log a warning when the recipient is unknown or the lookup itself failed.
/// Returns true if a warning was emitted. Never blocks the send.
fn warn_if_unregistered(message: &Message, registered: CourierResult<bool>) -> bool {
    match registered {
        Ok(true) => false,
        Ok(false) => {
            tracing::warn!(
                message_id = %message.id,
                recipient_id = %message.recipient_id,
                message_type = %message.message_type,
                "Recipient is not registered; message stored anyway"
            );
            true
        }
        Err(e) => {
            tracing::warn!(
                message_id = %message.id,
                recipient_id = %message.recipient_id,
                error = %e,
                "Recipient lookup failed; message stored anyway"
            );
            true
        }
    }
}

impl fmt::Debug for Broker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Broker")
            .field("messages", &self.store.len().ok())
            .field("agents", &self.registry.len().ok())
            .field("config", &self.config)
            .finish()
    }
}
