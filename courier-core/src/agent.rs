//! Agent identity

use crate::{AgentId, AgentStatus, Capability, Timestamp};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// An addressable participant in the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AgentInfo {
    /// Unique identifier chosen by the agent
    pub agent_id: AgentId,
    /// Human-readable name
    pub name: String,
    /// Capabilities this agent advertises
    #[cfg_attr(feature = "openapi", schema(value_type = Vec<Capability>))]
    pub capabilities: BTreeSet<Capability>,
    /// Current status
    pub status: AgentStatus,
    /// Where an external delivery layer can reach the agent
    pub endpoint: Option<String>,
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub metadata: Map<String, Value>,
    /// Task ids the agent is working on
    pub current_tasks: Vec<String>,
    /// Workflow ids the agent takes part in
    pub workflow_participation: Vec<String>,
    /// Last registration, status change or heartbeat
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub last_seen: Timestamp,
}

impl AgentInfo {
    /// Create a new agent record. Status starts Online.
    pub fn new(
        agent_id: impl Into<AgentId>,
        name: impl Into<String>,
        capabilities: BTreeSet<Capability>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            name: name.into(),
            capabilities,
            status: AgentStatus::Online,
            endpoint: None,
            metadata: Map::new(),
            current_tasks: Vec::new(),
            workflow_participation: Vec::new(),
            last_seen: Utc::now(),
        }
    }

    /// Set the endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set metadata.
    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Update the last-seen timestamp.
    pub fn touch(&mut self) {
        self.last_seen = Utc::now();
    }

    /// Check if agent has a specific capability.
    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}
