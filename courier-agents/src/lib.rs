//! COURIER Agents - Agent Registry
//!
//! Tracks which agents exist, what they can do and how they are doing:
//! - Upsert registration (re-registering refreshes an agent)
//! - Capability discovery through an inverted index
//! - Status, heartbeat, task and workflow bookkeeping

use courier_core::{
    is_broadcast, AgentError, AgentId, AgentInfo, AgentStatus, Capability, CourierResult,
    StorageError, ValidationError,
};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

// ============================================================================
// REGISTRY STATE
// ============================================================================

#[derive(Debug, Default)]
struct RegistryState {
    agents: HashMap<AgentId, AgentInfo>,
    by_capability: HashMap<Capability, HashSet<AgentId>>,
}

impl RegistryState {
    fn unindex(&mut self, agent_id: &str, capabilities: &BTreeSet<Capability>) {
        for capability in capabilities {
            if let Some(ids) = self.by_capability.get_mut(capability) {
                ids.remove(agent_id);
                if ids.is_empty() {
                    self.by_capability.remove(capability);
                }
            }
        }
    }

    fn index(&mut self, agent_id: &str, capabilities: &BTreeSet<Capability>) {
        for capability in capabilities {
            self.by_capability
                .entry(*capability)
                .or_default()
                .insert(agent_id.to_string());
        }
    }
}

// ============================================================================
// AGENT REGISTRY
// ============================================================================

/// Registry of agents and their capabilities.
///
/// Cloning shares the underlying state. Agents and the capability index sit
/// behind one lock so the index never disagrees with the agent records.
#[derive(Debug, Clone, Default)]
pub struct AgentRegistry {
    state: Arc<RwLock<RegistryState>>,
}

impl AgentRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> CourierResult<RwLockReadGuard<'_, RegistryState>> {
        self.state
            .read()
            .map_err(|_| StorageError::LockPoisoned.into())
    }

    fn write(&self) -> CourierResult<RwLockWriteGuard<'_, RegistryState>> {
        self.state
            .write()
            .map_err(|_| StorageError::LockPoisoned.into())
    }

    /// Register or refresh an agent.
    ///
    /// Re-registering an existing id replaces its name, capabilities,
    /// endpoint and metadata, resets status to Online and touches
    /// `last_seen`. Task and workflow bookkeeping is kept. The capability
    /// index drops entries from the previous registration.
    pub fn register(
        &self,
        agent_id: &str,
        name: &str,
        capabilities: BTreeSet<Capability>,
        endpoint: Option<String>,
        metadata: Option<Map<String, Value>>,
    ) -> CourierResult<bool> {
        if agent_id.trim().is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "agent_id".to_string(),
            }
            .into());
        }
        if is_broadcast(agent_id) {
            return Err(ValidationError::ReservedIdentifier {
                field: "agent_id".to_string(),
                value: agent_id.to_string(),
            }
            .into());
        }

        let mut state = self.write()?;
        let previous = state.agents.remove(agent_id);

        let mut info = AgentInfo::new(agent_id, name, capabilities)
            .with_metadata(metadata.unwrap_or_default());
        info.endpoint = endpoint;
        if let Some(previous) = previous {
            state.unindex(agent_id, &previous.capabilities);
            info.current_tasks = previous.current_tasks;
            info.workflow_participation = previous.workflow_participation;
        }

        let capabilities = info.capabilities.clone();
        state.index(agent_id, &capabilities);
        state.agents.insert(agent_id.to_string(), info);
        Ok(true)
    }

    /// Ids of agents advertising `capability`, sorted.
    pub fn get_by_capability(&self, capability: Capability) -> CourierResult<BTreeSet<AgentId>> {
        let state = self.read()?;
        Ok(state
            .by_capability
            .get(&capability)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default())
    }

    /// Change an agent's status. Returns false if the agent is unknown.
    pub fn update_status(&self, agent_id: &str, status: AgentStatus) -> CourierResult<bool> {
        let mut state = self.write()?;
        match state.agents.get_mut(agent_id) {
            Some(agent) => {
                agent.status = status;
                agent.touch();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Record a heartbeat. Returns false if the agent is unknown.
    pub fn heartbeat(&self, agent_id: &str) -> CourierResult<bool> {
        let mut state = self.write()?;
        match state.agents.get_mut(agent_id) {
            Some(agent) => {
                agent.touch();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Get a copy of an agent record.
    pub fn get(&self, agent_id: &str) -> CourierResult<Option<AgentInfo>> {
        Ok(self.read()?.agents.get(agent_id).cloned())
    }

    /// Check if an agent is registered.
    pub fn contains(&self, agent_id: &str) -> CourierResult<bool> {
        Ok(self.read()?.agents.contains_key(agent_id))
    }

    /// Copies of every agent record, sorted by id.
    pub fn list(&self) -> CourierResult<Vec<AgentInfo>> {
        let state = self.read()?;
        let mut agents: Vec<AgentInfo> = state.agents.values().cloned().collect();
        agents.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        Ok(agents)
    }

    /// Number of registered agents.
    pub fn len(&self) -> CourierResult<usize> {
        Ok(self.read()?.agents.len())
    }

    /// Whether no agent is registered.
    pub fn is_empty(&self) -> CourierResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Add a task id to an agent's current tasks (no duplicates).
    pub fn assign_task(&self, agent_id: &str, task_id: &str) -> CourierResult<()> {
        self.with_agent(agent_id, |agent| {
            if !agent.current_tasks.iter().any(|t| t == task_id) {
                agent.current_tasks.push(task_id.to_string());
            }
        })
    }

    /// Remove a task id from an agent's current tasks.
    /// Returns whether the task was present.
    pub fn complete_task(&self, agent_id: &str, task_id: &str) -> CourierResult<bool> {
        let mut removed = false;
        self.with_agent(agent_id, |agent| {
            let before = agent.current_tasks.len();
            agent.current_tasks.retain(|t| t != task_id);
            removed = agent.current_tasks.len() != before;
        })?;
        Ok(removed)
    }

    /// Record that an agent participates in a workflow (no duplicates).
    pub fn join_workflow(&self, agent_id: &str, workflow_id: &str) -> CourierResult<()> {
        self.with_agent(agent_id, |agent| {
            if !agent.workflow_participation.iter().any(|w| w == workflow_id) {
                agent.workflow_participation.push(workflow_id.to_string());
            }
        })
    }

    fn with_agent(&self, agent_id: &str, f: impl FnOnce(&mut AgentInfo)) -> CourierResult<()> {
        let mut state = self.write()?;
        let agent = state
            .agents
            .get_mut(agent_id)
            .ok_or_else(|| AgentError::NotRegistered {
                agent_id: agent_id.to_string(),
            })?;
        f(agent);
        agent.touch();
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::{CourierError, BROADCAST_RECIPIENT};

    fn caps(list: &[Capability]) -> BTreeSet<Capability> {
        list.iter().copied().collect()
    }

    #[test]
    fn test_register_and_get() {
        let registry = AgentRegistry::new();
        let registered = registry
            .register(
                "Agent-1",
                "Builder",
                caps(&[Capability::TaskExecution]),
                Some("tcp://127.0.0.1:9000".to_string()),
                None,
            )
            .unwrap();
        assert!(registered);

        let agent = registry.get("Agent-1").unwrap().unwrap();
        assert_eq!(agent.name, "Builder");
        assert_eq!(agent.status, AgentStatus::Online);
        assert_eq!(agent.endpoint.as_deref(), Some("tcp://127.0.0.1:9000"));
        assert!(registry.get("Agent-2").unwrap().is_none());
        assert_eq!(registry.len().unwrap(), 1);
    }

    #[test]
    fn test_register_stores_metadata_and_replaces_it_on_upsert() {
        let registry = AgentRegistry::new();
        let mut metadata = Map::new();
        metadata.insert("region".to_string(), Value::from("eu-west"));
        registry
            .register("a", "A", BTreeSet::new(), None, Some(metadata))
            .unwrap();
        let agent = registry.get("a").unwrap().unwrap();
        assert_eq!(agent.metadata.get("region"), Some(&Value::from("eu-west")));

        registry.register("a", "A", BTreeSet::new(), None, None).unwrap();
        assert!(registry.get("a").unwrap().unwrap().metadata.is_empty());
    }

    #[test]
    fn test_get_by_capability() {
        let registry = AgentRegistry::new();
        registry
            .register("a", "A", caps(&[Capability::TaskExecution, Capability::Testing]), None, None)
            .unwrap();
        registry
            .register("b", "B", caps(&[Capability::Testing]), None, None)
            .unwrap();

        let testers = registry.get_by_capability(Capability::Testing).unwrap();
        assert_eq!(testers.into_iter().collect::<Vec<_>>(), vec!["a", "b"]);
        let executors = registry.get_by_capability(Capability::TaskExecution).unwrap();
        assert_eq!(executors.len(), 1);
        assert!(registry
            .get_by_capability(Capability::Security)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_reregister_is_upsert_and_drops_stale_index() {
        let registry = AgentRegistry::new();
        registry
            .register("a", "A", caps(&[Capability::Planning]), None, None)
            .unwrap();
        registry.update_status("a", AgentStatus::Error).unwrap();
        registry.assign_task("a", "task-1").unwrap();

        let again = registry
            .register("a", "A v2", caps(&[Capability::Analysis]), None, None)
            .unwrap();
        assert!(again);

        let agent = registry.get("a").unwrap().unwrap();
        assert_eq!(agent.name, "A v2");
        assert_eq!(agent.status, AgentStatus::Online);
        assert_eq!(agent.current_tasks, vec!["task-1".to_string()]);
        assert!(registry
            .get_by_capability(Capability::Planning)
            .unwrap()
            .is_empty());
        assert!(registry
            .get_by_capability(Capability::Analysis)
            .unwrap()
            .contains("a"));
        assert_eq!(registry.len().unwrap(), 1);
    }

    #[test]
    fn test_register_rejects_empty_and_reserved_ids() {
        let registry = AgentRegistry::new();
        assert!(matches!(
            registry.register("", "nobody", BTreeSet::new(), None, None),
            Err(CourierError::Validation(ValidationError::RequiredFieldMissing { .. }))
        ));
        assert!(matches!(
            registry.register(BROADCAST_RECIPIENT, "everyone", BTreeSet::new(), None, None),
            Err(CourierError::Validation(ValidationError::ReservedIdentifier { .. }))
        ));
        assert!(registry.is_empty().unwrap());
    }

    #[test]
    fn test_update_status_unknown_agent() {
        let registry = AgentRegistry::new();
        assert!(!registry.update_status("ghost", AgentStatus::Busy).unwrap());
        assert!(!registry.heartbeat("ghost").unwrap());
    }

    #[test]
    fn test_update_status_touches_last_seen() {
        let registry = AgentRegistry::new();
        registry.register("a", "A", BTreeSet::new(), None, None).unwrap();
        let before = registry.get("a").unwrap().unwrap().last_seen;
        std::thread::sleep(std::time::Duration::from_millis(2));

        assert!(registry.update_status("a", AgentStatus::Busy).unwrap());
        let agent = registry.get("a").unwrap().unwrap();
        assert_eq!(agent.status, AgentStatus::Busy);
        assert!(agent.last_seen > before);
    }

    #[test]
    fn test_task_and_workflow_bookkeeping() {
        let registry = AgentRegistry::new();
        registry.register("a", "A", BTreeSet::new(), None, None).unwrap();

        registry.assign_task("a", "t1").unwrap();
        registry.assign_task("a", "t1").unwrap();
        registry.join_workflow("a", "wf").unwrap();
        let agent = registry.get("a").unwrap().unwrap();
        assert_eq!(agent.current_tasks, vec!["t1".to_string()]);
        assert_eq!(agent.workflow_participation, vec!["wf".to_string()]);

        assert!(registry.complete_task("a", "t1").unwrap());
        assert!(!registry.complete_task("a", "t1").unwrap());

        assert!(matches!(
            registry.assign_task("ghost", "t1"),
            Err(CourierError::Agent(AgentError::NotRegistered { .. }))
        ));
    }

    #[test]
    fn test_list_sorted_by_id() {
        let registry = AgentRegistry::new();
        for id in ["c", "a", "b"] {
            registry.register(id, id, BTreeSet::new(), None, None).unwrap();
        }
        let ids: Vec<String> = registry
            .list()
            .unwrap()
            .into_iter()
            .map(|a| a.agent_id)
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
