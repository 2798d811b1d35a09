//! Shared broker construction for integration tests.

use courier_broker::Broker;
use courier_test_utils::{fixtures, Capability, InMemoryMessageStore};
use std::sync::Arc;

/// Broker over a fresh store with the given agents registered.
pub fn broker_with_agents(agents: &[(&str, &[Capability])]) -> Broker {
    Broker::with_parts(
        fixtures::quiet_config(),
        Arc::new(InMemoryMessageStore::new()),
        fixtures::registry_with_agents(agents),
    )
    .expect("default config is valid")
}

/// Broker with no agents registered.
#[allow(dead_code)]
pub fn empty_broker() -> Broker {
    broker_with_agents(&[])
}
