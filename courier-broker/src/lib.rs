//! COURIER Broker - In-Process Message Broker
//!
//! A typed, prioritized, pull-based message broker for agents:
//! - Direct and broadcast sends with capability-based discovery
//! - Priority and sequence ordered retrieval
//! - Acknowledgment, TTL and retry lifecycle
//! - Status snapshots for dashboards
//!
//! ```ignore
//! use courier_broker::{archetypes, Broker};
//! use courier_core::{BrokerConfig, Capability};
//!
//! let broker = Broker::new(BrokerConfig::from_env())?;
//! broker.register("Agent-1", "Builder", [Capability::TaskExecution].into(), None, None)?;
//! let id = broker.send(archetypes::onboarding("orchestrator", "Agent-1", 1, "Welcome", ""))?;
//! assert!(broker.acknowledge(&id, "Agent-1")?);
//! ```

pub mod archetypes;
mod broker;
mod delivery;
mod lifecycle;
pub mod reaper;
mod status;
pub mod telemetry;

pub use broker::Broker;
pub use delivery::delivery_order;
pub use reaper::{run_expiry_sweeper, SweeperMetrics, SweeperSnapshot};
pub use status::SystemStatus;
pub use telemetry::init_tracing;
