//! Enum types for COURIER messages and agents

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// STRING CONVERSIONS
// ============================================================================

/// Normalize a user-facing token so `TASK_EXECUTION`, `task-execution` and
/// `task execution` all compare equal.
fn normalize_token(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Declares one message-kind sub-enum together with its wire strings.
macro_rules! message_kind {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Canonical wire string.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $text, )+
                }
            }

            fn parse_normalized(token: &str) -> Option<Self> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|kind| normalize_token(kind.as_str()) == token)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

// ============================================================================
// MESSAGE TYPE
// ============================================================================

message_kind! {
    /// Agent lifecycle and onboarding traffic.
    LifecycleKind {
        Onboarding => "onboarding",
        OnboardingStart => "onboarding_start",
        OnboardingPhase => "onboarding_phase",
        OnboardingComplete => "onboarding_complete",
        Registration => "registration",
        Heartbeat => "heartbeat",
        StatusUpdate => "status_update",
        Shutdown => "shutdown",
        Training => "training",
        Recovery => "recovery",
    }
}

message_kind! {
    /// Task assignment and progress traffic.
    TaskKind {
        TaskAssignment => "task_assignment",
        TaskAccepted => "task_accepted",
        TaskRejected => "task_rejected",
        TaskProgress => "task_progress",
        TaskCompleted => "task_completed",
        TaskFailed => "task_failed",
        TaskCancelled => "task_cancelled",
        TaskEscalation => "task_escalation",
        TaskHandoff => "task_handoff",
        ContractClaim => "contract_claim",
    }
}

message_kind! {
    /// Workflow and multi-agent coordination traffic.
    WorkflowKind {
        Coordination => "coordination",
        WorkflowStart => "workflow_start",
        WorkflowUpdate => "workflow_update",
        WorkflowComplete => "workflow_complete",
        PhaseTransition => "phase_transition",
        Sync => "sync",
        Vote => "vote",
        Consensus => "consensus",
        ResourceRequest => "resource_request",
        ResourceRelease => "resource_release",
    }
}

message_kind! {
    /// System notices, alerts and command traffic.
    SystemKind {
        Broadcast => "broadcast",
        SystemAlert => "system_alert",
        Emergency => "emergency",
        Error => "error",
        Warning => "warning",
        Info => "info",
        HealthCheck => "health_check",
        ConfigUpdate => "config_update",
        Command => "command",
        Response => "response",
    }
}

/// Logical grouping of message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum MessageCategory {
    Lifecycle,
    Task,
    Workflow,
    System,
}

/// Closed set of message types, grouped by category.
///
/// Serializes to the flat wire string of the inner kind (for example
/// `"onboarding_phase"`); parsing accepts any casing and `-`/`_` spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MessageType {
    Lifecycle(LifecycleKind),
    Task(TaskKind),
    Workflow(WorkflowKind),
    System(SystemKind),
}

impl MessageType {
    pub const ONBOARDING_PHASE: MessageType = MessageType::Lifecycle(LifecycleKind::OnboardingPhase);
    pub const HEARTBEAT: MessageType = MessageType::Lifecycle(LifecycleKind::Heartbeat);
    pub const TASK_ASSIGNMENT: MessageType = MessageType::Task(TaskKind::TaskAssignment);
    pub const COORDINATION: MessageType = MessageType::Workflow(WorkflowKind::Coordination);
    pub const BROADCAST: MessageType = MessageType::System(SystemKind::Broadcast);

    /// Category this type belongs to.
    pub fn category(&self) -> MessageCategory {
        match self {
            MessageType::Lifecycle(_) => MessageCategory::Lifecycle,
            MessageType::Task(_) => MessageCategory::Task,
            MessageType::Workflow(_) => MessageCategory::Workflow,
            MessageType::System(_) => MessageCategory::System,
        }
    }

    /// Canonical wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Lifecycle(kind) => kind.as_str(),
            MessageType::Task(kind) => kind.as_str(),
            MessageType::Workflow(kind) => kind.as_str(),
            MessageType::System(kind) => kind.as_str(),
        }
    }

    /// Whether this type is part of agent onboarding.
    pub fn is_onboarding(&self) -> bool {
        matches!(
            self,
            MessageType::Lifecycle(
                LifecycleKind::Onboarding
                    | LifecycleKind::OnboardingStart
                    | LifecycleKind::OnboardingPhase
                    | LifecycleKind::OnboardingComplete
            )
        )
    }

    /// Iterate every message type across all categories.
    pub fn all() -> impl Iterator<Item = MessageType> {
        LifecycleKind::ALL
            .iter()
            .copied()
            .map(MessageType::Lifecycle)
            .chain(TaskKind::ALL.iter().copied().map(MessageType::Task))
            .chain(WorkflowKind::ALL.iter().copied().map(MessageType::Workflow))
            .chain(SystemKind::ALL.iter().copied().map(MessageType::System))
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = MessageTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = normalize_token(s);
        LifecycleKind::parse_normalized(&token)
            .map(MessageType::Lifecycle)
            .or_else(|| TaskKind::parse_normalized(&token).map(MessageType::Task))
            .or_else(|| WorkflowKind::parse_normalized(&token).map(MessageType::Workflow))
            .or_else(|| SystemKind::parse_normalized(&token).map(MessageType::System))
            .ok_or_else(|| MessageTypeParseError(s.to_string()))
    }
}

impl Serialize for MessageType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MessageType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Error when parsing an invalid message type string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTypeParseError(pub String);

impl fmt::Display for MessageTypeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid message type: {}", self.0)
    }
}

impl std::error::Error for MessageTypeParseError {}

// ============================================================================
// PRIORITY
// ============================================================================

/// Message priority, serialized as its integer value 1..=5.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum MessagePriority {
    Low = 1,
    #[default]
    Normal = 2,
    High = 3,
    Urgent = 4,
    Critical = 5,
}

impl MessagePriority {
    pub const ALL: [MessagePriority; 5] = [
        MessagePriority::Low,
        MessagePriority::Normal,
        MessagePriority::High,
        MessagePriority::Urgent,
        MessagePriority::Critical,
    ];

    /// Integer value (1 = lowest, 5 = most urgent).
    pub fn value(self) -> u8 {
        self as u8
    }

    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessagePriority::Low => "low",
            MessagePriority::Normal => "normal",
            MessagePriority::High => "high",
            MessagePriority::Urgent => "urgent",
            MessagePriority::Critical => "critical",
        }
    }
}

impl From<MessagePriority> for u8 {
    fn from(priority: MessagePriority) -> Self {
        priority.value()
    }
}

impl TryFrom<u8> for MessagePriority {
    type Error = PriorityParseError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        MessagePriority::ALL
            .iter()
            .copied()
            .find(|p| p.value() == value)
            .ok_or_else(|| PriorityParseError(value.to_string()))
    }
}

impl fmt::Display for MessagePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessagePriority {
    type Err = PriorityParseError;

    /// Accepts either the name (`"high"`) or the integer (`"3"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(value) = s.trim().parse::<u8>() {
            return MessagePriority::try_from(value);
        }
        let token = normalize_token(s);
        MessagePriority::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == token)
            .ok_or_else(|| PriorityParseError(s.to_string()))
    }
}

/// Error when a priority is outside 1..=5 or has an unknown name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityParseError(pub String);

impl fmt::Display for PriorityParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid message priority: {} (expected 1..=5)", self.0)
    }
}

impl std::error::Error for PriorityParseError {}

// ============================================================================
// MESSAGE STATUS
// ============================================================================

/// Lifecycle status of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum MessageStatus {
    #[default]
    Pending,
    Delivered,
    Acknowledged,
    Read,
    Expired,
    Failed,
    Cancelled,
}

impl MessageStatus {
    pub const ALL: [MessageStatus; 7] = [
        MessageStatus::Pending,
        MessageStatus::Delivered,
        MessageStatus::Acknowledged,
        MessageStatus::Read,
        MessageStatus::Expired,
        MessageStatus::Failed,
        MessageStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Pending => "pending",
            MessageStatus::Delivered => "delivered",
            MessageStatus::Acknowledged => "acknowledged",
            MessageStatus::Read => "read",
            MessageStatus::Expired => "expired",
            MessageStatus::Failed => "failed",
            MessageStatus::Cancelled => "cancelled",
        }
    }

    /// Still waiting on the recipient (counts toward queue depth).
    pub fn is_active(&self) -> bool {
        matches!(self, MessageStatus::Pending | MessageStatus::Delivered)
    }

    /// Ended without being read.
    pub fn is_aborted(&self) -> bool {
        matches!(
            self,
            MessageStatus::Expired | MessageStatus::Failed | MessageStatus::Cancelled
        )
    }

    /// No further transition is possible.
    pub fn is_terminal(&self) -> bool {
        *self == MessageStatus::Read || self.is_aborted()
    }

    /// Edges of the status graph. Read from Delivered is only valid when
    /// acknowledgment is not required; the lifecycle checks that.
    pub fn can_transition_to(&self, next: MessageStatus) -> bool {
        use MessageStatus::*;
        matches!(
            (self, next),
            (Pending, Delivered)
                | (Pending, Acknowledged)
                | (Pending, Cancelled)
                | (Pending, Expired)
                | (Pending, Failed)
                | (Delivered, Acknowledged)
                | (Delivered, Read)
                | (Delivered, Expired)
                | (Delivered, Failed)
                | (Acknowledged, Read)
                | (Acknowledged, Failed)
        )
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = normalize_token(s);
        MessageStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == token)
            .ok_or_else(|| StatusParseError(s.to_string()))
    }
}

/// Error when parsing an invalid message or agent status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusParseError(pub String);

impl fmt::Display for StatusParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid status: {}", self.0)
    }
}

impl std::error::Error for StatusParseError {}

// ============================================================================
// AGENT ENUMS
// ============================================================================

/// Coarse liveness status of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum AgentStatus {
    #[default]
    Offline,
    Online,
    Busy,
    Idle,
    Error,
    Recovering,
    Onboarding,
    Training,
}

impl AgentStatus {
    pub const ALL: [AgentStatus; 8] = [
        AgentStatus::Offline,
        AgentStatus::Online,
        AgentStatus::Busy,
        AgentStatus::Idle,
        AgentStatus::Error,
        AgentStatus::Recovering,
        AgentStatus::Onboarding,
        AgentStatus::Training,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Offline => "offline",
            AgentStatus::Online => "online",
            AgentStatus::Busy => "busy",
            AgentStatus::Idle => "idle",
            AgentStatus::Error => "error",
            AgentStatus::Recovering => "recovering",
            AgentStatus::Onboarding => "onboarding",
            AgentStatus::Training => "training",
        }
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = normalize_token(s);
        AgentStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == token)
            .ok_or_else(|| StatusParseError(s.to_string()))
    }
}

/// What an agent can do; indexed for discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum Capability {
    TaskExecution,
    Coordination,
    Monitoring,
    Analysis,
    Communication,
    Planning,
    Testing,
    Documentation,
    Integration,
    Security,
    DataProcessing,
    Reporting,
}

impl Capability {
    pub const ALL: [Capability; 12] = [
        Capability::TaskExecution,
        Capability::Coordination,
        Capability::Monitoring,
        Capability::Analysis,
        Capability::Communication,
        Capability::Planning,
        Capability::Testing,
        Capability::Documentation,
        Capability::Integration,
        Capability::Security,
        Capability::DataProcessing,
        Capability::Reporting,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::TaskExecution => "task_execution",
            Capability::Coordination => "coordination",
            Capability::Monitoring => "monitoring",
            Capability::Analysis => "analysis",
            Capability::Communication => "communication",
            Capability::Planning => "planning",
            Capability::Testing => "testing",
            Capability::Documentation => "documentation",
            Capability::Integration => "integration",
            Capability::Security => "security",
            Capability::DataProcessing => "data_processing",
            Capability::Reporting => "reporting",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = CapabilityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = normalize_token(s);
        Capability::ALL
            .iter()
            .copied()
            .find(|cap| normalize_token(cap.as_str()) == token)
            .ok_or_else(|| CapabilityParseError(s.to_string()))
    }
}

/// Error when parsing an invalid capability string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityParseError(pub String);

impl fmt::Display for CapabilityParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid capability: {}", self.0)
    }
}

impl std::error::Error for CapabilityParseError {}
