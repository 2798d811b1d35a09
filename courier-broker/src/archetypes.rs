//! Message archetypes
//!
//! Drafts with fixed defaults for the common conversations. Every draft can
//! still be adjusted with the [`MessageDraft`] builder methods before sending.

use crate::Broker;
use courier_core::{
    AgentId, CourierResult, MessageDraft, MessageId, MessagePriority, MessageType,
    BROADCAST_RECIPIENT,
};

/// Onboarding phase instruction: CRITICAL, acknowledgment required.
pub fn onboarding(
    sender_id: impl Into<AgentId>,
    recipient_id: impl Into<AgentId>,
    phase_number: u32,
    subject: impl Into<String>,
    content: impl Into<String>,
) -> MessageDraft {
    MessageDraft::new(sender_id, recipient_id, MessageType::ONBOARDING_PHASE)
        .with_priority(MessagePriority::Critical)
        .requiring_ack(true)
        .with_phase(phase_number)
        .with_subject(subject)
        .with_content(content)
}

/// Peer coordination: NORMAL, no acknowledgment.
pub fn coordination(
    sender_id: impl Into<AgentId>,
    recipient_id: impl Into<AgentId>,
    subject: impl Into<String>,
    content: impl Into<String>,
) -> MessageDraft {
    MessageDraft::new(sender_id, recipient_id, MessageType::COORDINATION)
        .with_priority(MessagePriority::Normal)
        .with_subject(subject)
        .with_content(content)
}

/// Announcement to every agent: NORMAL, no acknowledgment.
pub fn broadcast(
    sender_id: impl Into<AgentId>,
    subject: impl Into<String>,
    content: impl Into<String>,
) -> MessageDraft {
    MessageDraft::new(sender_id, BROADCAST_RECIPIENT, MessageType::BROADCAST)
        .with_priority(MessagePriority::Normal)
        .with_subject(subject)
        .with_content(content)
}

/// Task hand-out: HIGH, correlated to `task_id`.
pub fn task_assignment(
    sender_id: impl Into<AgentId>,
    recipient_id: impl Into<AgentId>,
    task_id: impl Into<String>,
    subject: impl Into<String>,
    content: impl Into<String>,
    requires_ack: bool,
) -> MessageDraft {
    MessageDraft::new(sender_id, recipient_id, MessageType::TASK_ASSIGNMENT)
        .with_priority(MessagePriority::High)
        .requiring_ack(requires_ack)
        .with_task(task_id)
        .with_subject(subject)
        .with_content(content)
}

/// Workflow progress note: NORMAL coordination correlated to `workflow_id`.
pub fn workflow_update(
    sender_id: impl Into<AgentId>,
    recipient_id: impl Into<AgentId>,
    workflow_id: impl Into<String>,
    subject: impl Into<String>,
    content: impl Into<String>,
) -> MessageDraft {
    MessageDraft::new(sender_id, recipient_id, MessageType::COORDINATION)
        .with_priority(MessagePriority::Normal)
        .with_workflow(workflow_id)
        .with_subject(subject)
        .with_content(content)
}

impl Broker {
    pub fn send_onboarding(
        &self,
        sender_id: &str,
        recipient_id: &str,
        phase_number: u32,
        subject: &str,
        content: &str,
    ) -> CourierResult<MessageId> {
        self.send(onboarding(sender_id, recipient_id, phase_number, subject, content))
    }

    pub fn send_coordination(
        &self,
        sender_id: &str,
        recipient_id: &str,
        subject: &str,
        content: &str,
    ) -> CourierResult<MessageId> {
        self.send(coordination(sender_id, recipient_id, subject, content))
    }

    pub fn send_broadcast(
        &self,
        sender_id: &str,
        subject: &str,
        content: &str,
    ) -> CourierResult<MessageId> {
        self.send(broadcast(sender_id, subject, content))
    }

    pub fn send_task_assignment(
        &self,
        sender_id: &str,
        recipient_id: &str,
        task_id: &str,
        subject: &str,
        content: &str,
        requires_ack: bool,
    ) -> CourierResult<MessageId> {
        self.send(task_assignment(
            sender_id,
            recipient_id,
            task_id,
            subject,
            content,
            requires_ack,
        ))
    }

    pub fn send_workflow_update(
        &self,
        sender_id: &str,
        recipient_id: &str,
        workflow_id: &str,
        subject: &str,
        content: &str,
    ) -> CourierResult<MessageId> {
        self.send(workflow_update(
            sender_id,
            recipient_id,
            workflow_id,
            subject,
            content,
        ))
    }
}
