//! Lifecycle transitions
//!
//! Every operation here is one check-and-set inside a single store update,
//! so concurrent callers racing on the same message see exactly one `true`.
//! Ineligible calls return `Ok(false)` and change nothing, except that an
//! overdue message observed by any mutation is moved to Expired.
//!
//! Broadcast messages keep one receipt per agent. Acknowledge, read and
//! delivery marks write the caller's receipt; cancel, retry and expiry act
//! on the broadcast itself.

use crate::Broker;
use chrono::Utc;
use courier_core::{CourierResult, MessageStatus, Timestamp};
use courier_storage::MessageEntry;

/// Move an overdue Pending/Delivered message to Expired.
/// Returns true if this call made the transition.
fn observe_expiry(entry: &mut MessageEntry, now: Timestamp) -> bool {
    let message = &mut entry.message;
    if message.status.is_active() && message.is_expired(now) {
        message.status = MessageStatus::Expired;
        true
    } else {
        false
    }
}

impl Broker {
    /// Acknowledge a message on behalf of `agent_id`.
    ///
    /// Succeeds once, from Pending or Delivered, for a message that requires
    /// acknowledgment and is addressed to the caller.
    pub fn acknowledge(&self, message_id: &str, agent_id: &str) -> CourierResult<bool> {
        let now = Utc::now();
        let mut expired = false;
        let outcome = self.store.update(message_id, &mut |entry: &mut MessageEntry| {
            expired = observe_expiry(entry, now);
            if !entry.message.requires_acknowledgment || !entry.message.is_addressed_to(agent_id) {
                return false;
            }
            let mut receipt = entry.receipt_for(agent_id);
            if !receipt.status.can_transition_to(MessageStatus::Acknowledged) {
                return false;
            }
            receipt.status = MessageStatus::Acknowledged;
            receipt.acknowledged_at = Some(now);
            entry.set_receipt_for(agent_id, receipt);
            true
        })?;

        self.log_transition(message_id, agent_id, "acknowledge", outcome, expired);
        Ok(outcome.unwrap_or(false))
    }

    /// Mark a message read on behalf of `agent_id`.
    ///
    /// Allowed from Acknowledged, or from Delivered when the message does
    /// not require acknowledgment. A Pending message must be delivered or
    /// acknowledged first.
    pub fn mark_read(&self, message_id: &str, agent_id: &str) -> CourierResult<bool> {
        let now = Utc::now();
        let mut expired = false;
        let outcome = self.store.update(message_id, &mut |entry: &mut MessageEntry| {
            expired = observe_expiry(entry, now);
            if !entry.message.is_addressed_to(agent_id) {
                return false;
            }
            let mut receipt = entry.receipt_for(agent_id);
            let allowed = match receipt.status {
                MessageStatus::Acknowledged => true,
                MessageStatus::Delivered => !entry.message.requires_acknowledgment,
                _ => false,
            };
            if !allowed {
                return false;
            }
            receipt.status = MessageStatus::Read;
            receipt.read_at = Some(now);
            entry.set_receipt_for(agent_id, receipt);
            true
        })?;

        self.log_transition(message_id, agent_id, "mark_read", outcome, expired);
        Ok(outcome.unwrap_or(false))
    }

    /// Record that `agent_id` has picked the message up (Pending -> Delivered).
    pub fn mark_delivered(&self, message_id: &str, agent_id: &str) -> CourierResult<bool> {
        let now = Utc::now();
        let mut expired = false;
        let outcome = self.store.update(message_id, &mut |entry: &mut MessageEntry| {
            expired = observe_expiry(entry, now);
            if !entry.message.is_addressed_to(agent_id) {
                return false;
            }
            let mut receipt = entry.receipt_for(agent_id);
            if receipt.status != MessageStatus::Pending {
                return false;
            }
            receipt.status = MessageStatus::Delivered;
            receipt.delivered_at = Some(now);
            entry.set_receipt_for(agent_id, receipt);
            true
        })?;

        self.log_transition(message_id, agent_id, "mark_delivered", outcome, expired);
        Ok(outcome.unwrap_or(false))
    }

    /// Cancel a Pending message. Only its sender may cancel it.
    pub fn cancel(&self, message_id: &str, requester_id: &str) -> CourierResult<bool> {
        let now = Utc::now();
        let mut expired = false;
        let outcome = self.store.update(message_id, &mut |entry: &mut MessageEntry| {
            expired = observe_expiry(entry, now);
            if entry.message.sender_id != requester_id
                || entry.message.status != MessageStatus::Pending
            {
                return false;
            }
            entry.message.status = MessageStatus::Cancelled;
            true
        })?;

        self.log_transition(message_id, requester_id, "cancel", outcome, expired);
        Ok(outcome.unwrap_or(false))
    }

    /// Count one delivery retry. The message fails once its budget is spent.
    ///
    /// Returns false for unknown, expired or terminal messages and once the
    /// budget is exhausted.
    pub fn increment_retry(&self, message_id: &str) -> CourierResult<bool> {
        let now = Utc::now();
        let mut expired = false;
        let mut failed = false;
        let outcome = self.store.update(message_id, &mut |entry: &mut MessageEntry| {
            expired = observe_expiry(entry, now);
            if expired {
                return false;
            }
            let counted = entry.message.increment_retry();
            failed = entry.message.status == MessageStatus::Failed;
            counted
        })?;

        if outcome == Some(true) && failed {
            tracing::warn!(message_id = %message_id, "Retry budget exhausted; message failed");
        }
        if expired {
            tracing::debug!(message_id = %message_id, "Message expired");
        }
        Ok(outcome.unwrap_or(false))
    }

    /// Expire every active message whose TTL has elapsed at `now`.
    /// Returns how many messages were expired.
    pub fn expire_overdue(&self, now: Timestamp) -> CourierResult<usize> {
        let expired = self
            .store
            .update_all(&mut |entry: &mut MessageEntry| observe_expiry(entry, now))?;
        if expired > 0 {
            tracing::debug!(expired, "Overdue messages expired");
        }
        Ok(expired)
    }

    fn log_transition(
        &self,
        message_id: &str,
        agent_id: &str,
        operation: &'static str,
        outcome: Option<bool>,
        expired: bool,
    ) {
        if expired {
            tracing::debug!(message_id = %message_id, "Message expired");
        }
        match outcome {
            Some(true) => tracing::debug!(
                message_id = %message_id,
                agent_id = %agent_id,
                operation,
                "Lifecycle transition applied"
            ),
            Some(false) => tracing::trace!(
                message_id = %message_id,
                agent_id = %agent_id,
                operation,
                "Lifecycle transition not eligible"
            ),
            None => tracing::trace!(
                message_id = %message_id,
                operation,
                "Lifecycle transition on unknown message"
            ),
        }
    }
}
