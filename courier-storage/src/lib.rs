//! COURIER Storage - Message Store Trait and In-Memory Implementation
//!
//! Defines the storage abstraction for messages. The store keeps, per
//! message, the insertion ordinal used for FIFO tie-breaking and the
//! per-agent receipts of broadcast messages, all behind one lock so a
//! lifecycle transition is a single check-and-set.

use courier_core::{
    AgentId, CourierResult, EntityType, Message, MessageId, Receipt, StorageError,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

// ============================================================================
// MESSAGE ENTRY
// ============================================================================

/// A stored message plus its store-side bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEntry {
    /// The message as sent, with its own lifecycle fields
    pub message: Message,
    /// Position in insertion order (0-based, strictly increasing)
    pub ordinal: u64,
    /// Per-agent lifecycle state for broadcast messages
    pub receipts: HashMap<AgentId, Receipt>,
}

impl MessageEntry {
    /// Wrap a freshly appended message.
    pub fn new(message: Message, ordinal: u64) -> Self {
        Self {
            message,
            ordinal,
            receipts: HashMap::new(),
        }
    }

    /// Lifecycle state of this message as `agent_id` sees it.
    ///
    /// Direct messages have a single state. For broadcast messages an
    /// agent's own acknowledgment or read survives a later cancel/expiry of
    /// the broadcast; anything still in flight is overridden by it.
    pub fn receipt_for(&self, agent_id: &str) -> Receipt {
        if !self.message.is_broadcast() {
            return self.message.receipt();
        }
        let base = self.message.receipt();
        match self.receipts.get(agent_id) {
            Some(receipt) if !(base.status.is_aborted() && receipt.status.is_active()) => *receipt,
            _ if base.status.is_aborted() => base,
            _ => Receipt::pending(),
        }
    }

    /// Store `agent_id`'s lifecycle state.
    pub fn set_receipt_for(&mut self, agent_id: &str, receipt: Receipt) {
        if self.message.is_broadcast() {
            self.receipts.insert(agent_id.to_string(), receipt);
        } else {
            self.message.apply_receipt(&receipt);
        }
    }

    /// Copy of the message with `agent_id`'s lifecycle state applied.
    pub fn view_for(&self, agent_id: &str) -> Message {
        let mut view = self.message.clone();
        if view.is_broadcast() {
            view.apply_receipt(&self.receipt_for(agent_id));
        }
        view
    }
}

// ============================================================================
// STORAGE TRAIT
// ============================================================================

/// Storage trait for messages.
///
/// Messages are append-only: there is no delete. Mutation goes through
/// [`update`](MessageStore::update), whose closure runs under the store's
/// write lock and reports whether it changed anything.
pub trait MessageStore: Send + Sync {
    /// Insert a new message. Fails if the id already exists.
    fn append(&self, message: Message) -> CourierResult<MessageId>;

    /// Get a message by id.
    fn get(&self, id: &str) -> CourierResult<Option<Message>>;

    /// Get a message with its bookkeeping.
    fn entry(&self, id: &str) -> CourierResult<Option<MessageEntry>>;

    /// Number of stored messages.
    fn len(&self) -> CourierResult<usize>;

    /// Whether the store holds no messages.
    fn is_empty(&self) -> CourierResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Copies of every message, in insertion order.
    fn all(&self) -> CourierResult<Vec<Message>>;

    /// Copies of the entries matching `predicate`, in insertion order.
    fn scan(&self, predicate: &dyn Fn(&MessageEntry) -> bool) -> CourierResult<Vec<MessageEntry>>;

    /// Run `mutation` against one entry under the write lock.
    /// Returns `None` if the id is unknown, else the closure's result.
    fn update(
        &self,
        id: &str,
        mutation: &mut dyn FnMut(&mut MessageEntry) -> bool,
    ) -> CourierResult<Option<bool>>;

    /// Run `mutation` against every entry under one write lock.
    /// Returns how many entries it reported as changed.
    fn update_all(&self, mutation: &mut dyn FnMut(&mut MessageEntry) -> bool)
        -> CourierResult<usize>;
}

// ============================================================================
// IN-MEMORY STORE
// ============================================================================

#[derive(Debug, Default)]
struct StoreState {
    entries: HashMap<MessageId, MessageEntry>,
    next_ordinal: u64,
}

/// In-memory message store.
///
/// Cloning shares the underlying state.
#[derive(Clone, Default)]
pub struct InMemoryMessageStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryMessageStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> CourierResult<RwLockReadGuard<'_, StoreState>> {
        self.state
            .read()
            .map_err(|_| StorageError::LockPoisoned.into())
    }

    fn write(&self) -> CourierResult<RwLockWriteGuard<'_, StoreState>> {
        self.state
            .write()
            .map_err(|_| StorageError::LockPoisoned.into())
    }
}

impl fmt::Debug for InMemoryMessageStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let len = self.len().ok();
        f.debug_struct("InMemoryMessageStore")
            .field("len", &len)
            .finish()
    }
}

fn in_insertion_order(mut entries: Vec<MessageEntry>) -> Vec<MessageEntry> {
    entries.sort_by_key(|entry| entry.ordinal);
    entries
}

impl MessageStore for InMemoryMessageStore {
    fn append(&self, message: Message) -> CourierResult<MessageId> {
        let mut state = self.write()?;
        if state.entries.contains_key(&message.id) {
            return Err(StorageError::InsertFailed {
                entity_type: EntityType::Message,
                reason: format!("id {} already exists", message.id),
            }
            .into());
        }
        let ordinal = state.next_ordinal;
        state.next_ordinal += 1;
        let id = message.id.clone();
        state
            .entries
            .insert(id.clone(), MessageEntry::new(message, ordinal));
        Ok(id)
    }

    fn get(&self, id: &str) -> CourierResult<Option<Message>> {
        let state = self.read()?;
        Ok(state.entries.get(id).map(|entry| entry.message.clone()))
    }

    fn entry(&self, id: &str) -> CourierResult<Option<MessageEntry>> {
        let state = self.read()?;
        Ok(state.entries.get(id).cloned())
    }

    fn len(&self) -> CourierResult<usize> {
        Ok(self.read()?.entries.len())
    }

    fn all(&self) -> CourierResult<Vec<Message>> {
        let entries = self.scan(&|_: &MessageEntry| true)?;
        Ok(entries.into_iter().map(|entry| entry.message).collect())
    }

    fn scan(&self, predicate: &dyn Fn(&MessageEntry) -> bool) -> CourierResult<Vec<MessageEntry>> {
        let state = self.read()?;
        let matching = state
            .entries
            .values()
            .filter(|entry| predicate(entry))
            .cloned()
            .collect();
        Ok(in_insertion_order(matching))
    }

    fn update(
        &self,
        id: &str,
        mutation: &mut dyn FnMut(&mut MessageEntry) -> bool,
    ) -> CourierResult<Option<bool>> {
        let mut state = self.write()?;
        Ok(state.entries.get_mut(id).map(|entry| mutation(entry)))
    }

    fn update_all(
        &self,
        mutation: &mut dyn FnMut(&mut MessageEntry) -> bool,
    ) -> CourierResult<usize> {
        let mut state = self.write()?;
        let mut changed = 0;
        for entry in state.entries.values_mut() {
            if mutation(entry) {
                changed += 1;
            }
        }
        Ok(changed)
    }
}

// ============================================================================
// TESTS
// ============================================================================
