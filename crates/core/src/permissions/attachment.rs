//! Live capability attachments and the synchronizer that feeds them
//!
//! An attachment is owned by the host platform: it is what actually grants
//! or denies nodes to an online player. The engine only pushes deltas into it.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::types::{PermissionDelta, PermissionMap};

/// Host-owned, mutable set of nodes granted to an active subject
pub trait Attachment: Send {
    /// Nodes currently installed
    fn installed(&self) -> HashMap<String, bool>;

    fn set(&mut self, node: &str, value: bool);

    fn unset(&mut self, node: &str);

    /// Apply a batch of changes.
    ///
    /// Hosts that can replace their backing map in one step should override
    /// this; the default issues one `unset`/`set` per node.
    fn apply_delta(&mut self, delta: &PermissionDelta) {
        for node in &delta.removed {
            self.unset(node);
        }
        for (node, value) in &delta.upserted {
            self.set(node, *value);
        }
    }

    /// Ask the host to recompute effective permissions derived from this
    /// attachment
    fn recalculate(&mut self);
}

/// Result of synchronizing one attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOutcome {
    pub removed: usize,
    pub upserted: usize,
}

/// Bring `attachment` in line with `target`.
///
/// Only the difference is applied. The recalculation signal is always sent,
/// even when nothing changed.
pub fn synchronize(attachment: &mut dyn Attachment, target: &PermissionMap) -> SyncOutcome {
    let delta = PermissionDelta::between(&attachment.installed(), target);
    if !delta.is_empty() {
        attachment.apply_delta(&delta);
    }
    attachment.recalculate();

    SyncOutcome {
        removed: delta.removed.len(),
        upserted: delta.upserted.len(),
    }
}

/// Observable state of a [`MemoryAttachment`]
#[derive(Debug, Default, Clone)]
pub struct AttachmentState {
    pub nodes: HashMap<String, bool>,
    /// Number of non-empty deltas applied
    pub deltas_applied: usize,
    /// Number of recalculation signals received
    pub recalculations: usize,
}

/// In-memory attachment.
///
/// Clones share state, so a host can keep one handle for inspection while
/// the registry owns the other.
#[derive(Debug, Default, Clone)]
pub struct MemoryAttachment {
    state: Arc<Mutex<AttachmentState>>,
}

impl MemoryAttachment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current state
    pub fn state(&self) -> AttachmentState {
        self.state.lock().clone()
    }

    /// Whether `node` is installed and granted
    pub fn has(&self, node: &str) -> bool {
        self.state.lock().nodes.get(node).copied().unwrap_or(false)
    }

    /// Raw installed value of `node`
    pub fn value(&self, node: &str) -> Option<bool> {
        self.state.lock().nodes.get(node).copied()
    }
}

impl Attachment for MemoryAttachment {
    fn installed(&self) -> HashMap<String, bool> {
        self.state.lock().nodes.clone()
    }

    fn set(&mut self, node: &str, value: bool) {
        self.state.lock().nodes.insert(node.to_string(), value);
    }

    fn unset(&mut self, node: &str) {
        self.state.lock().nodes.remove(node);
    }

    fn apply_delta(&mut self, delta: &PermissionDelta) {
        let mut state = self.state.lock();
        for node in &delta.removed {
            state.nodes.remove(node);
        }
        for (node, value) in &delta.upserted {
            state.nodes.insert(node.clone(), *value);
        }
        state.deltas_applied += 1;
    }

    fn recalculate(&mut self) {
        self.state.lock().recalculations += 1;
    }
}
