//! Permission types
//!
//! This module defines the resolved map produced by the resolvers and the
//! delta applied to live attachments.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::store::fold_name;

/// Stable identifier of a subject (player).
///
/// Identifiers are compared case-insensitively; they are stored folded with
/// [`fold_name`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubjectId(String);

impl SubjectId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(fold_name(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubjectId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for SubjectId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl AsRef<str> for SubjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Ordered node -> bool map.
///
/// Values follow "last write wins": inserting an existing node replaces its
/// value. Position is tracked separately from the value: every insert stamps
/// the node with a fresh sequence number, so the most recently written node
/// iterates last. Ordering only serves dumps and debugging.
#[derive(Debug, Clone, Default)]
pub struct PermissionMap {
    values: HashMap<String, (u64, bool)>,
    order: BTreeMap<u64, String>,
    next: u64,
}

impl PermissionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `node` to `value`, moving it to the end. Returns the previous value.
    pub fn insert(&mut self, node: impl Into<String>, value: bool) -> Option<bool> {
        let node = node.into();
        let seq = self.next;
        self.next += 1;

        let previous = self.values.insert(node.clone(), (seq, value));
        if let Some((old_seq, _)) = previous {
            self.order.remove(&old_seq);
        }
        self.order.insert(seq, node);
        previous.map(|(_, v)| v)
    }

    pub fn remove(&mut self, node: &str) -> Option<bool> {
        let (seq, value) = self.values.remove(node)?;
        self.order.remove(&seq);
        Some(value)
    }

    pub fn get(&self, node: &str) -> Option<bool> {
        self.values.get(node).map(|(_, v)| *v)
    }

    pub fn contains_key(&self, node: &str) -> bool {
        self.values.contains_key(node)
    }

    /// Fold `layer` over this map: for every node in `layer`, its value wins.
    pub fn overlay(&mut self, layer: &PermissionMap) {
        for (node, value) in layer.iter() {
            self.insert(node, value);
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Nodes and values in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> + '_ {
        self.order
            .values()
            .map(move |node| (node.as_str(), self.values[node].1))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.order.values().map(String::as_str)
    }
}

impl PartialEq for PermissionMap {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl Eq for PermissionMap {}

impl<S: Into<String>> FromIterator<(S, bool)> for PermissionMap {
    fn from_iter<I: IntoIterator<Item = (S, bool)>>(iter: I) -> Self {
        let mut map = PermissionMap::new();
        map.extend(iter);
        map
    }
}

impl<S: Into<String>> Extend<(S, bool)> for PermissionMap {
    fn extend<I: IntoIterator<Item = (S, bool)>>(&mut self, iter: I) {
        for (node, value) in iter {
            self.insert(node, value);
        }
    }
}

impl Serialize for PermissionMap {
    fn serialize<Ser: Serializer>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (node, value) in self.iter() {
            map.serialize_entry(node, &value)?;
        }
        map.end()
    }
}

/// Changes needed to turn an installed node set into a target map
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionDelta {
    /// Nodes installed but absent from the target (sorted)
    pub removed: Vec<String>,
    /// Nodes new or changed in the target, in target order
    pub upserted: Vec<(String, bool)>,
}

impl PermissionDelta {
    /// Compute the delta from `installed` to `target`
    pub fn between(installed: &HashMap<String, bool>, target: &PermissionMap) -> Self {
        let mut removed: Vec<String> = installed
            .keys()
            .filter(|node| !target.contains_key(node))
            .cloned()
            .collect();
        removed.sort();

        let upserted = target
            .iter()
            .filter(|(node, value)| installed.get(*node) != Some(value))
            .map(|(node, value)| (node.to_string(), value))
            .collect();

        Self { removed, upserted }
    }

    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.upserted.is_empty()
    }

    /// Number of individual node operations
    pub fn len(&self) -> usize {
        self.removed.len() + self.upserted.len()
    }
}
