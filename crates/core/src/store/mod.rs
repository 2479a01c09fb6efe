//! Configuration store contract
//!
//! The resolver never owns group or user definitions. It reads them through
//! the [`ConfigStore`] trait, which models a hierarchical document addressed
//! by slash-delimited paths:
//!
//! ```text
//! groups/<name>/permissions          node -> bool
//! groups/<name>/inheritance          [parent, ...]
//! groups/<name>/worlds/<world>       node -> bool
//! users/<id>/groups                  [group, ...]
//! users/<id>/permissions             node -> bool
//! users/<id>/worlds/<world>          node -> bool
//! ```
//!
//! Permission nodes contain dots (`permissions.build`), so `/` is the only
//! path delimiter. [`TomlStore`] is the bundled implementation.

mod defaults;
mod document;

use std::fmt;

use crate::error::StoreResult;

pub use defaults::STOCK_DOCUMENT;
pub use document::TomlStore;

/// Top-level table holding group definitions
pub const GROUPS: &str = "groups";
/// Top-level table holding user definitions
pub const USERS: &str = "users";
/// Flat node -> bool table of a group or user
pub const PERMISSIONS: &str = "permissions";
/// Per-world overlay tables of a group or user
pub const WORLDS: &str = "worlds";
/// Parent list of a group
pub const INHERITANCE: &str = "inheritance";
/// Group membership list of a user
pub const MEMBERSHIP: &str = "groups";

/// Case-folded form of a group or user name.
///
/// Every name comparison in the crate goes through this fold (Unicode
/// lowercase), so store lookups, subject ids and cycle tracking agree.
pub fn fold_name(name: &str) -> String {
    name.to_lowercase()
}

/// Whether two group or user names refer to the same entry
pub fn same_name(a: &str, b: &str) -> bool {
    a == b || fold_name(a) == fold_name(b)
}

/// A path into the hierarchical store
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NodePath {
    segments: Vec<String>,
}

impl NodePath {
    /// The document root
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a slash-delimited path, ignoring empty segments
    pub fn parse(path: &str) -> Self {
        Self {
            segments: path
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// Path to a child of this node
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// `groups/<name>`
    pub fn group(name: &str) -> Self {
        Self::root().child(GROUPS).child(name)
    }

    /// `users/<id>`
    pub fn user(id: &str) -> Self {
        Self::root().child(USERS).child(id)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

/// A value written through [`ConfigStore::set`]
#[derive(Debug, Clone, PartialEq)]
pub enum Leaf {
    Bool(bool),
    StringList(Vec<String>),
    /// An empty table
    Table,
}

/// Read/write access to the backing configuration.
///
/// Reads take `&self`: a shared borrow of the store is the immutable snapshot
/// a resolution pass works against. Lookups of individual path segments are
/// case-insensitive.
pub trait ConfigStore {
    /// Identity of the store for diagnostic messages (file path or label)
    fn current_path(&self) -> String;

    /// Whether any node (table or leaf) exists at `path`
    fn exists(&self, path: &NodePath) -> StoreResult<bool>;

    /// Keys of the table at `path`, or `None` when nothing is there.
    ///
    /// Returns `StoreError::WrongType` if the node is a leaf.
    fn keys(&self, path: &NodePath) -> StoreResult<Option<Vec<String>>>;

    /// Boolean leaf at `path`
    fn get_bool(&self, path: &NodePath) -> StoreResult<Option<bool>>;

    /// Ordered string list at `path`
    fn get_string_list(&self, path: &NodePath) -> StoreResult<Option<Vec<String>>>;

    /// Write a value, creating intermediate tables
    fn set(&mut self, path: &NodePath, value: Leaf) -> StoreResult<()>;

    /// Remove the node at `path`; returns whether anything was removed
    fn remove(&mut self, path: &NodePath) -> StoreResult<bool>;

    /// Make all writes durable
    fn flush(&mut self) -> StoreResult<()>;
}
