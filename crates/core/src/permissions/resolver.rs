//! Shared resolver state and store-reading helpers

use crate::config::EngineConfig;
use crate::diagnostics::{DiagnosticsSink, Warning};
use crate::error::{StoreError, StoreResult};
use crate::store::{ConfigStore, NodePath};

use super::types::PermissionMap;

/// Read-only view used for one resolution pass.
///
/// Holds a shared borrow of the store, so the configuration cannot change
/// while a pass is running.
pub struct Resolver<'a, S: ?Sized> {
    pub(super) store: &'a S,
    pub(super) config: &'a EngineConfig,
    pub(super) sink: &'a dyn DiagnosticsSink,
}

impl<S: ?Sized> Clone for Resolver<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: ?Sized> Copy for Resolver<'_, S> {}

impl<'a, S: ConfigStore + ?Sized> Resolver<'a, S> {
    pub fn new(store: &'a S, config: &'a EngineConfig, sink: &'a dyn DiagnosticsSink) -> Self {
        Self {
            store,
            config,
            sink,
        }
    }

    pub fn store(&self) -> &'a S {
        self.store
    }

    pub fn config(&self) -> &'a EngineConfig {
        self.config
    }

    /// Turn a recoverable store error into a warning and a default value
    pub(crate) fn recover<T: Default>(&self, result: StoreResult<T>) -> StoreResult<T> {
        match result {
            Err(StoreError::WrongType { path, found, .. }) => {
                self.sink.warn(Warning::MalformedNesting { path, found });
                Ok(T::default())
            }
            other => other,
        }
    }

    /// Read a flat node -> bool table.
    ///
    /// Non-boolean nodes are skipped and reported once per table.
    pub(crate) fn read_nodes(&self, path: &NodePath) -> StoreResult<PermissionMap> {
        let mut nodes = PermissionMap::new();
        let Some(keys) = self.recover(self.store.keys(path))? else {
            return Ok(nodes);
        };

        let mut skipped = Vec::new();
        for key in keys {
            match self.store.get_bool(&path.child(key.as_str())) {
                Ok(Some(value)) => {
                    nodes.insert(key, value);
                }
                Ok(None) => {}
                Err(err) if err.is_recoverable() => skipped.push(key),
                Err(err) => return Err(err),
            }
        }

        if let Some((first, rest)) = skipped.split_first() {
            self.sink.warn(Warning::NonBooleanNodes {
                path: path.to_string(),
                first: first.clone(),
                additional: rest.len(),
            });
        }
        Ok(nodes)
    }

    /// Read an ordered list of group names
    pub(crate) fn read_list(&self, path: &NodePath) -> StoreResult<Option<Vec<String>>> {
        self.recover(self.store.get_string_list(path))
    }
}
