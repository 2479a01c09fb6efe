//! Group resolution
//!
//! A group's map is built by folding, in order:
//!
//! 1. each parent in its `inheritance` list (later parents win)
//! 2. its own `permissions`
//! 3. its `worlds.<environment>` overlay
//!
//! Each step overrides the one before it on conflicting nodes.

use std::collections::HashSet;

use crate::diagnostics::Warning;
use crate::error::StoreResult;
use crate::store::{fold_name, ConfigStore, NodePath, INHERITANCE, PERMISSIONS, WORLDS};

use super::resolver::Resolver;
use super::types::PermissionMap;

impl<S: ConfigStore + ?Sized> Resolver<'_, S> {
    /// Resolve `group` in `environment`.
    ///
    /// Undefined groups resolve to an empty map.
    pub fn resolve_group(&self, group: &str, environment: Option<&str>) -> StoreResult<PermissionMap> {
        let mut visited = HashSet::new();
        self.resolve_group_with(group, environment, &mut visited)
    }

    /// Resolve `group` with an explicit set of groups already being expanded.
    ///
    /// Group names in `visited` are folded with [`fold_name`]. If `group` is already in the
    /// set, a cyclic inheritance warning is emitted and the branch contributes
    /// nothing.
    pub fn resolve_group_with(
        &self,
        group: &str,
        environment: Option<&str>,
        visited: &mut HashSet<String>,
    ) -> StoreResult<PermissionMap> {
        self.expand_group(group, environment, visited, None)
    }

    fn expand_group(
        &self,
        group: &str,
        environment: Option<&str>,
        visited: &mut HashSet<String>,
        referrer: Option<&str>,
    ) -> StoreResult<PermissionMap> {
        let key = fold_name(group);
        if visited.contains(&key) {
            self.sink.warn(Warning::CyclicInheritance {
                group: referrer.unwrap_or(group).to_string(),
                parent: group.to_string(),
            });
            return Ok(PermissionMap::new());
        }

        let base = NodePath::group(group);
        if self.recover(self.store.keys(&base))?.is_none() {
            tracing::trace!("Group {} is not defined", group);
            return Ok(PermissionMap::new());
        }

        let parents = self.read_list(&base.child(INHERITANCE))?.unwrap_or_default();
        visited.insert(key.clone());
        let inherited = self.fold_parents(group, &parents, environment, visited);
        visited.remove(&key);
        let mut perms = inherited?;

        perms.overlay(&self.read_nodes(&base.child(PERMISSIONS))?);

        if let Some(world) = environment {
            perms.overlay(&self.read_nodes(&base.child(WORLDS).child(world))?);
        }

        Ok(perms)
    }

    fn fold_parents(
        &self,
        group: &str,
        parents: &[String],
        environment: Option<&str>,
        visited: &mut HashSet<String>,
    ) -> StoreResult<PermissionMap> {
        let mut perms = PermissionMap::new();
        for parent in parents {
            perms.overlay(&self.expand_group(parent, environment, visited, Some(group))?);
        }
        Ok(perms)
    }

    /// Folded names of every group that inherits from `group`, directly
    /// or transitively, plus `group` itself.
    ///
    /// Computed as a fixed point over the parent lists of all defined
    /// groups, so cycles cannot prevent termination.
    pub fn inheritance_closure(&self, group: &str) -> StoreResult<HashSet<String>> {
        let groups_path = NodePath::root().child(crate::store::GROUPS);
        let names = self.recover(self.store.keys(&groups_path))?.unwrap_or_default();

        let mut edges = Vec::with_capacity(names.len());
        for name in names {
            let parents = self
                .read_list(&NodePath::group(&name).child(INHERITANCE))?
                .unwrap_or_default();
            let parents: Vec<String> = parents.iter().map(|p| fold_name(p)).collect();
            edges.push((fold_name(&name), parents));
        }

        let mut closure = HashSet::from([fold_name(group)]);
        loop {
            let before = closure.len();
            for (name, parents) in &edges {
                if !closure.contains(name) && parents.iter().any(|p| closure.contains(p)) {
                    closure.insert(name.clone());
                }
            }
            if closure.len() == before {
                break;
            }
        }

        Ok(closure)
    }
}
