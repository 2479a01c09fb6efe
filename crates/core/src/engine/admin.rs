//! Administrative queries and mutations
//!
//! Every mutation follows the same sequence: write to the store, flush it,
//! then refresh exactly the subjects the change can affect. If the write or
//! the flush fails, the store is put back to what it held before the call.
//! A write that would not change anything is reported as
//! [`MutationOutcome::Unchanged`] and neither flushes nor refreshes.

use crate::error::{AdminError, StoreResult};
use crate::permissions::{PermissionMap, RefreshReport, SubjectId, SubjectRegistry};
use crate::store::{
    same_name, ConfigStore, Leaf, NodePath, GROUPS, INHERITANCE, MEMBERSHIP, PERMISSIONS, USERS,
    WORLDS,
};

use super::Permissions;

/// Result of an administrative mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The store was written and these subjects were re-synchronized
    Changed(RefreshReport),
    /// The store already held the requested state
    Unchanged,
}

impl MutationOutcome {
    pub fn is_changed(&self) -> bool {
        matches!(self, MutationOutcome::Changed(_))
    }
}

/// A group's own definition, without anything inherited
#[derive(Debug, Clone, PartialEq)]
pub struct GroupInfo {
    /// Name as written in the store
    pub name: String,
    pub permissions: PermissionMap,
    pub worlds: Vec<(String, PermissionMap)>,
    pub inheritance: Vec<String>,
}

/// Split an admin node argument into an optional world and the node.
///
/// `nether:permissions.build` targets the `nether` overlay, a plain node
/// targets the global table. The split is on the first `:`, so everything
/// after it belongs to the node (`nether:a:b` is node `a:b` in `nether`).
/// A node that itself contains `:` can only be set on the global table with
/// an empty world prefix (`:a:b`).
pub fn parse_node_target(target: &str) -> (Option<&str>, &str) {
    match target.split_once(':') {
        Some((world, node)) if !world.is_empty() => (Some(world), node),
        Some(("", node)) => (None, node),
        _ => (None, target),
    }
}

fn node_table(base: NodePath, world: Option<&str>) -> NodePath {
    match world {
        Some(world) => base.child(WORLDS).child(world),
        None => base.child(PERMISSIONS),
    }
}

fn contains_name(list: &[String], name: &str) -> bool {
    list.iter().any(|g| same_name(g, name))
}

impl<S: ConfigStore> Permissions<S> {
    // ========================================================================
    // Queries
    // ========================================================================

    /// Names of all defined groups, as written in the store
    pub fn group_names(&self) -> StoreResult<Vec<String>> {
        let names = self.store.keys(&NodePath::root().child(GROUPS))?;
        Ok(names.unwrap_or_default())
    }

    /// Own definition of `group`, or `None` if it is not defined
    pub fn group(&self, group: &str) -> StoreResult<Option<GroupInfo>> {
        let Some(name) = self.stored_group_name(group)? else {
            return Ok(None);
        };
        let resolver = self.resolver();
        let base = NodePath::group(&name);

        let permissions = resolver.read_nodes(&base.child(PERMISSIONS))?;
        let inheritance = resolver.read_list(&base.child(INHERITANCE))?.unwrap_or_default();

        let worlds_path = base.child(WORLDS);
        let world_names = resolver.recover(self.store.keys(&worlds_path))?.unwrap_or_default();
        let mut worlds = Vec::with_capacity(world_names.len());
        for world in world_names {
            let nodes = resolver.read_nodes(&worlds_path.child(world.as_str()))?;
            worlds.push((world, nodes));
        }

        Ok(Some(GroupInfo {
            name,
            permissions,
            worlds,
            inheritance,
        }))
    }

    /// Effective group list of `subject` (the default group when it has no
    /// entry)
    pub fn subject_groups(&self, subject: &SubjectId) -> StoreResult<Vec<String>> {
        self.resolver().membership(subject)
    }

    /// Subjects whose entry lists `group` directly, sorted.
    ///
    /// Subjects that belong to the default group only implicitly are not
    /// listed.
    pub fn group_members(&self, group: &str) -> StoreResult<Vec<SubjectId>> {
        let resolver = self.resolver();
        let users = resolver
            .recover(self.store.keys(&NodePath::root().child(USERS)))?
            .unwrap_or_default();

        let mut members = Vec::new();
        for user in users {
            let id = SubjectId::new(&user);
            let Some(groups) = resolver.explicit_membership(&id)? else {
                continue;
            };
            if contains_name(&groups, group) {
                members.push(id);
            }
        }
        members.sort();
        members.dedup();
        Ok(members)
    }

    fn stored_group_name(&self, group: &str) -> StoreResult<Option<String>> {
        Ok(self
            .group_names()?
            .into_iter()
            .find(|name| same_name(name, group)))
    }

    fn require_group(&self, group: &str) -> Result<String, AdminError> {
        self.stored_group_name(group)?
            .ok_or_else(|| AdminError::NoSuchGroup(group.to_string()))
    }
}

// Mutations snapshot the store before writing, hence the `Clone` bound.
impl<S: ConfigStore + Clone> Permissions<S> {
    // ========================================================================
    // Group mutations
    // ========================================================================

    /// Set a node on a group; `target` may be `world:node`
    pub fn set_group_permission(
        &mut self,
        registry: &mut SubjectRegistry,
        group: &str,
        target: &str,
        value: bool,
    ) -> Result<MutationOutcome, AdminError> {
        let name = self.require_group(group)?;
        let (world, node) = parse_node_target(target);
        let path = node_table(NodePath::group(&name), world).child(node);

        if matches!(self.store.get_bool(&path), Ok(Some(current)) if current == value) {
            return Ok(MutationOutcome::Unchanged);
        }
        self.commit(|store| store.set(&path, Leaf::Bool(value)))?;
        tracing::info!("Group {} now has {} = {}", name, target, value);
        Ok(MutationOutcome::Changed(self.refresh_group(registry, &name)?))
    }

    /// Remove a node from a group; `target` may be `world:node`
    pub fn unset_group_permission(
        &mut self,
        registry: &mut SubjectRegistry,
        group: &str,
        target: &str,
    ) -> Result<MutationOutcome, AdminError> {
        let name = self.require_group(group)?;
        let (world, node) = parse_node_target(target);
        let path = node_table(NodePath::group(&name), world).child(node);

        if !self.store.exists(&path)? {
            return Ok(MutationOutcome::Unchanged);
        }
        self.commit(|store| store.remove(&path).map(drop))?;
        tracing::info!("Group {} no longer has {}", name, target);
        Ok(MutationOutcome::Changed(self.refresh_group(registry, &name)?))
    }

    // ========================================================================
    // Subject mutations
    // ========================================================================

    /// Set a node on a subject; `target` may be `world:node`.
    ///
    /// A subject without an entry first gets one holding the default group,
    /// so that writing its first node does not drop the implicit membership.
    pub fn set_subject_permission(
        &mut self,
        registry: &mut SubjectRegistry,
        subject: &SubjectId,
        target: &str,
        value: bool,
    ) -> Result<MutationOutcome, AdminError> {
        let base = NodePath::user(subject.as_str());
        let (world, node) = parse_node_target(target);
        let path = node_table(base.clone(), world).child(node);

        if matches!(self.store.get_bool(&path), Ok(Some(current)) if current == value) {
            return Ok(MutationOutcome::Unchanged);
        }
        let implicit = match self.resolver().explicit_membership(subject)? {
            Some(_) => None,
            None => Some(vec![self.config.default_group.clone()]),
        };
        self.commit(|store| {
            if let Some(groups) = implicit {
                store.set(&base.child(MEMBERSHIP), Leaf::StringList(groups))?;
            }
            store.set(&path, Leaf::Bool(value))
        })?;
        tracing::info!("Player {} now has {} = {}", subject, target, value);
        Ok(MutationOutcome::Changed(self.refresh_subject(registry, subject)?))
    }

    /// Remove a node from a subject; `target` may be `world:node`
    pub fn unset_subject_permission(
        &mut self,
        registry: &mut SubjectRegistry,
        subject: &SubjectId,
        target: &str,
    ) -> Result<MutationOutcome, AdminError> {
        let (world, node) = parse_node_target(target);
        let path = node_table(NodePath::user(subject.as_str()), world).child(node);

        if !self.store.exists(&path)? {
            return Ok(MutationOutcome::Unchanged);
        }
        self.commit(|store| store.remove(&path).map(drop))?;
        tracing::info!("Player {} no longer has {}", subject, target);
        Ok(MutationOutcome::Changed(self.refresh_subject(registry, subject)?))
    }

    /// Append `group` to the subject's membership list
    pub fn add_subject_group(
        &mut self,
        registry: &mut SubjectRegistry,
        subject: &SubjectId,
        group: &str,
    ) -> Result<MutationOutcome, AdminError> {
        let mut groups = self.subject_groups(subject)?;
        if contains_name(&groups, group) {
            return Ok(MutationOutcome::Unchanged);
        }
        groups.push(group.to_string());
        self.write_membership(registry, subject, groups)
    }

    /// Remove `group` from the subject's membership list
    pub fn remove_subject_group(
        &mut self,
        registry: &mut SubjectRegistry,
        subject: &SubjectId,
        group: &str,
    ) -> Result<MutationOutcome, AdminError> {
        let mut groups = self.subject_groups(subject)?;
        if !contains_name(&groups, group) {
            return Ok(MutationOutcome::Unchanged);
        }
        groups.retain(|g| !same_name(g, group));
        self.write_membership(registry, subject, groups)
    }

    /// Replace the subject's membership list
    pub fn set_subject_groups(
        &mut self,
        registry: &mut SubjectRegistry,
        subject: &SubjectId,
        groups: Vec<String>,
    ) -> Result<MutationOutcome, AdminError> {
        if self.resolver().explicit_membership(subject)?.as_ref() == Some(&groups) {
            return Ok(MutationOutcome::Unchanged);
        }
        self.write_membership(registry, subject, groups)
    }

    fn write_membership(
        &mut self,
        registry: &mut SubjectRegistry,
        subject: &SubjectId,
        groups: Vec<String>,
    ) -> Result<MutationOutcome, AdminError> {
        let path = NodePath::user(subject.as_str()).child(MEMBERSHIP);
        tracing::info!("Player {} is now in groups {:?}", subject, groups);
        self.commit(|store| store.set(&path, Leaf::StringList(groups)))?;
        Ok(MutationOutcome::Changed(self.refresh_subject(registry, subject)?))
    }

    /// Run `write` against the store and flush it, restoring the previous
    /// contents if either step fails
    fn commit<F>(&mut self, write: F) -> StoreResult<()>
    where
        F: FnOnce(&mut S) -> StoreResult<()>,
    {
        let snapshot = self.store.clone();
        let result = write(&mut self.store).and_then(|()| self.store.flush());
        if let Err(err) = result {
            self.store = snapshot;
            tracing::warn!(
                "Write to {} failed, changes rolled back: {}",
                self.store.current_path(),
                err
            );
            return Err(err);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::error::StoreError;
    use crate::permissions::MemoryAttachment;
    use crate::store::TomlStore;

    const DOC: &str = r#"
        [groups.default.permissions]
        "chat" = true
        [groups.Builder]
        inheritance = ["default"]
        [groups.Builder.permissions]
        "build" = true
        [groups.Builder.worlds.creative]
        "fly" = true
        [groups.Builder.worlds.arena]
        "fly" = false
        [groups.mod]
        inheritance = ["builder"]

        [users.ann]
        groups = ["builder"]
        [users.Bob]
        groups = ["MOD", "default"]
        [users.cat]
        groups = []
    "#;

    struct Fixture {
        engine: Permissions<TomlStore>,
        registry: SubjectRegistry,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                engine: Permissions::new(TomlStore::parse(DOC).unwrap(), EngineConfig::default()),
                registry: SubjectRegistry::new(),
            }
        }

        fn online(&mut self, id: &str) -> MemoryAttachment {
            let attachment = MemoryAttachment::new();
            self.engine
                .register_subject(
                    &mut self.registry,
                    SubjectId::new(id),
                    Some("world"),
                    Box::new(attachment.clone()),
                )
                .unwrap();
            attachment
        }
    }

    #[test]
    fn test_parse_node_target() {
        assert_eq!(parse_node_target("nether:a.b"), (Some("nether"), "a.b"));
        assert_eq!(parse_node_target("a.b"), (None, "a.b"));
        assert_eq!(parse_node_target(":a.b"), (None, "a.b"));
        assert_eq!(parse_node_target("nether:a:b"), (Some("nether"), "a:b"));
        assert_eq!(parse_node_target(":a:b"), (None, "a:b"));
    }

    #[test]
    fn test_group_info() {
        let fixture = Fixture::new();
        let info = fixture.engine.group("builder").unwrap().unwrap();
        assert_eq!(info.name, "Builder");
        assert_eq!(info.inheritance, ["default"]);
        assert_eq!(info.permissions.get("build"), Some(true));
        let worlds: Vec<&str> = info.worlds.iter().map(|(w, _)| w.as_str()).collect();
        assert_eq!(worlds, ["arena", "creative"]);
        assert!(fixture.engine.group("ghost").unwrap().is_none());
    }

    #[test]
    fn test_group_members() {
        let fixture = Fixture::new();
        assert_eq!(
            fixture.engine.group_members("builder").unwrap(),
            [SubjectId::new("ann")]
        );
        assert_eq!(
            fixture.engine.group_members("mod").unwrap(),
            [SubjectId::new("bob")]
        );
        assert!(fixture.engine.group_members("nobody").unwrap().is_empty());
    }

    #[test]
    fn test_group_members_non_ascii() {
        let doc = r#"
            [groups.VIP.permissions]
            "fly" = true
            [users."Élodie"]
            groups = ["vip"]
        "#;
        let engine = Permissions::new(TomlStore::parse(doc).unwrap(), EngineConfig::default());
        let elodie = SubjectId::new("Élodie");

        assert_eq!(engine.group_members("vip").unwrap(), [elodie.clone()]);
        assert_eq!(engine.subject_groups(&elodie).unwrap(), ["vip"]);
        assert_eq!(engine.group("vip").unwrap().unwrap().name, "VIP");
    }

    #[test]
    fn test_set_group_permission_refreshes_dependents() {
        let mut fixture = Fixture::new();
        let ann = fixture.online("ann");
        let bob = fixture.online("bob");
        let cat = fixture.online("cat");

        let outcome = fixture
            .engine
            .set_group_permission(&mut fixture.registry, "BUILDER", "tnt", true)
            .unwrap();

        let MutationOutcome::Changed(report) = outcome else {
            panic!("expected a change");
        };
        assert_eq!(report.subjects, [SubjectId::new("ann"), SubjectId::new("bob")]);
        assert!(ann.has("tnt"));
        assert!(bob.has("tnt"));
        assert!(!cat.has("tnt"));
        assert_eq!(cat.state().recalculations, 1);
    }

    #[test]
    fn test_set_group_world_permission() {
        let mut fixture = Fixture::new();
        fixture
            .engine
            .set_group_permission(&mut fixture.registry, "default", "nether:fire", true)
            .unwrap();
        let map = fixture.engine.resolve_group("default", Some("nether")).unwrap();
        assert_eq!(map.get("fire"), Some(true));
        let map = fixture.engine.resolve_group("default", None).unwrap();
        assert_eq!(map.get("fire"), None);
    }

    #[test]
    fn test_group_mutation_unknown_group() {
        let mut fixture = Fixture::new();
        let err = fixture
            .engine
            .set_group_permission(&mut fixture.registry, "ghost", "x", true)
            .unwrap_err();
        assert!(matches!(err, AdminError::NoSuchGroup(ref g) if g == "ghost"));
    }

    #[test]
    fn test_unchanged_mutations() {
        let mut fixture = Fixture::new();
        let ann = fixture.online("ann");

        let same = fixture
            .engine
            .set_group_permission(&mut fixture.registry, "builder", "build", true)
            .unwrap();
        assert_eq!(same, MutationOutcome::Unchanged);

        let missing = fixture
            .engine
            .unset_group_permission(&mut fixture.registry, "builder", "nope")
            .unwrap();
        assert_eq!(missing, MutationOutcome::Unchanged);
        assert_eq!(ann.state().recalculations, 1);
    }

    #[test]
    fn test_unset_group_permission() {
        let mut fixture = Fixture::new();
        let ann = fixture.online("ann");
        assert!(ann.has("build"));

        let outcome = fixture
            .engine
            .unset_group_permission(&mut fixture.registry, "builder", "build")
            .unwrap();
        assert!(outcome.is_changed());
        assert!(!ann.has("build"));
    }

    #[test]
    fn test_subject_permission_creates_entry_with_default_group() {
        let mut fixture = Fixture::new();
        let dan = fixture.online("dan");
        assert!(dan.has("chat"));

        fixture
            .engine
            .set_subject_permission(
                &mut fixture.registry,
                &SubjectId::new("dan"),
                "home",
                true,
            )
            .unwrap();

        assert_eq!(
            fixture.engine.subject_groups(&SubjectId::new("dan")).unwrap(),
            ["default"]
        );
        assert!(dan.has("chat"));
        assert!(dan.has("home"));
    }

    #[test]
    fn test_unset_subject_permission_without_entry() {
        let mut fixture = Fixture::new();
        let outcome = fixture
            .engine
            .unset_subject_permission(&mut fixture.registry, &SubjectId::new("dan"), "home")
            .unwrap();
        assert_eq!(outcome, MutationOutcome::Unchanged);
        assert!(fixture
            .engine
            .resolver()
            .explicit_membership(&SubjectId::new("dan"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_add_and_remove_subject_group() {
        let mut fixture = Fixture::new();
        let cat = fixture.online("cat");
        let cat_id = SubjectId::new("cat");
        assert!(cat.state().nodes.is_empty());

        fixture
            .engine
            .add_subject_group(&mut fixture.registry, &cat_id, "builder")
            .unwrap();
        assert!(cat.has("build"));

        let again = fixture
            .engine
            .add_subject_group(&mut fixture.registry, &cat_id, "Builder")
            .unwrap();
        assert_eq!(again, MutationOutcome::Unchanged);

        fixture
            .engine
            .remove_subject_group(&mut fixture.registry, &cat_id, "BUILDER")
            .unwrap();
        assert!(cat.state().nodes.is_empty());
    }

    #[test]
    fn test_add_group_to_implicit_member_keeps_default() {
        let mut fixture = Fixture::new();
        let dan = SubjectId::new("dan");
        fixture
            .engine
            .add_subject_group(&mut fixture.registry, &dan, "mod")
            .unwrap();
        assert_eq!(
            fixture.engine.subject_groups(&dan).unwrap(),
            ["default", "mod"]
        );
    }

    #[test]
    fn test_set_subject_groups() {
        let mut fixture = Fixture::new();
        let ann = fixture.online("ann");
        let ann_id = SubjectId::new("ann");

        let outcome = fixture
            .engine
            .set_subject_groups(&mut fixture.registry, &ann_id, vec!["default".to_string()])
            .unwrap();
        assert!(outcome.is_changed());
        assert!(!ann.has("build"));
        assert!(ann.has("chat"));

        let same = fixture
            .engine
            .set_subject_groups(&mut fixture.registry, &ann_id, vec!["default".to_string()])
            .unwrap();
        assert_eq!(same, MutationOutcome::Unchanged);
    }

    /// Engine over a file that can no longer be written: the backing path is
    /// replaced by a directory after the document was read
    fn unwritable(dir: &tempfile::TempDir) -> Permissions<TomlStore> {
        let path = dir.path().join("permissions.toml");
        std::fs::write(&path, DOC).unwrap();
        let store = TomlStore::open(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();
        Permissions::new(store, EngineConfig::default())
    }

    #[test]
    fn test_failed_flush_restores_group_node() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = unwritable(&dir);
        let mut registry = SubjectRegistry::new();
        let attachment = MemoryAttachment::new();
        engine
            .register_subject(&mut registry, SubjectId::new("ann"), None, Box::new(attachment.clone()))
            .unwrap();

        let err = engine
            .set_group_permission(&mut registry, "default", "tnt", true)
            .unwrap_err();
        assert!(matches!(err, AdminError::Store(StoreError::Io(_))));

        let path = NodePath::group("default").child(PERMISSIONS).child("tnt");
        assert_eq!(engine.store().get_bool(&path).unwrap(), None);
        engine.refresh_all(&mut registry).unwrap();
        assert!(!attachment.has("tnt"));
        assert!(attachment.has("chat"));
    }

    #[test]
    fn test_failed_flush_restores_removed_node() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = unwritable(&dir);
        let mut registry = SubjectRegistry::new();

        assert!(engine
            .unset_group_permission(&mut registry, "builder", "build")
            .is_err());
        let path = NodePath::group("Builder").child(PERMISSIONS).child("build");
        assert_eq!(engine.store().get_bool(&path).unwrap(), Some(true));
    }

    #[test]
    fn test_failed_flush_does_not_create_subject_entry() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = unwritable(&dir);
        let mut registry = SubjectRegistry::new();
        let dan = SubjectId::new("dan");

        assert!(engine
            .set_subject_permission(&mut registry, &dan, "home", true)
            .is_err());
        assert!(engine.resolver().explicit_membership(&dan).unwrap().is_none());
        assert!(!engine.store().exists(&NodePath::user("dan")).unwrap());

        assert!(engine
            .add_subject_group(&mut registry, &SubjectId::new("ann"), "mod")
            .is_err());
        assert_eq!(
            engine.subject_groups(&SubjectId::new("ann")).unwrap(),
            ["builder"]
        );
    }
}
