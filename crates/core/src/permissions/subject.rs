//! Subject resolution
//!
//! A subject without an entry in `users` resolves exactly like the default
//! group. Otherwise its map is built by folding, in order:
//!
//! 1. each group in its `groups` list, resolved independently
//! 2. its own `permissions`
//! 3. its `worlds.<environment>` overlay
//!
//! An entry with an empty (or missing) group list gets no groups at all; the
//! default group only applies to subjects with no entry.

use crate::config::MembershipOrder;
use crate::error::StoreResult;
use crate::store::{ConfigStore, NodePath, MEMBERSHIP, PERMISSIONS, WORLDS};

use super::resolver::Resolver;
use super::types::{PermissionMap, SubjectId};

impl<S: ConfigStore + ?Sized> Resolver<'_, S> {
    /// Resolve `subject` in `environment`
    pub fn resolve_subject(
        &self,
        subject: &SubjectId,
        environment: Option<&str>,
    ) -> StoreResult<PermissionMap> {
        let base = NodePath::user(subject.as_str());
        let Some(mut groups) = self.explicit_membership(subject)? else {
            return self.resolve_group(&self.config.default_group, environment);
        };
        if self.config.membership_order == MembershipOrder::EarlierOverrides {
            groups.reverse();
        }

        let mut perms = PermissionMap::new();
        for group in &groups {
            perms.overlay(&self.resolve_group(group, environment)?);
        }

        perms.overlay(&self.read_nodes(&base.child(PERMISSIONS))?);

        if let Some(world) = environment {
            perms.overlay(&self.read_nodes(&base.child(WORLDS).child(world))?);
        }

        tracing::debug!(
            "Resolved {} nodes for {} in {:?}",
            perms.len(),
            subject,
            environment
        );
        Ok(perms)
    }

    /// Group list from the subject's entry, or `None` if it has no entry.
    ///
    /// An entry without a `groups` list yields an empty list.
    pub fn explicit_membership(&self, subject: &SubjectId) -> StoreResult<Option<Vec<String>>> {
        let base = NodePath::user(subject.as_str());
        if self.recover(self.store.keys(&base))?.is_none() {
            return Ok(None);
        }
        Ok(Some(
            self.read_list(&base.child(MEMBERSHIP))?.unwrap_or_default(),
        ))
    }

    /// Groups the subject effectively belongs to: its explicit list, or the
    /// default group when it has no entry
    pub fn membership(&self, subject: &SubjectId) -> StoreResult<Vec<String>> {
        Ok(self
            .explicit_membership(subject)?
            .unwrap_or_else(|| vec![self.config.default_group.clone()]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::diagnostics::CollectingSink;
    use crate::store::TomlStore;

    const DOC: &str = r#"
        [groups.default.permissions]
        "chat.speak" = true
        "perm.a" = false

        [groups.member.permissions]
        "perm.a" = true
        "perm.m" = true

        [groups.vip.permissions]
        "perm.m" = false

        [users.overrider]
        groups = ["member"]
        [users.overrider.permissions]
        "perm.a" = false
        [users.overrider.worlds.nether]
        "perm.a" = true

        [users.stacked]
        groups = ["member", "vip"]

        [users.loner]
        groups = []
        [users.loner.permissions]
        "own.node" = true

        [users.listless.permissions]
        "own.node" = true
    "#;

    fn resolve_with(config: &EngineConfig, subject: &str, world: Option<&str>) -> PermissionMap {
        let store = TomlStore::parse(DOC).unwrap();
        let sink = CollectingSink::new();
        Resolver::new(&store, config, &sink)
            .resolve_subject(&SubjectId::new(subject), world)
            .unwrap()
    }

    fn resolve(subject: &str, world: Option<&str>) -> PermissionMap {
        resolve_with(&EngineConfig::default(), subject, world)
    }

    #[test]
    fn test_unknown_subject_gets_default_group() {
        let store = TomlStore::parse(DOC).unwrap();
        let config = EngineConfig::default();
        let sink = CollectingSink::new();
        let resolver = Resolver::new(&store, &config, &sink);

        let subject = resolver
            .resolve_subject(&SubjectId::new("stranger"), Some("world"))
            .unwrap();
        let group = resolver.resolve_group("default", Some("world")).unwrap();
        assert_eq!(subject, group);
    }

    #[test]
    fn test_subject_overrides_group() {
        let map = resolve("overrider", None);
        assert_eq!(map.get("perm.a"), Some(false));
        assert_eq!(map.get("perm.m"), Some(true));
    }

    #[test]
    fn test_subject_world_overlay_wins() {
        let map = resolve("Overrider", Some("nether"));
        assert_eq!(map.get("perm.a"), Some(true));
    }

    #[test]
    fn test_later_group_overrides_earlier() {
        let map = resolve("stacked", None);
        assert_eq!(map.get("perm.m"), Some(false));
    }

    #[test]
    fn test_earlier_overrides_when_configured() {
        let config = EngineConfig {
            membership_order: MembershipOrder::EarlierOverrides,
            ..EngineConfig::default()
        };
        let map = resolve_with(&config, "stacked", None);
        assert_eq!(map.get("perm.m"), Some(true));
    }

    #[test]
    fn test_explicit_empty_membership_skips_default() {
        let map = resolve("loner", None);
        assert_eq!(map.keys().collect::<Vec<_>>(), ["own.node"]);

        let map = resolve("listless", None);
        assert_eq!(map.keys().collect::<Vec<_>>(), ["own.node"]);
    }

    #[test]
    fn test_missing_default_group_is_empty() {
        let store = TomlStore::parse("[groups.other.permissions]\n\"x\" = true\n").unwrap();
        let config = EngineConfig::default();
        let sink = CollectingSink::new();
        let map = Resolver::new(&store, &config, &sink)
            .resolve_subject(&SubjectId::new("anyone"), None)
            .unwrap();
        assert!(map.is_empty());
        assert!(sink.is_empty());
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let first = resolve("stacked", Some("nether"));
        let second = resolve("stacked", Some("nether"));
        assert_eq!(first, second);
        assert_eq!(
            first.iter().collect::<Vec<_>>(),
            second.iter().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_non_ascii_entry_is_found() {
        let doc = r#"
            [groups.default.permissions]
            "chat" = true
            [groups.vip.permissions]
            "fly" = true
            [users."Élodie"]
            groups = ["vip"]
        "#;
        let store = TomlStore::parse(doc).unwrap();
        let config = EngineConfig::default();
        let sink = CollectingSink::new();
        let map = Resolver::new(&store, &config, &sink)
            .resolve_subject(&SubjectId::new("Élodie"), None)
            .unwrap();
        assert_eq!(map.iter().collect::<Vec<_>>(), [("fly", true)]);
    }

    #[test]
    fn test_membership() {
        let store = TomlStore::parse(DOC).unwrap();
        let config = EngineConfig::default();
        let sink = CollectingSink::new();
        let resolver = Resolver::new(&store, &config, &sink);

        assert_eq!(
            resolver.membership(&SubjectId::new("stacked")).unwrap(),
            ["member", "vip"]
        );
        assert_eq!(
            resolver.membership(&SubjectId::new("stranger")).unwrap(),
            ["default"]
        );
        assert!(resolver
            .membership(&SubjectId::new("loner"))
            .unwrap()
            .is_empty());
        assert_eq!(
            resolver.explicit_membership(&SubjectId::new("stranger")).unwrap(),
            None
        );
    }
}
