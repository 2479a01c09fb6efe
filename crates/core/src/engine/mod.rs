//! Engine facade
//!
//! [`Permissions`] owns the configuration store, the engine settings and the
//! diagnostics sink. The [`SubjectRegistry`] stays with the host and is passed
//! into every entry point that touches attachments.
//!
//! All entry points run to completion on the calling thread. Hosts with
//! several threads must serialize calls themselves.
//!
//! # Example
//!
//! ```ignore
//! use groupperms_core::{EngineConfig, MemoryAttachment, Permissions, SubjectId, SubjectRegistry, TomlStore};
//!
//! let store = TomlStore::open_or_create("plugins/groupperms/permissions.toml")?;
//! let engine = Permissions::new(store, EngineConfig::default());
//! let mut registry = SubjectRegistry::new();
//!
//! // Player joins
//! engine.register_subject(&mut registry, SubjectId::new("notch"), Some("world"), Box::new(MemoryAttachment::new()))?;
//!
//! // Player changes world
//! engine.change_environment(&mut registry, &SubjectId::new("notch"), Some("nether"))?;
//! ```

mod admin;

use std::collections::HashSet;
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::diagnostics::{DiagnosticsSink, TracingSink};
use crate::error::StoreResult;
use crate::permissions::{
    Attachment, PermissionMap, RefreshPlanner, RefreshReport, Resolver, SubjectId,
    SubjectRegistry,
};
use crate::store::ConfigStore;

pub use admin::{parse_node_target, GroupInfo, MutationOutcome};

/// Permission engine bound to one configuration store
pub struct Permissions<S> {
    store: S,
    config: EngineConfig,
    sink: Arc<dyn DiagnosticsSink>,
}

impl<S: ConfigStore> Permissions<S> {
    /// Create an engine that reports warnings through `tracing`
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self::with_sink(store, config, Arc::new(TracingSink))
    }

    /// Create an engine with a custom diagnostics sink
    pub fn with_sink(store: S, config: EngineConfig, sink: Arc<dyn DiagnosticsSink>) -> Self {
        Self {
            store,
            config,
            sink,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Direct store access.
    ///
    /// Changes made here are not applied to anyone until a refresh is
    /// requested.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Resolver over the current store contents
    pub fn resolver(&self) -> Resolver<'_, S> {
        Resolver::new(&self.store, &self.config, self.sink.as_ref())
    }

    pub fn planner(&self) -> RefreshPlanner<'_, S> {
        RefreshPlanner::new(self.resolver())
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    pub fn resolve_group(&self, group: &str, environment: Option<&str>) -> StoreResult<PermissionMap> {
        self.resolver().resolve_group(group, environment)
    }

    pub fn resolve_subject(
        &self,
        subject: &SubjectId,
        environment: Option<&str>,
    ) -> StoreResult<PermissionMap> {
        self.resolver().resolve_subject(subject, environment)
    }

    pub fn inheritance_closure(&self, group: &str) -> StoreResult<HashSet<String>> {
        self.resolver().inheritance_closure(group)
    }

    // ========================================================================
    // Refresh
    // ========================================================================

    pub fn refresh_all(&self, registry: &mut SubjectRegistry) -> StoreResult<RefreshReport> {
        self.planner().refresh_all(registry)
    }

    pub fn refresh_subject(
        &self,
        registry: &mut SubjectRegistry,
        subject: &SubjectId,
    ) -> StoreResult<RefreshReport> {
        self.planner().refresh_subject(registry, subject)
    }

    pub fn refresh_group(
        &self,
        registry: &mut SubjectRegistry,
        group: &str,
    ) -> StoreResult<RefreshReport> {
        self.planner().refresh_group(registry, group)
    }

    // ========================================================================
    // Subject lifecycle
    // ========================================================================

    /// Subject came online: install its attachment and synchronize it
    pub fn register_subject(
        &self,
        registry: &mut SubjectRegistry,
        subject: SubjectId,
        environment: Option<&str>,
        attachment: Box<dyn Attachment>,
    ) -> StoreResult<RefreshReport> {
        tracing::debug!("Player {} joined, registering...", subject);
        registry.register(subject.clone(), environment.map(str::to_string), attachment);
        self.refresh_subject(registry, &subject)
    }

    /// Subject went offline; returns its attachment so the host can detach it
    pub fn unregister_subject(
        &self,
        registry: &mut SubjectRegistry,
        subject: &SubjectId,
    ) -> Option<Box<dyn Attachment>> {
        let attachment = registry.unregister(subject);
        if attachment.is_none() {
            tracing::debug!("Unregistering {}: was not registered", subject);
        }
        attachment
    }

    /// Subject moved to another environment; recalculates only on an actual
    /// change
    pub fn change_environment(
        &self,
        registry: &mut SubjectRegistry,
        subject: &SubjectId,
        environment: Option<&str>,
    ) -> StoreResult<RefreshReport> {
        if !registry.set_environment(subject, environment) {
            return Ok(RefreshReport::default());
        }
        tracing::debug!(
            "Player {} moved to world {:?}, recalculating...",
            subject,
            environment
        );
        self.refresh_subject(registry, subject)
    }

    // ========================================================================
    // Reload
    // ========================================================================

    /// Replace the store with a freshly read one and re-synchronize everyone.
    ///
    /// If resolving against the new store fails, the previous store is put
    /// back and no attachment is modified.
    pub fn reload(&mut self, registry: &mut SubjectRegistry, store: S) -> StoreResult<RefreshReport> {
        let previous = std::mem::replace(&mut self.store, store);
        match self.refresh_all(registry) {
            Ok(report) => {
                tracing::info!(
                    "Reloaded permissions from {}, {} players refreshed",
                    self.store.current_path(),
                    report.len()
                );
                Ok(report)
            }
            Err(err) => {
                self.store = previous;
                tracing::error!("Reload failed, keeping previous permissions: {}", err);
                Err(err)
            }
        }
    }

    /// Swap engine settings and re-synchronize everyone.
    ///
    /// On failure the previous settings are restored.
    pub fn reconfigure(
        &mut self,
        registry: &mut SubjectRegistry,
        config: EngineConfig,
    ) -> StoreResult<RefreshReport> {
        let previous = std::mem::replace(&mut self.config, config);
        self.refresh_all(registry).inspect_err(|_| {
            self.config = previous;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingSink;
    use crate::permissions::MemoryAttachment;
    use crate::store::TomlStore;

    const DOC: &str = r#"
        [groups.default.permissions]
        "permissions.build" = false
        [groups.default.worlds.creative]
        "permissions.build" = true
    "#;

    fn engine() -> Permissions<TomlStore> {
        Permissions::new(TomlStore::parse(DOC).unwrap(), EngineConfig::default())
    }

    #[test]
    fn test_register_synchronizes() {
        let engine = engine();
        let mut registry = SubjectRegistry::new();
        let attachment = MemoryAttachment::new();

        let report = engine
            .register_subject(
                &mut registry,
                SubjectId::new("steve"),
                Some("world"),
                Box::new(attachment.clone()),
            )
            .unwrap();

        assert_eq!(report.len(), 1);
        assert_eq!(attachment.value("permissions.build"), Some(false));
    }

    #[test]
    fn test_change_environment_only_on_change() {
        let engine = engine();
        let mut registry = SubjectRegistry::new();
        let attachment = MemoryAttachment::new();
        let steve = SubjectId::new("steve");
        engine
            .register_subject(
                &mut registry,
                steve.clone(),
                Some("world"),
                Box::new(attachment.clone()),
            )
            .unwrap();

        let same = engine
            .change_environment(&mut registry, &steve, Some("world"))
            .unwrap();
        assert!(same.is_empty());
        assert_eq!(attachment.state().recalculations, 1);

        engine
            .change_environment(&mut registry, &steve, Some("creative"))
            .unwrap();
        assert!(attachment.has("permissions.build"));
        assert_eq!(attachment.state().recalculations, 2);
    }

    #[test]
    fn test_unregister() {
        let engine = engine();
        let mut registry = SubjectRegistry::new();
        let steve = SubjectId::new("steve");
        engine
            .register_subject(
                &mut registry,
                steve.clone(),
                None,
                Box::new(MemoryAttachment::new()),
            )
            .unwrap();

        assert!(engine.unregister_subject(&mut registry, &steve).is_some());
        assert!(engine.unregister_subject(&mut registry, &steve).is_none());
        assert!(engine.refresh_subject(&mut registry, &steve).unwrap().is_empty());
    }

    #[test]
    fn test_reload_applies_new_store() {
        let mut engine = engine();
        let mut registry = SubjectRegistry::new();
        let attachment = MemoryAttachment::new();
        engine
            .register_subject(
                &mut registry,
                SubjectId::new("steve"),
                Some("world"),
                Box::new(attachment.clone()),
            )
            .unwrap();

        let replacement = TomlStore::parse("[groups.default.permissions]\n\"chat\" = true\n").unwrap();
        let report = engine.reload(&mut registry, replacement).unwrap();

        assert_eq!(report.len(), 1);
        assert!(attachment.has("chat"));
        assert_eq!(attachment.value("permissions.build"), None);
    }

    #[test]
    fn test_reconfigure_changes_default_group() {
        let doc = r#"
            [groups.default.permissions]
            "a" = true
            [groups.guest.permissions]
            "g" = true
        "#;
        let sink = Arc::new(CollectingSink::new());
        let mut engine = Permissions::with_sink(
            TomlStore::parse(doc).unwrap(),
            EngineConfig::default(),
            sink.clone(),
        );
        let mut registry = SubjectRegistry::new();
        let attachment = MemoryAttachment::new();
        engine
            .register_subject(
                &mut registry,
                SubjectId::new("x"),
                None,
                Box::new(attachment.clone()),
            )
            .unwrap();
        assert!(attachment.has("a"));

        let config = EngineConfig {
            default_group: "guest".to_string(),
            ..EngineConfig::default()
        };
        engine.reconfigure(&mut registry, config).unwrap();
        assert!(attachment.has("g"));
        assert!(!attachment.has("a"));
        assert!(sink.is_empty());
    }
}
