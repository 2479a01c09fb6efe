//! Change-scoped refresh
//!
//! After a mutation, only subjects whose resolved map could have changed are
//! re-resolved and re-synchronized. Every affected subject is resolved before
//! any attachment is touched: if the store fails midway, no attachment sees a
//! partial update.

use std::collections::HashSet;

use crate::error::StoreResult;
use crate::store::{fold_name, ConfigStore};

use super::attachment::synchronize;
use super::registry::SubjectRegistry;
use super::resolver::Resolver;
use super::types::{PermissionMap, SubjectId};

/// Subjects re-synchronized by a refresh, in application order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub subjects: Vec<SubjectId>,
}

impl RefreshReport {
    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    pub fn contains(&self, subject: &SubjectId) -> bool {
        self.subjects.contains(subject)
    }
}

/// Decides which active subjects a change affects and re-synchronizes them
pub struct RefreshPlanner<'a, S: ?Sized> {
    resolver: Resolver<'a, S>,
}

impl<'a, S: ConfigStore + ?Sized> RefreshPlanner<'a, S> {
    pub fn new(resolver: Resolver<'a, S>) -> Self {
        Self { resolver }
    }

    /// Re-synchronize every active subject
    pub fn refresh_all(&self, registry: &mut SubjectRegistry) -> StoreResult<RefreshReport> {
        let targets = registry.subjects();
        tracing::debug!("Refreshing all {} active subjects", targets.len());
        self.apply(registry, targets)
    }

    /// Re-synchronize a single subject; inactive subjects are ignored
    pub fn refresh_subject(
        &self,
        registry: &mut SubjectRegistry,
        subject: &SubjectId,
    ) -> StoreResult<RefreshReport> {
        if !registry.is_active(subject) {
            return Ok(RefreshReport::default());
        }
        self.apply(registry, vec![subject.clone()])
    }

    /// Re-synchronize active subjects whose groups inherit from `group`
    pub fn refresh_group(
        &self,
        registry: &mut SubjectRegistry,
        group: &str,
    ) -> StoreResult<RefreshReport> {
        let closure = self.resolver.inheritance_closure(group)?;
        let targets = self.affected_subjects(registry, &closure)?;
        tracing::debug!(
            "Group {} change affects {} groups and {} active subjects",
            group,
            closure.len(),
            targets.len()
        );
        self.apply(registry, targets)
    }

    /// Active subjects with a direct membership in any group of `closure`
    /// (folded names)
    pub fn affected_subjects(
        &self,
        registry: &SubjectRegistry,
        closure: &HashSet<String>,
    ) -> StoreResult<Vec<SubjectId>> {
        let mut affected = Vec::new();
        for subject in registry.subjects() {
            let groups = self.resolver.membership(&subject)?;
            if groups.iter().any(|g| closure.contains(&fold_name(g))) {
                affected.push(subject);
            }
        }
        Ok(affected)
    }

    fn apply(
        &self,
        registry: &mut SubjectRegistry,
        targets: Vec<SubjectId>,
    ) -> StoreResult<RefreshReport> {
        let mut resolved: Vec<(SubjectId, PermissionMap)> = Vec::with_capacity(targets.len());
        for subject in targets {
            let environment = registry.environment(&subject).map(str::to_owned);
            let perms = self
                .resolver
                .resolve_subject(&subject, environment.as_deref())?;
            resolved.push((subject, perms));
        }

        let mut report = RefreshReport::default();
        for (subject, perms) in resolved {
            let Some(attachment) = registry.attachment_mut(&subject) else {
                continue;
            };
            let outcome = synchronize(attachment, &perms);
            tracing::debug!(
                "Synchronized {}: {} removed, {} set",
                subject,
                outcome.removed,
                outcome.upserted
            );
            report.subjects.push(subject);
        }
        Ok(report)
    }
}
