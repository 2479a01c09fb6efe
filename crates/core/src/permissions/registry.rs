//! Active subject registry
//!
//! Tracks which subjects are online, the world each one is evaluated in, and
//! the attachment their resolved permissions are pushed into. The registry is
//! an ordinary value owned by the host and passed to engine entry points, so
//! independent instances never share state.

use std::collections::HashMap;

use slotmap::{new_key_type, SlotMap};

use super::attachment::Attachment;
use super::types::SubjectId;

new_key_type! {
    /// Handle for a registered subject
    pub struct SubjectKey;
}

/// A subject that is currently online
pub struct ActiveSubject {
    id: SubjectId,
    environment: Option<String>,
    attachment: Box<dyn Attachment>,
}

impl ActiveSubject {
    pub fn id(&self) -> &SubjectId {
        &self.id
    }

    pub fn environment(&self) -> Option<&str> {
        self.environment.as_deref()
    }

    pub fn attachment_mut(&mut self) -> &mut dyn Attachment {
        self.attachment.as_mut()
    }
}

/// Registry of active subjects and their attachments
#[derive(Default)]
pub struct SubjectRegistry {
    /// Subjects indexed by key
    subjects: SlotMap<SubjectKey, ActiveSubject>,

    /// Lookup by subject id
    by_id: HashMap<SubjectId, SubjectKey>,
}

impl SubjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subject with its attachment.
    ///
    /// A subject that is already registered has its previous attachment
    /// replaced; the old one is returned so the host can detach it.
    pub fn register(
        &mut self,
        id: SubjectId,
        environment: Option<String>,
        attachment: Box<dyn Attachment>,
    ) -> Option<Box<dyn Attachment>> {
        let previous = self.unregister(&id);
        if previous.is_some() {
            tracing::debug!("Registering {}: was already registered", id);
        }

        let key = self.subjects.insert(ActiveSubject {
            id: id.clone(),
            environment,
            attachment,
        });
        self.by_id.insert(id, key);
        previous
    }

    /// Remove a subject, returning its attachment
    pub fn unregister(&mut self, id: &SubjectId) -> Option<Box<dyn Attachment>> {
        let key = self.by_id.remove(id)?;
        self.subjects.remove(key).map(|subject| subject.attachment)
    }

    /// Update the environment of an active subject.
    ///
    /// Returns `true` only if the subject is active and the environment
    /// actually changed.
    pub fn set_environment(&mut self, id: &SubjectId, environment: Option<&str>) -> bool {
        let Some(subject) = self.get_mut(id) else {
            return false;
        };
        if subject.environment.as_deref() == environment {
            return false;
        }
        subject.environment = environment.map(str::to_string);
        true
    }

    /// Environment of an active subject (`None` if inactive or unset)
    pub fn environment(&self, id: &SubjectId) -> Option<&str> {
        self.get(id).and_then(ActiveSubject::environment)
    }

    pub fn get(&self, id: &SubjectId) -> Option<&ActiveSubject> {
        self.by_id.get(id).and_then(|key| self.subjects.get(*key))
    }

    pub fn get_mut(&mut self, id: &SubjectId) -> Option<&mut ActiveSubject> {
        let key = *self.by_id.get(id)?;
        self.subjects.get_mut(key)
    }

    /// Attachment of an active subject
    pub fn attachment_mut(&mut self, id: &SubjectId) -> Option<&mut dyn Attachment> {
        self.get_mut(id).map(ActiveSubject::attachment_mut)
    }

    pub fn is_active(&self, id: &SubjectId) -> bool {
        self.by_id.contains_key(id)
    }

    /// Ids of all active subjects, sorted
    pub fn subjects(&self) -> Vec<SubjectId> {
        let mut ids: Vec<SubjectId> = self.by_id.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }
}
