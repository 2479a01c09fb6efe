//! Permission resolution for groupperms
//!
//! This module turns the group/user definitions held by a
//! [`ConfigStore`](crate::store::ConfigStore) into flat node -> bool maps and
//! keeps the attachments of online subjects in sync with them.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  mutation (admin command / reload / world change)             │
//! │        │                                                     │
//! │        ▼                                                     │
//! │  RefreshPlanner ── inheritance closure ──► affected subjects │
//! │        │                                                     │
//! │        ▼                                                     │
//! │  Resolver::resolve_subject ──► Resolver::resolve_group (xN)  │
//! │        │                                                     │
//! │        ▼                                                     │
//! │  synchronize ──► Attachment (host-owned, via SubjectRegistry)│
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Precedence
//!
//! Later layers override earlier ones:
//!
//! - group: parents (in list order) → own permissions → own world overlay
//! - subject: groups (in list order) → own permissions → own world overlay
//!
//! # Usage
//!
//! ```ignore
//! use groupperms_core::permissions::{RefreshPlanner, Resolver, SubjectId, SubjectRegistry};
//!
//! let resolver = Resolver::new(&store, &config, &sink);
//! let perms = resolver.resolve_subject(&SubjectId::new("notch"), Some("world"))?;
//!
//! // After editing group "user", resync only the subjects that depend on it
//! RefreshPlanner::new(resolver).refresh_group(&mut registry, "user")?;
//! ```

mod attachment;
mod group;
mod refresh;
mod registry;
mod resolver;
mod subject;
mod types;

pub use attachment::{synchronize, Attachment, AttachmentState, MemoryAttachment, SyncOutcome};
pub use refresh::{RefreshPlanner, RefreshReport};
pub use registry::{ActiveSubject, SubjectKey, SubjectRegistry};
pub use resolver::Resolver;
pub use types::{PermissionDelta, PermissionMap, SubjectId};
