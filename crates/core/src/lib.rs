//! groupperms - Core Logic
//!
//! Group-based permission resolution. Groups and users are defined in a
//! hierarchical configuration document; this crate flattens them into
//! node -> bool maps and keeps the attachments of online subjects in sync.
//!
//! # Modules
//!
//! - [`store`] - configuration store contract and the TOML-backed store
//! - [`permissions`] - group/subject resolution, attachments, refresh planning
//! - [`engine`] - the [`Permissions`] facade, lifecycle and admin mutations
//! - [`config`] - engine settings (`settings.toml`)
//! - [`diagnostics`] - non-fatal warnings raised while resolving

pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod permissions;
pub mod store;

// Re-export commonly used items
pub use config::{ConfigError, ConfigResult, EngineConfig, MembershipOrder};
pub use diagnostics::{CollectingSink, DiagnosticsSink, TracingSink, Warning};
pub use engine::{parse_node_target, GroupInfo, MutationOutcome, Permissions};
pub use error::{AdminError, StoreError, StoreResult};
pub use permissions::{
    synchronize, Attachment, MemoryAttachment, PermissionMap, RefreshPlanner, RefreshReport,
    Resolver, SubjectId, SubjectRegistry,
};
pub use store::{ConfigStore, Leaf, NodePath, TomlStore};
