//! Recoverable warnings raised while resolving permissions
//!
//! Resolution never aborts on a bad node or a cyclic branch. Problems are
//! handed to a [`DiagnosticsSink`] and the rest of the map is still produced.

use std::fmt;

use parking_lot::Mutex;

/// A recoverable problem found in the configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// `group` lists `parent`, which is already being expanded on this path
    CyclicInheritance { group: String, parent: String },
    /// One or more nodes under `path` are not booleans and were skipped
    NonBooleanNodes {
        path: String,
        first: String,
        additional: usize,
    },
    /// A node expected to be a table or list has the wrong shape
    MalformedNesting { path: String, found: &'static str },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::CyclicInheritance { group, parent } => write!(
                f,
                "cyclic inheritance detected from {} (back to {})",
                group, parent
            ),
            Warning::NonBooleanNodes {
                path,
                first,
                additional: 0,
            } => write!(f, "node {} in {} is non-boolean", first, path),
            Warning::NonBooleanNodes {
                path,
                first,
                additional,
            } => write!(
                f,
                "node {} in {} is non-boolean (and {} more)",
                first, path, additional
            ),
            Warning::MalformedNesting { path, found } => {
                write!(f, "malformed nesting at {}: found {}", path, found)
            }
        }
    }
}

/// Destination for recoverable warnings
pub trait DiagnosticsSink: Send + Sync {
    fn warn(&self, warning: Warning);
}

/// Emits warnings through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn warn(&self, warning: Warning) {
        tracing::warn!("{}", warning);
    }
}

/// Records warnings in memory.
///
/// Useful for surfacing configuration problems to an administrator after a
/// reload. Warnings are also forwarded to `tracing` at debug level.
#[derive(Debug, Default)]
pub struct CollectingSink {
    warnings: Mutex<Vec<Warning>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all recorded warnings
    pub fn warnings(&self) -> Vec<Warning> {
        self.warnings.lock().clone()
    }

    /// Remove and return all recorded warnings
    pub fn take(&self) -> Vec<Warning> {
        std::mem::take(&mut *self.warnings.lock())
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.lock().is_empty()
    }
}

impl DiagnosticsSink for CollectingSink {
    fn warn(&self, warning: Warning) {
        tracing::debug!("Recorded warning: {}", warning);
        self.warnings.lock().push(warning);
    }
}

impl<T: DiagnosticsSink + ?Sized> DiagnosticsSink for std::sync::Arc<T> {
    fn warn(&self, warning: Warning) {
        (**self).warn(warning);
    }
}
