//! Error types for store access and administrative mutations

/// Error type for configuration store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing store could not be read at all
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A node exists but holds a different kind of value than requested
    #[error("Expected {expected} at {path}, found {found}")]
    WrongType {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A write tried to descend through a leaf value
    #[error("Cannot create child of non-table node: {path}")]
    NotATable { path: String },

    /// Failed to read or write the backing file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse the backing document
    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// Failed to serialize the document
    #[error("Failed to serialize document: {0}")]
    Serialize(#[from] toml::ser::Error),
}

impl StoreError {
    /// Whether the error only affects a single node or branch.
    ///
    /// Recoverable errors are reported as diagnostics during resolution;
    /// everything else aborts the triggering operation.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, StoreError::WrongType { .. })
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Error type for administrative mutations
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    /// The named group is not defined
    #[error("No such group: {0}")]
    NoSuchGroup(String),

    /// The store rejected the read or write
    #[error(transparent)]
    Store(#[from] StoreError),
}
