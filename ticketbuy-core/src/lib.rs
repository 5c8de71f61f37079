pub mod repository;
pub mod identity;

pub use identity::{Actor, Role};

/// Failure reported by a storage backend.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write; carries the constraint name.
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),
    #[error("Storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
