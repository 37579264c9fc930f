use thiserror::Error;

/// Errors raised by the entity store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `insert` was called with a primary-key value that already exists
    /// within the entity kind.
    #[error("entity `{kind}` already has an instance with primary key `{primary_key}`")]
    DuplicatePrimaryKey {
        /// Entity kind.
        kind: String,
        /// Colliding primary-key value, rendered for diagnostics.
        primary_key: String,
    },

    /// `update` was called for a primary-key value that does not exist.
    #[error("entity `{kind}` has no instance with primary key `{primary_key}`")]
    InstanceNotFound {
        /// Entity kind.
        kind: String,
        /// Primary-key value that was not found.
        primary_key: String,
    },
}
