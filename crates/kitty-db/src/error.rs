//! Database-specific error types and conversions.

use kitty_core::error::KittyError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Corrupt row: {0}")]
    Decode(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Record already exists: {entity}")]
    Duplicate { entity: String },

    #[error("Password hashing failed: {0}")]
    Hash(String),
}

impl DbError {
    /// Classify a failed statement. Unique index violations become
    /// [`DbError::Duplicate`].
    pub(crate) fn from_check(err: surrealdb::Error, entity: &str) -> Self {
        let msg = err.to_string();
        if msg.contains("already contains") {
            DbError::Duplicate {
                entity: entity.into(),
            }
        } else {
            DbError::Query(msg)
        }
    }
}

impl From<DbError> for KittyError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => KittyError::NotFound { entity, id },
            DbError::Duplicate { entity } => KittyError::AlreadyExists { entity },
            DbError::Hash(msg) => KittyError::Crypto(msg),
            other => KittyError::Database(other.to_string()),
        }
    }
}
