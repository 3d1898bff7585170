//! Failures inside the `PostgreSQL` stores.
//!
//! The store traits only see [`StorageError`]; [`DbError::into_storage`]
//! tags a backend failure with the operation that hit it. Startup code that
//! talks to the pool directly can use [`DbError::kind`] to decide between a
//! configuration problem and an outage.

use lorekeep_types::{ErrorKind, StorageError};

/// Backend failure.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Query or connection failure reported by sqlx.
    #[error("postgres: {0}")]
    Postgres(#[from] sqlx::Error),

    /// An embedded migration could not be applied.
    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A JSONB column could not be encoded or decoded.
    #[error("json column: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A row holds a value no domain type accepts, e.g. an unknown status.
    #[error("undecodable row: {0}")]
    Decode(String),

    /// The pool settings are unusable.
    #[error("database config: {0}")]
    Config(String),
}

impl DbError {
    /// Wrap for the store traits, naming the failed `operation`.
    pub fn into_storage(self, operation: &'static str) -> StorageError {
        StorageError::new(operation, self)
    }

    /// Column `column` held something unexpected.
    pub fn decode(column: &str, detail: impl core::fmt::Display) -> Self {
        Self::Decode(format!("{column}: {detail}"))
    }

    /// Coarse classification.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Configuration,
            Self::Decode(_) | Self::Serialization(_) => ErrorKind::CorruptEvent,
            Self::Postgres(_) | Self::Migration(_) => ErrorKind::Storage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_separate_config_from_corruption() {
        assert_eq!(DbError::Config("empty".to_owned()).kind(), ErrorKind::Configuration);
        assert_eq!(DbError::decode("status", "\"paused\"").kind(), ErrorKind::CorruptEvent);
        assert_eq!(DbError::Postgres(sqlx::Error::PoolClosed).kind(), ErrorKind::Storage);
    }

    #[test]
    fn decode_names_the_column() {
        let err = DbError::decode("gm_mode", "unknown value 7");
        assert_eq!(err.to_string(), "undecodable row: gm_mode: unknown value 7");
    }
}
