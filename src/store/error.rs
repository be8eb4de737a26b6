use thiserror::Error;

/// Errors raised by a zone store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("aesthetics payload is not valid JSON: {0}")]
    MalformedAesthetics(#[from] serde_json::Error),

    #[error("no row for index {index} iter {iter}")]
    NotFound { index: i64, iter: i64 },

    #[error("entity has no assigned index; allocate one before calling set()")]
    MissingIndex,

    #[error("index {0} has no rows")]
    EmptyIndex(i64),
}

pub type Result<T> = std::result::Result<T, StoreError>;
