use common::{ParseVocabError, PvzId, ReceptionId};
use thiserror::Error;

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The pickup point already has a reception in progress.
    #[error("Open reception already exists for pickup point {0}")]
    OpenReceptionExists(PvzId),

    /// A product write targeted a reception that is no longer in progress.
    #[error("Reception {0} is closed")]
    ReceptionClosed(ReceptionId),

    /// A write referenced a parent row that does not exist.
    #[error("Referenced {entity} does not exist")]
    MissingParent { entity: &'static str },

    /// The e-mail address is already registered.
    #[error("Email already registered: {0}")]
    EmailTaken(String),

    /// A stored value is outside its vocabulary.
    #[error("Invalid stored value: {0}")]
    Decode(#[from] ParseVocabError),

    /// A joined row carried an id without the columns that belong to it.
    #[error("Incomplete joined row: missing {0}")]
    IncompleteRow(&'static str),

    /// The store refused the operation.
    #[error("Store unavailable")]
    Unavailable,

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
