use thiserror::Error;
use uuid::Uuid;

/// Which kind of record a lookup was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Topic,
    Idea,
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Entity::Topic => f.write_str("Topic"),
            Entity::Idea => f.write_str("Idea"),
        }
    }
}

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error not attributable to a constraint.
    #[error("Database error: {0}")]
    Sqlite(rusqlite::Error),

    /// A UNIQUE / CHECK / FOREIGN KEY constraint rejected a write.
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The record does not exist, or is hidden because it or an ancestor is
    /// archived.
    #[error("{0} not found")]
    NotFound(Entity),

    /// The record exists but is in the wrong lifecycle state for the
    /// requested transition.
    #[error("{entity} is {reason}")]
    InvalidState { entity: Entity, reason: &'static str },

    /// An idea cannot be restored while its topic is archived.
    #[error("Cannot restore idea because its parent topic is archived")]
    ParentArchived { topic_id: Uuid, topic_name: String },

    /// An idea was pointed at a topic that is missing or archived.
    #[error("Topic not found")]
    InvalidTarget(Uuid),

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// UUID parsing error.
    #[error("UUID error: {0}")]
    Uuid(#[from] uuid::Error),

    /// Chrono parsing error.
    #[error("Timestamp parse error: {0}")]
    ChronoParse(#[from] chrono::ParseError),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(code, ref message)
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::Constraint(
                    message
                        .clone()
                        .unwrap_or_else(|| "constraint failed".to_string()),
                )
            }
            other => StoreError::Sqlite(other),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
