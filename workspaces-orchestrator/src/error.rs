use thiserror::Error;

pub type Result<T> = std::result::Result<T, OrchestratorError>;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The caller-facing message is carried verbatim.
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    ExceededLimit(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A stored value is outside the range the schema allows
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),

    #[error("Hosting provider error: {0}")]
    Provider(#[from] reqwest::Error),

    #[error("Domain cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl OrchestratorError {
    pub fn slug_conflict() -> Self {
        Self::Conflict("Slug is already in use.".to_string())
    }

    pub fn domain_conflict() -> Self {
        Self::Conflict("Domain is already in use.".to_string())
    }
}
