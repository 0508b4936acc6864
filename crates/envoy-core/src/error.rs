use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnvoyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("LLM provider error: {0}")]
    LlmProvider(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EnvoyError {
    /// Short error code used in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            EnvoyError::Config(_) => "CONFIG_ERROR",
            EnvoyError::Validation(_) => "VALIDATION_ERROR",
            EnvoyError::NotFound(_) => "NOT_FOUND",
            EnvoyError::Database(_) => "DATABASE_ERROR",
            EnvoyError::LlmProvider(_) => "LLM_PROVIDER_ERROR",
            EnvoyError::Serialization(_) => "SERIALIZATION_ERROR",
            EnvoyError::Io(_) => "IO_ERROR",
            EnvoyError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status this error maps to.
    pub fn status(&self) -> u16 {
        match self {
            EnvoyError::Config(_) | EnvoyError::Internal(_) | EnvoyError::Database(_) => 500,
            EnvoyError::Validation(_) => 400,
            EnvoyError::NotFound(_) => 404,
            EnvoyError::LlmProvider(_) => 502,
            EnvoyError::Serialization(_) | EnvoyError::Io(_) => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, EnvoyError>;
