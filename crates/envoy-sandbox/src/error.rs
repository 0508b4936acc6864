use thiserror::Error;

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("tool code does not compile: {0}")]
    Compile(String),
}

pub type Result<T> = std::result::Result<T, SandboxError>;
