use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("store error: {0}")]
    Store(#[from] envoy_store::StoreError),

    #[error("invalid cron expression: {0}")]
    InvalidCron(String),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
