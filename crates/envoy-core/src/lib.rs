pub mod config;
pub mod cron;
pub mod error;
pub mod types;

pub use config::EnvoyConfig;
pub use error::{EnvoyError, Result};
pub use types::{new_id, SessionId};
