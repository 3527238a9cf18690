//! Application-wide error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("invalid key format: {0}")]
    InvalidKeyFormat(String),

    #[error("governance deployment failed: {0}")]
    Deployment(String),

    #[error("governance attach failed: {0}")]
    Attach(String),

    #[error("account manager resolution failed: {0}")]
    Resolution(String),

    #[error("logger error: {0}")]
    Logger(String),
}
