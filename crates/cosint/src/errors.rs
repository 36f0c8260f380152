use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Failed to access keyring: {0}")]
    KeyringAccess(String),

    #[error("Failed to save to keyring: {0}")]
    KeyringSave(String),

    #[error("Failed to access environment variable: {0}")]
    EnvVarAccess(String),
}

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Not authorized ({status}); sign in again with `cosint auth login`")]
    Unauthorized { status: StatusCode },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Server returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Could not obtain credentials: {0}")]
    Auth(#[from] AuthError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("A reply is still streaming; wait for it to finish or cancel it")]
    RequestInFlight,

    #[error("Message is empty")]
    EmptyMessage,

    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

/// Map a dotted config key to the environment variable that sets it
pub fn to_env_var(key: &str) -> String {
    format!("COSINT_{}", key.replace('.', "__").to_uppercase())
}

pub type ApiResult<T> = Result<T, ApiError>;
