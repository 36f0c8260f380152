use std::env;

use async_trait::async_trait;
use keyring::Entry;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::AuthError;

#[cfg(test)]
use mockall::automock;

const KEYRING_SERVICE: &str = "cosint";

/// Keyring entry name, also the environment variable checked as a fallback
pub const ACCESS_TOKEN_KEY: &str = "COSINT_ACCESS_TOKEN";

impl From<keyring::Error> for AuthError {
    fn from(err: keyring::Error) -> Self {
        AuthError::KeyringAccess(err.to_string())
    }
}

impl From<env::VarError> for AuthError {
    fn from(err: env::VarError) -> Self {
        AuthError::EnvVarAccess(err.to_string())
    }
}

/// Supplies the bearer token attached to every backend request.
///
/// `None` means there is no session; requests then go out without an
/// `Authorization` header and the backend decides what to do with them.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn access_token(&self) -> Result<Option<String>, AuthError>;
}

/// A fixed token, or none at all
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    token: Option<String>,
}

impl StaticCredentials {
    pub fn new<S: Into<String>>(token: S) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    pub fn anonymous() -> Self {
        Self { token: None }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn access_token(&self) -> Result<Option<String>, AuthError> {
        Ok(self.token.clone())
    }
}

#[cfg_attr(test, automock)]
pub trait Keyring: Send + Sync {
    fn read_token(&self) -> Result<Option<String>, AuthError>;
    fn store_token(&self, token: &str) -> Result<(), AuthError>;
    fn clear_token(&self) -> Result<(), AuthError>;
}

#[cfg_attr(test, automock)]
pub trait Environment: Send + Sync {
    fn get_var(&self, key: &str) -> Result<String, env::VarError>;
}

pub struct RealEnvironment;

impl Environment for RealEnvironment {
    fn get_var(&self, key: &str) -> Result<String, env::VarError> {
        env::var(key)
    }
}

impl Keyring for Entry {
    fn read_token(&self) -> Result<Option<String>, AuthError> {
        match self.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn store_token(&self, token: &str) -> Result<(), AuthError> {
        self.set_password(token)
            .map_err(|e| AuthError::KeyringSave(e.to_string()))
    }

    fn clear_token(&self) -> Result<(), AuthError> {
        match self.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyRetrievalStrategy {
    /// Only look in environment variables
    Env,
    /// Only look in system keyring
    Keyring,
    /// Try keyring first, then environment variables
    #[default]
    Both,
}

/// Token stored in the system keyring by `cosint auth login`, with an
/// environment variable fallback for CI and headless use
pub struct KeyringCredentials<K: Keyring = Entry, E: Environment = RealEnvironment> {
    keyring: K,
    env: E,
    strategy: KeyRetrievalStrategy,
}

impl KeyringCredentials {
    pub fn system(strategy: KeyRetrievalStrategy) -> Result<Self, AuthError> {
        let keyring = Entry::new(KEYRING_SERVICE, ACCESS_TOKEN_KEY)?;
        Ok(Self::with_backends(keyring, RealEnvironment, strategy))
    }
}

impl<K: Keyring, E: Environment> KeyringCredentials<K, E> {
    pub fn with_backends(keyring: K, env: E, strategy: KeyRetrievalStrategy) -> Self {
        Self {
            keyring,
            env,
            strategy,
        }
    }

    pub fn resolve(&self) -> Result<Option<String>, AuthError> {
        match self.strategy {
            KeyRetrievalStrategy::Env => Ok(self.from_env()),
            KeyRetrievalStrategy::Keyring => self.keyring.read_token(),
            KeyRetrievalStrategy::Both => match self.keyring.read_token() {
                Ok(Some(token)) => Ok(Some(token)),
                Ok(None) => Ok(self.from_env()),
                Err(e) => {
                    warn!("Could not read token from keyring: {}", e);
                    Ok(self.from_env())
                }
            },
        }
    }

    pub fn save(&self, token: &str) -> Result<(), AuthError> {
        self.keyring.store_token(token.trim())
    }

    pub fn clear(&self) -> Result<(), AuthError> {
        self.keyring.clear_token()
    }

    fn from_env(&self) -> Option<String> {
        match self.env.get_var(ACCESS_TOKEN_KEY) {
            Ok(token) if !token.trim().is_empty() => Some(token.trim().to_string()),
            _ => {
                debug!("{} not set", ACCESS_TOKEN_KEY);
                None
            }
        }
    }
}

#[async_trait]
impl<K: Keyring, E: Environment> CredentialProvider for KeyringCredentials<K, E> {
    async fn access_token(&self) -> Result<Option<String>, AuthError> {
        self.resolve()
    }
}
