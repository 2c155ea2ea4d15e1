use crate::domain::models::AccessToken;
use crate::infrastructure::error::CoreError;
use std::sync::Mutex;

/// Where the identity provider's bearer token lives between requests.
pub trait AccessTokenStore: Send + Sync {
    fn save_token(&self, token: &AccessToken) -> Result<(), CoreError>;
    fn load_token(&self) -> Result<Option<AccessToken>, CoreError>;
    fn delete_token(&self) -> Result<(), CoreError>;
}

#[derive(Debug, Clone)]
pub struct KeyringAccessTokenStore {
    service_name: String,
    account_name: String,
}

impl KeyringAccessTokenStore {
    pub fn new(service_name: impl Into<String>, account_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            account_name: account_name.into(),
        }
    }

    fn entry(&self) -> Result<keyring::Entry, CoreError> {
        keyring::Entry::new(&self.service_name, &self.account_name)
            .map_err(|error| CoreError::Credential(error.to_string()))
    }
}

impl Default for KeyringAccessTokenStore {
    fn default() -> Self {
        Self::new("roomsched.session", "default")
    }
}

impl AccessTokenStore for KeyringAccessTokenStore {
    fn save_token(&self, token: &AccessToken) -> Result<(), CoreError> {
        let payload = serde_json::to_string(token)
            .map_err(|error| CoreError::Credential(error.to_string()))?;
        self.entry()?
            .set_password(&payload)
            .map_err(|error| CoreError::Credential(error.to_string()))
    }

    fn load_token(&self) -> Result<Option<AccessToken>, CoreError> {
        let payload = match self.entry()?.get_password() {
            Ok(value) => value,
            Err(keyring::Error::NoEntry) => return Ok(None),
            Err(error) => return Err(CoreError::Credential(error.to_string())),
        };

        let token = serde_json::from_str::<AccessToken>(&payload)
            .map_err(|error| CoreError::Credential(error.to_string()))?;
        Ok(Some(token))
    }

    fn delete_token(&self) -> Result<(), CoreError> {
        match self.entry()?.delete_credential() {
            Ok(_) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(CoreError::Credential(error.to_string())),
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryAccessTokenStore {
    token: Mutex<Option<AccessToken>>,
}

impl AccessTokenStore for InMemoryAccessTokenStore {
    fn save_token(&self, token: &AccessToken) -> Result<(), CoreError> {
        let mut guard = self
            .token
            .lock()
            .map_err(|error| CoreError::Credential(format!("in-memory lock poisoned: {error}")))?;
        *guard = Some(token.clone());
        Ok(())
    }

    fn load_token(&self) -> Result<Option<AccessToken>, CoreError> {
        let guard = self
            .token
            .lock()
            .map_err(|error| CoreError::Credential(format!("in-memory lock poisoned: {error}")))?;
        Ok(guard.clone())
    }

    fn delete_token(&self) -> Result<(), CoreError> {
        let mut guard = self
            .token
            .lock()
            .map_err(|error| CoreError::Credential(format!("in-memory lock poisoned: {error}")))?;
        *guard = None;
        Ok(())
    }
}
