//! Session persistence in the OS keychain, one entry set per CLI profile.

#[cfg(test)]
use std::collections::HashMap;
#[cfg(test)]
use std::sync::{Mutex, OnceLock};

#[cfg(not(test))]
use keyring::Entry;
use taskflow_core::storage::{KeyValueStore, StorageError, StorageResult};

#[cfg(not(test))]
const KEYRING_SERVICE_NAME: &str = "taskflow-cli";

#[derive(Debug, Clone)]
pub struct KeyringStore {
    profile_name: String,
}

impl KeyringStore {
    pub fn new(profile_name: &str) -> Self {
        Self {
            profile_name: profile_name.to_string(),
        }
    }

    fn entry_name(&self, key: &str) -> String {
        format!("{}:{key}", self.profile_name)
    }

    #[cfg(test)]
    fn test_store() -> &'static Mutex<HashMap<String, String>> {
        static STORE: OnceLock<Mutex<HashMap<String, String>>> = OnceLock::new();
        STORE.get_or_init(|| Mutex::new(HashMap::new()))
    }

    #[cfg(not(test))]
    fn entry(&self, key: &str) -> StorageResult<Entry> {
        Entry::new(KEYRING_SERVICE_NAME, &self.entry_name(key))
            .map_err(|error| StorageError::Backend(error.to_string()))
    }
}

impl KeyValueStore for KeyringStore {
    #[cfg(not(test))]
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(StorageError::Backend(error.to_string())),
        }
    }

    #[cfg(test)]
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let guard = Self::test_store()
            .lock()
            .map_err(|error| StorageError::Backend(error.to_string()))?;
        Ok(guard.get(&self.entry_name(key)).cloned())
    }

    #[cfg(not(test))]
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.entry(key)?
            .set_password(value)
            .map_err(|error| StorageError::Backend(error.to_string()))
    }

    #[cfg(test)]
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut guard = Self::test_store()
            .lock()
            .map_err(|error| StorageError::Backend(error.to_string()))?;
        guard.insert(self.entry_name(key), value.to_string());
        Ok(())
    }

    #[cfg(not(test))]
    fn remove(&self, key: &str) -> StorageResult<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(StorageError::Backend(error.to_string())),
        }
    }

    #[cfg(test)]
    fn remove(&self, key: &str) -> StorageResult<()> {
        let mut guard = Self::test_store()
            .lock()
            .map_err(|error| StorageError::Backend(error.to_string()))?;
        guard.remove(&self.entry_name(key));
        Ok(())
    }
}
