//! Persistent CLI profile configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use taskflow_core::config::{normalize_base_url, AuthScheme, ClientConfig};

const CONFIG_FILE_NAME: &str = "cli-config.json";
pub const PROFILE_ENV: &str = "TASKFLOW_PROFILE";
pub const API_URL_ENV: &str = "TASKFLOW_API_URL";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliProfilesConfig {
    #[serde(default = "default_config_version")]
    pub version: u32,
    #[serde(default)]
    pub active_profile: Option<String>,
    #[serde(default)]
    pub profiles: BTreeMap<String, CliProfile>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliProfile {
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub auth_scheme: Option<AuthScheme>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

const fn default_config_version() -> u32 {
    1
}

pub fn default_config_path() -> Result<PathBuf, String> {
    dirs::config_dir()
        .map(|dir| dir.join("taskflow").join(CONFIG_FILE_NAME))
        .ok_or_else(|| "Failed to resolve CLI config directory".to_string())
}

/// Trimmed value, or `None` when absent or blank.
pub fn trimmed_non_empty(value: Option<&str>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

impl CliProfilesConfig {
    pub fn load() -> Result<Self, String> {
        Self::load_from_path(&default_config_path()?)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|error| format!("Failed to read config at {}: {}", path.display(), error))?;
        let mut config = serde_json::from_str::<Self>(&raw)
            .map_err(|error| format!("Failed to parse config at {}: {}", path.display(), error))?;
        config.normalize();
        Ok(config)
    }

    pub fn save(&self) -> Result<PathBuf, String> {
        let path = default_config_path()?;
        self.save_to_path(&path)?;
        Ok(path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    error
                )
            })?;
        }

        let mut normalized = self.clone();
        normalized.normalize();
        let serialized = serde_json::to_string_pretty(&normalized)
            .map_err(|error| format!("Failed to serialize config: {error}"))?;
        std::fs::write(path, serialized)
            .map_err(|error| format!("Failed to write config at {}: {}", path.display(), error))
    }

    pub fn resolve_profile_name(&self, explicit: Option<&str>) -> String {
        self.resolve_profile_name_with(explicit, std::env::var(PROFILE_ENV).ok().as_deref())
    }

    /// Flag, then environment, then active profile, then `default`.
    pub fn resolve_profile_name_with(&self, explicit: Option<&str>, env: Option<&str>) -> String {
        trimmed_non_empty(explicit)
            .or_else(|| trimmed_non_empty(env))
            .or_else(|| trimmed_non_empty(self.active_profile.as_deref()))
            .unwrap_or_else(|| "default".to_string())
    }

    pub fn profile(&self, name: &str) -> Option<&CliProfile> {
        self.profiles.get(name)
    }

    pub fn profile_mut_or_default(&mut self, name: &str) -> &mut CliProfile {
        self.profiles.entry(name.to_string()).or_default()
    }

    fn normalize(&mut self) {
        self.active_profile = trimmed_non_empty(self.active_profile.as_deref());
        for profile in self.profiles.values_mut() {
            profile.normalize();
        }
    }
}

impl CliProfile {
    pub fn to_client_config(&self) -> Result<ClientConfig, String> {
        self.to_client_config_with(std::env::var(API_URL_ENV).ok())
    }

    /// Effective client settings; `env_api_url` wins over the stored URL.
    pub fn to_client_config_with(
        &self,
        env_api_url: Option<String>,
    ) -> Result<ClientConfig, String> {
        let mut config = ClientConfig::default();
        let api_base_url =
            trimmed_non_empty(env_api_url.as_deref()).or_else(|| self.api_base_url.clone());
        if let Some(url) = api_base_url {
            config.api_base_url = normalize_base_url(&url)?;
        }
        if let Some(scheme) = self.auth_scheme {
            config.auth_scheme = scheme;
        }
        if let Some(secs) = self.request_timeout_secs {
            if secs == 0 {
                return Err("request_timeout_secs must be greater than zero".to_string());
            }
            config.request_timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    fn normalize(&mut self) {
        self.api_base_url = trimmed_non_empty(self.api_base_url.as_deref())
            .map(|url| url.trim_end_matches('/').to_string());
    }
}
