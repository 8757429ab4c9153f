use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use nexstage_util::errors::{NexstageError, NexstageResult};

use crate::properties::interpolate;

/// Global user configuration loaded from `~/.nexstage/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub servers: BTreeMap<String, ServerEntry>,
}

/// Credential and proxy entry for a named server, from `[servers.<id>]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerEntry {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub proxy: Option<String>,
}

/// Credentials resolved for one server, with `${env:...}` already expanded.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ServerCredentials {
    pub server_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub proxy: Option<String>,
}

impl std::fmt::Debug for ServerCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerCredentials")
            .field("server_id", &self.server_id)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "****"))
            .field("proxy", &self.proxy)
            .finish()
    }
}

impl GlobalConfig {
    /// Load the global configuration from `~/.nexstage/config.toml`, or return
    /// defaults if the file doesn't exist.
    pub fn load() -> NexstageResult<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load the global configuration from an explicit path.
    pub fn load_from(path: &Path) -> NexstageResult<Self> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            NexstageError::configuration(format!("Failed to read global config: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            NexstageError::configuration(format!("Failed to parse global config: {e}"))
        })
    }

    /// Returns the default path to the global config file.
    pub fn default_path() -> PathBuf {
        dirs_path().join("config.toml")
    }

    /// Resolve the credentials of `server_id`, interpolating `${env:VAR}`
    /// references against `env` and then the process environment.
    ///
    /// An unknown server ID is a configuration error: a credential
    /// reference that points nowhere would otherwise fail later as an
    /// opaque HTTP 401.
    pub fn credentials_for(
        &self,
        server_id: &str,
        env: &BTreeMap<String, String>,
    ) -> NexstageResult<ServerCredentials> {
        let entry = self.servers.get(server_id).ok_or_else(|| {
            NexstageError::configuration(format!(
                "Server '{server_id}' is not defined in {}",
                Self::default_path().display()
            ))
        })?;
        let expand = |v: &Option<String>| {
            v.as_deref()
                .map(|s| interpolate(s, env))
                .filter(|s| !s.is_empty())
        };
        Ok(ServerCredentials {
            server_id: server_id.to_string(),
            username: expand(&entry.username),
            password: expand(&entry.password),
            proxy: expand(&entry.proxy),
        })
    }
}

/// Returns the path to the nexstage data directory (`~/.nexstage/`).
///
/// `NEXSTAGE_HOME` overrides the location.
pub fn dirs_path() -> PathBuf {
    if let Ok(home) = std::env::var("NEXSTAGE_HOME") {
        return PathBuf::from(home);
    }
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    Path::new(&home).join(".nexstage")
}
