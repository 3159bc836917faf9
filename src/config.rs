//! Run-wide configuration: HTTP client settings and registry credentials

use crate::error::{RegistryError, Result};
use crate::reference::DEFAULT_REGISTRY;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

const DOCKER_CONFIG_FILE: &str = "config.json";
const DOCKER_HUB_AUTH_KEY: &str = "https://index.docker.io/v1/";

/// Settings shared by every registry session created during a run
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub timeout: Duration,
    pub plain_http: bool,
}

impl ClientConfig {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            plain_http: false,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_plain_http(mut self, plain_http: bool) -> Self {
        self.plain_http = plain_http;
        self
    }

    /// Base URL of the V2 API for a registry hostname
    pub fn base_url(&self, hostname: &str) -> String {
        if hostname == DEFAULT_REGISTRY {
            return "https://registry-1.docker.io".to_string();
        }
        let scheme = if self.plain_http { "http" } else { "https" };
        format!("{}://{}", scheme, hostname.trim_end_matches('/'))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Username and password for one registry; immutable once resolved
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_anonymous(&self) -> bool {
        self.username.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Where credentials come from for this run
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    pub username: Option<String>,
    pub password: Option<String>,
    pub config_path: Option<PathBuf>,
}

impl AuthConfig {
    pub fn new(
        username: Option<String>,
        password: Option<String>,
        config_path: Option<PathBuf>,
    ) -> Self {
        Self {
            username,
            password,
            config_path,
        }
    }

    /// Explicit username/password win, then the Docker config file, then anonymous
    pub fn resolve(&self, hostname: &str) -> Result<Credentials> {
        if let Some(username) = self.username.as_deref().filter(|u| !u.is_empty()) {
            return Ok(Credentials::new(
                username,
                self.password.clone().unwrap_or_default(),
            ));
        }

        let path = match &self.config_path {
            Some(path) => docker_config_file(path),
            None => match default_docker_config_dir() {
                Some(dir) => docker_config_file(&dir),
                None => return Ok(Credentials::anonymous()),
            },
        };
        if !path.exists() {
            return Ok(Credentials::anonymous());
        }

        let config = DockerConfigFile::load(&path)?;
        Ok(config.credentials_for(hostname)?.unwrap_or_default())
    }
}

/// Accept either the config directory or the file inside it
fn docker_config_file(path: &Path) -> PathBuf {
    if path.is_dir() {
        path.join(DOCKER_CONFIG_FILE)
    } else {
        path.to_path_buf()
    }
}

fn default_docker_config_dir() -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os("DOCKER_CONFIG") {
        return Some(PathBuf::from(dir));
    }
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".docker"))
}

#[derive(Debug, Default, Deserialize)]
struct DockerAuthEntry {
    #[serde(default)]
    auth: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

/// The `auths` section of a Docker CLI `config.json`
#[derive(Debug, Default, Deserialize)]
pub struct DockerConfigFile {
    #[serde(default)]
    auths: HashMap<String, DockerAuthEntry>,
}

impl DockerConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read(path).map_err(|e| {
            RegistryError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
            .map_err(|e| RegistryError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_json(data: &[u8]) -> Result<Self> {
        serde_json::from_slice(data).map_err(|e| RegistryError::Config(e.to_string()))
    }

    pub fn credentials_for(&self, hostname: &str) -> Result<Option<Credentials>> {
        let mut keys = vec![hostname.to_string(), format!("https://{}", hostname)];
        if hostname == DEFAULT_REGISTRY {
            keys.push(DOCKER_HUB_AUTH_KEY.to_string());
        }

        let Some(entry) = keys.iter().find_map(|key| self.auths.get(key)) else {
            return Ok(None);
        };

        if let Some(auth) = entry.auth.as_deref().filter(|a| !a.is_empty()) {
            let decoded = STANDARD.decode(auth).map_err(|e| {
                RegistryError::Config(format!("invalid auth for {}: {}", hostname, e))
            })?;
            let decoded = String::from_utf8(decoded).map_err(|e| {
                RegistryError::Config(format!("invalid auth for {}: {}", hostname, e))
            })?;
            let (username, password) = decoded.split_once(':').ok_or_else(|| {
                RegistryError::Config(format!("auth for {} is not user:password", hostname))
            })?;
            return Ok(Some(Credentials::new(username, password)));
        }

        Ok(entry.username.as_ref().map(|username| {
            Credentials::new(username.clone(), entry.password.clone().unwrap_or_default())
        }))
    }
}
