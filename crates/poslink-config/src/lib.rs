//! Shared configuration for poslink tools.
//!
//! One TOML file with `[api]`, `[channel]` and `[token]` sections, layered
//! under `POSLINK_*` environment variables, and translated into the
//! `poslink_api` connection settings. Also provides the keyring-backed
//! token store.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use poslink_api::token::TOKEN_KEY;
use poslink_api::{
    ChannelConfig, ClientConfig, FileTokenStore, ReconnectPolicy, RetryPolicy, SessionToken,
    TlsMode, TokenStore, TransportConfig,
};

/// Environment prefix; nested keys use `__`, e.g. `POSLINK_API__BASE_URL`.
pub const ENV_PREFIX: &str = "POSLINK_";

/// Keyring service name for the session token.
pub const KEYRING_SERVICE: &str = "poslink";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiSection,

    #[serde(default)]
    pub channel: ChannelSection,

    #[serde(default)]
    pub token: TokenSection,
}

/// `[api]`: the request client.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiSection {
    /// Backend base URL including the API prefix.
    pub base_url: String,

    /// Per-attempt timeout in seconds.
    pub timeout: u64,

    /// Accept invalid TLS certificates.
    pub insecure: bool,

    /// Extra CA certificate (PEM).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    /// Total attempts per call, including the first.
    pub max_attempts: u32,

    /// Linear backoff step between attempts.
    pub retry_delay_ms: u64,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/api".into(),
            timeout: 10,
            insecure: false,
            ca_cert: None,
            max_attempts: 3,
            retry_delay_ms: 1000,
        }
    }
}

/// `[channel]`: the event channel.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ChannelSection {
    /// Server origin. Defaults to the origin of `api.base_url`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub connect_timeout_ms: u64,
}

impl Default for ChannelSection {
    fn default() -> Self {
        Self {
            url: None,
            max_attempts: 5,
            base_delay_ms: 1000,
            connect_timeout_ms: 10_000,
        }
    }
}

/// Where the session token is persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenBackend {
    /// A `token` file in the data directory.
    #[default]
    File,
    /// The system keyring.
    Keyring,
}

/// `[token]`
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TokenSection {
    pub backend: TokenBackend,

    /// Directory for the file backend. Defaults to [`data_dir`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

// ── Translation to poslink_api ──────────────────────────────────────

impl Config {
    /// Parsed and checked `api.base_url`.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let url: Url = self
            .api
            .base_url
            .parse()
            .map_err(|e| invalid("api.base_url", format!("{e}: {}", self.api.base_url)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(invalid(
                "api.base_url",
                format!("expected http or https, got '{other}'"),
            )),
        }
    }

    /// Request client settings.
    pub fn client_config(&self) -> Result<ClientConfig, ConfigError> {
        if self.api.timeout == 0 {
            return Err(invalid("api.timeout", "must be at least 1 second"));
        }
        if self.api.max_attempts == 0 {
            return Err(invalid("api.max_attempts", "must be at least 1"));
        }

        Ok(ClientConfig {
            base_url: self.base_url()?,
            transport: TransportConfig {
                tls: self.tls_mode(),
                timeout: Duration::from_secs(self.api.timeout),
            },
            retry: RetryPolicy {
                max_attempts: self.api.max_attempts,
                base_delay: Duration::from_millis(self.api.retry_delay_ms),
            },
        })
    }

    /// `insecure` wins over `ca_cert`. Requests and the event channel share it.
    pub fn tls_mode(&self) -> TlsMode {
        if self.api.insecure {
            TlsMode::DangerAcceptInvalid
        } else if let Some(ref ca) = self.api.ca_cert {
            TlsMode::CustomCa(ca.clone())
        } else {
            TlsMode::System
        }
    }

    /// Event channel settings. `auth` is read on each connect; pass an empty
    /// slot to connect anonymously.
    pub fn channel_config(&self, auth: SessionToken) -> Result<ChannelConfig, ConfigError> {
        let url = match self.channel.url {
            Some(ref raw) => raw
                .parse()
                .map_err(|e| invalid("channel.url", format!("{e}: {raw}")))?,
            None => {
                let origin = self.base_url()?.origin().ascii_serialization();
                origin
                    .parse()
                    .map_err(|e| invalid("api.base_url", format!("{e}: no usable origin")))?
            }
        };
        if self.channel.connect_timeout_ms == 0 {
            return Err(invalid("channel.connect_timeout_ms", "must be positive"));
        }

        Ok(ChannelConfig {
            url,
            reconnect: ReconnectPolicy {
                max_attempts: self.channel.max_attempts,
                base_delay: Duration::from_millis(self.channel.base_delay_ms),
                connect_timeout: Duration::from_millis(self.channel.connect_timeout_ms),
            },
            tls: self.tls_mode(),
            auth,
        })
    }

    /// Directory used by the file token backend.
    pub fn token_dir(&self) -> PathBuf {
        self.token.dir.clone().unwrap_or_else(data_dir)
    }

    /// The configured token store.
    pub fn token_store(&self) -> Result<Arc<dyn TokenStore>, ConfigError> {
        Ok(match self.token.backend {
            TokenBackend::File => Arc::new(FileTokenStore::in_dir(self.token_dir())),
            TokenBackend::Keyring => Arc::new(KeyringTokenStore::new()?),
        })
    }
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "poslink", "poslink")
}

fn home_fallback(parts: &[&str]) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.extend(parts);
    p
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(&[".config", "poslink", "config.toml"]),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Directory for persisted state (the token file).
pub fn data_dir() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(&[".local", "share", "poslink"]),
        |dirs| dirs.data_dir().to_path_buf(),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load from the canonical path plus environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Defaults, then the TOML file at `path` (if present), then `POSLINK_*`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    tracing::debug!(path = %path.display(), "loading config");

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Keyring token store ─────────────────────────────────────────────

/// Session token in the system keyring (service `poslink`, user `token`).
#[derive(Debug)]
pub struct KeyringTokenStore {
    entry: keyring::Entry,
}

impl KeyringTokenStore {
    pub fn new() -> Result<Self, ConfigError> {
        Ok(Self {
            entry: keyring::Entry::new(KEYRING_SERVICE, TOKEN_KEY)?,
        })
    }
}

fn keyring_error(action: &str, e: &keyring::Error) -> poslink_api::Error {
    poslink_api::Error::TokenStore(format!("failed to {action} keyring entry: {e}"))
}

impl TokenStore for KeyringTokenStore {
    fn load(&self) -> Result<Option<SecretString>, poslink_api::Error> {
        match self.entry.get_password() {
            Ok(token) if token.is_empty() => Ok(None),
            Ok(token) => Ok(Some(SecretString::from(token))),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(keyring_error("read", &e)),
        }
    }

    fn save(&self, token: &SecretString) -> Result<(), poslink_api::Error> {
        self.entry
            .set_password(token.expose_secret())
            .map_err(|e| keyring_error("write", &e))
    }

    fn clear(&self) -> Result<(), poslink_api::Error> {
        match self.entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(keyring_error("delete", &e)),
        }
    }
}
