//! Runtime configuration for remote endpoints, cache and logging.
//!
//! # Invariants
//! - Every field has a default, so an empty JSON object is a valid config.
//! - `validate()` must pass before stores are built from a config.

use crate::cache::DEFAULT_SLOT;
use crate::logging::default_log_level;
use crate::model::element::Category;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const DEFAULT_BIRDS_URL: &str = "https://api.example.com/birds";
const DEFAULT_CLOUDS_URL: &str = "https://api.example.com/clouds";
const DEFAULT_CACHE_DB: &str = "skyscene_cache.sqlite3";

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config json: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

/// One category collection resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEndpoint {
    pub base_url: String,
    #[serde(default = "default_headers")]
    pub headers: BTreeMap<String, String>,
}

impl RemoteEndpoint {
    /// Endpoint with the default JSON content-type header.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            headers: default_headers(),
        }
    }

    /// Adds an `Authorization: Bearer` header.
    pub fn with_bearer(mut self, token: &str) -> Self {
        self.headers
            .insert("Authorization".to_string(), format!("Bearer {}", token.trim()));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub db_path: PathBuf,
    pub slot: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_CACHE_DB),
            slot: DEFAULT_SLOT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    /// Absolute directory for rolling log files; logging stays off when unset.
    pub dir: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level().to_string(),
            dir: None,
        }
    }
}

/// Top-level configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub birds: RemoteEndpoint,
    pub clouds: RemoteEndpoint,
    /// Bearer token applied to both endpoints.
    pub auth_token: Option<String>,
    pub cache: CacheConfig,
    pub log: LogConfig,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            birds: RemoteEndpoint::new(DEFAULT_BIRDS_URL),
            clouds: RemoteEndpoint::new(DEFAULT_CLOUDS_URL),
            auth_token: None,
            cache: CacheConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl SceneConfig {
    pub fn from_json_str(text: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(text).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Resolved endpoint for one category, with the auth token applied.
    pub fn endpoint(&self, category: Category) -> RemoteEndpoint {
        let endpoint = match category {
            Category::Bird => self.birds.clone(),
            Category::Cloud => self.clouds.clone(),
        };
        match self.auth_token.as_deref() {
            Some(token) if !token.trim().is_empty() => endpoint.with_bearer(token),
            _ => endpoint,
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        for category in Category::ALL {
            let endpoint = self.endpoint(category);
            let url = endpoint.base_url.trim();
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Invalid(format!(
                    "{} base_url must start with http:// or https://, got `{url}`",
                    category.plural_key()
                )));
            }
            if let Some(name) = endpoint.headers.keys().find(|name| !is_token(name)) {
                return Err(ConfigError::Invalid(format!(
                    "{} header name `{name}` is not a valid HTTP token",
                    category.plural_key()
                )));
            }
        }
        if self.cache.slot.trim().is_empty() {
            return Err(ConfigError::Invalid("cache.slot cannot be empty".to_string()));
        }
        Ok(())
    }
}

fn default_headers() -> BTreeMap<String, String> {
    BTreeMap::from([("Content-Type".to_string(), "application/json".to_string())])
}

fn is_token(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c))
}
