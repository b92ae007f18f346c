use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::error::{ConfigError, Result};

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TripplanConfig {
    pub backend: BackendSection,
    #[serde(default)]
    pub auth: AuthSection,
    #[serde(default)]
    pub map: MapSection,
}

impl TripplanConfig {
    /// Minimal configuration pointing at `base_url` with every other value
    /// at its default.
    pub fn for_base_url(base_url: impl Into<String>) -> Self {
        Self {
            backend: BackendSection {
                base_url: base_url.into(),
                timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
                user_agent: None,
                headers: BTreeMap::new(),
            },
            auth: AuthSection::default(),
            map: MapSection::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.backend.parsed_base_url()?;
        if self.backend.timeout_seconds == 0 {
            return Err(ConfigError::Invalid {
                field: "backend.timeout_seconds",
                reason: "must be greater than zero".into(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendSection {
    pub base_url: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl BackendSection {
    pub fn parsed_base_url(&self) -> Result<Url> {
        let url = Url::parse(&self.base_url).map_err(|err| ConfigError::Invalid {
            field: "backend.base_url",
            reason: err.to_string(),
        })?;
        if url.cannot_be_a_base() {
            return Err(ConfigError::Invalid {
                field: "backend.base_url",
                reason: format!("{} cannot be used as a base url", self.base_url),
            });
        }
        Ok(url)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

fn default_timeout_seconds() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthSection {
    #[serde(default)]
    pub token: Option<String>,
}

/// Browser map provider keys. Only carried through for front ends that
/// embed the map script; the API client never sends them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MapSection {
    #[serde(default)]
    pub js_api_key: String,
    #[serde(default)]
    pub security_js_code: String,
}

pub fn load_tripplan_config<P: AsRef<Path>>(path: P) -> Result<TripplanConfig> {
    let config: TripplanConfig = load_toml(path)?;
    config.validate()?;
    Ok(config)
}

fn load_toml<T, P>(path: P) -> Result<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        source,
        path: path.to_path_buf(),
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        source,
        path: path.to_path_buf(),
    })
}
