//! Runtime configuration for the sync controller and the `wardeck` binary.
//!
//! Resolution order: `$WARDECK_CONFIG_PATH`, then inline
//! `$WARDECK_CONFIG_JSON`, then a `wardeck.toml`/`wardeck.json` in the working
//! directory, then built-in defaults. Durations accept either whole seconds
//! or humantime strings such as `"1h"` or `"45s"`.

use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, anyhow, bail};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    cache::DEFAULT_CACHE_TTL,
    sync::{SyncOptions, controller::DEFAULT_REQUEST_TIMEOUT},
};

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:5001/api/scan/all";

pub const CONFIG_PATH_VAR: &str = "WARDECK_CONFIG_PATH";
pub const CONFIG_JSON_VAR: &str = "WARDECK_CONFIG_JSON";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub endpoint: String,
    #[serde(with = "duration_serde")]
    pub cache_ttl: Duration,
    #[serde(with = "duration_serde")]
    pub request_timeout: Duration,
    pub cache_dir: PathBuf,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            cache_ttl: DEFAULT_CACHE_TTL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            cache_dir: default_cache_dir(),
        }
    }
}

/// Where a loaded configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    EnvPath(PathBuf),
    EnvInline,
    File(PathBuf),
    Default,
}

fn default_cache_dir() -> PathBuf {
    env::temp_dir().join("wardeck-cache")
}

impl SyncConfig {
    pub fn load_from_env() -> anyhow::Result<(Self, ConfigSource)> {
        Self::load_with(|key| env::var(key).ok())
    }

    /// Same as [`SyncConfig::load_from_env`] with an injectable variable
    /// lookup.
    pub fn load_with(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<(Self, ConfigSource)> {
        if let Some(path_str) = lookup(CONFIG_PATH_VAR)
            && !path_str.trim().is_empty()
        {
            let path = PathBuf::from(path_str);
            let config = Self::load_from_file(&path)?;
            return Ok((config, ConfigSource::EnvPath(path)));
        }

        if let Some(raw) = lookup(CONFIG_JSON_VAR)
            && !raw.trim().is_empty()
        {
            let parsed: Self = serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse {CONFIG_JSON_VAR}"))?;
            parsed.validate()?;
            return Ok((parsed, ConfigSource::EnvInline));
        }

        if let Some(path) = Self::find_default_file() {
            let config = Self::load_from_file(&path)?;
            return Ok((config, ConfigSource::File(path)));
        }

        Ok((Self::default(), ConfigSource::Default))
    }

    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path).with_context(|| {
            format!("failed to read config from {}", path.display())
        })?;

        let config: Self = match path.extension().and_then(|ext| ext.to_str())
        {
            Some("json") => serde_json::from_str(&contents)
                .with_context(|| format!("invalid config {}", path.display()))?,
            Some("toml") => toml::from_str(&contents).map_err(|err| {
                anyhow!("invalid config {}: {}", path.display(), err)
            })?,
            _ => Self::parse_from_str(&contents, &path.display().to_string())?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse TOML, falling back to JSON.
    pub fn parse_from_str(contents: &str, origin: &str) -> anyhow::Result<Self> {
        toml::from_str(contents).or_else(|toml_err| {
            serde_json::from_str(contents).map_err(|json_err| {
                anyhow!(
                    "failed to parse config {}: toml error: {}; json error: {}",
                    origin,
                    toml_err,
                    json_err
                )
            })
        })
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.cache_ttl.is_zero() {
            bail!("cache_ttl must be greater than zero");
        }
        if self.request_timeout.is_zero() {
            bail!("request_timeout must be greater than zero");
        }
        self.endpoint_url()?;
        Ok(())
    }

    pub fn endpoint_url(&self) -> anyhow::Result<Url> {
        let url = Url::parse(&self.endpoint)
            .with_context(|| format!("invalid endpoint {}", self.endpoint))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => bail!("unsupported endpoint scheme {other}"),
        }
    }

    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            cache_ttl: self.cache_ttl,
            request_timeout: self.request_timeout,
        }
    }

    fn find_default_file() -> Option<PathBuf> {
        const CANDIDATES: &[&str] = &["wardeck.toml", "wardeck.json"];

        CANDIDATES
            .iter()
            .map(PathBuf::from)
            .find(|candidate| candidate.is_file())
    }
}

mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(u64),
        Human(String),
    }

    pub fn serialize<S: Serializer>(
        value: &Duration,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Duration, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Seconds(secs) => Ok(Duration::from_secs(secs)),
            Raw::Human(text) => humantime::parse_duration(text.trim())
                .map_err(|err| D::Error::custom(format!("{text:?}: {err}"))),
        }
    }
}
