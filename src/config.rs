use serde::Deserialize;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::ConfigError;

pub const ENV_PROVIDER: &str = "PREPARE_COMMIT_MSG_AI";
pub const ENV_API_KEY: &str = "PREPARE_COMMIT_MSG_APIKEY";
pub const ENV_GENERATE_PROMPT: &str = "PREPARE_COMMIT_MSG_SYSTEM_GENMSG";
pub const ENV_REFINE_PROMPT: &str = "PREPARE_COMMIT_MSG_SYSTEM_FIXMSG";

pub const DEFAULT_PROVIDER: &str = "anthropic";

const HOME_PREFIX: &str = "~/";

#[derive(Default, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Prompts {
    #[serde(default)]
    pub generate: String,

    #[serde(default)]
    pub refine: String,
}

/// One configuration source. Empty strings mean "not set here".
#[derive(Default, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayer {
    #[serde(default)]
    pub provider: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default)]
    pub prompts: Prompts,
}

impl ConfigLayer {
    /// Build a layer from an environment lookup.
    pub fn from_env<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).unwrap_or_default();
        Self {
            provider: var(ENV_PROVIDER),
            api_key: var(ENV_API_KEY),
            prompts: Prompts {
                generate: var(ENV_GENERATE_PROMPT),
                refine: var(ENV_REFINE_PROMPT),
            },
        }
    }

    pub fn from_process_env() -> Self {
        Self::from_env(|name| std::env::var(name).ok())
    }

    /// Load a layer from a TOML file. A missing file yields an empty layer.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let metadata = match fs::metadata(path) {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        if !metadata.is_file() {
            return Err(ConfigError::NotAFile(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overlay `other` onto `self`, field by field. Empty values never win.
    pub fn update(&mut self, other: &ConfigLayer) {
        overlay(&mut self.provider, &other.provider);
        overlay(&mut self.api_key, &other.api_key);
        overlay(&mut self.prompts.generate, &other.prompts.generate);
        overlay(&mut self.prompts.refine, &other.prompts.refine);
    }

    fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn overlay(current: &mut String, candidate: &str) {
    if !candidate.is_empty() {
        *current = candidate.to_string();
    }
}

impl fmt::Debug for ConfigLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigLayer")
            .field("provider", &self.provider)
            .field("api_key", &redact(&self.api_key))
            .field("generate_prompt", &self.prompts.generate)
            .field("refine_prompt", &self.prompts.refine)
            .finish()
    }
}

/// The merged settings for one hook invocation.
#[derive(Clone, PartialEq)]
pub struct EffectiveConfig {
    pub provider: String,
    pub api_key: String,
    pub generate_prompt: String,
    pub refine_prompt: String,
}

impl From<ConfigLayer> for EffectiveConfig {
    fn from(layer: ConfigLayer) -> Self {
        let provider = if layer.provider.is_empty() {
            DEFAULT_PROVIDER.to_string()
        } else {
            layer.provider
        };

        Self {
            provider,
            api_key: layer.api_key,
            generate_prompt: layer.prompts.generate,
            refine_prompt: layer.prompts.refine,
        }
    }
}

impl fmt::Debug for EffectiveConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectiveConfig")
            .field("provider", &self.provider)
            .field("api_key", &redact(&self.api_key))
            .field("generate_prompt", &self.generate_prompt)
            .field("refine_prompt", &self.refine_prompt)
            .finish()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

/// Everything needed to build the effective configuration, gathered up
/// front and resolved only when a provider is actually needed.
#[derive(Debug, Default, Clone)]
pub struct ConfigSources {
    pub env: ConfigLayer,
    pub file: Option<PathBuf>,
    pub flags: ConfigLayer,
}

impl ConfigSources {
    pub fn resolve(&self) -> Result<EffectiveConfig, ConfigError> {
        resolve(&self.env, self.file.as_deref(), &self.flags)
    }
}

/// Merge environment, file and flag layers, in that order of precedence.
pub fn resolve(
    env: &ConfigLayer,
    file: Option<&Path>,
    flags: &ConfigLayer,
) -> Result<EffectiveConfig, ConfigError> {
    let mut merged = ConfigLayer::default();
    merged.update(env);

    if let Some(path) = file {
        let layer = ConfigLayer::from_file(path)?;
        if !layer.is_empty() {
            debug!(path = %path.display(), "loaded config file");
        }
        merged.update(&layer);
    }

    merged.update(flags);

    let config = EffectiveConfig::from(merged);
    debug!(?config, "resolved configuration");
    Ok(config)
}

/// Pick the config file: an explicit path (with `~/` expanded) or the
/// per-user default location.
pub fn config_path(explicit: Option<&str>) -> Option<PathBuf> {
    match explicit {
        Some(p) => Some(expand_home(p)),
        None => default_config_path(),
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("prepare-commit-msg").join("config.toml"))
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix(HOME_PREFIX), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
