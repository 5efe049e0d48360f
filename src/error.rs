//! Error types for each stage of the hook, using thiserror.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from loading the configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} is not a regular file")]
    NotAFile(PathBuf),

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Errors from talking to an AI backend.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Request failed [{status}]: {body}")]
    Request { status: u16, body: String },

    #[error("Failed to decode {provider} response: {reason}")]
    Decode {
        provider: &'static str,
        reason: String,
    },

    #[error("Failed to reach {provider}: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

/// Errors from collecting the hook's input text.
#[derive(Error, Debug)]
pub enum HookError {
    #[error("git diff failed: {0}")]
    Diff(String),

    #[error("No commit message file given for the 'message' source")]
    MissingMessageFile,

    #[error("Failed to read commit message from {path}: {source}")]
    ReadMessage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Top-level failure of one hook run. Each class maps to its own exit code.
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Input(#[from] HookError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Failed to write commit message to {target}: {source}")]
    Write {
        target: String,
        #[source]
        source: std::io::Error,
    },
}

impl AppError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Input(_) => 1,
            Self::Config(_) => 2,
            Self::Provider(_) => 3,
            Self::Write { .. } => 4,
        }
    }
}
