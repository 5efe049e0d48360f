//! Interpretation of the arguments Git passes to `prepare-commit-msg`.
//!
//! Git calls the hook as `prepare-commit-msg <file> [<source> [<sha>]]`.
//! The source tells us why the commit is happening, which decides whether we
//! write a fresh message, polish the one the user supplied, or stay out of
//! the way.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::ai::ChatProvider;
use crate::error::{HookError, ProviderError};
use crate::git::DiffSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookSource {
    /// Plain `git commit`, or a source we don't know about.
    Default,
    /// `-m` / `-F`: the user already wrote a message.
    Message,
    Merge,
    Squash,
    /// `-c` / `-C` / `--amend`: message reused from an existing commit.
    Commit,
}

impl HookSource {
    pub fn from_arg(s: &str) -> Self {
        match s {
            "message" => Self::Message,
            "merge" => Self::Merge,
            "squash" => Self::Squash,
            "commit" => Self::Commit,
            _ => Self::Default,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookInvocation {
    pub output_file: Option<PathBuf>,
    pub source: HookSource,
    pub sha: Option<String>,
}

impl HookInvocation {
    /// Build from positional arguments. Anything past the third is ignored.
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut args = args.into_iter();
        let mut next = || {
            args.next()
                .map(|s| s.as_ref().to_string())
                .filter(|s| !s.is_empty())
        };

        let output_file = next().map(PathBuf::from);
        let source = next().map_or(HookSource::Default, |s| HookSource::from_arg(&s));
        let sha = next();

        Self {
            output_file,
            source,
            sha,
        }
    }
}

/// What the hook should do with this invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookAction {
    Skip,
    Generate(String),
    Refine(String),
}

impl HookAction {
    /// Ask the provider for the new message. `Skip` never touches it.
    pub fn run(&self, provider: &dyn ChatProvider) -> Result<Option<String>, ProviderError> {
        match self {
            Self::Skip => Ok(None),
            Self::Generate(diff) => provider.commit_message(diff).map(Some),
            Self::Refine(message) => provider.refine_text(message).map(Some),
        }
    }
}

/// Decide what to do and gather the input text for it.
pub fn dispatch(
    invocation: &HookInvocation,
    diffs: &dyn DiffSource,
) -> Result<HookAction, HookError> {
    let action = match invocation.source {
        HookSource::Merge | HookSource::Squash | HookSource::Commit => HookAction::Skip,
        HookSource::Message => {
            let path = invocation
                .output_file
                .as_deref()
                .ok_or(HookError::MissingMessageFile)?;
            non_empty(read_message(path)?).map_or(HookAction::Skip, HookAction::Refine)
        }
        HookSource::Default => {
            non_empty(diffs.staged_diff()?).map_or(HookAction::Skip, HookAction::Generate)
        }
    };

    debug!(source = ?invocation.source, action = action_name(&action), "dispatched");
    Ok(action)
}

/// Read a commit message file, dropping Git's `#` comment lines.
pub fn read_message(path: &Path) -> Result<String, HookError> {
    let bytes = fs::read(path).map_err(|source| HookError::ReadMessage {
        path: path.to_path_buf(),
        source,
    })?;

    // Messages may be in a non-UTF-8 i18n.commitEncoding.
    let content = String::from_utf8_lossy(&bytes);
    let message: String = content
        .lines()
        .filter(|line| !line.starts_with('#'))
        .map(|line| format!("{}\n", line))
        .collect();

    Ok(message.trim().to_string())
}

fn non_empty(text: String) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

fn action_name(action: &HookAction) -> &'static str {
    match action {
        HookAction::Skip => "skip",
        HookAction::Generate(_) => "generate",
        HookAction::Refine(_) => "refine",
    }
}
