use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::HookError;

/// Somewhere to read the staged changes from.
#[cfg_attr(test, mockall::automock)]
pub trait DiffSource {
    /// The staged diff, trimmed. Empty when nothing is staged.
    fn staged_diff(&self) -> Result<String, HookError>;
}

/// Reads the staged diff by running `git diff --staged`, in the current
/// directory unless told otherwise.
#[derive(Debug, Default, Clone)]
pub struct GitDiff {
    dir: Option<PathBuf>,
}

impl GitDiff {
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: Some(dir.as_ref().to_path_buf()),
        }
    }
}

impl DiffSource for GitDiff {
    fn staged_diff(&self) -> Result<String, HookError> {
        let mut cmd = Command::new("git");
        cmd.arg("diff")
            .arg("--staged")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.dir {
            cmd.current_dir(dir);
        }

        let output = cmd
            .output()
            .map_err(|e| HookError::Diff(format!("failed to run git: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = if stderr.trim().is_empty() {
                format!("exit code {}", output.status.code().unwrap_or(-1))
            } else {
                stderr.trim().to_string()
            };
            return Err(HookError::Diff(detail));
        }

        let diff = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!(bytes = diff.len(), "read staged diff");
        Ok(diff)
    }
}
