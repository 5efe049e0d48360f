use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use tracing::{debug, info};

use crate::ai::ChatProvider;
use crate::config::{ConfigSources, EffectiveConfig};
use crate::error::AppError;
use crate::git::DiffSource;
use crate::hook::{dispatch, HookAction, HookInvocation};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing to do: Git's own message stands.
    Skipped,
    /// A message was produced and written out.
    Written(String),
}

/// Main entry point for the hook.
///
/// Configuration is only resolved once there is something to send, so a
/// merge or an empty diff never fails on a broken config file.
pub fn run_hook<F>(
    invocation: &HookInvocation,
    sources: &ConfigSources,
    diffs: &dyn DiffSource,
    select: F,
) -> Result<Outcome, AppError>
where
    F: FnOnce(&EffectiveConfig) -> Box<dyn ChatProvider>,
{
    let action = dispatch(invocation, diffs)?;
    if action == HookAction::Skip {
        return Ok(Outcome::Skipped);
    }

    let config = sources.resolve()?;
    let provider = select(&config);
    info!(provider = provider.name(), "requesting commit message");

    let Some(message) = action.run(provider.as_ref())? else {
        return Ok(Outcome::Skipped);
    };

    write_message(invocation.output_file.as_deref(), &message)?;
    Ok(Outcome::Written(message))
}

/// Write the message plus one trailing newline to the file, or to stdout
/// when Git gave us no file.
pub fn write_message(target: Option<&Path>, message: &str) -> Result<(), AppError> {
    match target {
        Some(path) => {
            let write_err = |source: io::Error| AppError::Write {
                target: path.display().to_string(),
                source,
            };
            let mut file = File::create(path).map_err(write_err)?;
            writeln!(file, "{}", message).map_err(write_err)?;
            debug!(path = %path.display(), "wrote commit message");
        }
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            writeln!(out, "{}", message)
                .and_then(|_| out.flush())
                .map_err(|source| AppError::Write {
                    target: "stdout".into(),
                    source,
                })?;
        }
    }
    Ok(())
}
