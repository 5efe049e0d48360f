use std::process;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use prepare_commit_msg::ai::select_provider;
use prepare_commit_msg::config::{config_path, ConfigLayer, ConfigSources, Prompts};
use prepare_commit_msg::git::GitDiff;
use prepare_commit_msg::{run_hook, HookInvocation, Outcome};

const LOG_ENV: &str = "PREPARE_COMMIT_MSG_LOG";

/// Write commit messages for staged changes with an AI provider.
///
/// Install as `.git/hooks/prepare-commit-msg`; Git passes the message file,
/// the commit source and, for some sources, a commit SHA.
#[derive(Parser, Debug)]
#[command(name = "prepare-commit-msg")]
#[command(version)]
struct Cli {
    /// AI provider to use (anthropic, openai)
    #[arg(long)]
    ai: Option<String>,

    /// System prompt used when writing a message from the diff
    #[arg(long)]
    sys: Option<String>,

    /// System prompt used when correcting an existing message
    #[arg(long)]
    refine_sys: Option<String>,

    /// Path to the configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<String>,

    /// Commit message file (stdout when omitted)
    #[arg(value_name = "OUTPUT_FILE")]
    output_file: Option<String>,

    /// Why Git is committing: message, template, merge, squash or commit
    #[arg(value_name = "SOURCE")]
    source: Option<String>,

    /// Commit SHA, for the commit source
    #[arg(value_name = "SHA")]
    sha: Option<String>,
}

impl Cli {
    fn invocation(&self) -> HookInvocation {
        let args = [&self.output_file, &self.source, &self.sha]
            .into_iter()
            .map(|arg| arg.clone().unwrap_or_default());
        HookInvocation::from_args(args)
    }

    fn config_sources(&self) -> ConfigSources {
        let flags = ConfigLayer {
            provider: self.ai.clone().unwrap_or_default(),
            api_key: String::new(),
            prompts: Prompts {
                generate: self.sys.clone().unwrap_or_default(),
                refine: self.refine_sys.clone().unwrap_or_default(),
            },
        };

        ConfigSources {
            env: ConfigLayer::from_process_env(),
            file: config_path(self.config.as_deref()),
            flags,
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let invocation = cli.invocation();
    let sources = cli.config_sources();

    match run_hook(&invocation, &sources, &GitDiff::default(), select_provider) {
        Ok(Outcome::Skipped) | Ok(Outcome::Written(_)) => {}
        Err(err) => {
            eprintln!("{} {}", "error:".red().bold(), err);
            process::exit(err.exit_code());
        }
    }
}
