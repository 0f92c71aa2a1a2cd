//! Command-line interface for orgsync
//!
//! This module defines the CLI structure using clap derive macros.
//! Each subcommand is implemented in its own submodule.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::error::{Error, Result};

mod pull;
mod push;
mod sync;

/// orgsync - org-mode task synchronization
///
/// Reconciles an org-mode task file with a remote task-list service:
/// pull the list into org text, push org text to the list, or merge
/// the two while keeping the history of conflicting edits.
#[derive(Parser, Debug)]
#[command(name = "orgsync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration file (defaults to ./.orgsync.toml)
    #[arg(long, global = true, env = "ORGSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Task store path
    #[arg(long, global = true, env = "ORGSYNC_STORE")]
    pub store: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write the remote task list as org text
    Pull {
        /// Org file to write (stdout when omitted)
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Replace the remote task list with the contents of an org file
    Push {
        /// Org file to read
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Merge an org file with the remote task list, updating both
    Sync {
        /// Org file to merge and rewrite
        #[arg(long)]
        file: Option<PathBuf>,

        /// Resolve conflicts with interactive prompts
        #[arg(short, long)]
        interactive: bool,
    },
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Pull { file } => pull::run(pull::PullOptions {
                file,
                store: self.store,
                config: self.config,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Push { file } => push::run(push::PushOptions {
                file,
                store: self.store,
                config: self.config,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Sync { file, interactive } => sync::run(sync::SyncOptions {
                file,
                interactive,
                store: self.store,
                config: self.config,
                json: self.json,
                quiet: self.quiet,
            }),
        }
    }
}

/// Load configuration from an explicit path or the working directory.
fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None => Ok(Config::load_from_dir(Path::new("."))),
    }
}

/// Resolve the org file a command works on: explicit flag first, then
/// the configured default.
fn resolve_org_file(flag: Option<PathBuf>, config: &Config) -> Result<PathBuf> {
    flag.or_else(|| config.org_file.clone()).ok_or_else(|| {
        Error::InvalidArgument(
            "no org file given; pass --file or set org_file in .orgsync.toml".to_string(),
        )
    })
}
