//! CLI command implementations.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::error::CliResult;

pub mod init;
pub mod inspect;
pub mod train;

/// Rafko - reverse-mode autodiff training runtime for sparse recurrent networks
#[derive(Parser, Debug)]
#[command(name = "rafko", version, about = "Train and inspect sparse recurrent networks")]
pub struct RafkoCli {
    /// CLI-wide configuration file (distinct from a network file's own settings)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a template network/dataset TOML file
    Init(init::InitCommand),
    /// Train a network against a dataset file, reporting fitness as it goes
    Train(train::TrainCommand),
    /// Load a network file and report its structure, or solve one input
    Inspect(inspect::InspectCommand),
}

impl RafkoCli {
    /// Execute the selected subcommand.
    pub fn execute(self) -> CliResult<()> {
        match self.command {
            Commands::Init(cmd) => cmd.execute(),
            Commands::Train(cmd) => cmd.execute(),
            Commands::Inspect(cmd) => cmd.execute(),
        }
    }
}
