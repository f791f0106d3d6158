//! Administrative command line over the back-office database.

pub mod init;
pub mod migrations;
pub mod settings;
pub mod statuses;

use crate::libs::config::{self, AppConfig};
use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Create or upgrade the database and seed default data")]
    Init(init::InitArgs),
    #[command(about = "Inspect schema upgrades")]
    Migrations(migrations::MigrationsArgs),
    #[command(about = "Print the status catalogue")]
    Statuses(statuses::StatusesArgs),
    #[command(about = "Print application settings")]
    Settings,
}

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help(true))]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    pub fn menu() -> Result<()> {
        let cli = Self::parse();
        let config = AppConfig::load()?;
        config::install(config.clone());

        match cli.command {
            Commands::Init(args) => init::cmd(args, &config),
            Commands::Migrations(args) => migrations::cmd(args),
            Commands::Statuses(args) => statuses::cmd(args),
            Commands::Settings => settings::cmd(),
        }
    }
}
