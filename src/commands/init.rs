//! Database initialization command.
//!
//! Creates missing tables, applies pending upgrades and seeds the default
//! rows. Safe to run on an existing database.

use crate::{
    db::{db::Db, schema::initialize_database},
    libs::{config::AppConfig, messages::Message},
    msg_success,
};
use anyhow::Result;
use clap::Args;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Database file to use instead of the configured one
    #[arg(long)]
    database: Option<String>,

    /// Write the resolved configuration to the data directory
    #[arg(short, long)]
    save_config: bool,
}

pub fn cmd(args: InitArgs, config: &AppConfig) -> Result<()> {
    let mut config = config.clone();
    if let Some(path) = args.database {
        config.database_path = path;
    }

    let db = Db::open(config.resolved_database_path())?;
    initialize_database(&db, &config)?;

    if args.save_config {
        config.save()?;
        msg_success!(Message::ConfigSaved);
    }
    Ok(())
}
