use crate::{
    db::{
        db::Db,
        migrations::{get_db_version, needs_migration, MigrationManager},
    },
    libs::messages::Message,
    msg_info, msg_print,
};
use anyhow::Result;
use clap::{Args, Subcommand};

#[derive(Debug, Args)]
pub struct MigrationsArgs {
    #[command(subcommand)]
    command: MigrationsCommand,
}

#[derive(Debug, Subcommand)]
enum MigrationsCommand {
    /// Show current database version
    Status,
    /// Show migration history
    History,
}

pub fn cmd(args: MigrationsArgs) -> Result<()> {
    let db = Db::new()?;

    match args.command {
        MigrationsCommand::Status => {
            let (version, needs_update) = db.with_connection(|conn| Ok((get_db_version(conn)?, needs_migration(conn)?)))?;

            msg_print!(Message::DatabaseVersion(version));
            if needs_update {
                msg_info!(Message::DatabaseNeedsUpdate);
            } else {
                msg_info!(Message::DatabaseUpToDate);
            }
        }
        MigrationsCommand::History => {
            let history = db.with_connection(|conn| MigrationManager::new().get_migration_history(conn))?;

            msg_print!(Message::MigrationHistory, true);
            for record in history {
                println!("  v{}: {} (applied: {})", record.version, record.name, record.applied_at);
            }
        }
    }

    Ok(())
}
