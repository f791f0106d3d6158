use crate::{
    db::{db::Db, statuses::Status},
    libs::messages::Message,
    msg_info, msg_print,
};
use anyhow::Result;
use clap::Args;
use prettytable::{row, Table};

#[derive(Debug, Args)]
pub struct StatusesArgs {
    /// Only statuses of this type (Client, Project, Task, ...)
    #[arg(short = 't', long = "type")]
    status_type: Option<String>,
}

pub fn cmd(args: StatusesArgs) -> Result<()> {
    let db = Db::new()?;
    let statuses = db.session().statuses().list(args.status_type.as_deref())?;

    if statuses.is_empty() {
        msg_info!(Message::NoStatusesFound);
        return Ok(());
    }

    msg_print!(Message::StatusCatalogueHeader, true);
    print_table(&statuses);
    Ok(())
}

fn flag(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        ""
    }
}

fn print_table(statuses: &[Status]) {
    let mut table = Table::new();

    table.add_row(row!["ID", "TYPE", "NAME", "COLOR", "DAYS", "ARCHIVAL", "COMPLETION"]);
    for status in statuses {
        table.add_row(row![
            status.status_id,
            status.status_type,
            status.status_name,
            status.color_hex.as_deref().unwrap_or(""),
            status.default_duration_days.map(|d| d.to_string()).unwrap_or_default(),
            flag(status.is_archival_status),
            flag(status.is_completion_status)
        ]);
    }
    table.printstd();
}
