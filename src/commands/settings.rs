use crate::{db::db::Db, libs::messages::Message, msg_info, msg_print};
use anyhow::Result;
use prettytable::{row, Table};

pub fn cmd() -> Result<()> {
    let db = Db::new()?;
    let settings = db.session().settings().all()?;

    if settings.is_empty() {
        msg_info!(Message::NoSettingsFound);
        return Ok(());
    }

    msg_print!(Message::SettingsHeader, true);
    let mut table = Table::new();
    table.add_row(row!["KEY", "VALUE"]);
    for (key, value) in &settings {
        table.add_row(row![key, value.as_deref().unwrap_or("")]);
    }
    table.printstd();
    Ok(())
}
