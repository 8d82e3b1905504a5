use comfy_table::Cell;

use revpub_core::config::RevpubConfig;

use crate::dispatch::open_repository;
use crate::format::{format_date, summary_line};
use crate::table::CliTableTheme;

pub(crate) fn run_log(config: &RevpubConfig, last: usize) -> Result<(), Box<dyn std::error::Error>> {
    let repo = open_repository(config)?;
    let entries = repo.history(last)?;

    let theme = CliTableTheme::detect();
    let mut table = theme.new_data_table(&["Rev", "Author", "Date", "Message"]);
    for entry in &entries {
        table.add_row(vec![
            Cell::new(entry.revision),
            Cell::new(entry.author.as_deref().unwrap_or("-")),
            Cell::new(format_date(Some(entry.date))),
            Cell::new(summary_line(&entry.message)),
        ]);
    }
    println!("{table}");
    Ok(())
}
