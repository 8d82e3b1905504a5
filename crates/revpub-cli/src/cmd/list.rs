use comfy_table::Cell;

use revpub_core::config::RevpubConfig;
use revpub_types::path;

use crate::dispatch::open_repository;
use crate::format::{format_bytes, format_date};
use crate::table::CliTableTheme;

pub(crate) fn run_list(config: &RevpubConfig, folder: &str) -> Result<(), Box<dyn std::error::Error>> {
    let repo = open_repository(config)?;
    let names = repo.list(folder)?;
    if names.is_empty() {
        println!("No entries found.");
        return Ok(());
    }

    let theme = CliTableTheme::detect();
    let mut table = theme.new_data_table(&["Name", "Type", "Size", "Modified"]);
    for name in &names {
        let entry = repo.resolve_resource(&path::join(folder, name));
        table.add_row(vec![
            Cell::new(name),
            theme.kind_cell(entry.kind),
            Cell::new(format_bytes(entry.size)),
            Cell::new(format_date(entry.last_modified)),
        ]);
    }
    println!("{table}");

    Ok(())
}
