use revpub_core::config::RevpubConfig;

use crate::dispatch::open_repository;
use crate::format::{format_bytes, format_date};
use crate::table::CliTableTheme;

pub(crate) fn run_info(config: &RevpubConfig, location: &str) -> Result<(), Box<dyn std::error::Error>> {
    let repo = open_repository(config)?;
    let resource = repo.resolve_resource(location);
    if !resource.exists {
        return Err(format!("not found: {location}").into());
    }

    let theme = CliTableTheme::detect();
    let mut table = theme.new_kv_table();
    theme.add_kv_row(&mut table, "Repository", repo.root());
    theme.add_kv_row(&mut table, "Path", &resource.path);
    table.add_row(vec![
        comfy_table::Cell::new("Type"),
        theme.kind_cell(resource.kind),
    ]);
    theme.add_kv_row(&mut table, "Size", format_bytes(resource.size));
    theme.add_kv_row(&mut table, "Modified", format_date(resource.last_modified));
    if let Some(rev) = config.repository.retrieve_revision {
        theme.add_kv_row(&mut table, "Pinned revision", rev);
    }
    println!("{table}");
    Ok(())
}
