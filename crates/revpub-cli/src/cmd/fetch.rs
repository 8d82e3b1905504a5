use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use revpub_core::config::RevpubConfig;

use crate::dispatch::open_repository;
use crate::format::format_bytes;

pub(crate) fn run_fetch(
    config: &RevpubConfig,
    source: &str,
    dest: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let repo = open_repository(config)?;

    if dest == "-" {
        let mut stdout = std::io::stdout().lock();
        repo.get(source, &mut stdout)?;
        stdout.flush()?;
        return Ok(());
    }

    let dest = Path::new(dest);
    let dir = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    let bytes = repo.get(source, tmp.as_file_mut())?;
    tmp.as_file().sync_all()?;
    tmp.persist(dest).map_err(|e| e.error)?;
    println!("Fetched {} to {}", format_bytes(bytes), dest.display());
    Ok(())
}
