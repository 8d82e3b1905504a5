use std::path::PathBuf;

use revpub_core::config;

const DEFAULT_CONFIG: &str = "revpub.yaml";

pub(crate) fn run_config_generate(dest: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let path = PathBuf::from(dest.unwrap_or(DEFAULT_CONFIG));

    if path.exists() {
        return Err(format!("file already exists: {}", path.display()).into());
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    std::fs::write(&path, config::minimal_config_template())?;
    println!("Config written to: {}", path.display());
    println!("Edit it to point repository.url at your store.");
    Ok(())
}
