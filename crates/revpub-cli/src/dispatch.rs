use std::sync::Arc;

use revpub_core::config::RevpubConfig;
use revpub_core::{ArtifactRepository, ConnectionCache};
use revpub_store::{MemoryRegistry, StoreConnector};

use crate::cli::Commands;
use crate::cmd;

/// Repository handle for `cfg`, authoring commits as the configured user.
pub(crate) fn open_repository(
    cfg: &RevpubConfig,
) -> Result<ArtifactRepository, Box<dyn std::error::Error>> {
    let connector = StoreConnector::new(
        Arc::new(MemoryRegistry::new()),
        cfg.repository.username.clone(),
    );
    Ok(ArtifactRepository::new(
        cfg.clone(),
        Arc::new(connector),
        Arc::new(ConnectionCache::new()),
    )?)
}

pub(crate) fn dispatch_command(
    command: &Commands,
    cfg: &RevpubConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Publish {
            module,
            overwrite,
            files,
        } => cmd::publish::run_publish(cfg, module, *overwrite, files),
        Commands::Fetch { path, dest } => cmd::fetch::run_fetch(cfg, path, dest),
        Commands::List { path } => cmd::list::run_list(cfg, path),
        Commands::Info { path } => cmd::info::run_info(cfg, path),
        Commands::Log { last } => cmd::log::run_log(cfg, *last),
        Commands::Config { .. } | Commands::Init { .. } => {
            Err("command does not use a repository configuration".into())
        }
    }
}
