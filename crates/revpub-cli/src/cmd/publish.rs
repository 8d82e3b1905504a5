use std::path::PathBuf;

use tracing::warn;

use revpub_core::config::RevpubConfig;
use revpub_core::pattern::expand_pattern;
use revpub_core::{ArtifactRepository, PublishOutcome, Scheduled, UploadSource};
use revpub_types::ModuleRevisionId;

use crate::dispatch::open_repository;
use crate::table::CliTableTheme;

pub(crate) fn run_publish(
    config: &RevpubConfig,
    module: &str,
    overwrite: bool,
    files: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let mrid: ModuleRevisionId = module.parse()?;
    let mut repo = open_repository(config)?;
    repo.begin_publish_transaction(mrid.clone())?;

    if let Err(e) = schedule_files(&mut repo, config, &mrid, overwrite, files) {
        discard(&mut repo);
        return Err(e);
    }

    let outcome = match repo.commit_publish_transaction() {
        Ok(outcome) => outcome,
        Err(e) => {
            discard(&mut repo);
            return Err(e.into());
        }
    };
    print_outcome(&mrid, &outcome);
    Ok(())
}

fn schedule_files(
    repo: &mut ArtifactRepository,
    config: &RevpubConfig,
    mrid: &ModuleRevisionId,
    overwrite: bool,
    files: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    for file in files {
        let path = PathBuf::from(file);
        if !path.is_file() {
            return Err(format!("not a file: {file}").into());
        }
        let artifact = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| format!("invalid file name: '{file}'"))?;
        let dest = expand_pattern(&config.publish.pattern, mrid, artifact);
        if repo.put(UploadSource::File(path.clone()), &dest, overwrite)? == Scheduled::Skipped {
            eprintln!("Skipped (already published): {dest}");
        }
    }
    Ok(())
}

fn discard(repo: &mut ArtifactRepository) {
    if let Err(e) = repo.abort_publish_transaction() {
        warn!(error = %e, "could not abort publish transaction");
    }
}

fn print_outcome(mrid: &ModuleRevisionId, outcome: &PublishOutcome) {
    let theme = CliTableTheme::detect();
    let mut table = theme.new_kv_table();
    theme.add_kv_row(&mut table, "Module", mrid);
    theme.add_kv_row(&mut table, "Files written", outcome.written);
    theme.add_kv_row(&mut table, "Files skipped", outcome.skipped.len());
    let revision = outcome
        .revision
        .map(|r| r.to_string())
        .unwrap_or_else(|| "- (nothing to commit)".to_string());
    theme.add_kv_row(&mut table, "Revision", revision);
    if let Some(rev) = outcome.alias_revision {
        theme.add_kv_row(&mut table, "Alias revision", rev);
    }
    println!("{table}");

    for (permanent, alias) in &outcome.aliased {
        println!("  {permanent} <- {alias}");
    }
    for skipped in &outcome.skipped {
        println!("  skipped {skipped}");
    }
}
