use std::path::Path;

use revpub_store::TreeStore;

pub(crate) fn run_init(path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = TreeStore::init_local(Path::new(path))?;
    println!("Store initialized at: {}", store.root_url());
    println!("Set repository.url to this URL in revpub.yaml to publish into it.");
    Ok(())
}
