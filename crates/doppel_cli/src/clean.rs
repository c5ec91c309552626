//! `doppel clean` — discard the incremental cache.

use doppel_cache::CacheStore;

use crate::project::resolve_project_root;
use crate::GlobalArgs;

/// Runs the `doppel clean` command.
///
/// Removes the project's cache directory; the next `generate` regenerates
/// every target from scratch.
pub fn run(global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project_dir = resolve_project_root(global)?;
    let config = doppel_config::load_config(&project_dir)?;

    let cache_dir = project_dir.join(&config.cache.dir);
    let store = CacheStore::new(&cache_dir);
    store.clean()?;

    if !global.quiet {
        eprintln!("   Removed {}", cache_dir.display());
    }
    Ok(0)
}
