//! `doppel generate` — the generation pipeline.
//!
//! Finds the project, loads `doppel.toml`, applies CLI overrides, and runs
//! the orchestrator. Exit code 1 is reserved for configuration errors and
//! for requested types that failed to resolve; cache problems and opacity
//! never fail the command.

use std::sync::Arc;

use doppel_pipeline::{Collaborators, Generator};

use crate::project::{render_diagnostics, resolve_project_root};
use crate::{GenerateArgs, GlobalArgs};

/// Runs the `doppel generate` command.
pub fn run(args: &GenerateArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project_dir = resolve_project_root(global)?;
    let mut config = doppel_config::load_config(&project_dir)?;

    if !args.targets.is_empty() {
        config.generate.targets = args.targets.clone();
        // Explicit output paths pair with the configured target list, not
        // an overridden one.
        config.generate.outputs.clear();
    }
    if args.prune {
        config.generate.prune = true;
    }
    if args.only_interfaces {
        config.generate.only_interfaces = true;
    }
    if args.strict_linking {
        config.generate.relaxed_linking = false;
    }
    if args.no_cache {
        config.cache.disabled = true;
    }

    if !global.quiet {
        eprintln!("   Generating doubles for {}", config.project.name);
    }

    let config = Arc::new(config);
    let collab = Collaborators::file_based(Arc::clone(&config), &project_dir);
    let generator = Generator::new(config, &project_dir, collab);

    // Configuration problems are the only errors generate() returns; they
    // abort before any scheduling and carry exit code 1.
    let summary = match generator.generate() {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("error: {e}");
            return Ok(1);
        }
    };

    render_diagnostics(&generator.diagnostics(), global);

    if !global.quiet {
        for outcome in &summary.generated {
            eprintln!(
                "   {} -> {} ({} type(s))",
                outcome.target,
                outcome.output.display(),
                outcome.types_generated
            );
        }
        for target in &summary.from_cache {
            eprintln!("   {target}: up to date");
        }
        eprintln!(
            "   Result: {} generated, {} from cache, {} error(s)",
            summary.generated.len(),
            summary.from_cache.len(),
            summary.error_count
        );
    }

    if summary.has_failed_types() {
        Ok(1)
    } else {
        Ok(0)
    }
}
