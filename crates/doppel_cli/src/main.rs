//! Doppel CLI — the command-line interface for the doppel test-double
//! generator.
//!
//! Provides `doppel generate` for running the generation pipeline over a
//! project's declared targets and `doppel clean` for discarding the
//! incremental cache.

#![warn(missing_docs)]

mod clean;
mod generate;
mod project;

use std::process;

use clap::{Parser, Subcommand, ValueEnum};

/// Doppel — an incremental test-double generator.
#[derive(Parser, Debug)]
#[command(name = "doppel", version, about = "Doppel test-double generator")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Show notes (cache decisions, opacity trail) in addition to warnings
    /// and errors.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Control colored output.
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Path to a custom `doppel.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate test doubles for the project's targets.
    Generate(GenerateArgs),
    /// Remove the incremental cache; every target regenerates on the next
    /// run.
    Clean,
}

/// Arguments for the `doppel generate` subcommand.
#[derive(Parser, Debug)]
pub struct GenerateArgs {
    /// Target names to generate. Defaults to the configuration's
    /// `generate.targets` list (or every declared target).
    pub targets: Vec<String>,

    /// Generate only for types referenced from test declaration files.
    #[arg(long)]
    pub prune: bool,

    /// Generate doubles only for interface types.
    #[arg(long)]
    pub only_interfaces: bool,

    /// Fail types with unresolved external ancestors instead of degrading
    /// them to opaque output.
    #[arg(long)]
    pub strict_linking: bool,

    /// Ignore cached records and regenerate everything, without writing
    /// new records.
    #[arg(long)]
    pub no_cache: bool,
}

/// Controls whether colored output is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Detect from terminal capabilities.
    Auto,
    /// Always produce colored output.
    Always,
    /// Never produce colored output.
    Never,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to show note-severity diagnostics.
    pub verbose: bool,
    /// Whether to use colored output.
    pub color: bool,
    /// Optional path to a custom config file.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let color = match cli.color {
        ColorChoice::Auto => atty_is_terminal(),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        color,
        config: cli.config,
    };

    let result = match cli.command {
        Command::Generate(ref args) => generate::run(args, &global),
        Command::Clean => clean::run(&global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Rough terminal detection — checks if stdout is a terminal.
fn atty_is_terminal() -> bool {
    // Use a simple heuristic: check the TERM env var.
    // In a real build we'd use the `is-terminal` crate, but this is
    // sufficient for now.
    std::env::var("TERM").is_ok()
}
