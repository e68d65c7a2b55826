//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `marginalia_core` linkage with a deterministic ping/version line.
//! - Optionally load a project bundle and print its frequency table and
//!   document co-occurrence matrix.
//!
//! Usage: `marginalia_cli [bundle.json] [top_n]`

use clap::Parser;
use marginalia_core::{init_logging_from_config, CooccurrenceMatrix, ProjectBundle, Workspace};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Marginalia core smoke probe and bundle summary
#[derive(Parser, Debug)]
#[command(name = "marginalia_cli", version)]
struct Cli {
    /// Project bundle (JSON) to load and summarize
    bundle: Option<PathBuf>,

    /// Number of top codes to show (defaults to the bundle config)
    top_n: Option<NonZeroUsize>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    println!("marginalia_core ping={}", marginalia_core::ping());
    println!("marginalia_core version={}", marginalia_core::core_version());

    let Some(bundle_path) = cli.bundle else {
        return ExitCode::SUCCESS;
    };
    match run(&bundle_path, cli.top_n.map(NonZeroUsize::get)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(bundle_path: &Path, top_n: Option<usize>) -> Result<(), String> {
    let bundle = ProjectBundle::from_path(bundle_path).map_err(|err| err.to_string())?;
    if let Some(config) = bundle.config.as_ref() {
        init_logging_from_config(&config.logging).map_err(|err| err.to_string())?;
    }
    let workspace = Workspace::from_bundle(bundle).map_err(|err| err.to_string())?;
    log::info!(
        "event=cli_load module=cli status=ok documents={} codes={} codings={}",
        workspace.documents().len(),
        workspace.codes().len(),
        workspace.annotations().coding_count()
    );

    println!();
    println!("code frequencies:");
    for entry in workspace.top_codes(top_n) {
        println!("  {:>6}  {}  {}", entry.count, entry.color, entry.name);
    }

    println!();
    println!("document co-occurrence:");
    print_matrix(&workspace.document_cooccurrence(top_n));
    Ok(())
}

fn print_matrix(matrix: &CooccurrenceMatrix) {
    if matrix.is_empty() {
        println!("  (no codes)");
        return;
    }
    let width = matrix
        .codes
        .iter()
        .map(|code| code.name.chars().count())
        .max()
        .unwrap_or(0)
        .max(6);

    let header = (0..matrix.len())
        .map(|column| format!("{column:>6}"))
        .collect::<String>();
    println!("  {:width$}{header}", "");
    for (row, code) in matrix.codes.iter().enumerate() {
        let cells = matrix.cells[row]
            .iter()
            .map(|value| format!("{value:>6}"))
            .collect::<String>();
        println!("  {:width$}{cells}", code.name);
    }
}
