//! bundlescope - analyze jar archives and resolve cross-archive dependencies.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use bundlescope_core::archive::{ArchiveError, ArchiveSetBuilder};
use bundlescope_core::report::{suggested_export_header, ActivatorReport, AnalysisReport};
use bundlescope_core::resolver::resolve_all;

mod jar;

#[derive(Parser, Debug)]
#[command(
    name = "bundlescope",
    about = "Analyze jar archives: exported/imported capabilities, cross-archive providers, minimal build dependencies"
)]
struct Cli {
    /// Jar files or directories to scan for jars. Each argument is one
    /// input collection.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Emit the full report as JSON instead of the text summary.
    #[arg(long)]
    json: bool,

    /// Also print the suggested export header per archive.
    #[arg(long)]
    headers: bool,

    /// Package prefixes treated as always available (repeatable).
    #[arg(long = "ignore-prefix", default_value = "java")]
    ignore_prefixes: Vec<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut builder = ArchiveSetBuilder::new();
    for input in &cli.inputs {
        if !input.exists() {
            // Missing collections are skipped like empty ones; the builder
            // still fails if nothing at all was loaded.
            tracing::warn!(input = %input.display(), "input does not exist, skipping");
            continue;
        }
        let jars = jar::find_jars(input);
        let mut loaded = Vec::with_capacity(jars.len());
        for path in &jars {
            loaded.push(jar::load_jar(path)?);
        }
        builder
            .add_collection(&input.display().to_string(), loaded)
            .with_context(|| format!("failed to load archives from {}", input.display()))?;
    }

    let mut archives = match builder.build() {
        Ok(archives) => archives,
        Err(ArchiveError::NoArchives) => bail!("no jar archives found in the given inputs"),
        Err(other) => return Err(other.into()),
    };

    archives.post_process_uses(&cli.ignore_prefixes);
    resolve_all(&mut archives);

    let report = AnalysisReport::from_archives(&archives, &cli.ignore_prefixes);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for entry in &report.archives {
        println!("{} {} ({})", entry.identity, entry.version, entry.file_name);

        if !entry.provided_packages.is_empty() {
            println!("  provides: {}", entry.provided_packages.join(", "));
        }
        match &entry.activator {
            ActivatorReport::None => {}
            ActivatorReport::Unique { class } => println!("  activator: {class}"),
            ActivatorReport::Ambiguous { candidates } => {
                println!("  activator: ambiguous ({})", candidates.join(", "));
            }
        }
        if !entry.unprovided_referenced_packages.is_empty() {
            println!(
                "  needs: {}",
                entry.unprovided_referenced_packages.join(", ")
            );
        }
        for edge in &entry.providers {
            println!(
                "  provided by {} {}: {}",
                edge.archive,
                edge.version,
                edge.capabilities.join(", ")
            );
        }
        for unresolved in &entry.unresolved_imports {
            println!(
                "  UNRESOLVED: {} {}",
                unresolved.name, unresolved.range
            );
        }
        if !entry.selected_dependencies.is_empty() {
            let picks: Vec<String> = entry
                .selected_dependencies
                .iter()
                .map(|edge| format!("{} {}", edge.archive, edge.version))
                .collect();
            println!("  build deps: {}", picks.join(", "));
        }
        println!();
    }

    if cli.headers {
        for (_, archive) in archives.iter() {
            if let Some(header) = suggested_export_header(archive) {
                println!("{}: Export-Package: {header}", archive.identity);
            }
        }
    }

    Ok(())
}
