use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{error, info};

use rusty_bridge::{
    extension_token, global, pipeline, write_binary, write_delimited, Case, PipelineConfig, Table,
};

#[derive(Parser)]
#[command(
    name = "rusty-bridge",
    version,
    about = "Load a table by file extension and apply a case transformation"
)]
struct Cli {
    /// Resource to load; its extension selects the loader.
    #[arg(value_name = "FILE", required_unless_present = "list_formats")]
    file: Option<PathBuf>,

    /// Case fold to apply (overrides the config file).
    #[arg(long, value_enum)]
    case: Option<Case>,

    /// JSON pipeline configuration.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Write the result here (.csv, .tsv, .pckl or .pkl) instead of stdout.
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Print the registered extension tokens and exit.
    #[arg(long)]
    list_formats: bool,
}

fn main() -> ExitCode {
    env_logger::init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let registry = global().context("initializing format registry")?;

    if cli.list_formats {
        for descriptor in registry.descriptors() {
            println!("{}", descriptor.extensions().join(" "));
        }
        return Ok(());
    }

    let Some(file) = cli.file else {
        bail!("no input file given");
    };

    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(case) = cli.case {
        config.case = case;
    }

    let table = pipeline::run_with_config(registry, &file, &config)
        .with_context(|| format!("processing {}", file.display()))?;

    match &cli.output {
        Some(path) => {
            store(path, &table)?;
            info!("wrote {} rows to {}", table.len(), path.display());
        }
        None => print!("{table}"),
    }
    Ok(())
}

/// Write `table` in the format named by the extension of `path`.
fn store(path: &Path, table: &Table) -> Result<()> {
    match extension_token(path).as_str() {
        ".csv" => write_delimited(path, table, b','),
        ".tsv" => write_delimited(path, table, b'\t'),
        ".pckl" | ".pkl" => write_binary(path, table),
        other => bail!("cannot write '{other}' output: {}", path.display()),
    }
    .with_context(|| format!("writing {}", path.display()))
}
