#![forbid(unsafe_code)]

mod description;

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use crate::description::SocDescription;

const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Human-readable tables.
    Text,
    /// The finalized map as pretty-printed JSON.
    Json,
}

#[derive(Parser, Debug)]
#[command(
    name = "socmap",
    version,
    about = "Compose a SoC from a JSON description and print its finalized address map."
)]
struct Args {
    /// SoC description (JSON).
    ///
    /// Environment variable: `SOCMAP_DESCRIPTION`.
    #[arg(long, env = "SOCMAP_DESCRIPTION", value_name = "PATH")]
    description: PathBuf,

    /// Output format.
    ///
    /// Environment variable: `SOCMAP_FORMAT`.
    #[arg(long, env = "SOCMAP_FORMAT", value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Write the map to this path instead of stdout.
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Log filter (tracing-subscriber EnvFilter syntax). Logs go to stderr.
    ///
    /// Environment variable: `SOCMAP_LOG`.
    #[arg(long, env = "SOCMAP_LOG", default_value = DEFAULT_LOG_FILTER)]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    run(args)
}

fn run(args: Args) -> anyhow::Result<()> {
    let raw = fs::read_to_string(&args.description)
        .with_context(|| format!("read {}", args.description.display()))?;
    let description: SocDescription = serde_json::from_str(&raw)
        .with_context(|| format!("parse {}", args.description.display()))?;

    let soc = description.build().context("compose SoC")?;
    let map = soc.finalize().context("finalize SoC")?;
    tracing::info!(
        regions = map.bus.regions().len(),
        csr_regions = map.csr_regions().len(),
        irqs = map.irq_wiring.len(),
        "SoC finalized"
    );

    let mut rendered = match args.format {
        OutputFormat::Text => map.to_string(),
        OutputFormat::Json => serde_json::to_string_pretty(&map).context("serialize map")?,
    };
    rendered.push('\n');

    match &args.output {
        Some(path) => {
            fs::write(path, rendered).with_context(|| format!("write {}", path.display()))?
        }
        None => io::stdout()
            .write_all(rendered.as_bytes())
            .context("write stdout")?,
    }
    Ok(())
}
