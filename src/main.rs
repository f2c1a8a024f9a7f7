// Command-line front end over the conversion session.
// The lib.rs file serves as the public API; this binary only wires it to files.

use std::path::PathBuf;
use anyhow::{Result, anyhow, bail};
use clap::Parser;
use serde_json::json;
use tokio::signal;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use webp_converter_lib::commands::{
    apply_quality_all, collect_inputs, convert_files, estimate_sweep, export_archive,
    export_separate,
};
use webp_converter_lib::utils::format_kb;
use webp_converter_lib::{ConversionSummary, ConverterConfig, SessionHandle};

/// Convert raster images to WebP, preview sizes, and export them.
#[derive(Parser, Debug)]
#[command(name = "webp-converter", version, about)]
struct Cli {
    /// Quality committed to every image after ingestion (0.05 to 0.9, or 1.0 with the free policy)
    #[arg(short, long)]
    quality: Option<f32>,

    /// JSON settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory the archive or files are written to
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Write one .webp per image instead of a ZIP archive
    #[arg(long)]
    separate: bool,

    /// Print projected sizes at every quality step and write nothing
    #[arg(long)]
    estimate: bool,

    /// Print results as JSON lines
    #[arg(long)]
    json: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Image files, or directories of images
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    info!("=== webp-converter starting ===");

    let config = match &cli.config {
        Some(path) => ConverterConfig::load(path).await?,
        None => ConverterConfig::default(),
    };
    let session = SessionHandle::create(config)?;
    debug!("Session ready");

    let outcome = tokio::select! {
        result = run(&cli, &session) => result,
        _ = shutdown_signal() => Err(anyhow!("Interrupted")),
    };

    session.destroy().await;
    outcome
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        warn!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl+C, shutting down");
}

async fn run(cli: &Cli, session: &SessionHandle) -> Result<()> {
    let inputs = collect_inputs(&cli.inputs).await?;
    if inputs.is_empty() {
        bail!("No supported images found");
    }

    let report = convert_files(session, &inputs).await?;
    for failure in &report.failed {
        warn!("{}: {}", failure.name, failure.error);
    }
    if report.ingested.is_empty() {
        bail!("None of the {} input(s) could be converted", report.total());
    }

    if let Some(quality) = cli.quality {
        apply_quality_all(session, quality).await?;
    }

    if cli.estimate {
        for record in session.records().await {
            let sweep = estimate_sweep(session, record.id()).await?;
            if cli.json {
                let line = json!({ "id": record.id(), "name": record.name(), "estimates": sweep });
                println!("{}", serde_json::to_string(&line)?);
            } else {
                println!("{} ({})", record.name(), format_kb(record.source().byte_length() as u64));
                for estimate in &sweep {
                    println!("  {}  {}", estimate.quality, estimate.display());
                }
            }
        }
        return Ok(());
    }

    print_summaries(&session.summaries().await, cli.json)?;

    if cli.separate {
        let written = export_separate(session, &cli.output).await?;
        info!("Wrote {} file(s)", written.len());
    } else {
        let path = export_archive(session, &cli.output).await?;
        info!("Wrote {}", path.display());
    }
    Ok(())
}

fn print_summaries(summaries: &[ConversionSummary], as_json: bool) -> Result<()> {
    for summary in summaries {
        if as_json {
            println!("{}", serde_json::to_string(summary)?);
        } else {
            println!(
                "{:<40} {:>12} -> {:>12}  {:>6.1}%  q={:.2}",
                summary.name,
                format_kb(summary.original_size),
                format_kb(summary.converted_size),
                summary.compression_ratio,
                summary.quality
            );
        }
    }
    Ok(())
}
