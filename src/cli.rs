//! # CLI Module
//!
//! Command-line interface for ncslice:
//! - Argument parsing with clap
//! - Subcommands for format checking, catalog inspection and slice reading
//! - Environment variable support with the NCSLICE_ prefix
//! - Human/JSON/YAML output formats
//! - Progress reporting for whole-catalog scans
//! - Shell completion generation

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use indicatif::{ProgressBar, ProgressStyle};
use log::debug;

use crate::reader::{RasterSlice, SliceReader};
use crate::storage::resolve_input;
use crate::summary;

/// Index and decode multidimensional geophysical datasets as 2-D raster slices
#[derive(Parser, Debug)]
#[command(name = "ncslice")]
#[command(about = "Inspect and decode coverage slices of multidimensional datasets")]
#[command(version)]
#[command(long_about = "
ncslice indexes multidimensional geophysical datasets (NetCDF and friends)
into an ordered collection of 2-D raster slices. It classifies coordinate
axes, groups slices into coverage types, and decodes any slice by integer
index with its georeference attached.

EXAMPLES:
  # Can this file be decoded at all?
  ncslice check data.nc

  # Axes, coverage types and slice counts
  ncslice info data.nc

  # The same, as JSON
  ncslice info data.nc --output-format json

  # List the slices of one coverage type
  ncslice slices data.nc --coverage z

  # Decode slice 42 and show its statistics
  ncslice read data.nc 42

  # Scan the whole catalog with a progress bar
  ncslice stats data.nc

  # Remote inputs are localized before opening
  ncslice info s3://bucket/ocean/sst.nc

  # Generate completions
  ncslice completions bash > ~/.bash_completion.d/ncslice
")]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode - suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output format for structured data
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Ancillary metadata file (JSON or YAML), applied before any read
    #[arg(long, global = true, env = "NCSLICE_ANCILLARY")]
    pub ancillary: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check whether an input passes the format pre-check
    Check {
        /// Input dataset path (local or S3)
        #[arg(value_name = "INPUT", env = "NCSLICE_INPUT")]
        input: String,
    },

    /// Show dimensions, classified axes and coverage types
    Info {
        /// Input dataset path (local or S3)
        #[arg(value_name = "INPUT", env = "NCSLICE_INPUT")]
        input: String,
    },

    /// List slice descriptors
    Slices {
        /// Input dataset path (local or S3)
        #[arg(value_name = "INPUT", env = "NCSLICE_INPUT")]
        input: String,

        /// Restrict the listing to one coverage type
        #[arg(short, long)]
        coverage: Option<String>,

        /// Show at most this many slices
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Decode one slice and report its metadata and statistics
    Read {
        /// Input dataset path (local or S3)
        #[arg(value_name = "INPUT", env = "NCSLICE_INPUT")]
        input: String,

        /// Global slice index
        #[arg(value_name = "INDEX")]
        index: usize,
    },

    /// Decode every slice and report per-coverage statistics
    Stats {
        /// Input dataset path (local or S3)
        #[arg(value_name = "INPUT", env = "NCSLICE_INPUT")]
        input: String,
    },

    /// Generate shell completions
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
    Yaml,
}

/// Wire the verbosity flags into env_logger. `RUST_LOG` still wins when the
/// user sets it explicitly.
pub fn init_logging(cli: &Cli) {
    let default_level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

/// Execute the parsed command line.
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Check { ref input } => check(input).await,
        Commands::Info { ref input } => info(input, &cli).await,
        Commands::Slices {
            ref input,
            ref coverage,
            limit,
        } => slices(input, coverage.as_deref(), limit, &cli).await,
        Commands::Read { ref input, index } => read(input, index, &cli).await,
        Commands::Stats { ref input } => stats(input, &cli).await,
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "ncslice", &mut io::stdout());
            Ok(())
        }
    }
}

async fn check(input: &str) -> Result<()> {
    let source = resolve_input(input).await?;
    if SliceReader::can_decode(source.path()) {
        println!("{}: supported", source.origin());
        Ok(())
    } else {
        bail!("{}: unsupported format", source.origin());
    }
}

/// Opens a reader over a resolved input, applying the global ancillary flag.
async fn open_reader(input: &str, cli: &Cli) -> Result<(crate::storage::InputSource, SliceReader)> {
    let source = resolve_input(input).await?;
    let mut reader = SliceReader::open(source.path())
        .with_context(|| format!("Failed to open dataset '{}'", source.origin()))?;
    if let Some(ancillary) = &cli.ancillary {
        reader
            .set_ancillary(ancillary)
            .with_context(|| format!("Failed to apply ancillary file '{}'", ancillary.display()))?;
    }
    Ok((source, reader))
}

async fn info(input: &str, cli: &Cli) -> Result<()> {
    let (_source, reader) = open_reader(input, cli).await?;
    let summary = summary::summarize(&reader);
    match cli.output_format {
        OutputFormat::Human => summary::print_summary_human(&summary),
        OutputFormat::Json => summary::print_summary_json(&summary)?,
        OutputFormat::Yaml => summary::print_summary_yaml(&summary)?,
    }
    reader.dispose()?;
    Ok(())
}

async fn slices(input: &str, coverage: Option<&str>, limit: Option<usize>, cli: &Cli) -> Result<()> {
    let (_source, reader) = open_reader(input, cli).await?;
    let descriptors = match coverage {
        Some(name) => reader.slices_for_type(name),
        None => {
            let mut all = Vec::with_capacity(reader.num_slices());
            for index in 0..reader.num_slices() {
                all.push(reader.slice(index)?);
            }
            all
        }
    };
    let shown = limit.unwrap_or(descriptors.len()).min(descriptors.len());

    match cli.output_format {
        OutputFormat::Human => {
            for descriptor in &descriptors[..shown] {
                let tuple: Vec<String> = descriptor
                    .coordinates
                    .iter()
                    .map(|c| format!("{}={}", c.dimension, c.value))
                    .collect();
                println!(
                    "{:>6}  {}  {}  [{}]",
                    descriptor.index,
                    descriptor.coverage,
                    descriptor.variable,
                    tuple.join(", ")
                );
            }
            if shown < descriptors.len() {
                println!("... {} more", descriptors.len() - shown);
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&descriptors[..shown])?)
        }
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&descriptors[..shown])?),
    }
    reader.dispose()?;
    Ok(())
}

async fn read(input: &str, index: usize, cli: &Cli) -> Result<()> {
    let (_source, reader) = open_reader(input, cli).await?;
    let slice = reader
        .read(index)
        .with_context(|| format!("Failed to read slice {index}"))?;
    print_slice(&slice);
    reader.dispose()?;
    Ok(())
}

fn print_slice(slice: &RasterSlice) {
    println!("Slice {}:", slice.descriptor.index);
    println!("  Coverage: {}", slice.descriptor.coverage);
    println!("  Variable: {}", slice.descriptor.variable);
    println!(
        "  Plane: {}x{} {} ({} band)",
        slice.width,
        slice.height,
        slice.kind().name(),
        slice.band_count
    );
    for coord in &slice.descriptor.coordinates {
        println!(
            "  {} = {} (position {})",
            coord.dimension, coord.value, coord.position
        );
    }
    match &slice.georef.crs {
        Some(crs) => println!("  CRS: {}", crs.code),
        None => println!("  CRS: unresolved (pixel space)"),
    }
    match &slice.georef.mapping {
        crate::georef::GridMapping::Affine(t) => println!(
            "  Transform: origin=({}, {}) scale=({}, {})",
            t.origin_x, t.origin_y, t.scale_x, t.scale_y
        ),
        crate::georef::GridMapping::Curvilinear { width, height, .. } => {
            println!("  Transform: curvilinear {width}x{height} coordinate arrays")
        }
    }
    if let Some((min, max, mean)) = sample_stats(slice) {
        println!("  Samples: min={min} max={max} mean={mean:.4}");
    } else {
        println!("  Samples: all no-data");
    }
}

async fn stats(input: &str, cli: &Cli) -> Result<()> {
    let (_source, reader) = open_reader(input, cli).await?;
    let total = reader.num_slices();

    let bar = ProgressBar::new(total as u64);
    bar.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
            .context("Invalid progress template")?,
    );

    let mut per_type: Vec<(String, f64, f64, f64, usize)> = Vec::new();
    for index in 0..total {
        let slice = reader.read(index)?;
        bar.set_message(slice.descriptor.coverage.clone());
        if let Some((min, max, mean)) = sample_stats(&slice) {
            match per_type
                .iter_mut()
                .find(|(name, ..)| *name == slice.descriptor.coverage)
            {
                Some(entry) => {
                    entry.1 = entry.1.min(min);
                    entry.2 = entry.2.max(max);
                    entry.3 += mean;
                    entry.4 += 1;
                }
                None => per_type.push((slice.descriptor.coverage.clone(), min, max, mean, 1)),
            }
        }
        bar.inc(1);
    }
    bar.finish_with_message("done");
    debug!("scanned {total} slices");

    for (name, min, max, mean_sum, count) in &per_type {
        println!(
            "{name}: {count} slices, min={min} max={max} mean-of-means={:.4}",
            mean_sum / *count as f64
        );
    }
    reader.dispose()?;
    Ok(())
}

/// Min/max/mean over a slice's samples, skipping NaNs and the no-data
/// marker. `None` when nothing survives the skip.
fn sample_stats(slice: &RasterSlice) -> Option<(f64, f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;
    let mut count = 0usize;
    for idx in 0..slice.pixels.len() {
        let value = slice.pixels.value_as_f64(idx);
        if value.is_nan() {
            continue;
        }
        if let Some(nodata) = slice.nodata {
            if value == nodata {
                continue;
            }
        }
        min = min.min(value);
        max = max.max(value);
        sum += value;
        count += 1;
    }
    (count > 0).then(|| (min, max, sum / count as f64))
}
