use std::path::{Path, PathBuf};
use std::time::Instant;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use rosette_traits_lib::logger::init_logger;
use rosette_traits_lib::{prepare_all, process_all, BatchSummary, Config};

/// Command-line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about = "Rosette trait extraction from segmented plant images")]
struct Args {
    /// Path to configuration file; defaults are used if it does not exist
    #[clap(short, long, default_value = "config.toml", global = true)]
    config: PathBuf,

    /// Log debug messages
    #[clap(short, long, global = true)]
    verbose: bool,

    /// Process images one at a time
    #[clap(long, global = true)]
    no_parallel: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Measure traits from predicted masks and write diagnostics
    Measure {
        /// Directory of original images (overwrites config)
        #[clap(short, long)]
        images: Option<String>,

        /// Directory of predicted masks (overwrites config)
        #[clap(short, long)]
        masks: Option<String>,

        /// Output directory (overwrites config)
        #[clap(short, long)]
        output: Option<String>,

        /// Label value excluded from the plant region
        #[clap(long)]
        ignore_label: Option<u8>,

        /// Factor by which masks were downscaled
        #[clap(long)]
        scale_ratio: Option<f64>,
    },
    /// Resize and pad images into model inputs with metadata sidecars
    Preprocess {
        /// Directory of original images (overwrites config)
        #[clap(short, long)]
        images: Option<String>,

        /// Directory for the prepared inputs
        #[clap(short, long)]
        output: PathBuf,
    },
}

fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        Config::from_file(path).with_context(|| format!("loading {}", path.display()))
    } else {
        info!("No config at {}, using defaults", path.display());
        Ok(Config::default())
    }
}

fn report(summary: BatchSummary, start_time: Instant) {
    info!(
        "Processed {} images ({} failed) in {:.2} seconds",
        summary.processed,
        summary.failed,
        start_time.elapsed().as_secs_f64()
    );
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(args.verbose);

    let mut config = load_config(&args.config)?;
    if args.no_parallel {
        config.use_parallel = false;
    }

    let start_time = Instant::now();

    match args.command {
        Command::Measure { images, masks, output, ignore_label, scale_ratio } => {
            if let Some(images) = images {
                config.images_dir = images;
            }
            if let Some(masks) = masks {
                config.masks_dir = masks;
            }
            if let Some(output) = output {
                config.output_dir = output;
            }
            if ignore_label.is_some() {
                config.ignore_label = ignore_label;
            }
            if let Some(ratio) = scale_ratio {
                config.scale_ratio = ratio;
            }

            config.validate().context("invalid configuration")?;
            let summary = process_all(&config).context("trait measurement failed")?;
            report(summary, start_time);
        }
        Command::Preprocess { images, output } => {
            if let Some(images) = images {
                config.images_dir = images;
            }

            let summary = prepare_all(&config, &output).context("preprocessing failed")?;
            report(summary, start_time);
        }
    }

    Ok(())
}
