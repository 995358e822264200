use anyhow::{bail, Result};
use clap::Parser;
use rayon::prelude::*;
use station_community_detector::config::{Config, DetectorConfig, GraphConfig, MatrixConfig};
use station_community_detector::pipeline;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[clap(
    name = "station-community-detector",
    about = "Modularity-based community detection over station co-occurrence matrices"
)]
struct Cli {
    /// Co-occurrence matrix (.csv or .parquet), or a directory of them
    #[clap(long)]
    input: PathBuf,

    /// Output directory for results
    #[clap(long, default_value = "community_results")]
    output_dir: PathBuf,

    /// Column holding the row station ids
    #[clap(long, default_value = "start_station_id")]
    id_column: String,

    /// Columns to ignore when reading the matrix
    #[clap(long)]
    skip_column: Vec<String>,

    /// Modularity resolution; higher values give smaller communities
    #[clap(long, default_value = "1.0")]
    resolution: f64,

    /// Local-moving passes allowed per level
    #[clap(long, default_value = "100")]
    max_passes: usize,

    /// Aggregation levels allowed
    #[clap(long, default_value = "32")]
    max_levels: usize,

    /// Keep diagonal entries as self-loops
    #[clap(long)]
    self_loops: bool,

    /// Number of worker threads (0 = use all available cores)
    #[clap(long, default_value = "0")]
    threads: usize,

    /// Verbose logging
    #[clap(long, short)]
    verbose: bool,
}

impl Cli {
    fn config(&self) -> Config {
        Config::new(
            MatrixConfig {
                id_column: self.id_column.clone(),
                skip_columns: self.skip_column.clone(),
            },
            GraphConfig {
                include_self_loops: self.self_loops,
            },
            DetectorConfig {
                resolution: self.resolution,
                max_passes: self.max_passes,
                max_levels: self.max_levels,
                ..DetectorConfig::default()
            },
        )
    }
}

/// Matrix files to process, sorted by name
fn collect_inputs(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        bail!("Input not found: {}", input.display());
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(input)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && is_matrix_file(path))
        .collect();
    files.sort();

    Ok(files)
}

fn is_matrix_file(path: &Path) -> bool {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    matches!(extension.as_deref(), Some("csv") | Some("parquet") | Some("pq"))
}

/// Per-file output directory in batch mode, named after the full file name
/// so `a.csv` and `a.parquet` never share one
fn batch_output_dir(output_dir: &Path, input: &Path) -> PathBuf {
    let name = input.file_name().map(|s| s.to_os_string()).unwrap_or_default();
    output_dir.join(name)
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Cli::parse();

    // Configure logging
    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp_millis()
        .init();

    // Set number of threads
    let num_threads = if args.threads > 0 {
        args.threads
    } else {
        // If threads = 0, use all available cores
        num_cpus::get()
    };

    log::info!("Using {} worker threads", num_threads);
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()?;

    let config = args.config();
    let inputs = collect_inputs(&args.input)?;
    if inputs.is_empty() {
        bail!("No matrix files found in {}", args.input.display());
    }

    log::info!("Starting community detection on {} file(s)", inputs.len());
    log::info!("Output: {}", args.output_dir.display());

    std::fs::create_dir_all(&args.output_dir)?;

    let single = inputs.len() == 1 && args.input.is_file();

    // Every file is an independent run with its own graph and partition
    let failures: Vec<(PathBuf, anyhow::Error)> = inputs
        .par_iter()
        .filter_map(|path| {
            let output_dir = if single {
                args.output_dir.clone()
            } else {
                batch_output_dir(&args.output_dir, path)
            };

            match pipeline::process_file(path, &output_dir, &config) {
                Ok(report) => {
                    log::info!(
                        "{}: {} communities, modularity {:.6}",
                        path.display(),
                        report.detection.partition.community_count(),
                        report.detection.stats.modularity
                    );
                    None
                }
                Err(err) => Some((path.clone(), err)),
            }
        })
        .collect();

    for (path, err) in &failures {
        log::error!("{}: {:#}", path.display(), err);
    }

    if !failures.is_empty() {
        bail!("{} of {} file(s) failed", failures.len(), inputs.len());
    }

    log::info!("Analysis complete. Results saved to {}", args.output_dir.display());

    Ok(())
}
