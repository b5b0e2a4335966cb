use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{anyhow, Result};
use clap::{ArgAction, Parser};
use clustering::element::Element;
use clustering::engine::Engine;
use clustering::kernel::KernelKind;
use clustering::kmeans::CalcOutcome;
use clustering::seeding::CentroidSeed;
use config::clustering::ClusteringConfig;
use config::enums::{DataType, HardwareType};
use log::info;
use utils::delimited_reader::read_delimited_file;
use utils::random::SegmentSampler;

#[derive(Parser, Debug)]
#[command(version, about = "Lloyd k-means clustering of delimited text data", long_about = None)]
#[command(arg_required_else_help = true)]
struct Args {
    /// File with one data point per row. Text without a row separator is rejected.
    #[arg(short = 'f', long = "file", required = true)]
    file: PathBuf,

    /// Number of centroids to sample from the data, or a file with the initial centroids. A
    /// centroid file without a row separator holds a single centroid.
    #[arg(short = 'k', long = "initial", required = true)]
    initial: String,

    /// Separators, innermost first. `\n` and `\t` are unescaped.
    #[arg(short = 's', long = "separator", default_value = ",\\n")]
    separators: String,

    /// Element type: uint8, uint16, uint32, uint64, int8, int16, int32, int64, float, double
    #[arg(short = 'd', long = "dtype")]
    data_type: Option<DataType>,

    /// Maximum number of iterations
    #[arg(short = 'i', long = "iter")]
    max_iterations: Option<usize>,

    /// Accelerator: best, cpu, simd or gpu
    #[arg(short = 'a', long = "accelerator")]
    hardware: Option<HardwareType>,

    /// Seed used when sampling the initial centroids
    #[arg(long)]
    seed: Option<u64>,

    /// YAML clustering config. Flags given on the command line take precedence.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Repeat to log more
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn clustering_config(&self) -> Result<ClusteringConfig> {
        let mut config = match &self.config {
            Some(path) => ClusteringConfig::load(path)?,
            None => ClusteringConfig::default(),
        };
        if let Some(data_type) = self.data_type {
            config = config.with_data_type(data_type);
        }
        if let Some(max_iterations) = self.max_iterations {
            config = config.with_max_iterations(max_iterations);
        }
        if let Some(hardware) = self.hardware {
            config = config.with_hardware(hardware);
        }
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        config.validate()?;
        Ok(config)
    }
}

/// Result of one engine run.
struct Report<T> {
    kernel: KernelKind,
    outcome: CalcOutcome,
    cols: usize,
    centroids: Vec<T>,
}

fn unescape_separators(separators: &str) -> String {
    separators
        .replace("\\n", "\n")
        .replace("\\t", "\t")
        .replace("\\r", "\r")
}

/// Flattened rows and column count of a data point file.
fn read_points<T>(path: &Path, separators: &str) -> Result<(Vec<T>, usize)>
where
    T: FromStr,
    T::Err: Display,
{
    let (values, _, cols) = read_delimited_file::<T>(path, separators)?
        .into_2d()
        .map_err(|e| anyhow!("{}: {}", path.display(), e))?;
    Ok((values, cols))
}

/// Flattened rows and column count of a centroid file. A text with a single row parses as
/// one-dimensional and is read as that row.
fn read_centroids<T>(path: &Path, separators: &str) -> Result<(Vec<T>, usize)>
where
    T: FromStr,
    T::Err: Display,
{
    let table = read_delimited_file::<T>(path, separators)?;
    if table.num_axes() == 1 {
        let cols = table.values.len();
        return Ok((table.values, cols));
    }
    let (values, _, cols) = table
        .into_2d()
        .map_err(|e| anyhow!("{}: {}", path.display(), e))?;
    Ok((values, cols))
}

fn run<T>(args: &Args, config: &ClusteringConfig) -> Result<Vec<Report<T>>>
where
    T: Element + FromStr,
    T::Err: Display,
{
    let separators = unescape_separators(&args.separators);
    let (points, cols) = read_points::<T>(&args.file, &separators)?;
    info!(
        "Read {} points of dimension {} from {}",
        points.len() / cols.max(1),
        cols,
        args.file.display()
    );

    let centroids = match args.initial.parse::<usize>() {
        Ok(num_k) => {
            let mut sampler = SegmentSampler::new(config.seed);
            CentroidSeed::Sampled {
                num_k,
                sampler: &mut sampler,
            }
            .initial_centroids(&points, cols)?
        }
        Err(_) => {
            let (centroids, centroid_cols) =
                read_centroids::<T>(Path::new(&args.initial), &separators)?;
            if centroid_cols != cols {
                return Err(anyhow!(
                    "Centroids have {} columns, data points have {}",
                    centroid_cols,
                    cols
                ));
            }
            centroids
        }
    };

    // Both engines start from the same centroids.
    let scalar_config = config.clone().with_hardware(HardwareType::Scalar);
    let mut reports = vec![];
    for config in [&scalar_config, config] {
        let mut engine = Engine::build(&points, cols, CentroidSeed::Explicit(&centroids), config)?;
        let outcome = engine.calc()?;
        reports.push(Report {
            kernel: engine.kernel(),
            outcome,
            cols,
            centroids: engine.copy_centroids(),
        });
    }
    Ok(reports)
}

fn print_reports<T: Display>(reports: &[Report<T>]) {
    for report in reports {
        println!("kernel = {:?}", report.kernel);
        println!("time = {} (micro-secs)", report.outcome.elapsed_micros());
        if report.outcome.still_changing() {
            println!(
                "iterations = {} (assignments still changing)",
                report.outcome.iterations
            );
        } else {
            println!("iterations = {}", report.outcome.iterations);
        }
        for row in report.centroids.chunks_exact(report.cols) {
            let row = row
                .iter()
                .map(|value| value.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            println!("{}", row);
        }
    }
}

fn run_and_print<T>(args: &Args, config: &ClusteringConfig) -> Result<()>
where
    T: Element + FromStr + Display,
    T::Err: Display,
{
    print_reports(&run::<T>(args, config)?);
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = args.clustering_config()?;
    match config.data_type {
        DataType::Uint8 => run_and_print::<u8>(&args, &config),
        DataType::Uint16 => run_and_print::<u16>(&args, &config),
        DataType::Uint32 => run_and_print::<u32>(&args, &config),
        DataType::Uint64 => run_and_print::<u64>(&args, &config),
        DataType::Int8 => run_and_print::<i8>(&args, &config),
        DataType::Int16 => run_and_print::<i16>(&args, &config),
        DataType::Int32 => run_and_print::<i32>(&args, &config),
        DataType::Int64 => run_and_print::<i64>(&args, &config),
        DataType::Float => run_and_print::<f32>(&args, &config),
        DataType::Double => run_and_print::<f64>(&args, &config),
    }
}
