//! simval CLI - simulation-validation runs and sample-size sweeps.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use simval::output::{
    create_timestamped_output_dir, write_json, write_sweep_csv, write_trials_csv, Manifest,
    OUTPUT_SCHEMA_VERSION,
};
use simval::{
    run_model_trials, run_sample_size_sweep, summarize, Comparator, Model, ModelKind,
    ValidationConfig,
};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

const LOCAL_CONFIG: &str = "simval.toml";

#[derive(Parser)]
#[command(name = "simval")]
#[command(version)]
#[command(about = "Check that an estimator recovers known parameters from simulated data")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Debug, Args)]
struct CommonArgs {
    /// Path to a TOML configuration file (defaults to ./simval.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of trials
    #[arg(long, allow_negative_numbers = true)]
    trials: Option<i64>,

    /// Base seed for the per-trial random streams
    #[arg(long)]
    seed: Option<u64>,

    /// Model to validate: gaussian or linear
    #[arg(long)]
    model: Option<ModelKind>,

    /// Discrepancy measure: squared or absolute
    #[arg(long)]
    comparator: Option<Comparator>,

    /// Run trials on all cores
    #[arg(long)]
    parallel: bool,

    /// Root directory for timestamped run output
    #[arg(long, default_value = "output-simval")]
    outdir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one validation at a fixed sample size
    Run {
        #[command(flatten)]
        common: CommonArgs,

        /// Observations generated per trial
        #[arg(long)]
        sample_size: Option<usize>,
    },

    /// Repeat the validation over increasing sample sizes
    Sweep {
        #[command(flatten)]
        common: CommonArgs,

        /// Comma-separated, strictly increasing sample sizes
        #[arg(long, value_delimiter = ',')]
        sizes: Option<Vec<usize>>,
    },

    /// Print the default configuration as TOML
    ExampleConfig,
}

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to install tracing subscriber")
}

fn load_config(path: Option<&Path>) -> Result<ValidationConfig> {
    let path = match path {
        Some(path) => Some(path.to_path_buf()),
        None => Some(PathBuf::from(LOCAL_CONFIG)).filter(|p| p.exists()),
    };

    match path {
        Some(path) => {
            info!(path = %path.display(), "loading configuration");
            ValidationConfig::from_toml_file(&path)
                .with_context(|| format!("failed to load config: {}", path.display()))
        }
        None => Ok(ValidationConfig::default()),
    }
}

fn resolve_config(common: &CommonArgs) -> Result<ValidationConfig> {
    let mut cfg = load_config(common.config.as_deref())?;
    if let Some(trials) = common.trials {
        cfg.trials = trials;
    }
    if let Some(seed) = common.seed {
        cfg.seed = seed;
    }
    if let Some(model) = common.model {
        cfg.model = model;
    }
    if let Some(comparator) = common.comparator {
        cfg.comparator = comparator;
    }
    if common.parallel {
        cfg.parallel = true;
    }
    Ok(cfg)
}

fn manifest(cfg: &ValidationConfig, mode: &str, sample_sizes: Vec<usize>) -> Manifest {
    Manifest {
        schema_version: OUTPUT_SCHEMA_VERSION.to_string(),
        mode: mode.to_string(),
        model: cfg.model.name().to_string(),
        comparator: cfg.comparator.name().to_string(),
        trials: cfg.trials,
        seed: cfg.seed,
        parallel: cfg.parallel,
        sample_sizes,
    }
}

fn run_single(cfg: &ValidationConfig, outdir: &Path) -> Result<()> {
    let model = cfg.build_model(cfg.sample_size)?;
    info!(
        model = model.name(),
        trials = cfg.trials,
        sample_size = cfg.sample_size,
        seed = cfg.seed,
        "running validation"
    );

    let records = run_model_trials(&model, cfg.comparator, cfg.trials, cfg.seed, cfg.parallel)
        .context("validation run failed")?;
    let summary = summarize(&records)?;

    let run_dir = create_timestamped_output_dir(outdir)
        .with_context(|| format!("failed to create output under {}", outdir.display()))?;
    write_trials_csv(&run_dir.join("trials.csv"), &records)?;
    write_json(&run_dir.join("summary.json"), &summary)?;
    write_json(
        &run_dir.join("manifest.json"),
        &manifest(cfg, "run", vec![cfg.sample_size]),
    )?;

    info!(
        trials = summary.trials,
        overall_mean = summary.overall_mean,
        mean_error = ?summary.mean_error,
        max_error = ?summary.max_error,
        "validation complete"
    );
    println!("Output directory: {}", run_dir.display());
    Ok(())
}

fn run_sweep(cfg: &ValidationConfig, outdir: &Path) -> Result<()> {
    info!(
        trials = cfg.trials,
        sizes = ?cfg.sweep_sizes,
        seed = cfg.seed,
        "running sample-size sweep"
    );

    let report = run_sample_size_sweep(
        &cfg.sweep_sizes,
        cfg.trials,
        cfg.seed,
        cfg.comparator,
        cfg.parallel,
        |n| cfg.build_model(n),
    )
    .context("sample-size sweep failed")?;

    let run_dir = create_timestamped_output_dir(outdir)
        .with_context(|| format!("failed to create output under {}", outdir.display()))?;
    write_sweep_csv(&run_dir.join("sweep.csv"), &report)?;
    write_json(&run_dir.join("sweep.json"), &report)?;
    write_json(
        &run_dir.join("manifest.json"),
        &manifest(cfg, "sweep", cfg.sweep_sizes.clone()),
    )?;

    if report.is_consistent() {
        info!(overall_means = ?report.overall_means(), "error decreases with sample size");
    } else {
        warn!(
            overall_means = ?report.overall_means(),
            "error does not decrease monotonically with sample size"
        );
    }
    println!("Output directory: {}", run_dir.display());
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Run {
            common,
            sample_size,
        } => {
            let mut cfg = resolve_config(&common)?;
            if let Some(n) = sample_size {
                cfg.sample_size = n;
            }
            cfg.validate()?;
            run_single(&cfg, &common.outdir)
        }
        Commands::Sweep { common, sizes } => {
            let mut cfg = resolve_config(&common)?;
            if let Some(sizes) = sizes {
                cfg.sweep_sizes = sizes;
            }
            cfg.validate()?;
            run_sweep(&cfg, &common.outdir)
        }
        Commands::ExampleConfig => {
            print!("{}", ValidationConfig::default().to_toml_string()?);
            Ok(())
        }
    }
}
