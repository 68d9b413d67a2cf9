use anyhow::Context as _;
use clap::Parser;
use perf_importance::driver::{self, Driver};
use perf_importance::importance::{DEFAULT_FOLDS, DEFAULT_REPEATS, DEFAULT_SEED};
use perf_importance::{ImportanceOptions, RandomForestOptions};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Cross-validated permutation importance of structural file metrics for
/// language server latencies.
#[derive(Debug, Parser)]
#[command(name = "perf-importance", version)]
struct Opt {
    /// Input table. Defaults to `project.csv`, then `data/project.csv`.
    #[arg(long, value_name = "PATH")]
    csv: Option<PathBuf>,

    /// Where to write the sorted importance table.
    #[arg(long, value_name = "PATH", default_value = driver::DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Number of cross-validation folds.
    #[arg(long, default_value_t = DEFAULT_FOLDS)]
    folds: usize,

    /// Seed for fold shuffling, forest construction, and permutations.
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Trees per forest.
    #[arg(long, default_value = "300")]
    trees: NonZeroUsize,

    /// Shuffles per feature and fold.
    #[arg(long, default_value_t = NonZeroUsize::new(DEFAULT_REPEATS).expect("never fails"))]
    repeats: NonZeroUsize,

    /// Log fold scores and progress to stderr.
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into())
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let opt = Opt::parse();
    init_tracing(opt.verbose);

    let cwd = std::env::current_dir().context("cannot determine the working directory")?;
    let input = driver::discover_input(opt.csv.as_deref(), &cwd)?;

    let options = ImportanceOptions::new()
        .folds(opt.folds)
        .seed(opt.seed)
        .repeats(opt.repeats)
        .random_forest(RandomForestOptions::new().trees(opt.trees));
    let report = Driver::new(options).run_path(&input, &opt.output)?;

    print!("{}", report.summary());
    println!("wrote {}", opt.output.display());
    Ok(())
}
