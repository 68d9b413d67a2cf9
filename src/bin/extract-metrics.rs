use anyhow::Context as _;
use clap::Parser;
use perf_importance::{Aggregation, MetricExtractor};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Turns language server logs into a per-document metric table.
#[derive(Debug, Parser)]
#[command(name = "extract-metrics", version)]
struct Opt {
    /// UTF-8 log file to scan.
    log: PathBuf,

    /// Output CSV. Written to stdout when omitted.
    #[arg(long, value_name = "PATH", conflicts_with = "split_dir")]
    output: Option<PathBuf>,

    /// Write DEF.csv, OCC.csv, LOC.csv and NODE.csv into this directory,
    /// routing each document by the category directory in its path.
    #[arg(long, value_name = "DIR")]
    split_dir: Option<PathBuf>,

    /// One row per metric and one column per document.
    #[arg(long)]
    transpose: bool,

    /// How repeated measurements of one document are combined.
    #[arg(long, value_enum, default_value = "sum")]
    mode: Aggregation,

    /// Only keep documents whose identifier contains this substring.
    #[arg(long, value_name = "SUBSTR")]
    filter: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let opt = Opt::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut extractor = MetricExtractor::new()?;
    if let Some(needle) = &opt.filter {
        extractor = extractor.filter(needle.as_str());
    }
    extractor
        .feed_path(&opt.log)
        .with_context(|| format!("cannot read {}", opt.log.display()))?;
    let table = extractor.finish(opt.mode);

    match (&opt.split_dir, &opt.output) {
        (Some(dir), _) => {
            for path in table.write_split(dir, opt.transpose)? {
                eprintln!("wrote {}", path.display());
            }
        }
        (None, Some(path)) => {
            table.write_csv_path(path, opt.transpose)?;
            eprintln!("wrote {} documents to {}", table.rows_len(), path.display());
        }
        (None, None) if opt.transpose => table.write_transposed_csv(std::io::stdout().lock())?,
        (None, None) => table.write_csv(std::io::stdout().lock())?,
    }
    Ok(())
}
