//! Runs the estimator over every response metric of a project table.
use crate::dataframe::{DataFrame, DataFrameError};
use crate::importance::{EstimateError, ImportanceOptions, Importances};
use crate::report::{self, ImportanceRecord, ReportError};
use itertools::Itertools as _;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Structural metrics of a source file.
pub const FEATURE_COLUMNS: [&str; 4] = ["NOD", "DEF", "OCC", "LOC"];

/// Per-request latencies measured by the language server.
pub const TARGET_COLUMNS: [&str; 6] = [
    "compile_component",
    "locate_component",
    "traverse_component",
    "gotoDefinition",
    "rename",
    "completion",
];

pub const DEFAULT_INPUT: &str = "project.csv";
pub const FALLBACK_INPUT: &str = "data/project.csv";
pub const DEFAULT_OUTPUT: &str = "results/permutation_importance.csv";

/// Picks the input table: `explicit` if given, else `project.csv` and then
/// `data/project.csv` under `dir`.
pub fn discover_input(explicit: Option<&Path>, dir: &Path) -> Result<PathBuf, DriverError> {
    let candidates = match explicit {
        Some(path) => vec![path.to_path_buf()],
        None => vec![dir.join(DEFAULT_INPUT), dir.join(FALLBACK_INPUT)],
    };
    match candidates.iter().find(|p| p.is_file()) {
        Some(path) => Ok(path.clone()),
        None => Err(DriverError::InputNotFound { tried: candidates }),
    }
}

#[derive(Debug, Clone)]
pub struct Driver {
    features: Vec<String>,
    targets: Vec<String>,
    options: ImportanceOptions,
}

impl Driver {
    pub fn new(options: ImportanceOptions) -> Self {
        Self {
            features: FEATURE_COLUMNS.iter().map(|s| s.to_string()).collect(),
            targets: TARGET_COLUMNS.iter().map(|s| s.to_string()).collect(),
            options,
        }
    }

    pub fn features<S: AsRef<str>>(mut self, features: &[S]) -> Self {
        self.features = features.iter().map(|s| s.as_ref().to_owned()).collect();
        self
    }

    pub fn targets<S: AsRef<str>>(mut self, targets: &[S]) -> Self {
        self.targets = targets.iter().map(|s| s.as_ref().to_owned()).collect();
        self
    }

    /// Estimates every target in turn. Nothing is computed unless all
    /// feature and target columns are present.
    pub fn run(&self, frame: &DataFrame) -> Result<Report, DriverError> {
        let required = self
            .features
            .iter()
            .chain(self.targets.iter())
            .collect::<Vec<_>>();
        let missing = frame.missing_columns(&required);
        if !missing.is_empty() {
            return Err(EstimateError::MissingColumns { columns: missing }.into());
        }

        let frame = frame
            .drop_incomplete(&required)
            .expect("columns have been checked");
        info!(
            rows = frame.rows_len(),
            features = %self.features.iter().join(","),
            folds = self.options.folds_len(),
            "loaded table"
        );
        if frame.rows_len() == 0 {
            return Err(EstimateError::EmptyData.into());
        }

        let mut results = Vec::with_capacity(self.targets.len());
        for target in &self.targets {
            debug!(metric = %target, "estimating");
            let importances = self.options.estimate(&frame, &self.features, target)?;
            results.push((target.clone(), importances));
        }
        Ok(Report { results })
    }

    /// Loads `input`, runs every target, and writes the sorted records to
    /// `output`. The output file is only created once all targets succeed.
    pub fn run_path(&self, input: &Path, output: &Path) -> Result<Report, DriverError> {
        let frame = DataFrame::from_csv_path(input)?;
        let results = self.run(&frame)?;
        report::write_csv_path(output, &results.records())?;
        info!(path = %output.display(), "wrote results");
        Ok(results)
    }
}

impl Default for Driver {
    fn default() -> Self {
        Self::new(ImportanceOptions::default())
    }
}

/// Importances of every target, in the order the targets were run.
#[derive(Debug, Clone)]
pub struct Report {
    pub results: Vec<(String, Importances)>,
}

impl Report {
    /// Flattened records, sorted by target then descending mean importance.
    pub fn records(&self) -> Vec<ImportanceRecord> {
        let mut records = self
            .results
            .iter()
            .flat_map(|(target, importances)| ImportanceRecord::from_importances(target, importances))
            .collect::<Vec<_>>();
        report::sort_records(&mut records);
        records
    }

    /// Console text: targets in run order, features by descending mean
    /// importance.
    pub fn summary(&self) -> String {
        let records = self.records();
        self.results
            .iter()
            .map(|(target, _)| report::summary(target, &records))
            .collect()
    }
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("no input table found (tried {})", .tried.iter().map(|p| p.display()).join(", "))]
    InputNotFound { tried: Vec<PathBuf> },

    #[error(transparent)]
    Estimate(#[from] EstimateError),

    #[error(transparent)]
    Table(#[from] DataFrameError),

    #[error(transparent)]
    Report(#[from] ReportError),
}
