//! Cross-validated permutation importance.
//!
//! For every fold a random forest is fitted on the training rows, then each
//! feature of the held-out rows is shuffled repeatedly and the drop of the
//! held-out R² is recorded. Per-fold importances are summarised as a mean and
//! a sample standard deviation.
use crate::dataframe::DataFrame;
use crate::folds::{self, Fold, FoldCountError};
use crate::functions;
use crate::random_forest::{RandomForestOptions, RandomForestRegressor};
use crate::table::{Table, TableError};
use itertools::Itertools as _;
use rand::rngs::StdRng;
use rand::seq::SliceRandom as _;
use rand::{Rng, SeedableRng};
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use std::num::NonZeroUsize;
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_FOLDS: usize = 5;
pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_REPEATS: usize = 20;

#[derive(Debug, Clone)]
pub struct ImportanceOptions {
    folds: usize,
    seed: u64,
    repeats: NonZeroUsize,
    random_forest: RandomForestOptions,
    parallel: bool,
}

impl ImportanceOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn folds(mut self, folds: usize) -> Self {
        self.folds = folds;
        self
    }

    /// Seeds fold shuffling, forest construction, and column permutation.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// How many times each feature is shuffled per fold.
    pub fn repeats(mut self, repeats: NonZeroUsize) -> Self {
        self.repeats = repeats;
        self
    }

    /// Forest settings. The forest seed is always overridden by [`Self::seed`].
    pub fn random_forest(mut self, options: RandomForestOptions) -> Self {
        self.random_forest = options;
        self
    }

    pub fn parallel(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }

    pub fn folds_len(&self) -> usize {
        self.folds
    }

    pub fn estimate<S: AsRef<str>>(
        &self,
        frame: &DataFrame,
        features: &[S],
        target: &str,
    ) -> Result<Importances, EstimateError> {
        let mut names = features.iter().map(|f| f.as_ref()).collect::<Vec<_>>();
        names.push(target);

        let missing = frame.missing_columns(&names);
        if !missing.is_empty() {
            return Err(EstimateError::MissingColumns { columns: missing });
        }

        let columns = frame
            .complete_columns(&names)
            .expect("columns have been checked");
        let rows = columns[0].len();
        debug!(
            metric = target,
            rows,
            dropped = frame.rows_len() - rows,
            "dropped incomplete rows"
        );
        if rows == 0 {
            return Err(EstimateError::EmptyData);
        }

        let partition = folds::k_fold(rows, self.folds, self.seed)?;
        let mut fold_importances = vec![Vec::with_capacity(partition.len()); features.len()];
        let mut fold_scores = Vec::with_capacity(partition.len());
        for (i, fold) in partition.iter().enumerate() {
            let (score, importances) = self.run_fold(&columns, fold)?;
            info!(
                metric = target,
                fold = i,
                train_rows = fold.train.len(),
                test_rows = fold.test.len(),
                r2 = score,
                "held-out score"
            );
            fold_scores.push(score);
            for (acc, v) in fold_importances.iter_mut().zip(importances) {
                acc.push(v);
            }
        }

        let importances = fold_importances
            .iter()
            .map(|values| {
                let (mean, stddev) = functions::mean_and_stddev(values.iter().copied());
                Importance { mean, stddev }
            })
            .collect();
        Ok(Importances {
            features: features.iter().map(|f| f.as_ref().to_owned()).collect(),
            importances,
            fold_scores,
        })
    }

    fn run_fold(&self, columns: &[Vec<f64>], fold: &Fold) -> Result<(f64, Vec<f64>), EstimateError> {
        let table = Table::with_rows(
            columns.iter().map(|c| c.as_slice()).collect(),
            fold.train.clone(),
        )?;
        let options = self.random_forest.clone().seed(self.seed);
        let regressor = if self.parallel {
            RandomForestRegressor::fit_parallel(table, options)
        } else {
            RandomForestRegressor::fit(table, options)
        };

        let (features, target) = columns.split_at(columns.len() - 1);
        let rows = fold
            .test
            .iter()
            .map(|&row| features.iter().map(|c| c[row]).collect::<Vec<_>>())
            .collect::<Vec<_>>();
        let actual = fold.test.iter().map(|&row| target[0][row]).collect::<Vec<_>>();

        let permutation = PermutationImportance {
            regressor: &regressor,
            rows: &rows,
            actual: &actual,
            repeats: self.repeats.get(),
            parallel: self.parallel,
        };
        Ok(permutation.compute(self.seed))
    }
}

impl Default for ImportanceOptions {
    fn default() -> Self {
        Self {
            folds: DEFAULT_FOLDS,
            seed: DEFAULT_SEED,
            repeats: NonZeroUsize::new(DEFAULT_REPEATS).expect("never fails"),
            random_forest: RandomForestOptions::default(),
            parallel: true,
        }
    }
}

/// Estimates the importance of `features` for predicting `target` with the
/// default forest and repeat settings.
pub fn estimate<S: AsRef<str>>(
    frame: &DataFrame,
    features: &[S],
    target: &str,
    folds: usize,
    seed: u64,
) -> Result<Importances, EstimateError> {
    ImportanceOptions::new()
        .folds(folds)
        .seed(seed)
        .estimate(frame, features, target)
}

/// Permutation importance of every feature of a held-out row set.
struct PermutationImportance<'a> {
    regressor: &'a RandomForestRegressor,
    rows: &'a [Vec<f64>],
    actual: &'a [f64],
    repeats: usize,
    parallel: bool,
}

impl<'a> PermutationImportance<'a> {
    /// Returns the baseline R² and the mean score drop of each feature.
    fn compute(&self, seed: u64) -> (f64, Vec<f64>) {
        let predicted = self.regressor.predict_rows(self.rows);
        let baseline = functions::r2_score(self.actual, &predicted);

        let features_len = self.rows.first().map_or(0, |r| r.len());
        let mut seeder = StdRng::seed_from_u64(seed);
        let jobs = (0..features_len)
            .map(|feature| {
                let mut seed = [0u8; 32];
                seeder.fill(&mut seed);
                (feature, StdRng::from_seed(seed))
            })
            .collect::<Vec<_>>();

        let drops = if self.parallel {
            jobs.into_par_iter()
                .map(|(feature, mut rng)| self.feature_drop(feature, baseline, &mut rng))
                .collect()
        } else {
            jobs.into_iter()
                .map(|(feature, mut rng)| self.feature_drop(feature, baseline, &mut rng))
                .collect()
        };
        (baseline, drops)
    }

    fn feature_drop<R: Rng + ?Sized>(&self, feature: usize, baseline: f64, rng: &mut R) -> f64 {
        let mut column = self.rows.iter().map(|r| r[feature]).collect::<Vec<_>>();
        let mut rows = self.rows.to_vec();
        functions::mean((0..self.repeats).map(|_| {
            column.shuffle(rng);
            for (row, &v) in rows.iter_mut().zip(column.iter()) {
                row[feature] = v;
            }
            let predicted = self.regressor.predict_rows(&rows);
            baseline - functions::r2_score(self.actual, &predicted)
        }))
    }
}

/// Importance of one feature summarised over folds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Importance {
    pub mean: f64,
    pub stddev: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Importances {
    /// Feature names, in the order they were requested.
    pub features: Vec<String>,
    /// One entry per feature, aligned with `features`.
    pub importances: Vec<Importance>,
    /// Held-out R² of each fold before any shuffling.
    pub fold_scores: Vec<f64>,
}

impl Importances {
    pub fn means(&self) -> Vec<f64> {
        self.importances.iter().map(|i| i.mean).collect()
    }

    pub fn stddevs(&self) -> Vec<f64> {
        self.importances.iter().map(|i| i.stddev).collect()
    }

    pub fn iter(&self) -> impl '_ + Iterator<Item = (&str, Importance)> {
        self.features
            .iter()
            .map(String::as_str)
            .zip(self.importances.iter().copied())
    }
}

#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EstimateError {
    #[error("missing required columns: {}", .columns.iter().join(", "))]
    MissingColumns { columns: Vec<String> },

    #[error("no rows left after dropping rows with missing values")]
    EmptyData,

    #[error("invalid fold count {folds}: must be between 2 and the row count ({rows})")]
    InvalidFoldCount { folds: usize, rows: usize },

    #[error("invalid training table")]
    InvalidTable(#[from] TableError),
}

impl From<FoldCountError> for EstimateError {
    fn from(e: FoldCountError) -> Self {
        Self::InvalidFoldCount {
            folds: e.folds,
            rows: e.rows,
        }
    }
}
