//! Borrowed column-oriented view used while growing regression trees.
use ordered_float::OrderedFloat;
use rand::Rng;
use std::ops::Range;
use thiserror::Error;

/// A set of feature columns followed by a target column (the last one).
///
/// The table never owns its data. Row selection, bootstrap sampling, and the
/// per-node sorting done by the tree builder only shuffle `row_index`.
#[derive(Debug, Clone)]
pub struct Table<'a> {
    row_index: Vec<usize>,
    row_range: Range<usize>,
    columns: Vec<&'a [f64]>,
}

impl<'a> Table<'a> {
    #[cfg(test)]
    pub fn new(columns: Vec<&'a [f64]>) -> Result<Self, TableError> {
        let rows_len = columns.first().map_or(0, |c| c.len());
        Self::with_rows(columns, (0..rows_len).collect())
    }

    /// Makes a table that only sees the given rows of `columns`.
    pub fn with_rows(columns: Vec<&'a [f64]>, row_index: Vec<usize>) -> Result<Self, TableError> {
        if columns.is_empty() || columns[0].is_empty() || row_index.is_empty() {
            return Err(TableError::EmptyTable);
        }

        let rows_len = columns[0].len();
        if columns.iter().skip(1).any(|c| c.len() != rows_len) {
            return Err(TableError::RowSizeMismatch);
        }

        if let Some(&row) = row_index.iter().find(|&&i| i >= rows_len) {
            return Err(TableError::RowOutOfRange { row, rows_len });
        }

        let target = columns[columns.len() - 1];
        if row_index.iter().any(|&i| !target[i].is_finite()) {
            return Err(TableError::NonFiniteTarget);
        }

        let end = row_index.len();
        Ok(Self {
            row_index,
            row_range: Range { start: 0, end },
            columns,
        })
    }

    pub fn target(&self) -> impl '_ + Iterator<Item = f64> + Clone {
        self.column(self.columns.len() - 1)
    }

    pub fn feature(&self, feature_index: usize) -> impl '_ + Iterator<Item = f64> + Clone {
        debug_assert!(feature_index < self.features_len());
        self.column(feature_index)
    }

    fn column(&self, column_index: usize) -> impl '_ + Iterator<Item = f64> + Clone {
        self.rows().map(move |i| self.columns[column_index][i])
    }

    pub fn features_len(&self) -> usize {
        self.columns.len() - 1
    }

    pub fn rows_len(&self) -> usize {
        self.row_range.end - self.row_range.start
    }

    pub fn is_single_target(&self) -> bool {
        let mut target = self.target();
        match target.next() {
            None => true,
            Some(first) => target.all(|y| y == first),
        }
    }

    fn rows(&self) -> impl '_ + Iterator<Item = usize> + Clone {
        self.row_index[self.row_range.start..self.row_range.end]
            .iter()
            .copied()
    }

    pub fn sort_rows_by_feature(&mut self, feature_index: usize) {
        let column = self.columns[feature_index];
        self.row_index[self.row_range.start..self.row_range.end]
            .sort_by_key(|&x| OrderedFloat(column[x]))
    }

    pub fn bootstrap_sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Self {
        let row_index = (0..self.rows_len())
            .map(|_| self.row_index[rng.gen_range(self.row_range.start..self.row_range.end)])
            .collect::<Vec<_>>();
        let row_range = Range {
            start: 0,
            end: self.rows_len(),
        };
        Self {
            row_index,
            row_range,
            columns: self.columns.clone(),
        }
    }

    /// Candidate split points of a feature as `(row, threshold)` pairs.
    ///
    /// `row` is the number of rows that fall on the left side of `threshold`.
    /// The threshold is the midpoint of two neighbouring values, or the lower
    /// one when the midpoint rounds up to the upper value.
    pub fn thresholds(&self, feature_index: usize) -> impl '_ + Iterator<Item = (usize, f64)> {
        // Assumption: rows have been sorted by `feature_index`.
        let column = self.columns[feature_index];
        self.rows()
            .map(move |i| column[i])
            .enumerate()
            .scan(None, |prev: &mut Option<f64>, (i, x)| match *prev {
                Some(y) if y != x => {
                    *prev = Some(x);
                    let mid = (x + y) / 2.0;
                    Some(Some((i, if mid >= x { y } else { mid })))
                }
                Some(_) => Some(None),
                None => {
                    *prev = Some(x);
                    Some(None)
                }
            })
            .flatten()
    }

    pub fn with_split<F, T>(&mut self, row: usize, mut f: F) -> (T, T)
    where
        F: FnMut(&mut Self) -> T,
    {
        let row = row + self.row_range.start;
        let original = self.row_range.clone();

        self.row_range.end = row;
        let left = f(self);
        self.row_range.end = original.end;

        self.row_range.start = row;
        let right = f(self);
        self.row_range.start = original.start;

        (left, right)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("table must have at least one column and one row")]
    EmptyTable,

    #[error("some of columns have a different row count from others")]
    RowSizeMismatch,

    #[error("row {row} is out of range for a table with {rows_len} rows")]
    RowOutOfRange { row: usize, rows_len: usize },

    #[error("target column contains non finite numbers")]
    NonFiniteTarget,
}
