//! Owned, named-column table read from CSV, with missing values.
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub struct DataFrame {
    names: Vec<String>,
    columns: Vec<Vec<Option<f64>>>,
    rows_len: usize,
}

impl DataFrame {
    pub fn new(names: Vec<String>, columns: Vec<Vec<Option<f64>>>) -> Result<Self, DataFrameError> {
        if names.len() != columns.len() {
            return Err(DataFrameError::ColumnCountMismatch);
        }

        let mut seen = HashSet::new();
        if let Some(name) = names.iter().find(|n| !seen.insert(n.as_str())) {
            return Err(DataFrameError::DuplicateColumn(name.clone()));
        }

        let rows_len = columns.first().map_or(0, |c| c.len());
        if columns.iter().any(|c| c.len() != rows_len) {
            return Err(DataFrameError::RowSizeMismatch);
        }

        Ok(Self {
            names,
            columns,
            rows_len,
        })
    }

    /// Reads a CSV with a header row. Cells that are empty, `NaN`, or not
    /// finite numbers become missing values.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, DataFrameError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let names = reader
            .headers()?
            .iter()
            .map(String::from)
            .collect::<Vec<_>>();

        let mut columns = vec![Vec::new(); names.len()];
        for record in reader.records() {
            let record = record?;
            for (column, field) in columns.iter_mut().zip(record.iter()) {
                column.push(parse_cell(field));
            }
        }
        Self::new(names, columns)
    }

    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self, DataFrameError> {
        let file = File::open(path)?;
        Self::from_csv_reader(BufReader::new(file))
    }

    pub fn rows_len(&self) -> usize {
        self.rows_len
    }

    pub fn column_names(&self) -> impl '_ + Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.columns[i].as_slice())
    }

    /// Names from `required` that this frame does not have, in the given order.
    pub fn missing_columns<S: AsRef<str>>(&self, required: &[S]) -> Vec<String> {
        required
            .iter()
            .filter(|name| self.column(name.as_ref()).is_none())
            .map(|name| name.as_ref().to_owned())
            .collect()
    }

    /// Keeps only rows where every column in `names` has a value.
    ///
    /// Returns `None` if one of `names` is not a column of this frame.
    pub fn drop_incomplete<S: AsRef<str>>(&self, names: &[S]) -> Option<Self> {
        let used = names
            .iter()
            .map(|n| self.column(n.as_ref()))
            .collect::<Option<Vec<_>>>()?;
        let keep = (0..self.rows_len)
            .filter(|&row| used.iter().all(|c| c[row].is_some()))
            .collect::<Vec<_>>();
        let columns = self
            .columns
            .iter()
            .map(|c| keep.iter().map(|&row| c[row]).collect())
            .collect();
        Some(Self {
            names: self.names.clone(),
            columns,
            rows_len: keep.len(),
        })
    }

    /// Dense copies of the named columns, in the given order, restricted to
    /// rows that are complete across all of them.
    pub fn complete_columns<S: AsRef<str>>(&self, names: &[S]) -> Option<Vec<Vec<f64>>> {
        let cleaned = self.drop_incomplete(names)?;
        names
            .iter()
            .map(|n| {
                cleaned
                    .column(n.as_ref())
                    .map(|c| c.iter().flatten().copied().collect())
            })
            .collect()
    }
}

fn parse_cell(field: &str) -> Option<f64> {
    field.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[derive(Debug, Error)]
pub enum DataFrameError {
    #[error("the number of column names differs from the number of columns")]
    ColumnCountMismatch,

    #[error("duplicate column name: {0}")]
    DuplicateColumn(String),

    #[error("some of columns have a different row count from others")]
    RowSizeMismatch,

    #[error("failed to read CSV")]
    Csv(#[from] csv::Error),

    #[error("failed to open table")]
    Io(#[from] std::io::Error),
}
