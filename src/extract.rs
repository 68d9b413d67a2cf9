//! Per-document metric extraction from language server logs.
//!
//! The server logs one line per measurement, shaped like
//! `INFO: rename: 12 document: project/src/Foo.java`. Every recognized tag
//! becomes a column of the extracted table, with one row per document.
//! Tags never logged for a document read as zero.
use itertools::Itertools as _;
use regex::Regex;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Log tags and the column each one is written to, in output order.
pub const METRIC_TAGS: [(&str, &str); 10] = [
    ("compile component", "compile_component"),
    ("locate component", "locate_component"),
    ("traverse component", "traverse_component"),
    ("NOD", "NOD"),
    ("DEF", "DEF"),
    ("OCC", "OCC"),
    ("LOC", "LOC"),
    ("gotoDefinition", "gotoDefinition"),
    ("rename", "rename"),
    ("completion", "completion"),
];

/// Document categories, matched as a `/<name>/` (or `\<name>\`) path
/// component in this order, and the file each category is written to.
pub const CATEGORIES: [(&str, &str); 4] = [
    ("DEF", "DEF.csv"),
    ("OCC", "OCC.csv"),
    ("LOC", "LOC.csv"),
    ("NOD", "NODE.csv"),
];

/// The first category whose directory appears in `document`.
pub fn category(document: &str) -> Option<&'static str> {
    CATEGORIES.iter().map(|(name, _)| *name).find(|name| {
        document.contains(&format!("/{}/", name)) || document.contains(&format!("\\{}\\", name))
    })
}

/// How repeated measurements of one (document, tag) pair are combined.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Aggregation {
    #[default]
    Sum,
    Mean,
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Accumulator {
    sum: f64,
    count: usize,
}

impl Accumulator {
    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    /// Zero when nothing was recorded, in either mode.
    fn finish(self, aggregation: Aggregation) -> f64 {
        match (self.count, aggregation) {
            (0, _) => 0.0,
            (_, Aggregation::Sum) => self.sum,
            (n, Aggregation::Mean) => self.sum / n as f64,
        }
    }
}

#[derive(Debug)]
pub struct MetricExtractor {
    pattern: Regex,
    filter: Option<String>,
    index: HashMap<String, usize>,
    documents: Vec<(String, [Accumulator; METRIC_TAGS.len()])>,
}

impl MetricExtractor {
    pub fn new() -> Result<Self, ExtractError> {
        let tags = METRIC_TAGS.iter().map(|(tag, _)| regex::escape(tag)).join("|");
        let pattern = Regex::new(&format!(
            r"\b(?P<tag>{}): (?P<value>-?\d+(?:\.\d+)?) document: (?P<document>.+?)\s*$",
            tags
        ))?;
        Ok(Self {
            pattern,
            filter: None,
            index: HashMap::new(),
            documents: Vec::new(),
        })
    }

    /// Keeps only documents whose identifier contains `needle`.
    pub fn filter(mut self, needle: impl Into<String>) -> Self {
        self.filter = Some(needle.into());
        self
    }

    /// Records the measurement on `line`, if any. Returns whether it was kept.
    pub fn feed_line(&mut self, line: &str) -> bool {
        let Some(caps) = self.pattern.captures(line) else {
            return false;
        };
        let document = &caps["document"];
        if let Some(needle) = &self.filter {
            if !document.contains(needle.as_str()) {
                return false;
            }
        }
        let Ok(value) = caps["value"].parse::<f64>() else {
            return false;
        };
        let Some(column) = METRIC_TAGS.iter().position(|(tag, _)| *tag == &caps["tag"]) else {
            return false;
        };

        let row = match self.index.get(document) {
            Some(&row) => row,
            None => {
                self.index.insert(document.to_owned(), self.documents.len());
                self.documents
                    .push((document.to_owned(), [Accumulator::default(); METRIC_TAGS.len()]));
                self.documents.len() - 1
            }
        };
        self.documents[row].1[column].add(value);
        true
    }

    /// Feeds every line of `reader` and returns the number of kept lines.
    pub fn feed_reader<R: BufRead>(&mut self, reader: R) -> Result<usize, ExtractError> {
        let mut kept = 0;
        for line in reader.lines() {
            if self.feed_line(&line?) {
                kept += 1;
            }
        }
        debug!(kept, documents = self.documents.len(), "read log");
        Ok(kept)
    }

    pub fn feed_path<P: AsRef<Path>>(&mut self, path: P) -> Result<usize, ExtractError> {
        let file = File::open(path)?;
        self.feed_reader(BufReader::new(file))
    }

    pub fn finish(self, aggregation: Aggregation) -> MetricTable {
        let rows = self
            .documents
            .into_iter()
            .map(|(document, acc)| {
                let values = acc.iter().map(|a| a.finish(aggregation)).collect();
                (document, values)
            })
            .collect();
        MetricTable { rows }
    }
}

/// Extracted metrics: one row per document, in first-seen order.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricTable {
    rows: Vec<(String, Vec<f64>)>,
}

impl MetricTable {
    pub fn rows_len(&self) -> usize {
        self.rows.len()
    }

    pub fn get(&self, document: &str, column: &str) -> Option<f64> {
        let column = METRIC_TAGS.iter().position(|(_, c)| *c == column)?;
        self.rows
            .iter()
            .find(|(d, _)| d == document)
            .map(|(_, values)| values[column])
    }

    pub fn documents(&self) -> impl '_ + Iterator<Item = &str> {
        self.rows.iter().map(|(d, _)| d.as_str())
    }

    /// Splits the rows by [`category`], one table per entry of
    /// [`CATEGORIES`]. Documents outside every category are left out.
    pub fn split_by_category(&self) -> Vec<(&'static str, MetricTable)> {
        CATEGORIES
            .iter()
            .map(|(name, _)| {
                let rows = self
                    .rows
                    .iter()
                    .filter(|(document, _)| category(document) == Some(*name))
                    .cloned()
                    .collect();
                (*name, MetricTable { rows })
            })
            .collect()
    }

    /// Writes `document` followed by one column per metric.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), ExtractError> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(
            std::iter::once("document").chain(METRIC_TAGS.iter().map(|(_, column)| *column)),
        )?;
        for (document, values) in &self.rows {
            let cells = values.iter().map(|v| v.to_string());
            writer.write_record(std::iter::once(document.clone()).chain(cells))?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Writes one row per metric and one column per document.
    pub fn write_transposed_csv<W: Write>(&self, writer: W) -> Result<(), ExtractError> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(std::iter::once("metric").chain(self.documents()))?;
        for (i, (_, column)) in METRIC_TAGS.iter().enumerate() {
            let cells = self.rows.iter().map(|(_, values)| values[i].to_string());
            writer.write_record(std::iter::once(column.to_string()).chain(cells))?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Writes to `path` in either layout, creating missing parent directories.
    pub fn write_csv_path<P: AsRef<Path>>(&self, path: P, transposed: bool) -> Result<(), ExtractError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        if transposed {
            self.write_transposed_csv(file)
        } else {
            self.write_csv(file)
        }
    }

    /// Writes every category table into `dir` and returns the written paths.
    pub fn write_split<P: AsRef<Path>>(&self, dir: P, transposed: bool) -> Result<Vec<PathBuf>, ExtractError> {
        let dir = dir.as_ref();
        let mut written = Vec::with_capacity(CATEGORIES.len());
        for ((name, table), (_, file)) in self.split_by_category().into_iter().zip(CATEGORIES) {
            let path = dir.join(file);
            table.write_csv_path(&path, transposed)?;
            debug!(category = name, documents = table.rows_len(), path = %path.display(), "wrote split");
            written.push(path);
        }
        Ok(written)
    }
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("invalid metric pattern")]
    Pattern(#[from] regex::Error),

    #[error("failed to write CSV")]
    Csv(#[from] csv::Error),

    #[error("failed to read log")]
    Io(#[from] std::io::Error),
}
