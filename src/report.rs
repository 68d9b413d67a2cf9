use crate::importance::Importances;
use ordered_float::OrderedFloat;
use serde::Serialize;
use std::cmp::Reverse;
use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// One row of the results table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportanceRecord {
    pub target: String,
    pub feature: String,
    pub mean_importance: f64,
    pub std_importance: f64,
}

impl ImportanceRecord {
    pub fn from_importances<'a>(
        target: &'a str,
        importances: &'a Importances,
    ) -> impl 'a + Iterator<Item = Self> {
        importances.iter().map(move |(feature, i)| Self {
            target: target.to_owned(),
            feature: feature.to_owned(),
            mean_importance: i.mean,
            std_importance: i.stddev,
        })
    }
}

/// Orders records by target ascending, then mean importance descending.
pub fn sort_records(records: &mut [ImportanceRecord]) {
    records.sort_by(|a, b| {
        a.target.cmp(&b.target).then_with(|| {
            Reverse(OrderedFloat(a.mean_importance)).cmp(&Reverse(OrderedFloat(b.mean_importance)))
        })
    });
}

pub fn write_csv<W: Write>(writer: W, records: &[ImportanceRecord]) -> Result<(), ReportError> {
    let mut writer = csv::Writer::from_writer(writer);
    for record in records {
        writer.serialize(record)?;
    }
    if records.is_empty() {
        writer.write_record(["target", "feature", "mean_importance", "std_importance"])?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes `records` to `path`, creating missing parent directories.
pub fn write_csv_path<P: AsRef<Path>>(path: P, records: &[ImportanceRecord]) -> Result<(), ReportError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    write_csv(File::create(path)?, records)
}

/// Console block for one target: a header then one line per record of that
/// target, in the order given.
pub fn summary(target: &str, records: &[ImportanceRecord]) -> String {
    let mut s = String::new();
    let _ = writeln!(s, "==== {} ====", target);
    for r in records.iter().filter(|r| r.target == target) {
        let _ = writeln!(
            s,
            "{}: mean={:.6}, std={:.6}",
            r.feature, r.mean_importance, r.std_importance
        );
    }
    s
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write CSV")]
    Csv(#[from] csv::Error),

    #[error("failed to write report")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importance::Importance;

    fn importances(means: &[f64]) -> Importances {
        Importances {
            features: ["NOD", "DEF", "OCC", "LOC"][..means.len()]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            importances: means
                .iter()
                .map(|&mean| Importance { mean, stddev: 0.01 })
                .collect(),
            fold_scores: vec![],
        }
    }

    #[test]
    fn sorts_by_target_then_descending_mean() {
        let rename = importances(&[0.3, 0.1, 0.5, 0.2]);
        let completion = importances(&[0.0, 0.9]);
        let mut records = ImportanceRecord::from_importances("rename", &rename)
            .chain(ImportanceRecord::from_importances("completion", &completion))
            .collect::<Vec<_>>();
        sort_records(&mut records);

        let order = records
            .iter()
            .map(|r| (r.target.as_str(), r.mean_importance))
            .collect::<Vec<_>>();
        assert_eq!(
            order,
            vec![
                ("completion", 0.9),
                ("completion", 0.0),
                ("rename", 0.5),
                ("rename", 0.3),
                ("rename", 0.2),
                ("rename", 0.1),
            ]
        );
        assert_eq!(records[2].feature, "OCC");
    }

    #[test]
    fn writes_header_and_rows() -> anyhow::Result<()> {
        let rename = importances(&[0.25, 0.5]);
        let records = ImportanceRecord::from_importances("rename", &rename).collect::<Vec<_>>();
        let mut out = Vec::new();
        write_csv(&mut out, &records)?;
        assert_eq!(
            String::from_utf8(out)?,
            "target,feature,mean_importance,std_importance\n\
             rename,NOD,0.25,0.01\n\
             rename,DEF,0.5,0.01\n"
        );
        Ok(())
    }

    #[test]
    fn writes_into_new_directories() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("results/nested/importance.csv");
        write_csv_path(&path, &[])?;
        assert_eq!(
            fs::read_to_string(&path)?,
            "target,feature,mean_importance,std_importance\n"
        );
        Ok(())
    }

    #[test]
    fn summary_lists_one_target_with_six_decimals() {
        let rename = importances(&[0.5]);
        let completion = importances(&[0.25]);
        let records = ImportanceRecord::from_importances("rename", &rename)
            .chain(ImportanceRecord::from_importances("completion", &completion))
            .collect::<Vec<_>>();
        assert_eq!(
            summary("rename", &records),
            "==== rename ====\nNOD: mean=0.500000, std=0.010000\n"
        );
    }
}
