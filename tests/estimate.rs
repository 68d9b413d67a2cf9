use perf_importance::{estimate, DataFrame, EstimateError, ImportanceOptions, RandomForestOptions};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::num::NonZeroUsize;

const FEATURES: [&str; 4] = ["NOD", "DEF", "OCC", "LOC"];

/// Four uniform features and a target computed from them by `f`.
fn synthetic<F>(rows: usize, seed: u64, f: F) -> DataFrame
where
    F: Fn(&[f64]) -> f64,
{
    let mut rng = StdRng::seed_from_u64(seed);
    let mut columns = vec![Vec::with_capacity(rows); 5];
    for _ in 0..rows {
        let xs = (0..4).map(|_| rng.gen_range(0.0..100.0)).collect::<Vec<f64>>();
        for (column, &x) in columns.iter_mut().zip(xs.iter()) {
            column.push(Some(x));
        }
        columns[4].push(Some(f(&xs)));
    }
    let mut names = FEATURES.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    names.push("rename".to_owned());
    DataFrame::new(names, columns).expect("consistent columns")
}

fn quick() -> ImportanceOptions {
    ImportanceOptions::new()
        .random_forest(RandomForestOptions::new().trees(NonZeroUsize::new(20).expect("20")))
        .repeats(NonZeroUsize::new(4).expect("4"))
}

#[test]
fn linear_feature_dominates() -> anyhow::Result<()> {
    let frame = synthetic(50, 1, |xs| 3.0 * xs[2] + 1.0);
    let importances = estimate(&frame, &FEATURES, "rename", 5, 42)?;

    let means = importances.means();
    assert_eq!(means.len(), 4);
    assert_eq!(importances.stddevs().len(), 4);
    for (i, &m) in means.iter().enumerate() {
        if i != 2 {
            assert!(means[2] > m, "{:?}", means);
        }
    }
    assert_eq!(importances.fold_scores.len(), 5);
    Ok(())
}

#[test]
fn output_follows_requested_feature_order() -> anyhow::Result<()> {
    let frame = synthetic(30, 2, |xs| xs[0] - xs[3]);
    let order = ["LOC", "OCC", "NOD", "DEF"];
    let importances = quick().folds(3).estimate(&frame, &order, "rename")?;
    assert_eq!(importances.features, order);
    assert_eq!(importances.importances.len(), order.len());
    Ok(())
}

#[test]
fn identical_inputs_give_identical_results() -> anyhow::Result<()> {
    let frame = synthetic(40, 3, |xs| xs[0] * xs[1] / 100.0 + xs[3]);
    let first = quick().seed(7).estimate(&frame, &FEATURES, "rename")?;
    let second = quick().seed(7).estimate(&frame, &FEATURES, "rename")?;
    assert_eq!(first, second);
    for (a, b) in first.importances.iter().zip(second.importances.iter()) {
        assert_eq!(a.mean.to_bits(), b.mean.to_bits());
        assert_eq!(a.stddev.to_bits(), b.stddev.to_bits());
    }

    let sequential = quick()
        .seed(7)
        .parallel(false)
        .estimate(&frame, &FEATURES, "rename")?;
    assert_eq!(first, sequential);
    Ok(())
}

#[test]
fn input_frame_is_left_untouched() -> anyhow::Result<()> {
    let frame = synthetic(20, 4, |xs| xs[1]);
    let before = frame.clone();
    quick().folds(4).estimate(&frame, &FEATURES, "rename")?;
    assert_eq!(frame, before);
    Ok(())
}

#[test]
fn fold_count_bounds() {
    let frame = synthetic(12, 5, |xs| xs[0]);
    assert_eq!(
        quick().folds(1).estimate(&frame, &FEATURES, "rename"),
        Err(EstimateError::InvalidFoldCount { folds: 1, rows: 12 })
    );
    assert_eq!(
        quick().folds(13).estimate(&frame, &FEATURES, "rename"),
        Err(EstimateError::InvalidFoldCount { folds: 13, rows: 12 })
    );
    assert!(quick().folds(12).estimate(&frame, &FEATURES, "rename").is_ok());
}

#[test]
fn missing_columns_are_listed_together() {
    let frame = synthetic(10, 6, |xs| xs[0]);
    let err = quick()
        .estimate(&frame, &["NOD", "DEF", "OCC", "ELOC"], "gotoDefinition")
        .unwrap_err();
    assert_eq!(
        err,
        EstimateError::MissingColumns {
            columns: vec!["ELOC".to_owned(), "gotoDefinition".to_owned()]
        }
    );
    assert_eq!(
        err.to_string(),
        "missing required columns: ELOC, gotoDefinition"
    );
}

#[test]
fn incomplete_rows_are_dropped() -> anyhow::Result<()> {
    let frame = DataFrame::from_csv_reader(
        "NOD,DEF,OCC,LOC,rename\n\
         1,2,3,4,5\n\
         2,3,4,5,\n\
         3,4,5,6,7\n\
         4,5,,7,8\n\
         5,6,7,8,9\n"
            .as_bytes(),
    )?;
    assert!(quick().folds(3).estimate(&frame, &FEATURES, "rename").is_ok());
    assert_eq!(
        quick().folds(4).estimate(&frame, &FEATURES, "rename"),
        Err(EstimateError::InvalidFoldCount { folds: 4, rows: 3 })
    );

    let empty = DataFrame::from_csv_reader("NOD,DEF,OCC,LOC,rename\n1,2,3,4,\n".as_bytes())?;
    assert_eq!(
        quick().estimate(&empty, &FEATURES, "rename"),
        Err(EstimateError::EmptyData)
    );
    Ok(())
}
