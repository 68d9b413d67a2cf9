//! Seeded K-fold partitioning of row indices.
use rand::rngs::StdRng;
use rand::seq::SliceRandom as _;
use rand::SeedableRng;
use thiserror::Error;

/// One cross-validation pass: complementary train and held-out row sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    /// Training rows in ascending order.
    pub train: Vec<usize>,
    /// Held-out rows in shuffled order.
    pub test: Vec<usize>,
}

/// Shuffles `0..rows` with `seed` and cuts the result into `folds` contiguous
/// groups. The first `rows % folds` groups get one extra row.
pub fn k_fold(rows: usize, folds: usize, seed: u64) -> Result<Vec<Fold>, FoldCountError> {
    if folds < 2 || folds > rows {
        return Err(FoldCountError { folds, rows });
    }

    let mut indices = (0..rows).collect::<Vec<_>>();
    indices.shuffle(&mut StdRng::seed_from_u64(seed));

    let mut result = Vec::with_capacity(folds);
    let mut start = 0;
    for k in 0..folds {
        let size = rows / folds + usize::from(k < rows % folds);
        let test = indices[start..start + size].to_vec();

        let mut held_out = vec![false; rows];
        for &i in &test {
            held_out[i] = true;
        }
        let train = (0..rows).filter(|&i| !held_out[i]).collect();

        result.push(Fold { train, test });
        start += size;
    }
    Ok(result)
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid fold count {folds}: must be between 2 and the row count ({rows})")]
pub struct FoldCountError {
    pub folds: usize,
    pub rows: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_row_is_held_out_exactly_once() -> anyhow::Result<()> {
        for rows in 2..30 {
            for folds in 2..=rows {
                let partition = k_fold(rows, folds, 42)?;
                assert_eq!(partition.len(), folds);

                let mut seen = vec![0; rows];
                for fold in &partition {
                    for &i in &fold.test {
                        seen[i] += 1;
                    }
                    assert_eq!(fold.train.len() + fold.test.len(), rows);
                    assert!(fold.train.iter().all(|i| !fold.test.contains(i)));
                }
                assert!(seen.iter().all(|&n| n == 1));
            }
        }
        Ok(())
    }

    #[test]
    fn fold_sizes_are_balanced() -> anyhow::Result<()> {
        let sizes = k_fold(11, 4, 0)?
            .iter()
            .map(|f| f.test.len())
            .collect::<Vec<_>>();
        assert_eq!(sizes, vec![3, 3, 3, 2]);
        Ok(())
    }

    #[test]
    fn seed_controls_the_shuffle() -> anyhow::Result<()> {
        assert_eq!(k_fold(20, 5, 7)?, k_fold(20, 5, 7)?);
        assert_ne!(k_fold(20, 5, 7)?, k_fold(20, 5, 8)?);
        Ok(())
    }

    #[test]
    fn rejects_out_of_range_fold_counts() {
        assert_eq!(
            k_fold(10, 1, 0).unwrap_err(),
            FoldCountError { folds: 1, rows: 10 }
        );
        assert_eq!(
            k_fold(10, 11, 0).unwrap_err(),
            FoldCountError {
                folds: 11,
                rows: 10
            }
        );
    }
}
