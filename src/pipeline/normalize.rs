use crate::types::{Batch, FeatureColumn};

/// Mean and population standard deviation of one feature column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnStats {
    pub column: FeatureColumn,
    pub mean: f64,
    pub std_dev: f64,
}

impl ColumnStats {
    /// True when the deviation is only floating-point noise around a constant column.
    pub fn is_constant(&self) -> bool {
        self.std_dev <= CONSTANT_TOLERANCE * self.mean.abs().max(1.0)
    }
}

const CONSTANT_TOLERANCE: f64 = 10.0 * f64::EPSILON;

/// Per-column statistics over the whole batch.
///
/// Uses the population standard deviation (divides by n). An empty batch
/// yields zero mean and zero deviation for every column.
pub fn column_stats(batch: &Batch) -> Vec<ColumnStats> {
    let n = batch.len() as f64;

    FeatureColumn::ALL
        .iter()
        .map(|&column| {
            if batch.is_empty() {
                return ColumnStats {
                    column,
                    mean: 0.0,
                    std_dev: 0.0,
                };
            }

            let mean = batch.iter().map(|r| r.get(column)).sum::<f64>() / n;
            let variance = batch
                .iter()
                .map(|r| {
                    let d = r.get(column) - mean;
                    d * d
                })
                .sum::<f64>()
                / n;

            ColumnStats {
                column,
                mean,
                std_dev: variance.sqrt(),
            }
        })
        .collect()
}

/// Standardizes the ten feature columns to zero mean and unit variance.
///
/// One pass over the full batch: statistics are computed first, then every
/// value becomes `(value - mean) / std_dev`. `user_id` and `track_name` are
/// left untouched and row order is preserved.
///
/// A column with zero deviation (every value equal, e.g. a single-row batch)
/// is only centered, so all of its values become `0.0`.
pub fn standardize(mut batch: Batch) -> Batch {
    let stats = column_stats(&batch);

    for record in batch.iter_mut() {
        for s in &stats {
            let scale = if s.is_constant() { 1.0 } else { s.std_dev };
            let value = (record.get(s.column) - s.mean) / scale;
            record.set(s.column, value);
        }
    }

    batch
}
