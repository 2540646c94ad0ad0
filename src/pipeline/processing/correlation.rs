use tracing::{debug, info, instrument};

use super::cluster::average_linkage;
use crate::types::{CorrelationTriple, WideImpacts};

/// Square Pearson correlation matrix over impact categories.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorrelationMatrix {
    pub labels: Vec<String>,
    /// Row-major; `None` where the coefficient is undefined
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    /// Pairwise-complete Pearson correlation between every pair of columns.
    pub fn pearson(wide: &WideImpacts) -> Self {
        let n = wide.columns.len();
        let mut values = vec![vec![None; n]; n];
        for i in 0..n {
            for j in i..n {
                let r = pearson(&wide.columns[i].values, &wide.columns[j].values);
                values[i][j] = r;
                values[j][i] = r;
            }
        }
        Self {
            labels: wide.columns.iter().map(|c| c.label.clone()).collect(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.values.get(row).and_then(|r| r.get(col)).copied().flatten()
    }

    /// Reindex both axes by `order`.
    pub fn reorder(&self, order: &[usize]) -> Self {
        Self {
            labels: order.iter().map(|&i| self.labels[i].clone()).collect(),
            values: order
                .iter()
                .map(|&i| order.iter().map(|&j| self.values[i][j]).collect())
                .collect(),
        }
    }

    /// Leaf order of an average-linkage clustering whose observations are
    /// the matrix rows themselves. Undefined coefficients count as 0.
    pub fn cluster_order(&self) -> Vec<usize> {
        let observations: Vec<Vec<f64>> = self
            .values
            .iter()
            .map(|row| row.iter().map(|v| v.unwrap_or(0.0)).collect())
            .collect();
        average_linkage(&observations).leaf_order()
    }

    /// Flatten to (row, column, value), column by column, full matrix.
    pub fn triples(&self) -> Vec<CorrelationTriple> {
        let mut triples = Vec::with_capacity(self.len() * self.len());
        for (col, y) in self.labels.iter().enumerate() {
            for (row, x) in self.labels.iter().enumerate() {
                triples.push(CorrelationTriple {
                    x: x.clone(),
                    y: y.clone(),
                    value: self.values[row][col],
                });
            }
        }
        triples
    }
}

/// Correlation matrix of the wide impact table, reordered by clustering.
#[instrument(skip_all, fields(categories = wide.columns.len(), processes = wide.process_uuids.len()))]
pub fn clustered_correlation(wide: &WideImpacts) -> CorrelationMatrix {
    let matrix = CorrelationMatrix::pearson(wide);
    let order = matrix.cluster_order();
    debug!("Cluster leaf order: {:?}", order);
    let reordered = matrix.reorder(&order);
    info!("Computed {}x{} correlation matrix", reordered.len(), reordered.len());
    reordered
}

/// Pearson coefficient over the rows where both values are present.
/// `None` with fewer than two such rows or a zero variance.
pub fn pearson(a: &[Option<f64>], b: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }
    let count = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / count;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / count;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let (dx, dy) = (x - mean_x, y - mean_y);
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some((cov / (var_x * var_y).sqrt()).clamp(-1.0, 1.0))
}
