//! Agglomerative clustering with average linkage (UPGMA).

/// One agglomeration step. Ids below the leaf count are observations, id
/// `leaves + i` is the cluster formed at step `i`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Merge {
    /// Lower of the two cluster ids
    pub left: usize,
    pub right: usize,
    pub distance: f64,
    pub size: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dendrogram {
    pub leaves: usize,
    pub merges: Vec<Merge>,
}

impl Dendrogram {
    /// Left-to-right order of the observations under the dendrogram, visiting
    /// the lower-id child first.
    pub fn leaf_order(&self) -> Vec<usize> {
        if self.leaves == 0 {
            return Vec::new();
        }
        let root = self.leaves + self.merges.len() - 1;
        let mut order = Vec::with_capacity(self.leaves);
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if node < self.leaves {
                order.push(node);
            } else {
                let merge = &self.merges[node - self.leaves];
                stack.push(merge.right);
                stack.push(merge.left);
            }
        }
        order
    }
}

pub fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Cluster observation vectors by Euclidean distance with average linkage.
///
/// Ties on the minimum distance resolve to the pair with the lowest ids.
pub fn average_linkage(observations: &[Vec<f64>]) -> Dendrogram {
    let n = observations.len();
    if n == 0 {
        return Dendrogram::default();
    }

    let total = 2 * n - 1;
    let mut distance = vec![vec![0.0_f64; total]; total];
    for i in 0..n {
        for j in (i + 1)..n {
            let d = euclidean(&observations[i], &observations[j]);
            distance[i][j] = d;
            distance[j][i] = d;
        }
    }

    // (cluster id, size), kept in ascending id order
    let mut active: Vec<(usize, usize)> = (0..n).map(|i| (i, 1)).collect();
    let mut merges = Vec::with_capacity(n - 1);

    while active.len() > 1 {
        let mut best = (0, 1);
        let mut best_distance = f64::INFINITY;
        for a in 0..active.len() {
            for b in (a + 1)..active.len() {
                let d = distance[active[a].0][active[b].0];
                if d < best_distance {
                    best_distance = d;
                    best = (a, b);
                }
            }
        }

        let (left, left_size) = active[best.0];
        let (right, right_size) = active[best.1];
        let id = n + merges.len();
        let size = left_size + right_size;

        for &(other, _) in &active {
            if other == left || other == right {
                continue;
            }
            let d = (left_size as f64 * distance[other][left]
                + right_size as f64 * distance[other][right])
                / size as f64;
            distance[other][id] = d;
            distance[id][other] = d;
        }

        merges.push(Merge {
            left: left.min(right),
            right: left.max(right),
            distance: best_distance,
            size,
        });

        // best.1 > best.0, remove the later index first
        active.remove(best.1);
        active.remove(best.0);
        active.push((id, size));
    }

    Dendrogram { leaves: n, merges }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_points_merge_first() {
        let points = vec![vec![0.0], vec![10.0], vec![0.5], vec![10.2]];
        let dendrogram = average_linkage(&points);
        assert_eq!(dendrogram.merges.len(), 3);
        assert_eq!((dendrogram.merges[0].left, dendrogram.merges[0].right), (1, 3));
        assert_eq!((dendrogram.merges[1].left, dendrogram.merges[1].right), (0, 2));
        assert_eq!(dendrogram.merges[2].size, 4);
        assert_eq!(dendrogram.leaf_order(), vec![1, 3, 0, 2]);
    }

    #[test]
    fn average_linkage_uses_mean_distance() {
        let points = vec![vec![0.0], vec![1.0], vec![5.0]];
        let dendrogram = average_linkage(&points);
        // {0,1} then {2} at mean(5, 4) = 4.5
        assert_eq!(dendrogram.merges[0].distance, 1.0);
        assert_eq!(dendrogram.merges[1].distance, 4.5);
        assert_eq!(dendrogram.leaf_order(), vec![2, 0, 1]);
    }

    #[test]
    fn degenerate_inputs() {
        assert!(average_linkage(&[]).leaf_order().is_empty());
        assert_eq!(average_linkage(&[vec![1.0, 2.0]]).leaf_order(), vec![0]);
    }
}
