/// Agglomerative clustering of assets with Ward linkage.
///
/// The dendrogram is stored as a flat list of merges. Node ids `0..n` are the
/// original assets; merge `k` creates node `n + k`. Children always reference
/// lower ids, so the list is topologically ordered and needs no ownership links.

use tracing::debug;

use crate::errors::OptimizationError;
use crate::services::distance::DistanceMatrix;

/// Relative tolerance under which two candidate merge distances count as tied.
const TIE_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Merge {
    /// Child holding the lower original asset index.
    pub left: usize,
    pub right: usize,
    /// Ward linkage distance at which the children were joined.
    pub distance: f64,
    /// Number of assets under this node.
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dendrogram {
    leaf_count: usize,
    merges: Vec<Merge>,
}

impl Dendrogram {
    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    pub fn merges(&self) -> &[Merge] {
        &self.merges
    }

    /// Id of the node spanning every asset.
    pub fn root(&self) -> usize {
        if self.merges.is_empty() {
            0
        } else {
            self.leaf_count + self.merges.len() - 1
        }
    }

    pub fn is_leaf(&self, node: usize) -> bool {
        node < self.leaf_count
    }

    /// Children of an internal node, `None` for leaves.
    pub fn children(&self, node: usize) -> Option<(usize, usize)> {
        if self.is_leaf(node) {
            return None;
        }
        self.merges
            .get(node - self.leaf_count)
            .map(|m| (m.left, m.right))
    }
}

/// Build a Ward dendrogram from pairwise distances.
///
/// At every step the closest pair of live clusters is joined; ties are broken
/// by the smallest original asset indices the two clusters contain. Distances
/// to the new cluster come from the Lance-Williams form of Ward's criterion.
pub fn ward_linkage(dist: &DistanceMatrix) -> Result<Dendrogram, OptimizationError> {
    let n = dist.asset_count();
    if n == 0 {
        return Err(OptimizationError::Clustering(
            "cannot cluster an empty distance matrix".to_string(),
        ));
    }

    for i in 0..n {
        for j in 0..n {
            let d = dist.get(i, j);
            if !d.is_finite() {
                return Err(OptimizationError::Clustering(format!(
                    "non-finite distance between assets {} and {}",
                    i, j
                )));
            }
            if d < 0.0 {
                return Err(OptimizationError::Clustering(format!(
                    "negative distance between assets {} and {}",
                    i, j
                )));
            }
        }
    }

    let total_nodes = 2 * n - 1;
    let mut d = vec![vec![0.0_f64; total_nodes]; total_nodes];
    for i in 0..n {
        for j in 0..n {
            d[i][j] = dist.get(i, j);
        }
    }

    let mut size = vec![1_usize; total_nodes];
    // lowest original asset index under each node, used for ordering and ties
    let mut min_leaf: Vec<usize> = (0..total_nodes).collect();
    let mut active: Vec<usize> = (0..n).collect();
    let mut merges = Vec::with_capacity(n.saturating_sub(1));

    while active.len() > 1 {
        let mut best: Option<(usize, usize, f64)> = None;

        for (pos, &a) in active.iter().enumerate() {
            for &b in &active[pos + 1..] {
                let candidate = d[a][b];
                best = match best {
                    None => Some((a, b, candidate)),
                    Some((ba, bb, bd)) => {
                        let tied = (candidate - bd).abs() <= TIE_TOLERANCE * bd.max(1.0);
                        let better = if tied {
                            pair_key(&min_leaf, a, b) < pair_key(&min_leaf, ba, bb)
                        } else {
                            candidate < bd
                        };
                        if better {
                            Some((a, b, candidate))
                        } else {
                            Some((ba, bb, bd))
                        }
                    }
                };
            }
        }

        let Some((a, b, merge_dist)) = best else { break };
        let (left, right) = if min_leaf[a] <= min_leaf[b] { (a, b) } else { (b, a) };
        let node = n + merges.len();

        size[node] = size[left] + size[right];
        min_leaf[node] = min_leaf[left].min(min_leaf[right]);

        for &k in active.iter().filter(|&&k| k != left && k != right) {
            let (nl, nr, nk) = (size[left] as f64, size[right] as f64, size[k] as f64);
            let updated = ((nl + nk) * d[left][k].powi(2)
                + (nr + nk) * d[right][k].powi(2)
                - nk * merge_dist.powi(2))
                / (nl + nr + nk);
            let updated = updated.max(0.0).sqrt();
            d[node][k] = updated;
            d[k][node] = updated;
        }

        debug!(
            "Ward merge {}: {} + {} at {:.6} (size {})",
            merges.len(),
            left,
            right,
            merge_dist,
            size[node]
        );

        merges.push(Merge {
            left,
            right,
            distance: merge_dist,
            size: size[node],
        });

        active.retain(|&k| k != left && k != right);
        active.push(node);
    }

    Ok(Dendrogram { leaf_count: n, merges })
}

fn pair_key(min_leaf: &[usize], a: usize, b: usize) -> (usize, usize) {
    let (x, y) = (min_leaf[a], min_leaf[b]);
    (x + y, x.min(y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::distance::distance_from_correlation;
    use ndarray::{array, Array2};

    fn dist_from(values: Array2<f64>) -> DistanceMatrix {
        DistanceMatrix::from_array(values).unwrap()
    }

    #[test]
    fn test_correlated_pairs_merge_first() {
        // AAPL/MSFT highly correlated (0.9), GOOGL/META highly correlated (0.85)
        let corr = array![
            [1.0, 0.9, 0.3, 0.2],
            [0.9, 1.0, 0.25, 0.3],
            [0.3, 0.25, 1.0, 0.85],
            [0.2, 0.3, 0.85, 1.0],
        ];
        let tree = ward_linkage(&distance_from_correlation(&corr).unwrap()).unwrap();

        assert_eq!(tree.merges().len(), 3);
        assert_eq!((tree.merges()[0].left, tree.merges()[0].right), (0, 1));
        assert_eq!((tree.merges()[1].left, tree.merges()[1].right), (2, 3));
        assert_eq!((tree.merges()[2].left, tree.merges()[2].right), (4, 5));
        assert_eq!(tree.root(), 6);
        assert_eq!(tree.merges()[2].size, 4);
        assert!((tree.merges()[0].distance - 0.05_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_merge_distances_are_monotonic() {
        let corr = array![
            [1.0, 0.7, 0.1, -0.2, 0.4],
            [0.7, 1.0, 0.2, -0.1, 0.3],
            [0.1, 0.2, 1.0, 0.6, 0.0],
            [-0.2, -0.1, 0.6, 1.0, -0.3],
            [0.4, 0.3, 0.0, -0.3, 1.0],
        ];
        let tree = ward_linkage(&distance_from_correlation(&corr).unwrap()).unwrap();
        assert_eq!(tree.merges().len(), 4);
        for pair in tree.merges().windows(2) {
            assert!(pair[1].distance >= pair[0].distance - 1e-12);
        }
    }

    #[test]
    fn test_ties_break_on_lowest_asset_indices() {
        let d = 0.5_f64.sqrt();
        let tree = ward_linkage(&dist_from(array![
            [0.0, d, d],
            [d, 0.0, d],
            [d, d, 0.0],
        ]))
        .unwrap();
        assert_eq!((tree.merges()[0].left, tree.merges()[0].right), (0, 1));
        // {0, 1} holds the lowest original index, so it goes left of leaf 2
        assert_eq!((tree.merges()[1].left, tree.merges()[1].right), (3, 2));
        // Ward with equal distances keeps the same linkage height
        assert!((tree.merges()[1].distance - d).abs() < 1e-12);
    }

    #[test]
    fn test_clustering_is_deterministic() {
        let d = array![
            [0.0, 0.3, 0.3, 0.6],
            [0.3, 0.0, 0.3, 0.6],
            [0.3, 0.3, 0.0, 0.6],
            [0.6, 0.6, 0.6, 0.0],
        ];
        let first = ward_linkage(&dist_from(d.clone())).unwrap();
        let second = ward_linkage(&dist_from(d)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_non_finite_distance_rejected() {
        let err = ward_linkage(&dist_from(array![[0.0, f64::NAN], [f64::NAN, 0.0]])).unwrap_err();
        assert!(matches!(err, OptimizationError::Clustering(_)));
    }

    #[test]
    fn test_single_asset_has_no_merges() {
        let tree = ward_linkage(&dist_from(array![[0.0]])).unwrap();
        assert!(tree.merges().is_empty());
        assert_eq!(tree.root(), 0);
        assert!(tree.is_leaf(tree.root()));
    }
}
