/// Top-down recursive bisection over the quasi-diagonal asset order.
///
/// Every asset starts at weight 1.0. Each contiguous run is cut at its
/// midpoint and the two halves split the run's weight inversely to their
/// cluster variance, so weight is only ever moved between halves, never
/// created or lost.

use ndarray::Array2;

use crate::errors::OptimizationError;

/// Inverse-variance weights for a set of assets, normalized to sum to 1.
fn inverse_variance_weights(cov: &Array2<f64>, assets: &[usize]) -> Vec<f64> {
    let inv: Vec<f64> = assets
        .iter()
        .map(|&i| {
            let var = cov[[i, i]];
            if var > 0.0 { 1.0 / var } else { 0.0 }
        })
        .collect();
    let total: f64 = inv.iter().sum();
    if total > 0.0 {
        inv.iter().map(|w| w / total).collect()
    } else {
        vec![1.0 / assets.len() as f64; assets.len()]
    }
}

/// Variance of the inverse-variance portfolio over `assets`, `w' Σ w`.
pub fn cluster_variance(cov: &Array2<f64>, assets: &[usize]) -> f64 {
    let w = inverse_variance_weights(cov, assets);
    let mut var = 0.0;
    for (a, &i) in assets.iter().enumerate() {
        for (b, &j) in assets.iter().enumerate() {
            var += w[a] * w[b] * cov[[i, j]];
        }
    }
    var
}

/// Share of a run's weight that goes to its left half.
pub fn split_factor(left_var: f64, right_var: f64) -> f64 {
    let total = left_var + right_var;
    if total > 0.0 && total.is_finite() {
        1.0 - left_var / total
    } else {
        0.5
    }
}

/// Allocate weights by recursive bisection.
///
/// `order` is the quasi-diagonal permutation of asset indices and `cov` the
/// covariance of those assets. The result is indexed by asset (not by order
/// position) and sums to 1.
pub fn recursive_bisection(
    order: &[usize],
    cov: &Array2<f64>,
) -> Result<Vec<f64>, OptimizationError> {
    let n = cov.nrows();
    if order.is_empty() {
        return Err(OptimizationError::Allocation(
            "cluster order is empty".to_string(),
        ));
    }
    if cov.ncols() != n || order.len() != n {
        return Err(OptimizationError::Allocation(format!(
            "cluster order has {} assets but covariance is {}x{}",
            order.len(),
            n,
            cov.ncols()
        )));
    }
    let mut seen = vec![false; n];
    for &i in order {
        if i >= n || seen[i] {
            return Err(OptimizationError::Allocation(format!(
                "cluster order is not a permutation (asset index {})",
                i
            )));
        }
        seen[i] = true;
    }

    let mut weights = vec![1.0_f64; n];
    // work list of half-open ranges into `order`
    let mut pending = vec![(0usize, order.len())];

    while let Some((start, end)) = pending.pop() {
        if end - start <= 1 {
            continue;
        }
        let mid = start + (end - start) / 2;
        let left = &order[start..mid];
        let right = &order[mid..end];

        let alpha = split_factor(cluster_variance(cov, left), cluster_variance(cov, right));

        for &i in left {
            weights[i] *= alpha;
        }
        for &i in right {
            weights[i] *= 1.0 - alpha;
        }

        pending.push((mid, end));
        pending.push((start, mid));
    }

    Ok(weights)
}
