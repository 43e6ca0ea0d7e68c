//! Strategies for choosing the cluster count k.

use thiserror::Error;

use super::kmeans::{dist_sq, kmeans};

/// Floor on points per candidate cluster; caps the sweep so tiny data sets
/// cannot request more clusters than they can support.
const MIN_POINTS_PER_CLUSTER: usize = 10;

/// A consecutive-drop denominator below this is treated as a flat curve
/// rather than divided by.
const NEAR_ZERO: f64 = 1e-12;

#[derive(Debug, Error)]
pub enum SelectionError {
    /// The candidate k range collapsed: too few points or too small a
    /// `max_k` for the strategy to compare anything.
    #[error(
        "k selection needs at least {needed} candidate values, got {got} \
         (max_k {max_k}, {points} points)"
    )]
    DegenerateRange {
        needed: usize,
        got: usize,
        max_k: usize,
        points: usize,
    },

    /// Every consecutive inertia drop was near zero.
    #[error("inertia curve is flat; elbow selection cannot pick a k")]
    FlatCurve,
}

fn candidate_range(points: usize, max_k: usize) -> Vec<usize> {
    let upper = max_k.min(points / MIN_POINTS_PER_CLUSTER);
    if upper < 2 {
        Vec::new()
    } else {
        (2..=upper).collect()
    }
}

/// Sweep k and pick the value immediately after the largest drop in the rate
/// of inertia decrease (the knee of the curve).
pub fn elbow_k(
    points: &[[f64; 2]],
    max_k: usize,
    max_iterations: usize,
    seed: u64,
) -> Result<usize, SelectionError> {
    let candidates = candidate_range(points.len(), max_k);
    // Two consecutive drops are needed to form a single ratio.
    if candidates.len() < 3 {
        return Err(SelectionError::DegenerateRange {
            needed: 3,
            got: candidates.len(),
            max_k,
            points: points.len(),
        });
    }

    let inertias: Vec<f64> = candidates
        .iter()
        .map(|&k| kmeans(points, k, max_iterations, seed).inertia)
        .collect();
    let drops: Vec<f64> = inertias.windows(2).map(|w| w[0] - w[1]).collect();

    let mut best: Option<(usize, f64)> = None;
    for i in 0..drops.len() - 1 {
        if drops[i + 1].abs() < NEAR_ZERO {
            continue;
        }
        let ratio = drops[i] / drops[i + 1];
        if best.map_or(true, |(_, b)| ratio > b) {
            best = Some((i, ratio));
        }
    }

    match best {
        Some((i, _)) => Ok(candidates[i + 1]),
        None => Err(SelectionError::FlatCurve),
    }
}

/// Sweep k and pick the value maximizing the mean silhouette coefficient.
pub fn silhouette_k(
    points: &[[f64; 2]],
    max_k: usize,
    max_iterations: usize,
    seed: u64,
) -> Result<usize, SelectionError> {
    let candidates = candidate_range(points.len(), max_k);
    if candidates.len() < 2 {
        return Err(SelectionError::DegenerateRange {
            needed: 2,
            got: candidates.len(),
            max_k,
            points: points.len(),
        });
    }

    let mut best_k = candidates[0];
    let mut best_score = f64::NEG_INFINITY;
    for &k in &candidates {
        let fit = kmeans(points, k, max_iterations, seed);
        let score = mean_silhouette(points, &fit.labels, k);
        if score > best_score {
            best_score = score;
            best_k = k;
        }
    }
    Ok(best_k)
}

/// Mean silhouette coefficient of a labeling: per point, cohesion (mean
/// distance to its own cluster) against separation (mean distance to the
/// nearest other cluster). Singleton members contribute zero.
pub fn mean_silhouette(points: &[[f64; 2]], labels: &[usize], k: usize) -> f64 {
    let n = points.len();
    if n == 0 {
        return 0.0;
    }
    let mut counts = vec![0usize; k];
    for &label in labels {
        counts[label] += 1;
    }

    let mut total = 0.0;
    for i in 0..n {
        let own = labels[i];
        if counts[own] <= 1 {
            continue;
        }
        let mut sums = vec![0.0f64; k];
        for j in 0..n {
            if i == j {
                continue;
            }
            sums[labels[j]] += dist_sq(&points[i], &points[j]).sqrt();
        }
        let a = sums[own] / (counts[own] - 1) as f64;
        let mut b = f64::INFINITY;
        for c in 0..k {
            if c != own && counts[c] > 0 {
                b = b.min(sums[c] / counts[c] as f64);
            }
        }
        if !b.is_finite() {
            continue;
        }
        let denom = a.max(b);
        if denom > 0.0 {
            total += (b - a) / denom;
        }
    }
    total / n as f64
}

/// Deterministic k as a step function of the event count; no search.
///
/// The divisors come from operational tuning against feed volume: small
/// catalogs get a handful of coarse clusters, month-scale catalogs level off
/// between 20 and 50.
pub fn adaptive_k(count: usize) -> usize {
    if count < 1_000 {
        (count / 300).max(3)
    } else if count < 5_000 {
        (count / 300).max(8)
    } else if count < 15_000 {
        (count / 500).max(15)
    } else {
        (count / 800).clamp(20, 50)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Three well-separated blobs with enough jitter that splitting one
    /// further still moves the inertia measurably.
    fn three_blobs() -> Vec<[f64; 2]> {
        let centers = [[0.0, 0.0], [50.0, 0.0], [0.0, 50.0]];
        let mut points = Vec::new();
        for center in &centers {
            for i in 0..20 {
                let jitter = i as f64 * 0.1;
                points.push([center[0] + jitter, center[1] - jitter * 0.5]);
            }
        }
        points
    }

    #[test]
    fn elbow_finds_the_knee_at_three() {
        let points = three_blobs();
        let k = elbow_k(&points, 6, 100, 42).unwrap();
        assert_eq!(k, 3);
    }

    #[test]
    fn silhouette_prefers_the_true_cluster_count() {
        let points = three_blobs();
        let k = silhouette_k(&points, 6, 100, 42).unwrap();
        assert_eq!(k, 3);
    }

    #[test]
    fn sweeps_reject_a_collapsed_range() {
        let points: Vec<[f64; 2]> = (0..15).map(|i| [i as f64, 0.0]).collect();

        let err = elbow_k(&points, 10, 100, 42).unwrap_err();
        assert!(matches!(err, SelectionError::DegenerateRange { .. }));

        let err = silhouette_k(&points, 10, 100, 42).unwrap_err();
        assert!(matches!(err, SelectionError::DegenerateRange { .. }));
    }

    #[test]
    fn elbow_needs_three_candidates() {
        // 25 points cap the sweep at k=2: one candidate, no ratio to compare.
        let points: Vec<[f64; 2]> = (0..25).map(|i| [i as f64, 0.0]).collect();
        let err = elbow_k(&points, 10, 100, 42).unwrap_err();
        assert!(matches!(
            err,
            SelectionError::DegenerateRange { needed: 3, .. }
        ));
    }

    #[test]
    fn adaptive_matches_documented_thresholds() {
        assert_eq!(adaptive_k(500), 3);
        assert_eq!(adaptive_k(3_000), 10);
        assert_eq!(adaptive_k(10_000), 20);
        assert_eq!(adaptive_k(20_000), 25);

        assert!(adaptive_k(500) < adaptive_k(3_000));
        assert!(adaptive_k(3_000) < adaptive_k(10_000));
        assert!(adaptive_k(10_000) <= adaptive_k(20_000));
    }

    #[test]
    fn adaptive_clamps_large_catalogs() {
        assert_eq!(adaptive_k(15_000), 20);
        assert_eq!(adaptive_k(100_000), 50);
        assert_eq!(adaptive_k(0), 3);
    }
}
