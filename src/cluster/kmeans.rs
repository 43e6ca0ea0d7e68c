//! Seeded k-means over (latitude, longitude) pairs.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Result of a k-means fit.
#[derive(Debug, Clone)]
pub struct KMeansFit {
    pub centroids: Vec<[f64; 2]>,
    /// Cluster index per input point, parallel to the input slice.
    pub labels: Vec<usize>,
    /// Sum of squared distances from each point to its assigned centroid.
    pub inertia: f64,
}

pub(crate) fn dist_sq(a: &[f64; 2], b: &[f64; 2]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    dx * dx + dy * dy
}

fn nearest(point: &[f64; 2], centroids: &[[f64; 2]]) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (i, centroid) in centroids.iter().enumerate() {
        let d = dist_sq(point, centroid);
        if d < best_dist {
            best_dist = d;
            best = i;
        }
    }
    best
}

fn assign(points: &[[f64; 2]], centroids: &[[f64; 2]]) -> Vec<usize> {
    points.iter().map(|p| nearest(p, centroids)).collect()
}

/// k-means++ seeding: the first centroid is uniform, each subsequent one is
/// drawn with probability proportional to its squared distance from the
/// nearest centroid chosen so far.
fn seed_centroids(points: &[[f64; 2]], k: usize, rng: &mut StdRng) -> Vec<[f64; 2]> {
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.random_range(0..points.len())]);

    while centroids.len() < k {
        let weights: Vec<f64> = points
            .iter()
            .map(|p| {
                centroids
                    .iter()
                    .map(|c| dist_sq(p, c))
                    .fold(f64::INFINITY, f64::min)
            })
            .collect();
        let total: f64 = weights.iter().sum();
        if total <= f64::EPSILON {
            // Every point coincides with a centroid already.
            centroids.push(points[rng.random_range(0..points.len())]);
            continue;
        }
        let mut target = rng.random::<f64>() * total;
        let mut chosen = points.len() - 1;
        for (i, w) in weights.iter().enumerate() {
            target -= w;
            if target <= 0.0 {
                chosen = i;
                break;
            }
        }
        centroids.push(points[chosen]);
    }
    centroids
}

/// Partition `points` into `k` clusters.
///
/// Lloyd iterations: assign each point to its nearest centroid, recompute
/// each centroid as the mean of its assigned points, stop when assignments
/// stabilize or `max_iterations` is reached. A cluster left without members
/// is reseeded to a random point. Reproducible for a fixed `seed`.
pub fn kmeans(points: &[[f64; 2]], k: usize, max_iterations: usize, seed: u64) -> KMeansFit {
    assert!(k >= 1, "kmeans requires k >= 1");
    assert!(
        k <= points.len(),
        "kmeans requires k <= point count ({} > {})",
        k,
        points.len()
    );

    let mut rng = StdRng::seed_from_u64(seed);
    let mut centroids = seed_centroids(points, k, &mut rng);
    let mut labels = assign(points, &centroids);

    for _ in 0..max_iterations {
        let mut sums = vec![[0.0f64; 2]; k];
        let mut counts = vec![0usize; k];
        for (point, &label) in points.iter().zip(&labels) {
            sums[label][0] += point[0];
            sums[label][1] += point[1];
            counts[label] += 1;
        }
        for c in 0..k {
            if counts[c] == 0 {
                centroids[c] = points[rng.random_range(0..points.len())];
            } else {
                let n = counts[c] as f64;
                centroids[c] = [sums[c][0] / n, sums[c][1] / n];
            }
        }

        let new_labels = assign(points, &centroids);
        let stable = new_labels == labels;
        labels = new_labels;
        if stable {
            break;
        }
    }

    let inertia = points
        .iter()
        .zip(&labels)
        .map(|(p, &label)| dist_sq(p, &centroids[label]))
        .sum();

    KMeansFit {
        centroids,
        labels,
        inertia,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_blobs() -> Vec<[f64; 2]> {
        let mut points = Vec::new();
        for i in 0..10 {
            let jitter = i as f64 * 0.01;
            points.push([10.0 + jitter, 20.0 - jitter]);
            points.push([-30.0 - jitter, 50.0 + jitter]);
        }
        points
    }

    #[test]
    fn separates_two_blobs() {
        let points = two_blobs();
        let fit = kmeans(&points, 2, 100, 42);

        // Even indices are one blob, odd indices the other.
        let first = fit.labels[0];
        let second = fit.labels[1];
        assert_ne!(first, second);
        for (i, &label) in fit.labels.iter().enumerate() {
            if i % 2 == 0 {
                assert_eq!(label, first);
            } else {
                assert_eq!(label, second);
            }
        }
        assert!(fit.inertia < 1.0);
    }

    #[test]
    fn same_seed_reproduces_the_fit() {
        let points = two_blobs();
        let a = kmeans(&points, 2, 100, 7);
        let b = kmeans(&points, 2, 100, 7);
        assert_eq!(a.labels, b.labels);
        assert_eq!(a.centroids, b.centroids);
    }

    #[test]
    fn k_one_centroid_is_the_mean() {
        let points = vec![[0.0, 0.0], [2.0, 0.0], [0.0, 2.0], [2.0, 2.0]];
        let fit = kmeans(&points, 1, 100, 42);
        assert!((fit.centroids[0][0] - 1.0).abs() < 1e-9);
        assert!((fit.centroids[0][1] - 1.0).abs() < 1e-9);
        assert!(fit.labels.iter().all(|&l| l == 0));
    }

    #[test]
    fn inertia_shrinks_as_k_grows() {
        let points = two_blobs();
        let k1 = kmeans(&points, 1, 100, 42).inertia;
        let k2 = kmeans(&points, 2, 100, 42).inertia;
        assert!(k2 < k1);
    }
}
