//! Density-based clustering (DBSCAN).

use std::collections::VecDeque;

use super::kmeans::dist_sq;

/// Indices of all points within `eps` of `points[center]`, the point itself
/// included.
fn region_query(points: &[[f64; 2]], center: usize, eps_sq: f64) -> Vec<usize> {
    let origin = &points[center];
    points
        .iter()
        .enumerate()
        .filter(|(_, p)| dist_sq(origin, p) <= eps_sq)
        .map(|(i, _)| i)
        .collect()
}

/// Group points by density. A point with at least `min_samples` neighbors
/// within `eps` (itself counted) is a core point and seeds or extends a
/// cluster; points reachable from a core point join it; everything else is
/// noise (`None`).
///
/// Cluster indices are emergent and dense starting from zero.
pub fn dbscan(points: &[[f64; 2]], eps: f64, min_samples: usize) -> Vec<Option<usize>> {
    let n = points.len();
    let eps_sq = eps * eps;
    let mut labels: Vec<Option<usize>> = vec![None; n];
    let mut visited = vec![false; n];
    let mut cluster = 0;

    for i in 0..n {
        if visited[i] {
            continue;
        }
        visited[i] = true;

        let neighbors = region_query(points, i, eps_sq);
        if neighbors.len() < min_samples {
            // Not a core point; may still be claimed as a border point later.
            continue;
        }

        labels[i] = Some(cluster);
        let mut queue: VecDeque<usize> = neighbors.into();
        while let Some(j) = queue.pop_front() {
            if labels[j].is_none() {
                labels[j] = Some(cluster);
            }
            if !visited[j] {
                visited[j] = true;
                let reachable = region_query(points, j, eps_sq);
                if reachable.len() >= min_samples {
                    queue.extend(reachable);
                }
            }
        }
        cluster += 1;
    }

    labels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isolated_point_is_noise() {
        let mut points: Vec<[f64; 2]> = (0..8)
            .map(|i| [10.0 + i as f64 * 0.05, 20.0 + i as f64 * 0.05])
            .collect();
        points.push([80.0, -40.0]);

        let labels = dbscan(&points, 0.5, 4);
        assert!(labels[..8].iter().all(|l| l == &Some(0)));
        assert_eq!(labels[8], None);
    }

    #[test]
    fn finds_two_dense_groups() {
        let mut points = Vec::new();
        for i in 0..6 {
            points.push([0.0 + i as f64 * 0.05, 0.0]);
        }
        for i in 0..6 {
            points.push([30.0 + i as f64 * 0.05, 30.0]);
        }

        let labels = dbscan(&points, 0.5, 3);
        let first = labels[0].unwrap();
        let second = labels[6].unwrap();
        assert_ne!(first, second);
        assert!(labels[..6].iter().all(|l| l == &Some(first)));
        assert!(labels[6..].iter().all(|l| l == &Some(second)));
    }

    #[test]
    fn tiny_eps_labels_everything_noise() {
        let points: Vec<[f64; 2]> = (0..5).map(|i| [i as f64, 0.0]).collect();
        let labels = dbscan(&points, 1e-6, 2);
        assert!(labels.iter().all(|l| l.is_none()));
    }

    #[test]
    fn empty_input_yields_no_labels() {
        assert!(dbscan(&[], 0.5, 3).is_empty());
    }
}
