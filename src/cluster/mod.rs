//! Clustering pipeline: load located events, group them, rewrite the
//! summary table and backfill each event's cluster reference.

pub mod dbscan;
pub mod kmeans;
pub mod select;

use anyhow::Result;
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::config::{ClusterConfig, Strategy};
use crate::db::{Database, NewCluster};

pub use select::SelectionError;

/// What a clustering run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClusterRun {
    /// Located events processed.
    pub events: usize,
    /// Summary rows written.
    pub clusters: usize,
    /// Events labeled noise (density strategy only).
    pub noise: usize,
}

/// Run one clustering pass against the store.
///
/// The summary rewrite and the per-event backfill are two separate
/// transactions, as in the original pipeline; a crash between them can leave
/// fresh summaries with stale event references until the next run.
pub fn run(db: &Database, config: &ClusterConfig) -> Result<ClusterRun> {
    let events = db.located_events()?;
    if events.is_empty() {
        info!("no located earthquakes; skipping clustering");
        return Ok(ClusterRun::default());
    }

    let points: Vec<[f64; 2]> = events.iter().map(|e| e.position()).collect();
    info!(
        "clustering {} earthquake points with the {} strategy",
        points.len(),
        config.strategy
    );

    let labels = label_points(&points, config)?;

    // Centroid and member count per emitted label, in label order.
    let mut groups: BTreeMap<usize, (f64, f64, i64)> = BTreeMap::new();
    for (point, label) in points.iter().zip(&labels) {
        if let Some(label) = label {
            let entry = groups.entry(*label).or_insert((0.0, 0.0, 0));
            entry.0 += point[0];
            entry.1 += point[1];
            entry.2 += 1;
        }
    }
    let summaries: Vec<NewCluster> = groups
        .values()
        .map(|&(lat_sum, lon_sum, count)| NewCluster {
            latitude: lat_sum / count as f64,
            longitude: lon_sum / count as f64,
            cluster_size: count,
        })
        .collect();

    let ids = db.replace_clusters(&summaries)?;
    let id_by_label: BTreeMap<usize, i64> = groups.keys().copied().zip(ids).collect();

    let assignments: Vec<(String, Option<i64>)> = events
        .iter()
        .zip(&labels)
        .map(|(event, label)| {
            (
                event.id.clone(),
                label.map(|l| id_by_label[&l]),
            )
        })
        .collect();
    db.assign_clusters(&assignments)?;

    let noise = labels.iter().filter(|l| l.is_none()).count();
    info!(
        "stored {} clusters and updated {} earthquakes ({} noise)",
        summaries.len(),
        assignments.len(),
        noise
    );

    Ok(ClusterRun {
        events: events.len(),
        clusters: summaries.len(),
        noise,
    })
}

/// Produce a cluster label per point; `None` marks noise.
fn label_points(points: &[[f64; 2]], config: &ClusterConfig) -> Result<Vec<Option<usize>>> {
    if config.strategy == Strategy::Density {
        return Ok(dbscan::dbscan(points, config.eps, config.min_samples));
    }

    let k = match config.strategy {
        Strategy::FixedK => {
            anyhow::ensure!(config.k >= 1, "k must be at least 1");
            config.k
        }
        Strategy::Elbow => select::elbow_k(points, config.max_k, config.max_iterations, config.seed)?,
        Strategy::Silhouette => {
            select::silhouette_k(points, config.max_k, config.max_iterations, config.seed)?
        }
        Strategy::Adaptive => select::adaptive_k(points.len()),
        Strategy::Density => unreachable!(),
    };

    let k = if k > points.len() {
        warn!(
            "requested {} clusters for {} points; clamping",
            k,
            points.len()
        );
        points.len()
    } else {
        k
    };

    let fit = kmeans::kmeans(points, k, config.max_iterations, config.seed);
    Ok(fit.labels.into_iter().map(Some).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{EarthquakeEvent, NewCluster};
    use chrono::{TimeZone, Utc};
    use std::collections::HashSet;

    fn test_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_sqlite(&dir.path().join("geosight.db")).unwrap();
        db.initialize().unwrap();
        (dir, db)
    }

    fn event(id: &str, lat: f64, lon: f64) -> EarthquakeEvent {
        EarthquakeEvent {
            id: id.to_string(),
            time: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            latitude: Some(lat),
            longitude: Some(lon),
            depth: Some(8.0),
            magnitude: Some(3.0),
            place: None,
            cluster_id: None,
        }
    }

    fn blob_events(prefix: &str, center: (f64, f64), count: usize) -> Vec<EarthquakeEvent> {
        (0..count)
            .map(|i| {
                let jitter = i as f64 * 0.01;
                event(
                    &format!("{}{:03}", prefix, i),
                    center.0 + jitter,
                    center.1 - jitter,
                )
            })
            .collect()
    }

    #[test]
    fn fixed_k_covers_every_event() {
        let (_dir, db) = test_db();
        let mut events = blob_events("a", (10.0, 10.0), 10);
        events.extend(blob_events("b", (-40.0, 60.0), 10));
        events.extend(blob_events("c", (55.0, -120.0), 10));
        db.upsert_events(&events).unwrap();

        let config = ClusterConfig {
            strategy: Strategy::FixedK,
            k: 3,
            ..ClusterConfig::default()
        };
        let report = run(&db, &config).unwrap();
        assert_eq!(report, ClusterRun { events: 30, clusters: 3, noise: 0 });

        let clusters = db.all_clusters().unwrap();
        assert_eq!(clusters.len(), 3);
        let ids: HashSet<i64> = clusters.iter().map(|c| c.id).collect();
        let total: i64 = clusters.iter().map(|c| c.cluster_size).sum();
        assert_eq!(total, 30);

        for e in &events {
            let stored = db.get_event(&e.id).unwrap().unwrap();
            assert!(ids.contains(&stored.cluster_id.unwrap()));
        }
    }

    #[test]
    fn density_run_clears_noise_and_stores_member_means() {
        let (_dir, db) = test_db();
        let mut events = blob_events("a", (10.0, 10.0), 12);
        events.push(event("lonely", 80.0, -170.0));
        db.upsert_events(&events).unwrap();

        // Give the outlier a stale reference from a previous run.
        let stale = db
            .replace_clusters(&[NewCluster {
                latitude: 0.0,
                longitude: 0.0,
                cluster_size: 1,
            }])
            .unwrap();
        db.assign_clusters(&[("lonely".to_string(), Some(stale[0]))])
            .unwrap();

        let config = ClusterConfig {
            strategy: Strategy::Density,
            eps: 0.5,
            min_samples: 4,
            ..ClusterConfig::default()
        };
        let report = run(&db, &config).unwrap();
        assert_eq!(report.events, 13);
        assert_eq!(report.clusters, 1);
        assert_eq!(report.noise, 1);

        let lonely = db.get_event("lonely").unwrap().unwrap();
        assert_eq!(lonely.cluster_id, None);

        let clusters = db.all_clusters().unwrap();
        assert_eq!(clusters.len(), 1);
        let summary = &clusters[0];
        assert_eq!(summary.cluster_size, 12);

        let mean_lat: f64 = (0..12).map(|i| 10.0 + i as f64 * 0.01).sum::<f64>() / 12.0;
        let mean_lon: f64 = (0..12).map(|i| 10.0 - i as f64 * 0.01).sum::<f64>() / 12.0;
        assert!((summary.latitude - mean_lat).abs() < 1e-9);
        assert!((summary.longitude - mean_lon).abs() < 1e-9);

        for e in &events[..12] {
            let stored = db.get_event(&e.id).unwrap().unwrap();
            assert_eq!(stored.cluster_id, Some(summary.id));
        }
    }

    #[test]
    fn empty_working_set_mutates_nothing() {
        let (_dir, db) = test_db();
        let stale = db
            .replace_clusters(&[NewCluster {
                latitude: 1.0,
                longitude: 2.0,
                cluster_size: 3,
            }])
            .unwrap();

        let report = run(&db, &ClusterConfig::default()).unwrap();
        assert_eq!(report, ClusterRun::default());

        // The stale summary survives: nothing was touched.
        let clusters = db.all_clusters().unwrap();
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].id, stale[0]);
    }

    #[test]
    fn adaptive_strategy_uses_the_volume_step_function() {
        let (_dir, db) = test_db();
        let mut events = blob_events("a", (10.0, 10.0), 10);
        events.extend(blob_events("b", (-40.0, 60.0), 10));
        events.extend(blob_events("c", (55.0, -120.0), 10));
        db.upsert_events(&events).unwrap();

        let config = ClusterConfig {
            strategy: Strategy::Adaptive,
            ..ClusterConfig::default()
        };
        let report = run(&db, &config).unwrap();
        // 30 events fall in the smallest band: k = max(30 / 300, 3) = 3.
        assert_eq!(report.clusters, 3);
        assert_eq!(report.events, 30);
    }

    #[test]
    fn degenerate_sweep_surfaces_a_selection_error() {
        let (_dir, db) = test_db();
        db.upsert_events(&blob_events("a", (10.0, 10.0), 15))
            .unwrap();

        let config = ClusterConfig {
            strategy: Strategy::Elbow,
            ..ClusterConfig::default()
        };
        let err = run(&db, &config).unwrap_err();
        assert!(err.downcast_ref::<SelectionError>().is_some());

        // The failed run must not have rewritten anything.
        assert!(db.all_clusters().unwrap().is_empty());

        let config = ClusterConfig {
            strategy: Strategy::Silhouette,
            ..ClusterConfig::default()
        };
        assert!(run(&db, &config).is_err());
    }

    #[test]
    fn rerun_replaces_previous_assignments() {
        let (_dir, db) = test_db();
        let mut events = blob_events("a", (10.0, 10.0), 10);
        events.extend(blob_events("b", (-40.0, 60.0), 10));
        db.upsert_events(&events).unwrap();

        let config = ClusterConfig {
            strategy: Strategy::FixedK,
            k: 2,
            ..ClusterConfig::default()
        };
        run(&db, &config).unwrap();
        let first_ids: HashSet<i64> =
            db.all_clusters().unwrap().iter().map(|c| c.id).collect();

        run(&db, &config).unwrap();
        let second_ids: HashSet<i64> =
            db.all_clusters().unwrap().iter().map(|c| c.id).collect();

        // The table was rewritten and every event points into the new rows.
        assert!(first_ids.is_disjoint(&second_ids));
        for e in &events {
            let stored = db.get_event(&e.id).unwrap().unwrap();
            assert!(second_ids.contains(&stored.cluster_id.unwrap()));
        }
    }
}
