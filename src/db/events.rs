//! Row types shared by the database backends.

use chrono::{DateTime, Utc};

/// A seismic event as stored in the `earthquakes` table.
///
/// The provider-assigned `id` is the idempotency key for ingestion; the
/// `cluster_id` is owned by the clustering pipeline and is never written by
/// the upsert path.
#[derive(Debug, Clone, PartialEq)]
pub struct EarthquakeEvent {
    pub id: String,
    pub time: DateTime<Utc>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Depth below surface in kilometers.
    pub depth: Option<f64>,
    pub magnitude: Option<f64>,
    pub place: Option<String>,
    pub cluster_id: Option<i64>,
}

/// Projection of an event that carries both coordinates.
///
/// This is the clustering pipeline's working set: events missing either
/// coordinate are excluded from the query and from the backfill, so their
/// cluster reference is never touched.
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedEvent {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl LocatedEvent {
    pub fn position(&self) -> [f64; 2] {
        [self.latitude, self.longitude]
    }
}

/// A row of the `earthquake_clusters` table.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterSummary {
    pub id: i64,
    /// Centroid latitude (mean of member latitudes).
    pub latitude: f64,
    /// Centroid longitude (mean of member longitudes).
    pub longitude: f64,
    pub cluster_size: i64,
}

/// A centroid pending insertion, before the database assigns it an id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCluster {
    pub latitude: f64,
    pub longitude: f64,
    pub cluster_size: i64,
}
