//! USGS earthquake feed client.
//!
//! The feed is a GeoJSON feature collection; each feature carries the
//! provider id, a millisecond epoch timestamp, magnitude and place in
//! `properties`, and a `[longitude, latitude, depth]` triple in
//! `geometry.coordinates`.

use chrono::{TimeZone, Utc};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::config::FeedConfig;
use crate::db::EarthquakeEvent;

#[derive(Debug, Error)]
pub enum FeedError {
    /// Transport failure or non-success status.
    #[error("feed request failed: {0}")]
    Http(#[source] Box<ureq::Error>),

    #[error("failed to read feed response: {0}")]
    Io(#[from] std::io::Error),

    /// The payload did not match the expected feature-collection shape.
    #[error("malformed feed payload: {0}")]
    Malformed(String),
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    id: String,
    properties: Properties,
    geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize)]
struct Properties {
    /// Milliseconds since the Unix epoch.
    time: i64,
    #[serde(default)]
    mag: Option<f64>,
    #[serde(default)]
    place: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    coordinates: Vec<f64>,
}

pub struct FeedClient {
    agent: ureq::Agent,
    url: String,
}

impl FeedClient {
    pub fn new(config: &FeedConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build();
        Self {
            agent,
            url: config.url.clone(),
        }
    }

    /// Fetch and parse the current feed snapshot.
    pub fn fetch(&self) -> Result<Vec<EarthquakeEvent>, FeedError> {
        let response = self
            .agent
            .get(&self.url)
            .call()
            .map_err(|e| FeedError::Http(Box::new(e)))?;
        let body = response.into_string()?;
        parse_collection(&body)
    }
}

/// Parse a GeoJSON feature collection into event rows.
pub fn parse_collection(body: &str) -> Result<Vec<EarthquakeEvent>, FeedError> {
    let collection: FeatureCollection =
        serde_json::from_str(body).map_err(|e| FeedError::Malformed(e.to_string()))?;

    collection
        .features
        .into_iter()
        .map(feature_to_event)
        .collect()
}

fn feature_to_event(feature: Feature) -> Result<EarthquakeEvent, FeedError> {
    let geometry = feature.geometry.ok_or_else(|| {
        FeedError::Malformed(format!("feature {}: missing geometry", feature.id))
    })?;
    if geometry.coordinates.len() < 3 {
        return Err(FeedError::Malformed(format!(
            "feature {}: expected [longitude, latitude, depth], got {} coordinates",
            feature.id,
            geometry.coordinates.len()
        )));
    }

    let time = Utc
        .timestamp_millis_opt(feature.properties.time)
        .single()
        .ok_or_else(|| {
            FeedError::Malformed(format!(
                "feature {}: timestamp {} out of range",
                feature.id, feature.properties.time
            ))
        })?;

    Ok(EarthquakeEvent {
        id: feature.id,
        time,
        longitude: Some(geometry.coordinates[0]),
        latitude: Some(geometry.coordinates[1]),
        depth: Some(geometry.coordinates[2]),
        magnitude: feature.properties.mag,
        place: feature.properties.place,
        cluster_id: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "id": "us7000abcd",
                "properties": {"time": 1709294400000, "mag": 4.6, "place": "50 km W of Somewhere"},
                "geometry": {"type": "Point", "coordinates": [-118.2, 35.7, 9.3]}
            },
            {
                "type": "Feature",
                "id": "us7000abce",
                "properties": {"time": 1709294460000, "mag": null, "place": null},
                "geometry": {"type": "Point", "coordinates": [142.1, 38.0, 41.0]}
            }
        ]
    }"#;

    #[test]
    fn parses_feature_collection() {
        let events = parse_collection(SAMPLE).unwrap();
        assert_eq!(events.len(), 2);

        let first = &events[0];
        assert_eq!(first.id, "us7000abcd");
        assert_eq!(first.longitude, Some(-118.2));
        assert_eq!(first.latitude, Some(35.7));
        assert_eq!(first.depth, Some(9.3));
        assert_eq!(first.magnitude, Some(4.6));
        assert_eq!(first.time.timestamp_millis(), 1709294400000);
        assert_eq!(first.cluster_id, None);

        let second = &events[1];
        assert_eq!(second.magnitude, None);
        assert_eq!(second.place, None);
    }

    #[test]
    fn missing_geometry_is_malformed() {
        let body = r#"{"features": [{"id": "x", "properties": {"time": 0}, "geometry": null}]}"#;
        let err = parse_collection(body).unwrap_err();
        assert!(matches!(err, FeedError::Malformed(_)));
    }

    #[test]
    fn short_coordinate_tuple_is_malformed() {
        let body = r#"{"features": [{"id": "x", "properties": {"time": 0},
            "geometry": {"coordinates": [1.0, 2.0]}}]}"#;
        let err = parse_collection(body).unwrap_err();
        assert!(matches!(err, FeedError::Malformed(_)));
    }

    #[test]
    fn missing_time_field_is_malformed() {
        let body = r#"{"features": [{"id": "x", "properties": {"mag": 1.0},
            "geometry": {"coordinates": [1.0, 2.0, 3.0]}}]}"#;
        let err = parse_collection(body).unwrap_err();
        assert!(matches!(err, FeedError::Malformed(_)));
    }

    #[test]
    fn not_json_is_malformed() {
        let err = parse_collection("<html>gateway timeout</html>").unwrap_err();
        assert!(matches!(err, FeedError::Malformed(_)));
    }
}
