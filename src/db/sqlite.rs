//! SQLite backend implementation.

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::path::Path;

use super::events::{ClusterSummary, EarthquakeEvent, LocatedEvent, NewCluster};
use super::schema::{MIGRATIONS, SCHEMA};

pub struct SqliteDb {
    pub(crate) conn: Connection,
}

impl SqliteDb {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    pub fn initialize(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        self.run_migrations()?;
        Ok(())
    }

    fn run_migrations(&self) -> Result<()> {
        for migration in MIGRATIONS {
            let _ = self.conn.execute(migration, []);
        }
        Ok(())
    }

    /// Insert-or-update a batch of events in one transaction.
    ///
    /// The conflict-update list deliberately excludes `cluster_id`: the
    /// clustering pipeline owns that column, and re-ingesting an event must
    /// never disturb its assignment.
    pub fn upsert_events(&self, events: &[EarthquakeEvent]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO earthquakes (id, time, latitude, longitude, depth, magnitude, place)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(id) DO UPDATE SET
                    time = excluded.time,
                    latitude = excluded.latitude,
                    longitude = excluded.longitude,
                    depth = excluded.depth,
                    magnitude = excluded.magnitude,
                    place = excluded.place
                "#,
            )?;
            for event in events {
                stmt.execute(rusqlite::params![
                    event.id,
                    event.time.to_rfc3339(),
                    event.latitude,
                    event.longitude,
                    event.depth,
                    event.magnitude,
                    event.place,
                ])?;
            }
        }
        tx.commit()?;
        Ok(events.len())
    }

    /// Events whose latitude and longitude are both present.
    pub fn located_events(&self) -> Result<Vec<LocatedEvent>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, latitude, longitude FROM earthquakes
            WHERE latitude IS NOT NULL AND longitude IS NOT NULL
            ORDER BY id
            "#,
        )?;
        let results = stmt
            .query_map([], |row| {
                Ok(LocatedEvent {
                    id: row.get(0)?,
                    latitude: row.get(1)?,
                    longitude: row.get(2)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(results)
    }

    /// Wipe the summary table and insert the new centroids, returning the
    /// assigned ids in input order. Runs in one transaction.
    pub fn replace_clusters(&self, clusters: &[NewCluster]) -> Result<Vec<i64>> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM earthquake_clusters", [])?;
        let mut ids = Vec::with_capacity(clusters.len());
        {
            let mut stmt = tx.prepare(
                "INSERT INTO earthquake_clusters (latitude, longitude, cluster_size) VALUES (?1, ?2, ?3)",
            )?;
            for cluster in clusters {
                stmt.execute(rusqlite::params![
                    cluster.latitude,
                    cluster.longitude,
                    cluster.cluster_size,
                ])?;
                ids.push(tx.last_insert_rowid());
            }
        }
        tx.commit()?;
        Ok(ids)
    }

    /// Batch-update cluster references; `None` clears the reference.
    /// Runs in one transaction.
    pub fn assign_clusters(&self, assignments: &[(String, Option<i64>)]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let mut updated = 0;
        {
            let mut stmt =
                tx.prepare("UPDATE earthquakes SET cluster_id = ?1 WHERE id = ?2")?;
            for (event_id, cluster_id) in assignments {
                updated += stmt.execute(rusqlite::params![cluster_id, event_id])?;
            }
        }
        tx.commit()?;
        Ok(updated)
    }

    pub fn count_events(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM earthquakes", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn get_event(&self, id: &str) -> Result<Option<EarthquakeEvent>> {
        let result = self.conn.query_row(
            r#"
            SELECT id, time, latitude, longitude, depth, magnitude, place, cluster_id
            FROM earthquakes WHERE id = ?1
            "#,
            [id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<f64>>(2)?,
                    row.get::<_, Option<f64>>(3)?,
                    row.get::<_, Option<f64>>(4)?,
                    row.get::<_, Option<f64>>(5)?,
                    row.get::<_, Option<String>>(6)?,
                    row.get::<_, Option<i64>>(7)?,
                ))
            },
        );
        match result {
            Ok((id, time, latitude, longitude, depth, magnitude, place, cluster_id)) => {
                let time = match time {
                    Some(s) => DateTime::parse_from_rfc3339(&s)?.with_timezone(&Utc),
                    None => DateTime::<Utc>::UNIX_EPOCH,
                };
                Ok(Some(EarthquakeEvent {
                    id,
                    time,
                    latitude,
                    longitude,
                    depth,
                    magnitude,
                    place,
                    cluster_id,
                }))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn all_clusters(&self) -> Result<Vec<ClusterSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, latitude, longitude, cluster_size FROM earthquake_clusters ORDER BY id",
        )?;
        let results = stmt
            .query_map([], |row| {
                Ok(ClusterSummary {
                    id: row.get(0)?,
                    latitude: row.get(1)?,
                    longitude: row.get(2)?,
                    cluster_size: row.get(3)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(results)
    }
}
