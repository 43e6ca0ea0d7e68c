//! PostgreSQL backend implementation.

use anyhow::Result;
use postgres::types::ToSql;
use postgres::NoTls;
use r2d2::Pool;
use r2d2_postgres::PostgresConnectionManager;

use super::events::{ClusterSummary, EarthquakeEvent, LocatedEvent, NewCluster};
use super::postgres_schema::POSTGRES_SCHEMA;

/// Rows per multi-row statement. Seven parameters per row keeps a chunk well
/// under the protocol's parameter limit.
const BATCH_ROWS: usize = 1000;

pub struct PgDb {
    pool: Pool<PostgresConnectionManager<NoTls>>,
}

impl PgDb {
    pub fn open(url: &str, pool_size: u32) -> Result<Self> {
        let manager = PostgresConnectionManager::new(url.parse()?, NoTls);
        let pool = Pool::builder().max_size(pool_size).build(manager)?;
        Ok(Self { pool })
    }

    pub fn initialize(&self) -> Result<()> {
        let mut client = self.pool.get()?;
        client.batch_execute(POSTGRES_SCHEMA)?;
        Ok(())
    }

    pub fn upsert_events(&self, events: &[EarthquakeEvent]) -> Result<usize> {
        let mut client = self.pool.get()?;
        let mut tx = client.transaction()?;
        for chunk in events.chunks(BATCH_ROWS) {
            let mut query = String::from(
                "INSERT INTO earthquakes (id, time, latitude, longitude, depth, magnitude, place) VALUES ",
            );
            let mut params: Vec<&(dyn ToSql + Sync)> = Vec::with_capacity(chunk.len() * 7);
            for (i, event) in chunk.iter().enumerate() {
                if i > 0 {
                    query.push_str(", ");
                }
                let base = i * 7;
                query.push_str(&format!(
                    "(${}, ${}, ${}, ${}, ${}, ${}, ${})",
                    base + 1,
                    base + 2,
                    base + 3,
                    base + 4,
                    base + 5,
                    base + 6,
                    base + 7,
                ));
                params.push(&event.id);
                params.push(&event.time);
                params.push(&event.latitude);
                params.push(&event.longitude);
                params.push(&event.depth);
                params.push(&event.magnitude);
                params.push(&event.place);
            }
            query.push_str(
                " ON CONFLICT (id) DO UPDATE SET \
                 time = EXCLUDED.time, \
                 latitude = EXCLUDED.latitude, \
                 longitude = EXCLUDED.longitude, \
                 depth = EXCLUDED.depth, \
                 magnitude = EXCLUDED.magnitude, \
                 place = EXCLUDED.place",
            );
            tx.execute(query.as_str(), &params)?;
        }
        tx.commit()?;
        Ok(events.len())
    }

    pub fn located_events(&self) -> Result<Vec<LocatedEvent>> {
        let mut client = self.pool.get()?;
        let rows = client.query(
            "SELECT id, latitude, longitude FROM earthquakes \
             WHERE latitude IS NOT NULL AND longitude IS NOT NULL \
             ORDER BY id",
            &[],
        )?;
        let results = rows
            .iter()
            .map(|row| LocatedEvent {
                id: row.get(0),
                latitude: row.get(1),
                longitude: row.get(2),
            })
            .collect();
        Ok(results)
    }

    pub fn replace_clusters(&self, clusters: &[NewCluster]) -> Result<Vec<i64>> {
        let mut client = self.pool.get()?;
        let mut tx = client.transaction()?;
        tx.execute("DELETE FROM earthquake_clusters", &[])?;
        let mut ids = Vec::with_capacity(clusters.len());
        for chunk in clusters.chunks(BATCH_ROWS) {
            let mut query = String::from(
                "INSERT INTO earthquake_clusters (latitude, longitude, cluster_size) VALUES ",
            );
            let mut params: Vec<&(dyn ToSql + Sync)> = Vec::with_capacity(chunk.len() * 3);
            for (i, cluster) in chunk.iter().enumerate() {
                if i > 0 {
                    query.push_str(", ");
                }
                let base = i * 3;
                query.push_str(&format!("(${}, ${}, ${})", base + 1, base + 2, base + 3));
                params.push(&cluster.latitude);
                params.push(&cluster.longitude);
                params.push(&cluster.cluster_size);
            }
            query.push_str(" RETURNING id");
            for row in tx.query(query.as_str(), &params)? {
                ids.push(row.get(0));
            }
        }
        tx.commit()?;
        Ok(ids)
    }

    pub fn assign_clusters(&self, assignments: &[(String, Option<i64>)]) -> Result<usize> {
        let mut client = self.pool.get()?;
        let mut tx = client.transaction()?;
        let mut updated = 0u64;
        for chunk in assignments.chunks(BATCH_ROWS) {
            let mut query = String::from("UPDATE earthquakes SET cluster_id = data.cluster_id FROM (VALUES ");
            let mut params: Vec<&(dyn ToSql + Sync)> = Vec::with_capacity(chunk.len() * 2);
            for (i, (event_id, cluster_id)) in chunk.iter().enumerate() {
                if i > 0 {
                    query.push_str(", ");
                }
                let base = i * 2;
                query.push_str(&format!("(${}::text, ${}::bigint)", base + 1, base + 2));
                params.push(event_id);
                params.push(cluster_id);
            }
            query.push_str(") AS data(id, cluster_id) WHERE earthquakes.id = data.id");
            updated += tx.execute(query.as_str(), &params)?;
        }
        tx.commit()?;
        Ok(updated as usize)
    }

    pub fn count_events(&self) -> Result<usize> {
        let mut client = self.pool.get()?;
        let row = client.query_one("SELECT COUNT(*) FROM earthquakes", &[])?;
        let count: i64 = row.get(0);
        Ok(count as usize)
    }

    pub fn get_event(&self, id: &str) -> Result<Option<EarthquakeEvent>> {
        let mut client = self.pool.get()?;
        let row = client.query_opt(
            "SELECT id, time, latitude, longitude, depth, magnitude, place, cluster_id \
             FROM earthquakes WHERE id = $1",
            &[&id],
        )?;
        Ok(row.map(|row| EarthquakeEvent {
            id: row.get(0),
            time: row
                .get::<_, Option<chrono::DateTime<chrono::Utc>>>(1)
                .unwrap_or(chrono::DateTime::UNIX_EPOCH),
            latitude: row.get(2),
            longitude: row.get(3),
            depth: row.get(4),
            magnitude: row.get(5),
            place: row.get(6),
            cluster_id: row.get(7),
        }))
    }

    pub fn all_clusters(&self) -> Result<Vec<ClusterSummary>> {
        let mut client = self.pool.get()?;
        let rows = client.query(
            "SELECT id, latitude, longitude, cluster_size FROM earthquake_clusters ORDER BY id",
            &[],
        )?;
        let results = rows
            .iter()
            .map(|row| ClusterSummary {
                id: row.get(0),
                latitude: row.get(1),
                longitude: row.get(2),
                cluster_size: row.get(3),
            })
            .collect();
        Ok(results)
    }
}
