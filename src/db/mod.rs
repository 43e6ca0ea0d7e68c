mod schema;
pub mod events;
pub mod sqlite;

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "postgres")]
pub mod postgres_schema;

use anyhow::Result;

pub use events::{ClusterSummary, EarthquakeEvent, LocatedEvent, NewCluster};
pub use schema::{MIGRATIONS, SCHEMA};

use crate::config::DatabaseConfig;
#[cfg(feature = "postgres")]
use crate::config::DatabaseType;

/// Macro to dispatch a method call to the active backend variant.
macro_rules! dispatch {
    // No arguments beyond self
    ($self:expr, $method:ident()) => {
        match &$self.inner {
            DatabaseInner::Sqlite(db) => db.$method(),
            #[cfg(feature = "postgres")]
            DatabaseInner::Postgres(db) => db.$method(),
        }
    };
    // With arguments
    ($self:expr, $method:ident($($arg:expr),+ $(,)?)) => {
        match &$self.inner {
            DatabaseInner::Sqlite(db) => db.$method($($arg),+),
            #[cfg(feature = "postgres")]
            DatabaseInner::Postgres(db) => db.$method($($arg),+),
        }
    };
}

enum DatabaseInner {
    Sqlite(sqlite::SqliteDb),
    #[cfg(feature = "postgres")]
    Postgres(postgres::PgDb),
}

pub struct Database {
    inner: DatabaseInner,
}

impl Database {
    /// Open a database connection based on the provided configuration.
    pub fn open(config: &DatabaseConfig) -> Result<Self> {
        #[cfg(feature = "postgres")]
        {
            if config.backend == DatabaseType::Postgresql {
                let url = config.postgres_url()?;
                let pool_size = config.pool_size.unwrap_or(2);
                let pg = postgres::PgDb::open(&url, pool_size)?;
                return Ok(Self { inner: DatabaseInner::Postgres(pg) });
            }
        }

        let db = sqlite::SqliteDb::open(&config.sqlite_path)?;
        Ok(Self { inner: DatabaseInner::Sqlite(db) })
    }

    /// Open an SQLite-backed database directly (used by tests).
    pub fn open_sqlite(path: &std::path::Path) -> Result<Self> {
        let db = sqlite::SqliteDb::open(path)?;
        Ok(Self { inner: DatabaseInner::Sqlite(db) })
    }

    pub fn initialize(&self) -> Result<()> {
        dispatch!(self, initialize())
    }

    // ========================================================================
    // Event operations
    // ========================================================================

    /// Batch insert-or-update keyed by the provider id. The conflict-update
    /// list excludes `cluster_id`.
    pub fn upsert_events(&self, events: &[EarthquakeEvent]) -> Result<usize> {
        dispatch!(self, upsert_events(events))
    }

    /// Events carrying both coordinates, the clustering working set.
    pub fn located_events(&self) -> Result<Vec<LocatedEvent>> {
        dispatch!(self, located_events())
    }

    pub fn count_events(&self) -> Result<usize> {
        dispatch!(self, count_events())
    }

    pub fn get_event(&self, id: &str) -> Result<Option<EarthquakeEvent>> {
        dispatch!(self, get_event(id))
    }

    // ========================================================================
    // Cluster operations
    // ========================================================================

    /// Truncate and repopulate the summary table; returns assigned ids in
    /// input order.
    pub fn replace_clusters(&self, clusters: &[NewCluster]) -> Result<Vec<i64>> {
        dispatch!(self, replace_clusters(clusters))
    }

    /// Batch-update event cluster references; `None` clears.
    pub fn assign_clusters(&self, assignments: &[(String, Option<i64>)]) -> Result<usize> {
        dispatch!(self, assign_clusters(assignments))
    }

    pub fn all_clusters(&self) -> Result<Vec<ClusterSummary>> {
        dispatch!(self, all_clusters())
    }
}
