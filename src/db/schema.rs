pub const SCHEMA: &str = r#"
-- Cluster summaries: a derived view, truncated and rewritten on every run
CREATE TABLE IF NOT EXISTS earthquake_clusters (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    latitude REAL NOT NULL,
    longitude REAL NOT NULL,
    cluster_size INTEGER NOT NULL
);

-- Earthquake events keyed by the provider-assigned id
CREATE TABLE IF NOT EXISTS earthquakes (
    id TEXT PRIMARY KEY,
    time TEXT,                -- RFC 3339 UTC timestamp
    latitude REAL,
    longitude REAL,
    depth REAL,               -- kilometers
    magnitude REAL,
    place TEXT,
    cluster_id INTEGER REFERENCES earthquake_clusters(id) ON DELETE SET NULL
);

CREATE INDEX IF NOT EXISTS idx_earthquakes_cluster ON earthquakes(cluster_id);
CREATE INDEX IF NOT EXISTS idx_earthquakes_time ON earthquakes(time);
"#;

pub const MIGRATIONS: &[&str] = &[];
