pub const POSTGRES_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS earthquake_clusters (
    id BIGSERIAL PRIMARY KEY,
    latitude DOUBLE PRECISION NOT NULL,
    longitude DOUBLE PRECISION NOT NULL,
    cluster_size BIGINT NOT NULL
);

CREATE TABLE IF NOT EXISTS earthquakes (
    id TEXT PRIMARY KEY,
    time TIMESTAMPTZ,
    latitude DOUBLE PRECISION,
    longitude DOUBLE PRECISION,
    depth DOUBLE PRECISION,
    magnitude DOUBLE PRECISION,
    place TEXT,
    cluster_id BIGINT REFERENCES earthquake_clusters(id) ON DELETE SET NULL
);

CREATE INDEX IF NOT EXISTS idx_earthquakes_cluster ON earthquakes(cluster_id);
CREATE INDEX IF NOT EXISTS idx_earthquakes_time ON earthquakes(time);
"#;
