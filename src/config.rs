use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Public USGS feed: all events from the past 30 days, GeoJSON format.
pub const DEFAULT_FEED_URL: &str =
    "https://earthquake.usgs.gov/earthquakes/feed/v1.0/summary/all_month.geojson";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub feed: FeedConfig,

    #[serde(default)]
    pub cluster: ClusterConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    #[default]
    Sqlite,
    Postgresql,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub backend: DatabaseType,

    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: PathBuf,

    #[serde(default)]
    pub host: Option<String>,

    #[serde(default)]
    pub dbname: Option<String>,

    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub pool_size: Option<u32>,
}

fn default_sqlite_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("geosight")
        .join("geosight.db")
}

fn default_port() -> u16 {
    5432
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: DatabaseType::default(),
            sqlite_path: default_sqlite_path(),
            host: None,
            dbname: None,
            user: None,
            password: None,
            port: default_port(),
            pool_size: None,
        }
    }
}

impl DatabaseConfig {
    /// Overlay connection parameters from the process environment
    /// (`DB_HOST`, `DB_NAME`, `DB_USER`, `DB_PASSWORD`, `DB_PORT`).
    ///
    /// A present `DB_HOST` switches the backend to PostgreSQL, matching how
    /// the deployment supplies credentials.
    pub fn apply_env(&mut self) {
        if let Ok(host) = std::env::var("DB_HOST") {
            if !host.is_empty() {
                self.host = Some(host);
                self.backend = DatabaseType::Postgresql;
            }
        }
        if let Ok(dbname) = std::env::var("DB_NAME") {
            self.dbname = Some(dbname);
        }
        if let Ok(user) = std::env::var("DB_USER") {
            self.user = Some(user);
        }
        if let Ok(password) = std::env::var("DB_PASSWORD") {
            self.password = Some(password);
        }
        if let Ok(port) = std::env::var("DB_PORT") {
            if let Ok(port) = port.parse() {
                self.port = port;
            }
        }
    }

    /// Build a libpq-style connection string from the configured parameters.
    pub fn postgres_url(&self) -> Result<String> {
        let host = self
            .host
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("database host not configured (set DB_HOST)"))?;
        let dbname = self
            .dbname
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("database name not configured (set DB_NAME)"))?;
        let user = self
            .user
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("database user not configured (set DB_USER)"))?;

        let mut url = format!("host={} port={} dbname={} user={}", host, self.port, dbname, user);
        if let Some(password) = &self.password {
            url.push_str(&format!(" password={}", password));
        }
        Ok(url)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_feed_url")]
    pub url: String,

    #[serde(default = "default_feed_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_feed_url() -> String {
    DEFAULT_FEED_URL.to_string()
}

fn default_feed_timeout_secs() -> u64 {
    30
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: default_feed_url(),
            timeout_secs: default_feed_timeout_secs(),
        }
    }
}

/// How the clustering run picks its grouping.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// k-means with the configured `k`.
    #[default]
    FixedK,
    /// Sweep k, pick the knee of the inertia curve.
    Elbow,
    /// Sweep k, pick the best mean silhouette coefficient.
    Silhouette,
    /// Step function of the event count; no search.
    Adaptive,
    /// DBSCAN; cluster count emergent, sparse points labeled noise.
    Density,
}

impl FromStr for Strategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "fixed-k" | "kmeans" => Ok(Strategy::FixedK),
            "elbow" => Ok(Strategy::Elbow),
            "silhouette" => Ok(Strategy::Silhouette),
            "adaptive" => Ok(Strategy::Adaptive),
            "density" | "dbscan" => Ok(Strategy::Density),
            other => anyhow::bail!(
                "unknown strategy '{}' (expected fixed-k, elbow, silhouette, adaptive or density)",
                other
            ),
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Strategy::FixedK => "fixed-k",
            Strategy::Elbow => "elbow",
            Strategy::Silhouette => "silhouette",
            Strategy::Adaptive => "adaptive",
            Strategy::Density => "density",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    #[serde(default)]
    pub strategy: Strategy,

    /// Cluster count for the fixed-k strategy.
    #[serde(default = "default_k")]
    pub k: usize,

    /// Upper bound of the candidate sweep for elbow and silhouette.
    #[serde(default = "default_max_k")]
    pub max_k: usize,

    /// DBSCAN neighborhood radius in coordinate degrees.
    #[serde(default = "default_eps")]
    pub eps: f64,

    /// DBSCAN core-point threshold, counting the point itself.
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,

    #[serde(default = "default_seed")]
    pub seed: u64,

    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

fn default_k() -> usize {
    5
}

fn default_max_k() -> usize {
    10
}

fn default_eps() -> f64 {
    0.5
}

fn default_min_samples() -> usize {
    5
}

fn default_seed() -> u64 {
    42
}

fn default_max_iterations() -> usize {
    100
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            k: default_k(),
            max_k: default_max_k(),
            eps: default_eps(),
            min_samples: default_min_samples(),
            seed: default_seed(),
            max_iterations: default_max_iterations(),
        }
    }
}

impl Config {
    /// Load from the default location, falling back to defaults when no file
    /// exists. Environment overlays are applied either way.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();
        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };
        config.database.apply_env();
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.database.apply_env();
        Ok(config)
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("geosight")
    }

    fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }
}
