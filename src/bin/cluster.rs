//! Clustering entry point.
//!
//! Reads located earthquakes from the store, groups them with the configured
//! strategy, rewrites the `earthquake_clusters` table and backfills each
//! event's cluster reference.
//!
//! ```bash
//! geosight-cluster --strategy fixed-k --k 5
//! geosight-cluster --strategy density --eps 0.5 --min-samples 5
//! ```

use anyhow::Result;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::info;

use geosight::cluster;
use geosight::config::{Config, Strategy};
use geosight::db::Database;
use geosight::logging;

#[derive(Default)]
struct ClusterArgs {
    config_path: Option<PathBuf>,
    strategy: Option<Strategy>,
    k: Option<usize>,
    max_k: Option<usize>,
    eps: Option<f64>,
    min_samples: Option<usize>,
    seed: Option<u64>,
}

fn value_of<T: FromStr>(args: &[String], i: usize, flag: &str) -> T
where
    T::Err: std::fmt::Display,
{
    let Some(raw) = args.get(i + 1) else {
        eprintln!("Error: {} requires a value", flag);
        std::process::exit(1);
    };
    match raw.parse() {
        Ok(value) => value,
        Err(e) => {
            eprintln!("Error: invalid value '{}' for {}: {}", raw, flag, e);
            std::process::exit(1);
        }
    }
}

fn parse_args() -> ClusterArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut parsed = ClusterArgs::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("geosight-cluster {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--config" | "-c" => {
                parsed.config_path = Some(PathBuf::from(value_of::<String>(&args, i, "--config")));
                i += 1;
            }
            "--strategy" | "-s" => {
                parsed.strategy = Some(value_of(&args, i, "--strategy"));
                i += 1;
            }
            "--k" | "-k" => {
                parsed.k = Some(value_of(&args, i, "--k"));
                i += 1;
            }
            "--max-k" => {
                parsed.max_k = Some(value_of(&args, i, "--max-k"));
                i += 1;
            }
            "--eps" => {
                parsed.eps = Some(value_of(&args, i, "--eps"));
                i += 1;
            }
            "--min-samples" => {
                parsed.min_samples = Some(value_of(&args, i, "--min-samples"));
                i += 1;
            }
            "--seed" => {
                parsed.seed = Some(value_of(&args, i, "--seed"));
                i += 1;
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    parsed
}

fn print_help() {
    println!(
        r#"geosight-cluster - derive geographic clusters from stored earthquakes

USAGE:
    geosight-cluster [OPTIONS]

OPTIONS:
    --config, -c PATH     Path to config file
    --strategy, -s NAME   fixed-k | elbow | silhouette | adaptive | density
    --k, -k N             Cluster count for fixed-k
    --max-k N             Sweep bound for elbow and silhouette
    --eps DEGREES         Neighborhood radius for density
    --min-samples N       Core-point threshold for density
    --seed N              Random seed for k-means initialization
    --version, -V         Show version
    --help, -h            Show this help message

ENVIRONMENT:
    DB_HOST, DB_NAME, DB_USER, DB_PASSWORD, DB_PORT
                          PostgreSQL connection parameters (port defaults to 5432)
    GEOSIGHT_LOG          Log level (trace, debug, info, warn, error)

Config file location: $XDG_CONFIG_HOME/geosight/config.toml

See also: geosight-ingest --help"#
    );
}

fn main() -> Result<()> {
    let args = parse_args();

    dotenv::dotenv().ok();
    logging::init()?;

    let mut config = match &args.config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(strategy) = args.strategy {
        config.cluster.strategy = strategy;
    }
    if let Some(k) = args.k {
        config.cluster.k = k;
    }
    if let Some(max_k) = args.max_k {
        config.cluster.max_k = max_k;
    }
    if let Some(eps) = args.eps {
        config.cluster.eps = eps;
    }
    if let Some(min_samples) = args.min_samples {
        config.cluster.min_samples = min_samples;
    }
    if let Some(seed) = args.seed {
        config.cluster.seed = seed;
    }

    let db = Database::open(&config.database)?;
    db.initialize()?;

    let report = cluster::run(&db, &config.cluster)?;
    info!(
        "clustering finished: {} events, {} clusters, {} noise",
        report.events, report.clusters, report.noise
    );

    Ok(())
}
