use anyhow::Result;
use std::path::PathBuf;
use tracing::info;

use geosight::config::Config;
use geosight::db::Database;
use geosight::feed::FeedClient;
use geosight::{ingest, logging};

struct IngestArgs {
    config_path: Option<PathBuf>,
    url: Option<String>,
}

fn parse_args() -> IngestArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut parsed = IngestArgs {
        config_path: None,
        url: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("geosight-ingest {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    parsed.config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                } else {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--url" => {
                if i + 1 < args.len() {
                    parsed.url = Some(args[i + 1].clone());
                    i += 1;
                } else {
                    eprintln!("Error: --url requires a URL argument");
                    std::process::exit(1);
                }
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
        r#"geosight-ingest - fetch the USGS earthquake feed into the store

USAGE:
    geosight-ingest [OPTIONS]

OPTIONS:
    --config, -c PATH   Path to config file
    --url URL           Feed URL override
    --version, -V       Show version
    --help, -h          Show this help message

ENVIRONMENT:
    DB_HOST, DB_NAME, DB_USER, DB_PASSWORD, DB_PORT
                        PostgreSQL connection parameters (port defaults to 5432)
    GEOSIGHT_LOG        Log level (trace, debug, info, warn, error)

Config file location: $XDG_CONFIG_HOME/geosight/config.toml

See also: geosight-cluster --help"#
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
    if let Some(url) = args.url {
        config.feed.url = url;
    }

    let db = Database::open(&config.database)?;
    db.initialize()?;

    let client = FeedClient::new(&config.feed);
    let report = ingest::run(&db, &client)?;
    info!(
        "ingestion finished: {} fetched, {} upserted",
        report.fetched, report.upserted
    );

    Ok(())
}
