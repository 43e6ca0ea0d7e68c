pub mod cluster;
pub mod config;
pub mod db;
pub mod feed;
pub mod ingest;
pub mod logging;
