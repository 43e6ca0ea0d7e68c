//! Ingestion pipeline: fetch the current feed snapshot and upsert it.

use anyhow::Result;
use tracing::info;

use crate::db::Database;
use crate::feed::FeedClient;

/// What an ingestion run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub fetched: usize,
    pub upserted: usize,
}

/// Fetch the feed and upsert every event. Any transport or parse failure
/// aborts before the store is touched; the upsert itself is one transaction.
pub fn run(db: &Database, client: &FeedClient) -> Result<IngestReport> {
    let events = client.fetch()?;
    info!("fetched {} earthquakes from the feed", events.len());

    let upserted = db.upsert_events(&events)?;
    info!("upserted {} earthquake rows", upserted);

    Ok(IngestReport {
        fetched: events.len(),
        upserted,
    })
}
