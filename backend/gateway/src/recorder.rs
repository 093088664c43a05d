//! Mirrors the engine's event bus into SQLite.
//!
//! The engine's log is authoritative for the audit trail; this module
//! copies everything past the persisted cursor into the `events` table
//! after each committed mutation. Inserts are keyed on the engine
//! sequence number and ignored on replay, so recording is idempotent
//! and a crash between insert and cursor update loses nothing.

use escrow_engine::EscrowEngine;
use sqlx::SqlitePool;
use tracing::info;

use crate::db;
use crate::errors::Result;
use crate::records::NewEvent;

/// Persist every engine event past the stored cursor.
///
/// Returns the number of newly stored rows. Called with the engine
/// still under the writer lock, so the recorded order is the commit
/// order.
pub async fn record_new_events(pool: &SqlitePool, engine: &EscrowEngine) -> Result<usize> {
    let cursor = db::get_last_seq(pool).await?;
    let pending = engine.events_since(cursor.max(0) as u64);
    if pending.is_empty() {
        return Ok(0);
    }

    let rows: Vec<NewEvent> = pending.iter().map(NewEvent::from).collect();
    let inserted = db::insert_events(pool, &rows).await?;
    let last_seq = pending.last().map(|e| e.seq as i64).unwrap_or(cursor);
    db::save_cursor(pool, last_seq).await?;

    info!("Recorded {} new event(s), cursor at {}", inserted, last_seq);
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use escrow_engine::types::AccountId;
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use std::str::FromStr;

    async fn memory_pool() -> SqlitePool {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").unwrap();
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn records_each_batch_exactly_once() {
        let pool = memory_pool().await;
        let mut engine = EscrowEngine::new();
        let verifier: AccountId = "verifier".into();
        let donor: AccountId = "donor".into();

        let id = engine
            .create_project(
                &verifier,
                "ngo".into(),
                vec![100],
                vec!["m".into()],
                "P".into(),
                "D".into(),
            )
            .unwrap();
        assert_eq!(record_new_events(&pool, &engine).await.unwrap(), 1);
        // Nothing new, nothing recorded.
        assert_eq!(record_new_events(&pool, &engine).await.unwrap(), 0);

        engine.contribute(&donor, id, 100).unwrap();
        engine.verify_milestone(&verifier, id, 0).unwrap();
        assert_eq!(record_new_events(&pool, &engine).await.unwrap(), 2);

        let stored = db::get_all_events(&pool).await.unwrap();
        assert_eq!(stored.len(), 3);
        assert_eq!(stored[1].event_type, "project_funded");
        assert_eq!(stored[1].amount.as_deref(), Some("100"));
        assert_eq!(db::get_last_seq(&pool).await.unwrap(), 3);
    }
}
