//! Database layer — migrations, queries, and cursor management.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::info;

use crate::errors::Result;
use crate::records::{EventRecord, NewEvent};

/// Establish a SQLite connection pool and run pending migrations.
pub async fn init_pool(database_url: &str) -> Result<SqlitePool> {
    // Make sure the file is created if it doesn't exist yet.
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{database_url}")
    };
    let options = SqliteConnectOptions::from_str(&url)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied successfully");
    Ok(pool)
}

// ─────────────────────────────────────────────────────────
// Cursor helpers
// ─────────────────────────────────────────────────────────

/// Read the last engine sequence number persisted to this database.
/// Returns `0` when nothing has been recorded yet.
pub async fn get_last_seq(pool: &SqlitePool) -> Result<i64> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT last_seq FROM recorder_cursor WHERE id = 1")
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|(v,)| v).unwrap_or(0))
}

/// Persist the last recorded engine sequence number.
pub async fn save_cursor(pool: &SqlitePool, last_seq: i64) -> Result<()> {
    sqlx::query("UPDATE recorder_cursor SET last_seq = ?1 WHERE id = 1")
        .bind(last_seq)
        .execute(pool)
        .await?;
    Ok(())
}

// ─────────────────────────────────────────────────────────
// Event writes
// ─────────────────────────────────────────────────────────

/// Persist a batch of events. Rows whose `seq` already exists are
/// silently ignored to make the recorder idempotent.
pub async fn insert_events(pool: &SqlitePool, events: &[NewEvent]) -> Result<usize> {
    let mut count = 0usize;
    for ev in events {
        let rows_affected = sqlx::query(
            r#"
            INSERT OR IGNORE INTO events
                (seq, event_type, project_id, actor, amount, milestone_index,
                 certificate_id, recorded_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(ev.seq)
        .bind(&ev.event_type)
        .bind(ev.project_id)
        .bind(&ev.actor)
        .bind(&ev.amount)
        .bind(ev.milestone_index)
        .bind(ev.certificate_id)
        .bind(&ev.recorded_at)
        .execute(pool)
        .await?
        .rows_affected();

        count += rows_affected as usize;
    }
    Ok(count)
}

// ─────────────────────────────────────────────────────────
// Event reads
// ─────────────────────────────────────────────────────────

/// Fetch all events for a given project, in commit order.
pub async fn get_events_for_project(pool: &SqlitePool, project_id: i64) -> Result<Vec<EventRecord>> {
    let rows = sqlx::query_as::<_, EventRecord>(
        r#"
        SELECT seq, event_type, project_id, actor, amount, milestone_index,
               certificate_id, recorded_at, created_at
        FROM   events
        WHERE  project_id = ?1
        ORDER  BY seq ASC
        "#,
    )
    .bind(project_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Fetch all events, in commit order.
pub async fn get_all_events(pool: &SqlitePool) -> Result<Vec<EventRecord>> {
    let rows = sqlx::query_as::<_, EventRecord>(
        r#"
        SELECT seq, event_type, project_id, actor, amount, milestone_index,
               certificate_id, recorded_at, created_at
        FROM   events
        ORDER  BY seq ASC
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
