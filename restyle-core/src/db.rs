use std::path::Path;
use std::time::Duration;

use tokio_rusqlite::Connection;

use crate::artifacts::now_millis;
use crate::types::{CloseReason, DiffSession, SessionId, SessionRecord, SessionState};

const RECORD_COLUMNS: &str = "id, source_path, artifact_path, title, language, created_at,
                              state, outcome, backup_path, closed_at";

/// Opens (or creates) the journal database at `path`, configures WAL mode,
/// and applies schema migrations via the `schema_version` table.
///
/// This function is the single entry point for all journal connections.
/// It sets `busy_timeout` via the `Connection` method (not a PRAGMA string) to
/// ensure the setting takes effect regardless of pragma caching.
///
/// # Errors
///
/// Returns `tokio_rusqlite::Error` if the file cannot be opened, WAL configuration
/// fails, or schema DDL fails.
pub async fn open_db(path: &Path) -> Result<Connection, tokio_rusqlite::Error> {
    let conn = Connection::open(path).await?;

    conn.call(|db| -> rusqlite::Result<()> {
        db.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;",
        )?;
        db.busy_timeout(Duration::from_secs(5))?;
        Ok(())
    })
    .await?;

    conn.call(|db| -> rusqlite::Result<()> {
        crate::schema::migrate(db)?;
        Ok(())
    })
    .await?;

    Ok(conn)
}

fn read_record(r: &rusqlite::Row<'_>) -> rusqlite::Result<SessionRecord> {
    Ok(SessionRecord {
        id: r.get(0)?,
        source_path: r.get(1)?,
        artifact_path: r.get(2)?,
        title: r.get(3)?,
        language: r.get(4)?,
        created_at: r.get(5)?,
        state: r.get(6)?,
        outcome: r.get(7)?,
        backup_path: r.get(8)?,
        closed_at: r.get(9)?,
    })
}

/// Inserts the journal row for a freshly begun session.
///
/// # Errors
///
/// Returns `tokio_rusqlite::Error` if the insert transaction fails.
pub async fn record_session(
    conn: &Connection,
    session: &DiffSession,
) -> Result<(), tokio_rusqlite::Error> {
    let id = session.id.to_string();
    let source_path = session.source_path.to_string_lossy().into_owned();
    let artifact_path = session.formatted_path.to_string_lossy().into_owned();
    let title = session.title.clone();
    let language = session.language.as_str();
    let created_at = session.created_at;
    let state = session.state.as_str();

    conn.call(move |db| {
        let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO sessions (id, source_path, artifact_path, title, language, created_at, state)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![&id, &source_path, &artifact_path, &title, language, created_at, state],
        )?;
        tx.commit()?;
        Ok(())
    })
    .await
}

/// Updates the `state` column of an open session.
///
/// # Errors
///
/// Returns `tokio_rusqlite::Error` if the update fails.
pub async fn update_state(
    conn: &Connection,
    id: SessionId,
    state: SessionState,
) -> Result<(), tokio_rusqlite::Error> {
    let id = id.to_string();
    let state = state.as_str();

    conn.call(move |db| {
        db.execute(
            "UPDATE sessions SET state = ?1 WHERE id = ?2 AND closed_at IS NULL",
            rusqlite::params![state, &id],
        )?;
        Ok(())
    })
    .await
}

/// Records the backup taken before an apply.
///
/// # Errors
///
/// Returns `tokio_rusqlite::Error` if the update fails.
pub async fn record_backup(
    conn: &Connection,
    id: SessionId,
    backup_path: &Path,
) -> Result<(), tokio_rusqlite::Error> {
    let id = id.to_string();
    let backup_path = backup_path.to_string_lossy().into_owned();

    conn.call(move |db| {
        db.execute(
            "UPDATE sessions SET backup_path = ?1 WHERE id = ?2",
            rusqlite::params![&backup_path, &id],
        )?;
        Ok(())
    })
    .await
}

/// Marks a session closed. Closing an already-closed row is a no-op, so the
/// first recorded reason wins.
///
/// # Errors
///
/// Returns `tokio_rusqlite::Error` if the `BEGIN IMMEDIATE` transaction fails.
pub async fn close_session(
    conn: &Connection,
    id: &str,
    reason: CloseReason,
) -> Result<(), tokio_rusqlite::Error> {
    let id = id.to_owned();
    let outcome = reason.as_str();

    conn.call(move |db| {
        let now = now_millis();
        let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        tx.execute(
            "UPDATE sessions SET state = 'closed', outcome = ?1, closed_at = ?2
             WHERE id = ?3 AND closed_at IS NULL",
            rusqlite::params![outcome, now, &id],
        )?;
        tx.commit()?;
        Ok(())
    })
    .await
}

/// Returns every session that never reached `Closed`, oldest first.
///
/// # Errors
///
/// Returns `tokio_rusqlite::Error` if the query fails.
pub async fn load_dangling(conn: &Connection) -> Result<Vec<SessionRecord>, tokio_rusqlite::Error> {
    conn.call(|db| {
        let mut stmt = db.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM sessions WHERE closed_at IS NULL ORDER BY created_at ASC"
        ))?;
        let rows = stmt
            .query_map([], read_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    })
    .await
}

/// Returns the `limit` most recent sessions, newest first.
///
/// # Errors
///
/// Returns `tokio_rusqlite::Error` if the query fails.
pub async fn recent_sessions(
    conn: &Connection,
    limit: usize,
) -> Result<Vec<SessionRecord>, tokio_rusqlite::Error> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);

    conn.call(move |db| {
        let mut stmt = db.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM sessions ORDER BY created_at DESC, rowid DESC LIMIT ?1"
        ))?;
        let rows = stmt
            .query_map(rusqlite::params![limit], read_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    })
    .await
}
