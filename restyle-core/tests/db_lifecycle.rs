//! Journal database: open, migrate, record and close sessions.

use std::path::PathBuf;

use restyle_core::db;
use restyle_core::types::{
    CloseReason, DiffSession, Language, Resolution, SessionId, SessionState,
};

fn temp_db_path() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("state.db");
    (dir, path)
}

fn session(name: &str, created_at: i64) -> DiffSession {
    DiffSession {
        id: SessionId::new(),
        source_path: PathBuf::from("/work").join(name),
        formatted_path: PathBuf::from("/tmp/restyle/diff/1").join(name),
        title: format!("restyle {name}"),
        language: Language::C,
        created_at,
        state: SessionState::Formatting,
    }
}

#[tokio::test]
async fn full_journal_lifecycle() {
    let (_dir, path) = temp_db_path();
    let conn = db::open_db(&path).await.unwrap();

    let version: i64 = conn
        .call(|db| {
            Ok::<_, rusqlite::Error>(db.query_row(
                "SELECT MAX(version) FROM schema_version",
                [],
                |r| r.get(0),
            )?)
        })
        .await
        .unwrap();
    assert_eq!(version, 1, "schema_version should be 1");

    let journal: String = conn
        .call(|db| {
            Ok::<_, rusqlite::Error>(db.query_row("PRAGMA journal_mode", [], |r| r.get(0))?)
        })
        .await
        .unwrap();
    assert_eq!(journal, "wal", "journal_mode should be wal");

    let pk_type: String = conn
        .call(|db| {
            Ok::<_, rusqlite::Error>(db.query_row(
                "SELECT type FROM pragma_table_info('sessions') WHERE name = 'id'",
                [],
                |r| r.get(0),
            )?)
        })
        .await
        .unwrap();
    assert_eq!(pk_type, "TEXT", "sessions.id should be TEXT");

    let first = session("main.c", 1_000);
    let second = session("util.c", 2_000);
    db::record_session(&conn, &first).await.unwrap();
    db::record_session(&conn, &second).await.unwrap();
    db::update_state(&conn, second.id, SessionState::Presenting).await.unwrap();

    let dangling = db::load_dangling(&conn).await.unwrap();
    assert_eq!(dangling.len(), 2, "both sessions are still open");
    assert_eq!(dangling[0].id, first.id.to_string(), "oldest first");
    assert_eq!(dangling[1].state, "presenting");

    db::record_backup(&conn, second.id, &PathBuf::from("/tmp/restyle/backup/2_util.c"))
        .await
        .unwrap();
    db::close_session(&conn, &second.id.to_string(), CloseReason::Resolved(Resolution::Applied))
        .await
        .unwrap();
    // first recorded reason wins
    db::close_session(&conn, &second.id.to_string(), CloseReason::Abandoned)
        .await
        .unwrap();

    let dangling = db::load_dangling(&conn).await.unwrap();
    assert_eq!(dangling.len(), 1);
    assert_eq!(dangling[0].id, first.id.to_string());

    let recent = db::recent_sessions(&conn, 10).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].id, second.id.to_string(), "newest first");
    assert_eq!(recent[0].state, "closed");
    assert_eq!(recent[0].outcome.as_deref(), Some("applied"));
    assert_eq!(recent[0].backup_path.as_deref(), Some("/tmp/restyle/backup/2_util.c"));
    assert!(recent[0].closed_at.is_some());
    assert!(recent[1].outcome.is_none());

    let limited = db::recent_sessions(&conn, 1).await.unwrap();
    assert_eq!(limited.len(), 1);

    // persistence across connections
    let conn2 = db::open_db(&path).await.unwrap();
    let dangling2 = db::load_dangling(&conn2).await.unwrap();
    assert_eq!(dangling2.len(), 1, "open rows should persist across connections");
}

#[tokio::test]
async fn migration_handles_legacy_db() {
    let (_dir, path) = temp_db_path();

    // A sessions table from an unrelated older layout, no schema_version.
    {
        let db = rusqlite::Connection::open(&path).unwrap();
        db.execute_batch(
            "CREATE TABLE sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                repo_path TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            INSERT INTO sessions (repo_path, created_at) VALUES ('/old', '2024-01-01');",
        )
        .unwrap();
    }

    let conn = db::open_db(&path).await.unwrap();
    db::record_session(&conn, &session("main.c", 5)).await.unwrap();

    let count: i64 = conn
        .call(|db| {
            Ok::<_, rusqlite::Error>(db.query_row("SELECT COUNT(*) FROM sessions", [], |r| r.get(0))?)
        })
        .await
        .unwrap();
    assert_eq!(count, 1, "only the new session should exist");
}

#[tokio::test]
async fn reopening_does_not_rerun_migration() {
    let (_dir, path) = temp_db_path();
    {
        let conn = db::open_db(&path).await.unwrap();
        db::record_session(&conn, &session("main.c", 5)).await.unwrap();
    }
    let conn = db::open_db(&path).await.unwrap();
    let recent = db::recent_sessions(&conn, 10).await.unwrap();
    assert_eq!(recent.len(), 1, "existing rows survive a second open");
}
