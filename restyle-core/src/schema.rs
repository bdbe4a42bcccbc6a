/// DDL to create the schema_version tracking table.
///
/// Applied unconditionally on every DB open (before checking the version),
/// using `IF NOT EXISTS` so it is safe to run multiple times.
pub const SCHEMA_VERSION_DDL: &str = "
    CREATE TABLE IF NOT EXISTS schema_version (
        version INTEGER NOT NULL
    ) STRICT;
";

/// DDL for the v1 schema.
///
/// One table, `sessions`: a row per format-and-review session keyed by UUID v4
/// text. Rows with `closed_at IS NULL` belong to sessions that never reached
/// `Closed` (crash, forced quit) and drive startup cleanup.
pub const SCHEMA_V1_SQL: &str = "
    CREATE TABLE IF NOT EXISTS sessions (
        id            TEXT    PRIMARY KEY,
        source_path   TEXT    NOT NULL,
        artifact_path TEXT    NOT NULL,
        title         TEXT    NOT NULL,
        language      TEXT    NOT NULL,
        created_at    INTEGER NOT NULL,
        state         TEXT    NOT NULL
                              CHECK(state IN ('requesting','formatting','presenting',
                                              'resolved','closed')),
        outcome       TEXT    CHECK(outcome IN ('applied','fixed','dismissed','no_diff',
                                                'failed','cancelled','superseded',
                                                'abandoned')),
        backup_path   TEXT,
        closed_at     INTEGER
    ) STRICT;

    CREATE INDEX IF NOT EXISTS sessions_open ON sessions(closed_at) WHERE closed_at IS NULL;
";

/// Runs forward-only schema migration to migrate the DB to the latest version.
///
/// Idempotent: safe to call on every startup. A database without a recorded
/// version may carry a `sessions` table from an older layout; it is dropped
/// before v1 is applied, since the journal only serves cleanup and history.
pub fn migrate(db: &mut rusqlite::Connection) -> rusqlite::Result<()> {
    db.execute_batch(SCHEMA_VERSION_DDL)?;

    let version: i64 = db
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |r| r.get(0),
        )
        .unwrap_or(0);

    if version < 1 {
        let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        tx.execute_batch("DROP TABLE IF EXISTS sessions;")?;
        tx.execute_batch(SCHEMA_V1_SQL)?;
        tx.execute("INSERT INTO schema_version (version) VALUES (1)", [])?;
        tx.commit()?;
    }

    Ok(())
}
