// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Database Schema Migration Framework
//!
//! Provides versioned schema migrations with transactional safety.
//! Each migration has a version number, name, and either SQL or a Rust callback.
//! The runner tracks applied versions in a `schema_version` table and runs
//! pending migrations in order within a single transaction.

use rusqlite::Connection;

use super::StorageError;

/// A single schema migration step.
pub struct Migration {
    /// Monotonically increasing version number (starting at 1).
    pub version: u32,
    /// Human-readable name for this migration.
    pub name: &'static str,
    /// The migration action: either SQL or a Rust callback.
    pub action: MigrationAction,
}

/// The action a migration performs.
pub enum MigrationAction {
    /// Pure SQL migration.
    Sql(&'static str),
    /// Rust callback migration (for data transformations).
    Callback(fn(&Connection) -> Result<(), StorageError>),
}

/// Runs schema migrations against a database connection.
pub struct MigrationRunner;

impl MigrationRunner {
    /// Runs all pending migrations in a transaction.
    ///
    /// Creates the `schema_version` table if it doesn't exist, then applies
    /// any migrations whose version is greater than the current schema version.
    /// If any migration fails, all changes are rolled back.
    pub fn run(conn: &Connection, migrations: &[Migration]) -> Result<(), StorageError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at INTEGER NOT NULL
            );",
        )?;

        let current_version = Self::current_version(conn)?;

        let pending: Vec<&Migration> = migrations
            .iter()
            .filter(|m| m.version > current_version)
            .collect();

        if pending.is_empty() {
            return Ok(());
        }

        for window in pending.windows(2) {
            if window[0].version >= window[1].version {
                return Err(StorageError::Migration(format!(
                    "Migrations are not in order: v{} before v{}",
                    window[0].version, window[1].version
                )));
            }
        }

        conn.execute_batch("BEGIN EXCLUSIVE TRANSACTION;")?;

        for migration in &pending {
            let outcome = match &migration.action {
                MigrationAction::Sql(sql) => conn
                    .execute_batch(sql)
                    .map_err(|e| format!("Migration v{} '{}' failed: {}", migration.version, migration.name, e)),
                MigrationAction::Callback(cb) => cb(conn).map_err(|e| {
                    format!(
                        "Migration v{} '{}' callback failed: {}",
                        migration.version, migration.name, e
                    )
                }),
            };

            if let Err(message) = outcome {
                conn.execute_batch("ROLLBACK;")?;
                return Err(StorageError::Migration(message));
            }

            if let Err(e) = conn.execute(
                "INSERT INTO schema_version (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![migration.version, super::unix_seconds() as i64],
            ) {
                conn.execute_batch("ROLLBACK;")?;
                return Err(StorageError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e
                )));
            }

            tracing::debug!(version = migration.version, name = migration.name, "applied migration");
        }

        conn.execute_batch("COMMIT;")?;
        Ok(())
    }

    /// Returns the current schema version, or 0 if no migrations have been applied.
    pub fn current_version(conn: &Connection) -> Result<u32, StorageError> {
        let table_exists: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='schema_version'",
            [],
            |row| row.get(0),
        )?;

        if !table_exists {
            return Ok(0);
        }

        let version: Option<u32> =
            conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
                row.get(0)
            })?;

        Ok(version.unwrap_or(0))
    }
}

/// Returns all registered migrations in version order.
///
/// New migrations are appended to the end of this list.
pub fn all_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            name: "baseline_schema",
            action: MigrationAction::Sql(MIGRATION_V1_BASELINE),
        },
        Migration {
            version: 2,
            name: "normalize_empty_server_ids",
            action: MigrationAction::Callback(migrate_v2_normalize_server_ids),
        },
        Migration {
            version: 3,
            name: "server_id_unique_index",
            action: MigrationAction::Sql(MIGRATION_V3_SERVER_ID_INDEX),
        },
    ]
}

const MIGRATION_V1_BASELINE: &str = "
CREATE TABLE IF NOT EXISTS records (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    local_id TEXT NOT NULL UNIQUE,
    account TEXT NOT NULL,
    kind INTEGER NOT NULL,
    server_id TEXT,
    version INTEGER NOT NULL DEFAULT 0,
    dirty INTEGER NOT NULL DEFAULT 0,
    deleted INTEGER NOT NULL DEFAULT 0,
    last_modified INTEGER NOT NULL,
    data BLOB NOT NULL,
    photo BLOB
);

CREATE INDEX IF NOT EXISTS idx_records_dirty ON records(account, kind, dirty, deleted);

CREATE TABLE IF NOT EXISTS account_data (
    account TEXT NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    PRIMARY KEY (account, key)
);
";

/// Migration v2: an empty server id means "not accepted yet"; store it as NULL
/// so the unique index in v3 only covers real ids.
fn migrate_v2_normalize_server_ids(conn: &Connection) -> Result<(), StorageError> {
    let updated = conn.execute(
        "UPDATE records SET server_id = NULL WHERE server_id = ''",
        [],
    )?;
    if updated > 0 {
        tracing::info!(rows = updated, "normalized empty server ids");
    }
    Ok(())
}

const MIGRATION_V3_SERVER_ID_INDEX: &str = "
CREATE UNIQUE INDEX IF NOT EXISTS idx_records_server_id
    ON records(account, kind, server_id) WHERE server_id IS NOT NULL;
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_database_reaches_latest_version() {
        let conn = Connection::open_in_memory().unwrap();
        MigrationRunner::run(&conn, &all_migrations()).unwrap();
        assert_eq!(MigrationRunner::current_version(&conn).unwrap(), 3);
    }

    #[test]
    fn test_rerun_is_noop() {
        let conn = Connection::open_in_memory().unwrap();
        MigrationRunner::run(&conn, &all_migrations()).unwrap();
        MigrationRunner::run(&conn, &all_migrations()).unwrap();
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 3);
    }

    #[test]
    fn test_failed_migration_rolls_back() {
        let conn = Connection::open_in_memory().unwrap();
        let migrations = vec![
            Migration {
                version: 1,
                name: "ok",
                action: MigrationAction::Sql("CREATE TABLE t (x INTEGER);"),
            },
            Migration {
                version: 2,
                name: "broken",
                action: MigrationAction::Sql("NOT VALID SQL;"),
            },
        ];
        assert!(matches!(
            MigrationRunner::run(&conn, &migrations),
            Err(StorageError::Migration(_))
        ));
        assert_eq!(MigrationRunner::current_version(&conn).unwrap(), 0);
    }

    #[test]
    fn test_out_of_order_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        let migrations = vec![
            Migration {
                version: 2,
                name: "b",
                action: MigrationAction::Sql("SELECT 1;"),
            },
            Migration {
                version: 1,
                name: "a",
                action: MigrationAction::Sql("SELECT 1;"),
            },
        ];
        assert!(MigrationRunner::run(&conn, &migrations).is_err());
    }
}
