//! Versioned schema changes for the record database.
//!
//! Applied versions are listed in `_migrations`. Each pending migration runs
//! in its own transaction together with its ledger row.

use std::collections::HashSet;

use rusqlite::{params, Connection};

use super::error::DatabaseError;

/// `(version, name, sql)` in application order.
const MIGRATIONS: &[(u32, &str, &str)] = &[
    (
        1,
        "create_generations_table",
        include_str!("sql/001_create_generations.sql"),
    ),
    (
        2,
        "index_generations_created_at",
        include_str!("sql/002_index_generations_created_at.sql"),
    ),
    (
        3,
        "add_melody_url_to_generations",
        include_str!("sql/003_add_melody_url.sql"),
    ),
];

const CREATE_LEDGER: &str = "CREATE TABLE IF NOT EXISTS _migrations (
    version INTEGER PRIMARY KEY,
    description TEXT NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);";

/// Applies every migration not yet in the ledger. Returns how many ran.
pub fn run_all(conn: &Connection) -> Result<usize, DatabaseError> {
    conn.execute_batch(CREATE_LEDGER)?;
    let applied = applied_versions(conn)?;

    let mut ran = 0;
    for &(version, name, sql) in MIGRATIONS {
        if applied.contains(&version) {
            continue;
        }

        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(sql)
            .map_err(|e| DatabaseError::Migration {
                version,
                reason: e.to_string(),
            })?;
        tx.execute(
            "INSERT INTO _migrations (version, description) VALUES (?1, ?2)",
            params![version, name],
        )?;
        tx.commit()?;

        log::info!("Applied schema migration {:03} ({})", version, name);
        ran += 1;
    }

    Ok(ran)
}

fn applied_versions(conn: &Connection) -> Result<HashSet<u32>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT version FROM _migrations")?;
    let versions = stmt
        .query_map([], |row| row.get::<_, u32>(0))?
        .collect::<Result<HashSet<_>, _>>()?;
    Ok(versions)
}
