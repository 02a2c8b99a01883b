//! Shared SQLite PRAGMA setup for output databases

use rusqlite::Connection;

const OPTIMIZED_PRAGMAS: [&str; 6] = [
    "PRAGMA journal_mode = WAL",
    "PRAGMA synchronous = NORMAL",
    "PRAGMA temp_store = MEMORY",
    "PRAGMA mmap_size = 268435456",
    "PRAGMA cache_size = -64000",
    "PRAGMA wal_autocheckpoint = 1000",
];

/// Some PRAGMAs answer with a row and some don't, so drain whatever comes back.
fn run_pragma(conn: &Connection, sql: &str) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([])?;
    while rows.next()?.is_some() {}
    Ok(())
}

/// Apply WAL, NORMAL sync, in-memory temp store, mmap, cache and autocheckpoint
pub fn apply_optimized_pragmas(conn: &Connection) -> rusqlite::Result<()> {
    for pragma in OPTIMIZED_PRAGMAS {
        run_pragma(conn, pragma)?;
    }
    log::debug!("Applied {} SQLite PRAGMAs", OPTIMIZED_PRAGMAS.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_pragmas_applied() {
        let dir = tempdir().unwrap();
        let conn = Connection::open(dir.path().join("pragma.db")).unwrap();
        apply_optimized_pragmas(&conn).unwrap();

        let journal_mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(journal_mode.to_lowercase(), "wal");

        let checkpoint: i32 = conn
            .query_row("PRAGMA wal_autocheckpoint", [], |row| row.get(0))
            .unwrap();
        assert_eq!(checkpoint, 1000);
    }
}
