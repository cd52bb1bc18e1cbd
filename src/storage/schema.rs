//! Database schema definitions
//!
//! Node and edge timestamps are Unix epoch milliseconds. Run timestamps are
//! RFC 3339 text.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

-- Graph vertices and their work-queue lease
CREATE TABLE IF NOT EXISTS nodes (
    id INTEGER PRIMARY KEY,
    status TEXT NOT NULL DEFAULT 'pending'
        CHECK (status IN ('pending', 'processing', 'processed')),
    last_updated INTEGER,
    edge_count INTEGER,
    restricted INTEGER NOT NULL DEFAULT 0,
    lease_holder TEXT,
    lease_time INTEGER,
    CHECK (
        (status = 'processing' AND lease_holder IS NOT NULL AND lease_time IS NOT NULL)
        OR (status != 'processing' AND lease_holder IS NULL AND lease_time IS NULL)
    )
);

CREATE INDEX IF NOT EXISTS idx_nodes_status ON nodes(status);
CREATE INDEX IF NOT EXISTS idx_nodes_lease_holder ON nodes(lease_holder);
CREATE INDEX IF NOT EXISTS idx_nodes_status_lease_time ON nodes(status, lease_time);

-- Directed edges discovered from a source node's edge list
CREATE TABLE IF NOT EXISTS edges (
    source_id INTEGER NOT NULL REFERENCES nodes(id),
    target_id INTEGER NOT NULL REFERENCES nodes(id),
    established_at INTEGER NOT NULL,
    PRIMARY KEY (source_id, target_id)
);

CREATE INDEX IF NOT EXISTS idx_edges_target ON edges(target_id);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        initialize_schema(&conn).unwrap();
        let result = initialize_schema(&conn);

        assert!(result.is_ok());
    }

    #[test]
    fn test_tables_exist_after_init() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        for table in ["runs", "nodes", "edges"] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "Table {} should exist", table);
        }
    }

    #[test]
    fn test_processing_without_lease_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        let result = conn.execute(
            "INSERT INTO nodes (id, status) VALUES (1, 'processing')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_pending_with_lease_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        let result = conn.execute(
            "INSERT INTO nodes (id, status, lease_holder, lease_time) VALUES (1, 'pending', 'w', 0)",
            [],
        );
        assert!(result.is_err());
    }
}
