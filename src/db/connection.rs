use std::path::Path;

use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::{FinanceError, Result};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS categories (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        kind TEXT NOT NULL CHECK (kind IN ('EXPENSE', 'INCOME')),
        UNIQUE (name, kind)
    );

    CREATE TABLE IF NOT EXISTS transactions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        amount REAL NOT NULL,
        description TEXT,
        category_id INTEGER NOT NULL REFERENCES categories(id) ON DELETE CASCADE,
        date TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_transactions_category ON transactions(category_id);
    CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date);
";

/// Opens (creating if needed) the database file and applies the schema.
pub fn establish_connection(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    prepare(&conn)?;
    info!("Opened database at {}", path.display());
    Ok(conn)
}

pub fn close_connection(conn: Connection) -> Result<()> {
    conn.close().map_err(|(_, e)| FinanceError::Database(e))?;
    debug!("Database connection closed");
    Ok(())
}

fn prepare(conn: &Connection) -> Result<()> {
    // Cascades only fire with foreign keys enabled, and the pragma is per connection.
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

#[cfg(test)]
pub fn establish_test_connection() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    prepare(&conn)?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_foreign_keys_enabled() {
        let conn = establish_test_connection().unwrap();
        let enabled: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[test]
    fn test_schema_is_idempotent_on_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gastos.db");

        let conn = establish_connection(&path).unwrap();
        conn.execute(
            "INSERT INTO categories (name, kind) VALUES ('Comida', 'EXPENSE')",
            [],
        )
        .unwrap();
        close_connection(conn).unwrap();

        let conn = establish_connection(&path).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM categories", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_kind_check_constraint() {
        let conn = establish_test_connection().unwrap();
        let result = conn.execute(
            "INSERT INTO categories (name, kind) VALUES ('Comida', 'expense')",
            [],
        );
        assert!(result.is_err());
    }
}
