use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use shared_models::catalog::{CatalogEntry, NewCatalogEntry};

use crate::error::DatabaseError;

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<CatalogEntry> {
    Ok(CatalogEntry {
        id: row.get(0)?,
        name: row.get(1)?,
        form: row.get(2)?,
        created_at: row.get(3)?,
    })
}

pub fn list_catalog(conn: &Connection) -> Result<Vec<CatalogEntry>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, form, created_at FROM medication_catalog ORDER BY name",
    )?;
    let rows = stmt.query_map([], entry_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Substring match on name. LIKE is case-insensitive for ASCII in SQLite.
pub fn search_catalog(
    conn: &Connection,
    query: &str,
    limit: usize,
) -> Result<Vec<CatalogEntry>, DatabaseError> {
    let pattern = format!("%{}%", escape_like(query));
    let mut stmt = conn.prepare(
        "SELECT id, name, form, created_at FROM medication_catalog
         WHERE name LIKE ?1 ESCAPE '\\'
         ORDER BY name
         LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![pattern, limit as i64], entry_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Swap the whole catalog for `entries` in one transaction.
///
/// Names and forms are trimmed, rows missing either are skipped and a
/// repeated name keeps its first form. Returns the number of rows stored.
pub fn replace_catalog(
    conn: &mut Connection,
    entries: &[NewCatalogEntry],
    now: DateTime<Utc>,
) -> Result<usize, DatabaseError> {
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM medication_catalog", [])?;

    let mut inserted = 0;
    {
        let mut stmt = tx.prepare(
            "INSERT OR IGNORE INTO medication_catalog (name, form, created_at) VALUES (?1, ?2, ?3)",
        )?;
        for entry in entries {
            let name = entry.name.trim();
            let form = entry.form.trim();
            if name.is_empty() || form.is_empty() {
                continue;
            }
            inserted += stmt.execute(params![name, form, now])?;
        }
    }

    tx.commit()?;
    Ok(inserted)
}
