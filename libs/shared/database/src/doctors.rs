use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use shared_models::doctor::{Doctor, NewDoctor};

use crate::error::DatabaseError;

const DOCTOR_COLUMNS: &str =
    "id, email, password_hash, first_name, last_name, created_at, updated_at";

fn doctor_from_row(row: &Row<'_>) -> rusqlite::Result<Doctor> {
    Ok(Doctor {
        id: row.get(0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

pub fn insert_doctor(
    conn: &Connection,
    doctor: &NewDoctor,
    now: DateTime<Utc>,
) -> Result<Doctor, DatabaseError> {
    conn.execute(
        "INSERT INTO doctors (email, password_hash, first_name, last_name, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![
            doctor.email,
            doctor.password_hash,
            doctor.first_name,
            doctor.last_name,
            now,
        ],
    )?;
    let id = conn.last_insert_rowid();
    find_by_id(conn, id)?.ok_or(DatabaseError::NotFound { entity: "Doctor", id })
}

pub fn find_by_email(conn: &Connection, email: &str) -> Result<Option<Doctor>, DatabaseError> {
    let doctor = conn
        .query_row(
            &format!("SELECT {DOCTOR_COLUMNS} FROM doctors WHERE email = ?1"),
            params![email],
            doctor_from_row,
        )
        .optional()?;
    Ok(doctor)
}

pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<Doctor>, DatabaseError> {
    let doctor = conn
        .query_row(
            &format!("SELECT {DOCTOR_COLUMNS} FROM doctors WHERE id = ?1"),
            params![id],
            doctor_from_row,
        )
        .optional()?;
    Ok(doctor)
}

pub fn count_doctors(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row("SELECT COUNT(*) FROM doctors", [], |row| row.get(0))?;
    Ok(count)
}

/// Hard delete. Owned patients and their medications go with it.
pub fn delete_doctor(conn: &Connection, id: i64) -> Result<usize, DatabaseError> {
    let changes = conn.execute("DELETE FROM doctors WHERE id = ?1", params![id])?;
    Ok(changes)
}
