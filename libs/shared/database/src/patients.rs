use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use shared_models::patient::{ActiveReviewCounts, Checklist, Patient, PatientDetails, PatientSummary};

use crate::error::DatabaseError;

const PATIENT_COLUMNS: &str = "p.id, p.doctor_id, p.name, p.email, p.phone, p.date_of_birth,
     p.is_reconciled, p.last_reconciled_at, p.asked_otcs_topicals_injectables,
     p.asked_allergies, p.asked_medication_access, p.created_at, p.updated_at";

fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: row.get(0)?,
        doctor_id: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        date_of_birth: row.get(5)?,
        is_reconciled: row.get(6)?,
        last_reconciled_at: row.get(7)?,
        asked_otcs_topicals_injectables: row.get(8)?,
        asked_allergies: row.get(9)?,
        asked_medication_access: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

pub fn insert_patient(
    conn: &Connection,
    doctor_id: i64,
    details: &PatientDetails,
    now: DateTime<Utc>,
) -> Result<Patient, DatabaseError> {
    conn.execute(
        "INSERT INTO patients (doctor_id, name, email, phone, date_of_birth, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        params![
            doctor_id,
            details.name,
            details.email,
            details.phone,
            details.date_of_birth,
            now,
        ],
    )?;
    let id = conn.last_insert_rowid();
    find_by_id(conn, id)?.ok_or(DatabaseError::NotFound { entity: "Patient", id })
}

/// Roster for one doctor, newest first.
pub fn list_by_doctor(conn: &Connection, doctor_id: i64) -> Result<Vec<PatientSummary>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PATIENT_COLUMNS},
                (SELECT COUNT(*) FROM medications m
                 WHERE m.patient_id = p.id AND m.deleted_at IS NULL) AS medication_count
         FROM patients p
         WHERE p.doctor_id = ?1
         ORDER BY p.created_at DESC, p.id DESC"
    ))?;

    let rows = stmt.query_map(params![doctor_id], |row| {
        Ok(PatientSummary {
            patient: patient_from_row(row)?,
            medication_count: row.get(13)?,
        })
    })?;

    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<Patient>, DatabaseError> {
    let patient = conn
        .query_row(
            &format!("SELECT {PATIENT_COLUMNS} FROM patients p WHERE p.id = ?1"),
            params![id],
            patient_from_row,
        )
        .optional()?;
    Ok(patient)
}

pub fn exists(conn: &Connection, id: i64) -> Result<bool, DatabaseError> {
    let found = conn
        .query_row("SELECT 1 FROM patients WHERE id = ?1", params![id], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

/// `NotFound` unless the patient exists.
pub fn require(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    if !exists(conn, id)? {
        return Err(DatabaseError::NotFound { entity: "Patient", id });
    }
    Ok(())
}

/// Overwrites the demographic fields. Returns rows changed.
pub fn update_patient(
    conn: &Connection,
    id: i64,
    details: &PatientDetails,
    now: DateTime<Utc>,
) -> Result<usize, DatabaseError> {
    let changes = conn.execute(
        "UPDATE patients
         SET name = ?1, email = ?2, phone = ?3, date_of_birth = ?4, updated_at = ?5
         WHERE id = ?6",
        params![
            details.name,
            details.email,
            details.phone,
            details.date_of_birth,
            now,
            id,
        ],
    )?;
    Ok(changes)
}

/// Hard delete. Owned medications, soft-deleted ones included, go with it.
pub fn delete_patient(conn: &Connection, id: i64) -> Result<usize, DatabaseError> {
    let changes = conn.execute("DELETE FROM patients WHERE id = ?1", params![id])?;
    Ok(changes)
}

pub fn update_checklist(
    conn: &Connection,
    id: i64,
    checklist: &Checklist,
    now: DateTime<Utc>,
) -> Result<usize, DatabaseError> {
    let changes = conn.execute(
        "UPDATE patients
         SET asked_otcs_topicals_injectables = ?1,
             asked_allergies = ?2,
             asked_medication_access = ?3,
             updated_at = ?4
         WHERE id = ?5",
        params![
            checklist.asked_otcs_topicals_injectables,
            checklist.asked_allergies,
            checklist.asked_medication_access,
            now,
            id,
        ],
    )?;
    Ok(changes)
}

pub fn update_reconciliation(
    conn: &Connection,
    id: i64,
    is_reconciled: bool,
    now: DateTime<Utc>,
) -> Result<usize, DatabaseError> {
    let changes = conn.execute(
        "UPDATE patients
         SET is_reconciled = ?1, last_reconciled_at = ?2, updated_at = ?2
         WHERE id = ?3",
        params![is_reconciled, now, id],
    )?;
    Ok(changes)
}

/// Counts over active, non-deleted medications only.
pub fn active_review_counts(conn: &Connection, patient_id: i64) -> Result<ActiveReviewCounts, DatabaseError> {
    let counts = conn.query_row(
        "SELECT COUNT(*),
                COALESCE(SUM(CASE WHEN is_taking = 1 THEN 1 ELSE 0 END), 0)
         FROM medications
         WHERE patient_id = ?1 AND status = 'active' AND deleted_at IS NULL",
        params![patient_id],
        |row| {
            Ok(ActiveReviewCounts {
                total_active: row.get(0)?,
                checked_active: row.get(1)?,
            })
        },
    )?;
    Ok(counts)
}
