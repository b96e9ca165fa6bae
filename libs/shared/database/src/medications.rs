use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use shared_models::medication::{Medication, MedicationDetails, MedicationStatus, Prescribed, TakingUpdate};

use crate::error::{DatabaseError, InvalidEnumValue};

const MEDICATION_COLUMNS: &str = "id, patient_id, name, strength, form, dose, frequency, prescribed,
     comments, intended_duration, status, is_taking, archive_reason, archive_comments,
     added_at, archived_at, deleted_at";

/// Which slice of a patient's medication history to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MedicationView {
    /// Active then archived, newest first within each. Excludes deleted.
    All,
    Active,
    Archived,
    Deleted,
}

impl MedicationView {
    fn query(&self) -> String {
        let filter_and_order = match self {
            MedicationView::All => {
                "deleted_at IS NULL
                 ORDER BY CASE status WHEN 'active' THEN 1 WHEN 'archived' THEN 2 ELSE 3 END,
                          added_at DESC, id DESC"
            }
            MedicationView::Active => {
                "status = 'active' AND deleted_at IS NULL
                 ORDER BY added_at DESC, id DESC"
            }
            MedicationView::Archived => {
                "status = 'archived' AND deleted_at IS NULL
                 ORDER BY archived_at DESC, id DESC"
            }
            MedicationView::Deleted => {
                "deleted_at IS NOT NULL
                 ORDER BY deleted_at DESC, id DESC"
            }
        };
        format!("SELECT {MEDICATION_COLUMNS} FROM medications WHERE patient_id = ?1 AND {filter_and_order}")
    }
}

fn conversion_error(idx: usize, field: &'static str, value: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(InvalidEnumValue { field, value }))
}

fn medication_from_row(row: &Row<'_>) -> rusqlite::Result<Medication> {
    let prescribed = row
        .get::<_, Option<String>>(7)?
        .filter(|raw| !raw.trim().is_empty())
        .map(|raw| {
            raw.parse::<Prescribed>()
                .map_err(|_| conversion_error(7, "prescribed", raw.clone()))
        })
        .transpose()?;
    let raw_status = row.get::<_, String>(10)?;
    let status = raw_status
        .parse::<MedicationStatus>()
        .map_err(|_| conversion_error(10, "status", raw_status.clone()))?;

    Ok(Medication {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        name: row.get(2)?,
        strength: row.get(3)?,
        form: row.get(4)?,
        dose: row.get(5)?,
        frequency: row.get(6)?,
        prescribed,
        comments: row.get(8)?,
        intended_duration: row.get(9)?,
        status,
        is_taking: row.get(11)?,
        archive_reason: row.get(12)?,
        archive_comments: row.get(13)?,
        added_at: row.get(14)?,
        archived_at: row.get(15)?,
        deleted_at: row.get(16)?,
    })
}

/// New medications start active and marked as taken.
pub fn insert_medication(
    conn: &Connection,
    patient_id: i64,
    details: &MedicationDetails,
    now: DateTime<Utc>,
) -> Result<Medication, DatabaseError> {
    conn.execute(
        "INSERT INTO medications (patient_id, name, strength, form, dose, frequency, prescribed,
         comments, intended_duration, status, is_taking, added_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 'active', 1, ?10)",
        params![
            patient_id,
            details.name,
            details.strength,
            details.form,
            details.dose,
            details.frequency,
            details.prescribed.map(|p| p.as_str()),
            details.comments,
            details.intended_duration,
            now,
        ],
    )?;
    let id = conn.last_insert_rowid();
    find_by_id(conn, id)?.ok_or(DatabaseError::NotFound { entity: "Medication", id })
}

/// Any row, soft-deleted included.
pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<Medication>, DatabaseError> {
    let medication = conn
        .query_row(
            &format!("SELECT {MEDICATION_COLUMNS} FROM medications WHERE id = ?1"),
            params![id],
            medication_from_row,
        )
        .optional()?;
    Ok(medication)
}

pub fn list_by_patient(
    conn: &Connection,
    patient_id: i64,
    view: MedicationView,
) -> Result<Vec<Medication>, DatabaseError> {
    let mut stmt = conn.prepare(&view.query())?;
    let rows = stmt.query_map(params![patient_id], medication_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Most recent removed entry with the same name, case-insensitive.
///
/// Deleted rows win over archived ones; within a group the latest
/// deletion or archival wins.
pub fn find_previous_entry(
    conn: &Connection,
    patient_id: i64,
    name: &str,
) -> Result<Option<Medication>, DatabaseError> {
    let medication = conn
        .query_row(
            &format!(
                "SELECT {MEDICATION_COLUMNS} FROM medications
                 WHERE patient_id = ?1 AND LOWER(name) = LOWER(?2)
                   AND (status = 'archived' OR deleted_at IS NOT NULL)
                 ORDER BY CASE WHEN deleted_at IS NOT NULL THEN 1 ELSE 2 END,
                          COALESCE(deleted_at, archived_at) DESC,
                          id DESC
                 LIMIT 1"
            ),
            params![patient_id, name.trim()],
            medication_from_row,
        )
        .optional()?;
    Ok(medication)
}

pub fn update_details(
    conn: &Connection,
    id: i64,
    details: &MedicationDetails,
) -> Result<usize, DatabaseError> {
    let changes = conn.execute(
        "UPDATE medications
         SET name = ?1, strength = ?2, form = ?3, dose = ?4, frequency = ?5,
             prescribed = ?6, comments = ?7, intended_duration = ?8
         WHERE id = ?9 AND deleted_at IS NULL",
        params![
            details.name,
            details.strength,
            details.form,
            details.dose,
            details.frequency,
            details.prescribed.map(|p| p.as_str()),
            details.comments,
            details.intended_duration,
            id,
        ],
    )?;
    Ok(changes)
}

/// Archiving stamps `archived_at` and the archive note. Restoring leaves both in place.
pub fn set_status(
    conn: &Connection,
    id: i64,
    status: MedicationStatus,
    archive_reason: Option<&str>,
    archive_comments: Option<&str>,
    now: DateTime<Utc>,
) -> Result<usize, DatabaseError> {
    let changes = conn.execute(
        "UPDATE medications
         SET status = ?1,
             archived_at = CASE WHEN ?1 = 'archived' THEN ?2 ELSE archived_at END,
             archive_reason = CASE WHEN ?1 = 'archived' THEN ?3 ELSE archive_reason END,
             archive_comments = CASE WHEN ?1 = 'archived' THEN ?4 ELSE archive_comments END
         WHERE id = ?5 AND deleted_at IS NULL",
        params![status.as_str(), now, archive_reason, archive_comments, id],
    )?;
    Ok(changes)
}

pub fn set_archive_info(
    conn: &Connection,
    id: i64,
    archive_reason: Option<&str>,
    archive_comments: Option<&str>,
) -> Result<usize, DatabaseError> {
    let changes = conn.execute(
        "UPDATE medications
         SET archive_reason = ?1, archive_comments = ?2
         WHERE id = ?3 AND status = 'archived' AND deleted_at IS NULL",
        params![archive_reason, archive_comments, id],
    )?;
    Ok(changes)
}

pub fn set_taking(conn: &Connection, id: i64, is_taking: bool) -> Result<usize, DatabaseError> {
    let changes = conn.execute(
        "UPDATE medications SET is_taking = ?1 WHERE id = ?2 AND deleted_at IS NULL",
        params![is_taking, id],
    )?;
    Ok(changes)
}

/// Apply a checkbox snapshot in one transaction.
///
/// Every id must be an active, non-deleted medication of `patient_id`;
/// otherwise nothing is written and `NotFound` names the offending id.
pub fn batch_update_taking(
    conn: &mut Connection,
    patient_id: i64,
    updates: &[TakingUpdate],
) -> Result<usize, DatabaseError> {
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(
            "UPDATE medications SET is_taking = ?1
             WHERE id = ?2 AND patient_id = ?3 AND status = 'active' AND deleted_at IS NULL",
        )?;
        for update in updates {
            if stmt.execute(params![update.is_taking, update.id, patient_id])? == 0 {
                return Err(DatabaseError::NotFound {
                    entity: "Active medication",
                    id: update.id,
                });
            }
        }
    }
    tx.commit()?;
    Ok(updates.len())
}

/// Soft delete: the row stays for duplicate-history lookups.
pub fn soft_delete(conn: &Connection, id: i64, now: DateTime<Utc>) -> Result<usize, DatabaseError> {
    let changes = conn.execute(
        "UPDATE medications SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
        params![now, id],
    )?;
    Ok(changes)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::Duration;

    use super::*;
    use crate::doctors::insert_doctor;
    use crate::patients::{active_review_counts, delete_patient, insert_patient};
    use crate::sqlite::open_memory_database;
    use shared_models::doctor::NewDoctor;
    use shared_models::patient::PatientDetails;

    fn seed_patient(conn: &Connection) -> i64 {
        let doctor = insert_doctor(
            conn,
            &NewDoctor {
                email: "doc@example.com".to_string(),
                password_hash: "hash".to_string(),
                first_name: None,
                last_name: None,
            },
            Utc::now(),
        )
        .unwrap();
        insert_patient(
            conn,
            doctor.id,
            &PatientDetails {
                name: "Ada".to_string(),
                ..PatientDetails::default()
            },
            Utc::now(),
        )
        .unwrap()
        .id
    }

    fn details(name: &str) -> MedicationDetails {
        MedicationDetails {
            name: name.to_string(),
            strength: Some("10 mg".to_string()),
            form: Some("tablet".to_string()),
            prescribed: Some(Prescribed::Yes),
            ..MedicationDetails::default()
        }
    }

    fn ids(meds: &[Medication]) -> Vec<i64> {
        meds.iter().map(|m| m.id).collect()
    }

    #[test]
    fn new_medication_is_active_and_taken() {
        let conn = open_memory_database().unwrap();
        let patient_id = seed_patient(&conn);
        let med = insert_medication(&conn, patient_id, &details("Lisinopril"), Utc::now()).unwrap();

        assert_eq!(med.status, MedicationStatus::Active);
        assert!(med.is_taking);
        assert_eq!(med.prescribed, Some(Prescribed::Yes));
        assert!(med.archived_at.is_none());
        assert!(med.deleted_at.is_none());
    }

    #[test]
    fn listing_orders_active_first_then_by_recency() {
        let conn = open_memory_database().unwrap();
        let patient_id = seed_patient(&conn);
        let t0 = Utc::now();
        let old = insert_medication(&conn, patient_id, &details("Old"), t0).unwrap();
        let archived = insert_medication(&conn, patient_id, &details("Gone"), t0 + Duration::seconds(1)).unwrap();
        let new = insert_medication(&conn, patient_id, &details("New"), t0 + Duration::seconds(2)).unwrap();
        set_status(&conn, archived.id, MedicationStatus::Archived, None, None, t0 + Duration::seconds(3)).unwrap();

        let all = list_by_patient(&conn, patient_id, MedicationView::All).unwrap();
        assert_eq!(ids(&all), vec![new.id, old.id, archived.id]);

        let active = list_by_patient(&conn, patient_id, MedicationView::Active).unwrap();
        assert_eq!(ids(&active), vec![new.id, old.id]);

        let archived_view = list_by_patient(&conn, patient_id, MedicationView::Archived).unwrap();
        assert_eq!(ids(&archived_view), vec![archived.id]);
    }

    #[test]
    fn soft_delete_hides_from_listings_but_keeps_history() {
        let conn = open_memory_database().unwrap();
        let patient_id = seed_patient(&conn);
        let active = insert_medication(&conn, patient_id, &details("Metformin"), Utc::now()).unwrap();
        let archived = insert_medication(&conn, patient_id, &details("Aspirin"), Utc::now()).unwrap();
        set_status(&conn, archived.id, MedicationStatus::Archived, None, None, Utc::now()).unwrap();

        assert_eq!(soft_delete(&conn, active.id, Utc::now()).unwrap(), 1);
        assert_eq!(soft_delete(&conn, archived.id, Utc::now()).unwrap(), 1);
        assert_eq!(soft_delete(&conn, active.id, Utc::now()).unwrap(), 0);

        for view in [MedicationView::All, MedicationView::Active, MedicationView::Archived] {
            assert!(list_by_patient(&conn, patient_id, view).unwrap().is_empty());
        }
        let deleted = list_by_patient(&conn, patient_id, MedicationView::Deleted).unwrap();
        assert_eq!(deleted.len(), 2);

        let previous = find_previous_entry(&conn, patient_id, "METFORMIN").unwrap().unwrap();
        assert_eq!(previous.id, active.id);
        assert!(previous.is_deleted());
        // deleted flag is orthogonal to status
        let gone = find_by_id(&conn, archived.id).unwrap().unwrap();
        assert_eq!(gone.status, MedicationStatus::Archived);
        assert!(gone.is_deleted());
    }

    #[test]
    fn archive_then_restore_keeps_archived_at() {
        let conn = open_memory_database().unwrap();
        let patient_id = seed_patient(&conn);
        let med = insert_medication(&conn, patient_id, &details("Warfarin"), Utc::now()).unwrap();

        set_status(&conn, med.id, MedicationStatus::Archived, Some("Side effects"), None, Utc::now()).unwrap();
        let archived = find_by_id(&conn, med.id).unwrap().unwrap();
        let stamp = archived.archived_at.unwrap();
        assert_eq!(archived.archive_reason.as_deref(), Some("Side effects"));

        set_status(&conn, med.id, MedicationStatus::Active, None, None, Utc::now()).unwrap();
        let restored = find_by_id(&conn, med.id).unwrap().unwrap();
        assert_eq!(restored.status, MedicationStatus::Active);
        assert_eq!(restored.archived_at, Some(stamp));
        assert_eq!(restored.archive_reason.as_deref(), Some("Side effects"));

        let active = list_by_patient(&conn, patient_id, MedicationView::Active).unwrap();
        assert_eq!(ids(&active), vec![med.id]);
    }

    #[test]
    fn previous_entry_prefers_deleted_over_archived() {
        let conn = open_memory_database().unwrap();
        let patient_id = seed_patient(&conn);
        let t0 = Utc::now();

        let archived = insert_medication(&conn, patient_id, &details("Ibuprofen"), t0).unwrap();
        set_status(&conn, archived.id, MedicationStatus::Archived, None, None, t0 + Duration::seconds(10)).unwrap();

        let deleted = insert_medication(&conn, patient_id, &details("ibuprofen"), t0).unwrap();
        soft_delete(&conn, deleted.id, t0 + Duration::seconds(5)).unwrap();

        let previous = find_previous_entry(&conn, patient_id, "Ibuprofen").unwrap().unwrap();
        assert_eq!(previous.id, deleted.id);
    }

    #[test]
    fn previous_entry_picks_latest_archival_and_ignores_active() {
        let conn = open_memory_database().unwrap();
        let patient_id = seed_patient(&conn);
        let t0 = Utc::now();

        let first = insert_medication(&conn, patient_id, &details("Atenolol"), t0).unwrap();
        let second = insert_medication(&conn, patient_id, &details("Atenolol"), t0).unwrap();
        insert_medication(&conn, patient_id, &details("Atenolol"), t0).unwrap();
        set_status(&conn, first.id, MedicationStatus::Archived, None, None, t0 + Duration::seconds(1)).unwrap();
        set_status(&conn, second.id, MedicationStatus::Archived, None, None, t0 + Duration::seconds(2)).unwrap();

        let previous = find_previous_entry(&conn, patient_id, "atenolol").unwrap().unwrap();
        assert_eq!(previous.id, second.id);
        assert!(find_previous_entry(&conn, patient_id, "Atorvastatin").unwrap().is_none());
    }

    #[test]
    fn batch_update_is_all_or_nothing() {
        let mut conn = open_memory_database().unwrap();
        let patient_id = seed_patient(&conn);
        let a = insert_medication(&conn, patient_id, &details("A"), Utc::now()).unwrap();
        let b = insert_medication(&conn, patient_id, &details("B"), Utc::now()).unwrap();

        let err = batch_update_taking(
            &mut conn,
            patient_id,
            &[
                TakingUpdate { id: a.id, is_taking: false },
                TakingUpdate { id: 9999, is_taking: false },
            ],
        )
        .unwrap_err();
        assert_matches!(err, DatabaseError::NotFound { id: 9999, .. });
        assert!(find_by_id(&conn, a.id).unwrap().unwrap().is_taking);

        let applied = batch_update_taking(
            &mut conn,
            patient_id,
            &[
                TakingUpdate { id: a.id, is_taking: false },
                TakingUpdate { id: b.id, is_taking: true },
            ],
        )
        .unwrap();
        assert_eq!(applied, 2);
        assert!(!find_by_id(&conn, a.id).unwrap().unwrap().is_taking);

        let counts = active_review_counts(&conn, patient_id).unwrap();
        assert_eq!(counts.total_active, 2);
        assert_eq!(counts.checked_active, 1);
    }

    #[test]
    fn review_counts_skip_archived_and_deleted() {
        let conn = open_memory_database().unwrap();
        let patient_id = seed_patient(&conn);
        insert_medication(&conn, patient_id, &details("A"), Utc::now()).unwrap();
        let archived = insert_medication(&conn, patient_id, &details("B"), Utc::now()).unwrap();
        let deleted = insert_medication(&conn, patient_id, &details("C"), Utc::now()).unwrap();
        set_status(&conn, archived.id, MedicationStatus::Archived, None, None, Utc::now()).unwrap();
        soft_delete(&conn, deleted.id, Utc::now()).unwrap();

        let counts = active_review_counts(&conn, patient_id).unwrap();
        assert_eq!(counts.total_active, 1);
        assert_eq!(counts.checked_active, 1);
    }

    #[test]
    fn mutations_skip_deleted_rows() {
        let conn = open_memory_database().unwrap();
        let patient_id = seed_patient(&conn);
        let med = insert_medication(&conn, patient_id, &details("A"), Utc::now()).unwrap();
        soft_delete(&conn, med.id, Utc::now()).unwrap();

        assert_eq!(set_taking(&conn, med.id, false).unwrap(), 0);
        assert_eq!(update_details(&conn, med.id, &details("B")).unwrap(), 0);
        assert_eq!(
            set_status(&conn, med.id, MedicationStatus::Archived, None, None, Utc::now()).unwrap(),
            0
        );
    }

    #[test]
    fn unknown_prescribed_text_is_invalid_enum() {
        let conn = open_memory_database().unwrap();
        let patient_id = seed_patient(&conn);
        let med = insert_medication(&conn, patient_id, &details("Aspirin"), Utc::now()).unwrap();
        conn.execute("UPDATE medications SET prescribed = 'maybe' WHERE id = ?1", params![med.id])
            .unwrap();

        assert_matches!(
            find_by_id(&conn, med.id),
            Err(DatabaseError::InvalidEnum { field: "prescribed", ref value }) if value == "maybe"
        );
    }

    #[test]
    fn deleting_patient_cascades_to_medications() {
        let conn = open_memory_database().unwrap();
        let patient_id = seed_patient(&conn);
        let kept = insert_medication(&conn, patient_id, &details("A"), Utc::now()).unwrap();
        let removed = insert_medication(&conn, patient_id, &details("B"), Utc::now()).unwrap();
        soft_delete(&conn, removed.id, Utc::now()).unwrap();

        delete_patient(&conn, patient_id).unwrap();

        assert!(find_by_id(&conn, kept.id).unwrap().is_none());
        assert!(find_by_id(&conn, removed.id).unwrap().is_none());
    }
}
